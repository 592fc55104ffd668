//! Backend-mode strategies
//!
//! The tree picks one strategy when it is created and routes every
//! mode-dependent decision through it:
//!
//! - [`ShadowStrategy`]: the backend mirrors the logical tree, each component
//!   owns a backend shadow root, structural nodes get elements and slot
//!   content is reported through the slot operations.
//! - [`ComposedStrategy`]: the backend holds the composed tree only;
//!   structural nodes and shadow roots have no element.
//! - [`DomlikeStrategy`]: like composed, but scopes are encoded into class
//!   names as `prefix--name` and elements are never explicitly released.

use quill_backend::{Backend, BackendMode, ElementId, StyleScopeId};

use crate::scope::StyleScopeManager;

/// Attribute carrying the class prefix when extra info is requested
pub const CLASS_PREFIX_ATTR: &str = "quill:class-prefix";

/// Mode-dependent behaviour of a node tree
pub trait TreeStrategy: Sync {
    fn mode(&self) -> BackendMode;

    /// Whether the backend tree mirrors the logical tree
    fn mirrors_logical_tree(&self) -> bool;

    /// Owner handle passed to creation calls
    fn owner_context(&self, owner: Option<ElementId>) -> Option<ElementId>;

    /// Element for a structural node, if the mode renders them
    fn create_virtual(
        &self,
        backend: &mut dyn Backend,
        owner: Option<ElementId>,
        name: &str,
    ) -> Option<ElementId>;

    /// Element standing for the shadow root of `host`
    fn shadow_root_element(
        &self,
        backend: &mut dyn Backend,
        host: Option<ElementId>,
    ) -> Option<ElementId>;

    /// Apply the node's scope; `host_scope` is set for component hosts
    fn apply_style_scope(
        &self,
        backend: &mut dyn Backend,
        scopes: &StyleScopeManager,
        write_extra_info: bool,
        elem: ElementId,
        scope: StyleScopeId,
        host_scope: Option<StyleScopeId>,
    );

    fn add_class(
        &self,
        backend: &mut dyn Backend,
        scopes: &StyleScopeManager,
        elem: ElementId,
        name: &str,
        scope: StyleScopeId,
    );

    fn remove_class(
        &self,
        backend: &mut dyn Backend,
        scopes: &StyleScopeManager,
        elem: ElementId,
        name: &str,
        scope: StyleScopeId,
    );

    fn release(&self, backend: &mut dyn Backend, elem: ElementId) {
        backend.release(elem);
    }

    /// Turn a component host virtual. Returns whether the host keeps its
    /// element.
    fn set_virtual_host(&self, backend: &mut dyn Backend, elem: ElementId) -> bool;

    fn add_external_class(&self, _backend: &mut dyn Backend, _elem: ElementId, _name: &str) {}

    fn set_class_alias(
        &self,
        _backend: &mut dyn Backend,
        _elem: ElementId,
        _name: &str,
        _target: &str,
    ) {
    }

    fn set_inherit_slots(&self, _backend: &mut dyn Backend, _elem: ElementId) {}

    fn set_slot_name(&self, _backend: &mut dyn Backend, _elem: ElementId, _name: &str) {}
}

/// Strategy for a backend mode
pub fn strategy_for(mode: BackendMode) -> &'static dyn TreeStrategy {
    match mode {
        BackendMode::Shadow => &ShadowStrategy,
        BackendMode::Composed => &ComposedStrategy,
        BackendMode::Domlike => &DomlikeStrategy,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShadowStrategy;

impl TreeStrategy for ShadowStrategy {
    fn mode(&self) -> BackendMode {
        BackendMode::Shadow
    }

    fn mirrors_logical_tree(&self) -> bool {
        true
    }

    fn owner_context(&self, owner: Option<ElementId>) -> Option<ElementId> {
        owner
    }

    fn create_virtual(
        &self,
        backend: &mut dyn Backend,
        owner: Option<ElementId>,
        name: &str,
    ) -> Option<ElementId> {
        Some(backend.create_virtual_node(owner, name))
    }

    fn shadow_root_element(
        &self,
        backend: &mut dyn Backend,
        host: Option<ElementId>,
    ) -> Option<ElementId> {
        host.and_then(|host| backend.shadow_root(host))
    }

    fn apply_style_scope(
        &self,
        backend: &mut dyn Backend,
        _scopes: &StyleScopeManager,
        _write_extra_info: bool,
        elem: ElementId,
        scope: StyleScopeId,
        host_scope: Option<StyleScopeId>,
    ) {
        backend.set_style_scope(elem, scope, host_scope);
    }

    fn add_class(
        &self,
        backend: &mut dyn Backend,
        _scopes: &StyleScopeManager,
        elem: ElementId,
        name: &str,
        scope: StyleScopeId,
    ) {
        backend.add_class(elem, name, scope.non_global());
    }

    fn remove_class(
        &self,
        backend: &mut dyn Backend,
        _scopes: &StyleScopeManager,
        elem: ElementId,
        name: &str,
        scope: StyleScopeId,
    ) {
        backend.remove_class(elem, name, scope.non_global());
    }

    fn set_virtual_host(&self, backend: &mut dyn Backend, elem: ElementId) -> bool {
        backend.set_virtual_host(elem);
        true
    }

    fn add_external_class(&self, backend: &mut dyn Backend, elem: ElementId, name: &str) {
        backend.add_external_class(elem, name);
    }

    fn set_class_alias(
        &self,
        backend: &mut dyn Backend,
        elem: ElementId,
        name: &str,
        target: &str,
    ) {
        backend.set_class_alias(elem, name, target);
    }

    fn set_inherit_slots(&self, backend: &mut dyn Backend, elem: ElementId) {
        backend.set_inherit_slots(elem);
    }

    fn set_slot_name(&self, backend: &mut dyn Backend, elem: ElementId, name: &str) {
        backend.set_slot_name(elem, name);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ComposedStrategy;

impl TreeStrategy for ComposedStrategy {
    fn mode(&self) -> BackendMode {
        BackendMode::Composed
    }

    fn mirrors_logical_tree(&self) -> bool {
        false
    }

    fn owner_context(&self, _owner: Option<ElementId>) -> Option<ElementId> {
        None
    }

    fn create_virtual(
        &self,
        _backend: &mut dyn Backend,
        _owner: Option<ElementId>,
        _name: &str,
    ) -> Option<ElementId> {
        None
    }

    fn shadow_root_element(
        &self,
        _backend: &mut dyn Backend,
        _host: Option<ElementId>,
    ) -> Option<ElementId> {
        None
    }

    fn apply_style_scope(
        &self,
        backend: &mut dyn Backend,
        _scopes: &StyleScopeManager,
        _write_extra_info: bool,
        elem: ElementId,
        scope: StyleScopeId,
        host_scope: Option<StyleScopeId>,
    ) {
        backend.set_style_scope(elem, scope, host_scope);
    }

    fn add_class(
        &self,
        backend: &mut dyn Backend,
        _scopes: &StyleScopeManager,
        elem: ElementId,
        name: &str,
        scope: StyleScopeId,
    ) {
        backend.add_class(elem, name, scope.non_global());
    }

    fn remove_class(
        &self,
        backend: &mut dyn Backend,
        _scopes: &StyleScopeManager,
        elem: ElementId,
        name: &str,
        scope: StyleScopeId,
    ) {
        backend.remove_class(elem, name, scope.non_global());
    }

    fn set_virtual_host(&self, backend: &mut dyn Backend, elem: ElementId) -> bool {
        backend.release(elem);
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DomlikeStrategy;

impl DomlikeStrategy {
    /// `prefix--name` for scopes with a registered prefix, else `name`
    pub fn encode_class(scopes: &StyleScopeManager, name: &str, scope: StyleScopeId) -> String {
        let prefix = scope
            .non_global()
            .and_then(|scope| scopes.query_name(scope))
            .unwrap_or_default();
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}--{name}")
        }
    }
}

impl TreeStrategy for DomlikeStrategy {
    fn mode(&self) -> BackendMode {
        BackendMode::Domlike
    }

    fn mirrors_logical_tree(&self) -> bool {
        false
    }

    fn owner_context(&self, _owner: Option<ElementId>) -> Option<ElementId> {
        None
    }

    fn create_virtual(
        &self,
        _backend: &mut dyn Backend,
        _owner: Option<ElementId>,
        _name: &str,
    ) -> Option<ElementId> {
        None
    }

    fn shadow_root_element(
        &self,
        _backend: &mut dyn Backend,
        _host: Option<ElementId>,
    ) -> Option<ElementId> {
        None
    }

    fn apply_style_scope(
        &self,
        backend: &mut dyn Backend,
        scopes: &StyleScopeManager,
        write_extra_info: bool,
        elem: ElementId,
        scope: StyleScopeId,
        _host_scope: Option<StyleScopeId>,
    ) {
        if !write_extra_info {
            return;
        }
        if let Some(prefix) = scope.non_global().and_then(|s| scopes.query_name(s)) {
            if !prefix.is_empty() {
                let value = serde_json::Value::String(format!("{prefix}--"));
                backend.set_attribute(elem, CLASS_PREFIX_ATTR, &value);
            }
        }
    }

    fn add_class(
        &self,
        backend: &mut dyn Backend,
        scopes: &StyleScopeManager,
        elem: ElementId,
        name: &str,
        scope: StyleScopeId,
    ) {
        backend.add_class(elem, &Self::encode_class(scopes, name, scope), None);
    }

    fn remove_class(
        &self,
        backend: &mut dyn Backend,
        scopes: &StyleScopeManager,
        elem: ElementId,
        name: &str,
        scope: StyleScopeId,
    ) {
        backend.remove_class(elem, &Self::encode_class(scopes, name, scope), None);
    }

    fn release(&self, _backend: &mut dyn Backend, _elem: ElementId) {}

    fn set_virtual_host(&self, _backend: &mut dyn Backend, _elem: ElementId) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_selection() {
        assert_eq!(strategy_for(BackendMode::Shadow).mode(), BackendMode::Shadow);
        assert!(strategy_for(BackendMode::Shadow).mirrors_logical_tree());
        assert!(!strategy_for(BackendMode::Composed).mirrors_logical_tree());
        assert_eq!(strategy_for(BackendMode::Domlike).mode(), BackendMode::Domlike);
    }

    #[test]
    fn test_domlike_class_encoding() {
        let scopes = StyleScopeManager::new();
        let scope = scopes.register("card");
        let unnamed = scopes.register("");
        assert_eq!(DomlikeStrategy::encode_class(&scopes, "a", scope), "card--a");
        assert_eq!(DomlikeStrategy::encode_class(&scopes, "a", StyleScopeId::GLOBAL), "a");
        assert_eq!(DomlikeStrategy::encode_class(&scopes, "a", unnamed), "a");
        assert_eq!(DomlikeStrategy::encode_class(&scopes, "a", StyleScopeId(99)), "a");
    }
}
