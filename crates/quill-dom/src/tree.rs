//! Node Tree (arena-based)
//!
//! Owns the logical nodes of one backend context and the backend itself.
//! Structural changes live in the projector, class handling in the class
//! list module; this file covers creation, association and the plain
//! per-node properties.

use std::rc::Rc;
use std::sync::Arc;

use quill_backend::{
    Backend, BackendEvent, BackendMode, ElementId, EventBubbleStatus, IntersectionListener,
    MediaQueryListener, MediaQueryStatus, ModelBindingCallback, MutLevel, Observer,
    RenderCallback, StyleScopeId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DomError, DomResult};
use crate::mutation::{
    MutationCallback, MutationObserverId, MutationObserverInit, MutationRecord, MutationRelay,
};
use crate::node::{ComponentOptions, ModelBindingListener, Node, NodeKind, SlotData, StyleSegment};
use crate::scope::StyleScopeManager;
use crate::strategy::{TreeStrategy, strategy_for};
use crate::NodeId;

/// Tree-wide options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeOptions {
    /// Write debugging attributes, such as the class prefix, to elements
    pub write_extra_info_to_attr: bool,
}

/// Logical node arena bound to one backend context
pub struct NodeTree {
    pub(crate) backend: Box<dyn Backend>,
    pub(crate) strategy: &'static dyn TreeStrategy,
    pub(crate) nodes: Vec<Node>,
    pub(crate) scopes: Arc<StyleScopeManager>,
    pub(crate) options: TreeOptions,
    pub(crate) relay: MutationRelay,
    pub(crate) root: Option<NodeId>,
    pub(crate) fragment: Option<ElementId>,
}

impl NodeTree {
    /// Create a tree over `backend` using the process-wide scope registry
    pub fn new(backend: Box<dyn Backend>, options: TreeOptions) -> Self {
        Self::with_scopes(backend, options, StyleScopeManager::global())
    }

    pub fn with_scopes(
        backend: Box<dyn Backend>,
        options: TreeOptions,
        scopes: Arc<StyleScopeManager>,
    ) -> Self {
        let mode = backend.mode();
        tracing::info!("Creating node tree in {} mode", mode.as_str());
        Self {
            backend,
            strategy: strategy_for(mode),
            nodes: Vec::new(),
            scopes,
            options,
            relay: MutationRelay::new(),
            root: None,
            fragment: None,
        }
    }

    pub fn mode(&self) -> BackendMode {
        self.strategy.mode()
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn Backend {
        self.backend.as_mut()
    }

    pub fn scopes(&self) -> &Arc<StyleScopeManager> {
        &self.scopes
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// The mounted root component
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub(crate) fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.nodes.get(id.index()).ok_or(DomError::UnknownNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.nodes.get_mut(id.index()).ok_or(DomError::UnknownNode(id))
    }

    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Host component of a shadow root
    pub fn host_of(&self, shadow_root: NodeId) -> Option<NodeId> {
        match self.get(shadow_root)?.kind {
            NodeKind::ShadowRoot { host } => Some(host),
            _ => None,
        }
    }

    /// Shadow root of a component
    pub fn shadow_root(&self, component: NodeId) -> DomResult<NodeId> {
        self.node(component)?
            .shadow_root()
            .ok_or(DomError::NotAComponent(component))
    }

    /// Logical descendants in document order, `node` excluded
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(n) = self.get(node) else {
            return out;
        };
        let mut stack: Vec<NodeId> = n.children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.index()].children.iter().rev());
        }
        out
    }

    /// Nodes created for the shadow tree `shadow_root`, attached or not
    pub fn owned_by(&self, shadow_root: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.owner == Some(shadow_root))
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    /// Logical ancestors, nearest first
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.get(node).and_then(|n| n.parent);
        while let Some(id) = cur {
            out.push(id);
            cur = self.nodes[id.index()].parent;
        }
        out
    }

    // --- creation ---

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Owner context handed to backend creation calls
    fn owner_element(&self, owner: Option<NodeId>) -> Option<ElementId> {
        let ctx = match owner {
            Some(owner) => self.nodes[owner.index()].be,
            None if self.strategy.mirrors_logical_tree() => Some(self.backend.root_node()),
            None => None,
        };
        self.strategy.owner_context(ctx)
    }

    fn check_owner(&self, owner: NodeId) -> DomResult<()> {
        if self.node(owner)?.is_shadow_root() {
            Ok(())
        } else {
            Err(DomError::NotStructural(owner))
        }
    }

    fn apply_style_scope(&mut self, node: NodeId) {
        let Some(elem) = self.nodes[node.index()].be else {
            return;
        };
        let scope = self.default_scope(node);
        let host_scope = self.nodes[node.index()]
            .component_options()
            .and_then(|o| o.style_scope.non_global());
        if scope.is_global() && host_scope.is_none() {
            return;
        }
        self.strategy.apply_style_scope(
            self.backend.as_mut(),
            &self.scopes,
            self.options.write_extra_info_to_attr,
            elem,
            scope,
            host_scope,
        );
    }

    fn build_component(
        &mut self,
        owner: Option<NodeId>,
        tag: &str,
        options: ComponentOptions,
    ) -> NodeId {
        let owner_ctx = self.owner_element(owner);
        let be = self.backend.create_component(owner_ctx, tag);
        let id = NodeId(self.nodes.len() as u32);
        let shadow_root = NodeId(id.0 + 1);
        let virtual_host = options.virtual_host;
        let externals = options.external_classes.clone();
        self.alloc(Node::new(
            NodeKind::Component {
                tag: tag.to_string(),
                options,
                shadow_root,
            },
            owner,
            Some(be),
        ));
        let sr_be = self.strategy.shadow_root_element(self.backend.as_mut(), Some(be));
        let mut sr = Node::new(NodeKind::ShadowRoot { host: id }, None, sr_be);
        sr.associated = true;
        let sr_id = self.alloc(sr);
        self.refresh_composed_parent(sr_id);

        for name in &externals {
            self.strategy.add_external_class(self.backend.as_mut(), be, name);
        }
        if virtual_host && !self.strategy.set_virtual_host(self.backend.as_mut(), be) {
            self.nodes[id.index()].be = None;
        }
        self.apply_style_scope(id);
        tracing::debug!("Created component <{}> as {:?}", tag, id);
        id
    }

    /// Create the root component; it has no owner and is mounted with
    /// [`NodeTree::mount`]
    pub fn create_root_component(&mut self, tag: &str, options: ComponentOptions) -> NodeId {
        self.build_component(None, tag, options)
    }

    /// Create a component inside the shadow tree `owner`
    pub fn create_component(
        &mut self,
        owner: NodeId,
        tag: &str,
        options: ComponentOptions,
    ) -> DomResult<NodeId> {
        self.check_owner(owner)?;
        Ok(self.build_component(Some(owner), tag, options))
    }

    pub fn create_native(&mut self, owner: NodeId, tag: &str) -> DomResult<NodeId> {
        self.create_native_styled(owner, tag, tag)
    }

    /// Native element whose styling name differs from its tag
    pub fn create_native_styled(
        &mut self,
        owner: NodeId,
        tag: &str,
        styling_name: &str,
    ) -> DomResult<NodeId> {
        self.check_owner(owner)?;
        let owner_ctx = self.owner_element(Some(owner));
        let be = self.backend.create_element(owner_ctx, tag, styling_name);
        let id = self.alloc(Node::new(
            NodeKind::Native { tag: tag.to_string() },
            Some(owner),
            Some(be),
        ));
        self.ensure_associated(id);
        self.apply_style_scope(id);
        Ok(id)
    }

    pub fn create_text(&mut self, owner: NodeId, content: &str) -> DomResult<NodeId> {
        self.check_owner(owner)?;
        let owner_ctx = self.owner_element(Some(owner));
        let be = self.backend.create_text_node(owner_ctx, content);
        Ok(self.alloc(Node::new(
            NodeKind::Text { content: content.to_string() },
            Some(owner),
            Some(be),
        )))
    }

    /// Structural node without a rendering surface of its own
    pub fn create_virtual(&mut self, owner: NodeId, name: &str) -> DomResult<NodeId> {
        self.create_structural(owner, name, None)
    }

    /// Slot receiving light content of the owner's host
    pub fn create_slot(&mut self, owner: NodeId, name: &str) -> DomResult<NodeId> {
        let slot = SlotData {
            name: name.to_string(),
            nodes: Vec::new(),
        };
        self.create_structural(owner, "slot", Some(slot))
    }

    fn create_structural(
        &mut self,
        owner: NodeId,
        name: &str,
        slot: Option<SlotData>,
    ) -> DomResult<NodeId> {
        self.check_owner(owner)?;
        let owner_ctx = self.owner_element(Some(owner));
        let be = self.strategy.create_virtual(self.backend.as_mut(), owner_ctx, name);
        let slot_name = slot.as_ref().map(|s| s.name.clone());
        let id = self.alloc(Node::new(
            NodeKind::Virtual {
                name: name.to_string(),
                slot,
                inherit_slots: false,
            },
            Some(owner),
            be,
        ));
        if let (Some(be), Some(slot_name)) = (be, slot_name) {
            self.strategy.set_slot_name(self.backend.as_mut(), be, &slot_name);
        }
        self.ensure_associated(id);
        Ok(id)
    }

    // --- association and element lifecycle ---

    pub(crate) fn ensure_associated(&mut self, node: NodeId) {
        let n = &mut self.nodes[node.index()];
        if n.associated || n.is_text() {
            return;
        }
        n.associated = true;
        if let Some(be) = n.be {
            self.backend.associate_value(be, node);
        }
    }

    /// Bind a component to its element now instead of on first insertion.
    /// Afterwards its host options are frozen.
    pub fn associate(&mut self, node: NodeId) -> DomResult<()> {
        if self.node(node)?.is_text() {
            return Err(DomError::NotAnElement(node));
        }
        self.ensure_associated(node);
        Ok(())
    }

    /// Make a component host virtual; only before association
    pub fn set_virtual_host(&mut self, component: NodeId) -> DomResult<()> {
        let n = self.node(component)?;
        if !n.is_component() {
            return Err(DomError::NotAComponent(component));
        }
        if n.associated {
            return Err(DomError::AlreadyAssociated(component));
        }
        let be = n.be;
        if let NodeKind::Component { options, .. } = &mut self.nodes[component.index()].kind {
            if options.virtual_host {
                return Ok(());
            }
            options.virtual_host = true;
        }
        if let Some(be) = be {
            if !self.strategy.mirrors_logical_tree() {
                // shadow content already under the host element moves out first
                if let Some(shadow_root) = self.nodes[component.index()].shadow_root() {
                    let units = self.composed_children(shadow_root);
                    self.remove_unit_footprints(&units);
                }
            }
            if !self.strategy.set_virtual_host(self.backend.as_mut(), be) {
                self.nodes[component.index()].be = None;
            }
        }
        Ok(())
    }

    /// Release the backend element now; the node keeps its logical state
    pub fn destroy_backend_element(&mut self, node: NodeId) {
        let Some(n) = self.nodes.get_mut(node.index()) else {
            return;
        };
        if let Some(be) = n.be.take() {
            self.strategy.release(self.backend.as_mut(), be);
            tracing::trace!("Released element {:?} of {:?}", be, node);
        }
    }

    /// Release the backend element when the node is next removed from its
    /// parent
    pub fn destroy_backend_element_on_detach(&mut self, node: NodeId) -> DomResult<()> {
        self.node_mut(node)?.destroy_on_detach = true;
        Ok(())
    }

    // --- text ---

    pub fn text(&self, node: NodeId) -> DomResult<&str> {
        match &self.node(node)?.kind {
            NodeKind::Text { content } => Ok(content),
            _ => Err(DomError::NotATextNode(node)),
        }
    }

    pub fn set_text(&mut self, node: NodeId, content: &str) -> DomResult<()> {
        let n = self.node_mut(node)?;
        let NodeKind::Text { content: current } = &mut n.kind else {
            return Err(DomError::NotATextNode(node));
        };
        *current = content.to_string();
        if let Some(be) = n.be {
            self.backend.set_text(be, content);
        }
        self.notify(MutationRecord::CharacterData { target: node });
        Ok(())
    }

    // --- properties ---

    fn notify_property(&mut self, node: NodeId, name: &str) {
        self.notify(MutationRecord::Properties {
            target: node,
            attribute_name: name.to_string(),
        });
    }

    pub fn set_id(&mut self, node: NodeId, id: &str) -> DomResult<()> {
        let n = self.node_mut(node)?;
        if n.is_text() {
            return Err(DomError::NotAnElement(node));
        }
        n.id = id.to_string();
        if let Some(be) = n.be {
            self.backend.set_id(be, id);
        }
        self.notify_property(node, "id");
        Ok(())
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: Value) -> DomResult<()> {
        let n = self.node_mut(node)?;
        if n.is_text() {
            return Err(DomError::NotAnElement(node));
        }
        let be = n.be;
        n.attributes.insert(name.to_string(), value.clone());
        if let Some(be) = be {
            self.backend.set_attribute(be, name, &value);
        }
        self.notify_property(node, name);
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> DomResult<()> {
        let n = self.node_mut(node)?;
        if n.attributes.remove(name).is_none() {
            return Ok(());
        }
        if let Some(be) = n.be {
            self.backend.remove_attribute(be, name);
        }
        self.notify_property(node, name);
        Ok(())
    }

    pub fn set_dataset(&mut self, node: NodeId, name: &str, value: Value) -> DomResult<()> {
        let n = self.node_mut(node)?;
        if n.is_text() {
            return Err(DomError::NotAnElement(node));
        }
        let be = n.be;
        n.dataset.insert(name.to_string(), value.clone());
        if let Some(be) = be {
            self.backend.set_dataset(be, name, &value);
        }
        self.notify_property(node, &format!("data:{name}"));
        Ok(())
    }

    /// Replace one inline style segment; the backend receives all
    /// non-empty segments joined
    pub fn set_style(&mut self, node: NodeId, text: &str, segment: StyleSegment) -> DomResult<()> {
        let n = self.node_mut(node)?;
        if n.class_list.is_none() {
            return Err(DomError::NotAnElement(node));
        }
        if n.style.len() <= segment.0 {
            n.style.resize(segment.0 + 1, String::new());
        }
        n.style[segment.0] = text.to_string();
        let joined = n.style_text();
        if let Some(be) = n.be {
            self.backend.set_style(be, &joined);
        }
        self.notify_property(node, "style");
        Ok(())
    }

    pub fn style(&self, node: NodeId, segment: StyleSegment) -> DomResult<&str> {
        Ok(self
            .node(node)?
            .style
            .get(segment.0)
            .map(String::as_str)
            .unwrap_or(""))
    }

    // --- model binding ---

    /// Register the listener for a two-way bound field. Registering again
    /// only swaps the listener; the backend is told once per field.
    pub fn set_model_binding_listener(
        &mut self,
        node: NodeId,
        field: &str,
        listener: ModelBindingListener,
    ) -> DomResult<()> {
        let n = self.node(node)?;
        if n.is_text() {
            return Err(DomError::NotAnElement(node));
        }
        let table = n.model_bindings.clone();
        let be = n.be;
        let existed = table.0.borrow_mut().insert(field.to_string(), listener).is_some();
        if existed {
            return Ok(());
        }
        if let Some(be) = be {
            let key = field.to_string();
            let callback: ModelBindingCallback = Rc::new(move |value: &Value| {
                if let Some(listener) = table.get(&key) {
                    listener(value);
                }
            });
            self.backend.set_model_binding_stat(be, field, Some(callback));
        }
        Ok(())
    }

    pub fn remove_model_binding_listener(&mut self, node: NodeId, field: &str) -> DomResult<()> {
        let n = self.node(node)?;
        let removed = n.model_bindings.0.borrow_mut().remove(field).is_some();
        if let (true, Some(be)) = (removed, n.be) {
            self.backend.set_model_binding_stat(be, field, None);
        }
        Ok(())
    }

    // --- events and observers ---

    /// Tell the backend which listeners exist on a node
    pub fn set_listener_stats(
        &mut self,
        node: NodeId,
        event_type: &str,
        capture: bool,
        mut_level: MutLevel,
    ) -> DomResult<()> {
        if let Some(be) = self.node(node)?.be {
            self.backend.set_listener_stats(be, event_type, capture, mut_level);
        }
        Ok(())
    }

    /// Install the global event listener. Events without an associated
    /// target bubble normally.
    pub fn on_event(
        &mut self,
        mut listener: impl FnMut(NodeId, &BackendEvent) -> EventBubbleStatus + 'static,
    ) {
        self.backend.on_event(Box::new(move |event: &BackendEvent| match event.target {
            Some(target) => listener(target, event),
            None => EventBubbleStatus::Normal,
        }));
    }

    pub fn create_media_query_observer(
        &mut self,
        status: MediaQueryStatus,
        listener: MediaQueryListener,
    ) -> Observer {
        self.backend.create_media_query_observer(status, listener)
    }

    /// Observe intersection of `node` with `relative`, or with the
    /// viewport. Nodes without an element never intersect.
    pub fn create_intersection_observer(
        &mut self,
        node: NodeId,
        relative: Option<NodeId>,
        relative_margin: &str,
        thresholds: &[f64],
        listener: IntersectionListener,
    ) -> DomResult<Observer> {
        let Some(elem) = self.node(node)?.be else {
            return Ok(Observer::detached());
        };
        let relative = match relative {
            Some(r) => self.node(r)?.be,
            None => None,
        };
        Ok(self
            .backend
            .create_intersection_observer(elem, relative, relative_margin, thresholds, listener))
    }

    pub fn observe(
        &mut self,
        target: NodeId,
        init: MutationObserverInit,
        callback: MutationCallback,
    ) -> DomResult<MutationObserverId> {
        self.node(target)?;
        Ok(self.relay.observe(target, init, callback))
    }

    pub fn disconnect_observer(&mut self, id: MutationObserverId) -> bool {
        self.relay.disconnect(id)
    }

    pub(crate) fn notify(&mut self, record: MutationRecord) {
        if self.relay.is_empty() {
            return;
        }
        let ancestors = self.ancestors(record.target());
        self.relay.deliver(&record, &ancestors);
    }

    // --- context pass-through ---

    /// Run `cb` after the next render pass
    pub fn render(&mut self, cb: RenderCallback) {
        self.backend.render(cb);
    }

    pub fn register_style_sheet_content(&mut self, path: &str, content: &str) {
        self.backend.register_style_sheet_content(path, content);
    }

    pub fn append_style_sheet_path(
        &mut self,
        path: &str,
        style_scope: Option<StyleScopeId>,
    ) -> usize {
        self.backend.append_style_sheet_path(path, style_scope)
    }

    pub fn disable_style_sheet(&mut self, index: usize) {
        self.backend.disable_style_sheet(index);
    }

    /// Destroy the backend context; the tree must not be used afterwards
    pub fn destroy(&mut self) {
        self.backend.destroy();
        tracing::info!("Destroyed node tree with {} nodes", self.nodes.len());
    }
}

impl std::fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeTree")
            .field("mode", &self.mode())
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_backend::MemoryBackend;

    fn tree(mode: BackendMode) -> (NodeTree, MemoryBackend) {
        let backend = MemoryBackend::new(mode);
        let tree = NodeTree::with_scopes(
            Box::new(backend.clone()),
            TreeOptions::default(),
            Arc::new(StyleScopeManager::new()),
        );
        (tree, backend)
    }

    #[test]
    fn test_component_allocates_shadow_root() {
        let (mut tree, _) = tree(BackendMode::Shadow);
        let root = tree.create_root_component("app", ComponentOptions::default());
        let sr = tree.shadow_root(root).unwrap();
        assert_eq!(tree.host_of(sr), Some(root));
        assert!(tree.get(sr).unwrap().backend_element().is_some());
        assert!(!tree.get(root).unwrap().is_associated());
    }

    #[test]
    fn test_composed_mode_skips_structural_elements() {
        let (mut tree, _) = tree(BackendMode::Composed);
        let root = tree.create_root_component("app", ComponentOptions::default());
        let sr = tree.shadow_root(root).unwrap();
        let block = tree.create_virtual(sr, "block").unwrap();
        assert!(tree.get(sr).unwrap().backend_element().is_none());
        assert!(tree.get(block).unwrap().backend_element().is_none());
    }

    #[test]
    fn test_owner_must_be_shadow_root() {
        let (mut tree, _) = tree(BackendMode::Composed);
        let root = tree.create_root_component("app", ComponentOptions::default());
        assert_eq!(tree.create_native(root, "div"), Err(DomError::NotStructural(root)));
    }

    #[test]
    fn test_set_virtual_host_after_association_fails() {
        let (mut tree, _) = tree(BackendMode::Composed);
        let root = tree.create_root_component("app", ComponentOptions::default());
        tree.associate(root).unwrap();
        assert_eq!(tree.set_virtual_host(root), Err(DomError::AlreadyAssociated(root)));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let (mut tree, _) = tree(BackendMode::Composed);
        let root = tree.create_root_component("app", ComponentOptions::default());
        let sr = tree.shadow_root(root).unwrap();
        let a = tree.create_native(sr, "a").unwrap();
        let b = tree.create_native(sr, "b").unwrap();
        let c = tree.create_native(sr, "c").unwrap();
        tree.append_child(sr, a).unwrap();
        tree.append_child(a, b).unwrap();
        tree.append_child(sr, c).unwrap();
        assert_eq!(tree.descendants(sr), vec![a, b, c]);
        assert_eq!(tree.ancestors(b), vec![a, sr]);
    }

    #[test]
    fn test_style_segments_are_joined() {
        let (mut tree, backend) = tree(BackendMode::Composed);
        let root = tree.create_root_component("app", ComponentOptions::default());
        let sr = tree.shadow_root(root).unwrap();
        let div = tree.create_native(sr, "div").unwrap();
        tree.set_style(div, "color: red", StyleSegment::MAIN).unwrap();
        tree.set_style(div, "width: 1px", StyleSegment(2)).unwrap();
        let be = tree.get(div).unwrap().backend_element().unwrap();
        assert_eq!(backend.element(be).unwrap().style, "color: red;width: 1px");
        assert_eq!(tree.style(div, StyleSegment(1)).unwrap(), "");
    }
}
