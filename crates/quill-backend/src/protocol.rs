//! The backend operation contract
//!
//! Context-level operations (sizing, stylesheets, rendering, events) and
//! element-level operations (tree mutation, slots, classes, attributes) are
//! gathered in one trait. Element handles are passed explicitly; a backend
//! that cannot perform an operation ignores it. Mutation calls never fail.

use std::rc::Rc;

use serde_json::Value;

use crate::mode::{
    BackendMode, IntersectionListener, IntersectionStatus, MediaQueryListener,
    MediaQueryStatus, Observer,
};
use crate::{ElementId, EventListener, MutLevel, NodeId, RenderCallback, StyleScopeId};

/// Callback the backend invokes when a two-way bound field changes
pub type ModelBindingCallback = Rc<dyn Fn(&Value)>;

/// A rendering surface
///
/// `owner` arguments of the creation methods are the backend shadow root the
/// new element belongs to. Only shadow-mode backends receive them; other modes
/// get `None`.
pub trait Backend {
    /// The physical representation this backend maintains
    fn mode(&self) -> BackendMode;

    /// Destroy the context. The node model never calls this by itself.
    fn destroy(&mut self) {}

    fn window_width(&self) -> f64 {
        1.0
    }

    fn window_height(&self) -> f64 {
        1.0
    }

    fn device_pixel_ratio(&self) -> f64 {
        1.0
    }

    /// Usually `"light"` or `"dark"`
    fn theme(&self) -> String {
        "light".to_string()
    }

    /// Register stylesheet content for `path`.
    ///
    /// Content referenced by `@import` may be registered before or after the
    /// importing sheet.
    fn register_style_sheet_content(&mut self, _path: &str, _content: &str) {}

    /// Activate the stylesheet at `path`, optionally limited to a scope, and
    /// return its index. A global scope means the sheet applies globally.
    fn append_style_sheet_path(&mut self, path: &str, style_scope: Option<StyleScopeId>) -> usize;

    fn disable_style_sheet(&mut self, _index: usize) {}

    /// Queue `cb` until the next render pass completes. Implementations must
    /// never call `cb` from inside this method.
    fn render(&mut self, cb: RenderCallback);

    /// The root element of the context
    fn root_node(&self) -> ElementId;

    /// Create an empty fragment for batched insertion
    fn create_fragment(&mut self) -> ElementId;

    fn create_element(
        &mut self,
        owner: Option<ElementId>,
        logical_name: &str,
        styling_name: &str,
    ) -> ElementId;

    fn create_text_node(&mut self, owner: Option<ElementId>, content: &str) -> ElementId;

    /// Create a component element; shadow backends attach a shadow root to it
    fn create_component(&mut self, owner: Option<ElementId>, tag_name: &str) -> ElementId {
        self.create_element(owner, tag_name, tag_name)
    }

    /// Create a structural element (shadow mode only)
    fn create_virtual_node(&mut self, owner: Option<ElementId>, virtual_name: &str) -> ElementId {
        self.create_element(owner, virtual_name, virtual_name)
    }

    /// Shadow root of a component element
    fn shadow_root(&self, _component: ElementId) -> Option<ElementId> {
        None
    }

    /// Install the global event listener, replacing any previous one
    fn on_event(&mut self, _listener: EventListener) {}

    /// The listener fires once right away with the current state, then on
    /// every change until the observer is disconnected.
    fn create_media_query_observer(
        &mut self,
        status: MediaQueryStatus,
        mut listener: MediaQueryListener,
    ) -> Observer {
        listener(status.matches(self.window_width(), self.window_height()));
        Observer::new()
    }

    // --- element lifecycle ---

    /// Release the element. Called at most once per element.
    fn release(&mut self, _elem: ElementId) {}

    /// Bind the logical node to the element. Called once for every non-text
    /// element.
    fn associate_value(&mut self, _elem: ElementId, _node: NodeId) {}

    // --- tree mutation ---

    /// `child` has no parent when this is called
    fn append_child(&mut self, _parent: ElementId, _child: ElementId) {}

    /// `index`, when given, is the position of `child` among the children
    fn remove_child(&mut self, _parent: ElementId, _child: ElementId, _index: Option<usize>) {}

    fn insert_before(
        &mut self,
        _parent: ElementId,
        _child: ElementId,
        _before: ElementId,
        _index: Option<usize>,
    ) {
    }

    fn replace_child(
        &mut self,
        _parent: ElementId,
        _child: ElementId,
        _old_child: ElementId,
        _index: Option<usize>,
    ) {
    }

    /// Delete `delete_count` children starting at `before` and insert the
    /// content of the fragment `list` there. `list` is empty afterwards.
    fn splice_before(
        &mut self,
        _parent: ElementId,
        _before: ElementId,
        _delete_count: usize,
        _list: ElementId,
    ) {
    }

    /// Append the content of the fragment `list`, leaving it empty
    fn splice_append(&mut self, _parent: ElementId, _list: ElementId) {}

    fn splice_remove(&mut self, _parent: ElementId, _before: ElementId, _delete_count: usize) {}

    // --- slots ---

    fn set_slot_name(&mut self, _elem: ElementId, _name: &str) {}

    /// `None` means the node is assigned to no slot and has no composed parent
    fn set_containing_slot(&mut self, _elem: ElementId, _slot: Option<ElementId>) {}

    /// Move a node between slots in one step; `index` is its position in the
    /// new slot's content
    fn reassign_containing_slot(
        &mut self,
        _elem: ElementId,
        _old_slot: Option<ElementId>,
        _new_slot: Option<ElementId>,
        _index: usize,
    ) {
    }

    fn splice_before_slot_nodes(
        &mut self,
        _slot: ElementId,
        _before: usize,
        _delete_count: usize,
        _list: ElementId,
    ) {
    }

    fn splice_append_slot_nodes(&mut self, _slot: ElementId, _list: ElementId) {}

    fn splice_remove_slot_nodes(&mut self, _slot: ElementId, _before: usize, _delete_count: usize) {
    }

    /// Only called while the element has no children
    fn set_inherit_slots(&mut self, _elem: ElementId) {}

    /// Only called before `associate_value`
    fn set_virtual_host(&mut self, _elem: ElementId) {}

    /// Only called before `associate_value`
    fn add_external_class(&mut self, _elem: ElementId, _class_name: &str) {}

    // --- styling ---

    /// Called at most once per element
    fn set_style_scope(
        &mut self,
        _elem: ElementId,
        _style_scope: StyleScopeId,
        _host_style_scope: Option<StyleScopeId>,
    ) {
    }

    fn set_style(&mut self, _elem: ElementId, _style_text: &str) {}

    fn add_class(
        &mut self,
        _elem: ElementId,
        _class_name: &str,
        _style_scope: Option<StyleScopeId>,
    ) {
    }

    fn remove_class(
        &mut self,
        _elem: ElementId,
        _class_name: &str,
        _style_scope: Option<StyleScopeId>,
    ) {
    }

    fn clear_classes(&mut self, _elem: ElementId) {}

    fn set_class_alias(&mut self, _elem: ElementId, _class_name: &str, _target: &str) {}

    // --- attributes and content ---

    fn set_id(&mut self, _elem: ElementId, _id: &str) {}

    fn set_attribute(&mut self, _elem: ElementId, _name: &str, _value: &Value) {}

    fn remove_attribute(&mut self, _elem: ElementId, _name: &str) {}

    fn set_dataset(&mut self, _elem: ElementId, _name: &str, _value: &Value) {}

    /// Only called for text elements
    fn set_text(&mut self, _elem: ElementId, _content: &str) {}

    fn set_model_binding_stat(
        &mut self,
        _elem: ElementId,
        _attribute_name: &str,
        _listener: Option<ModelBindingCallback>,
    ) {
    }

    fn set_listener_stats(
        &mut self,
        _elem: ElementId,
        _event_type: &str,
        _capture: bool,
        _mut_level: MutLevel,
    ) {
    }

    /// Fires once right away, then on every intersection change until
    /// disconnected
    fn create_intersection_observer(
        &mut self,
        _elem: ElementId,
        _relative: Option<ElementId>,
        _relative_margin: &str,
        _thresholds: &[f64],
        mut listener: IntersectionListener,
    ) -> Observer {
        listener(&IntersectionStatus::default());
        Observer::new()
    }
}
