//! Recording in-memory backend
//!
//! Applies every operation to an in-memory element tree, keeps a log of the
//! calls it received and records contract violations (removing an element that
//! is not a child, adding a class twice, splicing a non-fragment, ...) instead
//! of failing. Clones share the same state, so a test can keep one handle
//! while the node tree owns another.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde_json::Value;

use crate::mode::{
    IntersectionListener, IntersectionStatus, MediaQueryListener, MediaQueryStatus, Observer,
};
use crate::{
    Backend, BackendEvent, BackendMode, ElementId, EventBubbleStatus, EventListener,
    EventOptions, ModelBindingCallback, MutLevel, NodeId, RenderCallback, RenderQueue,
    StyleScopeId,
};

/// Kind of a backend element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Fragment,
    Element,
    TextNode,
    Component,
    VirtualNode,
}

/// One element of the in-memory tree
#[derive(Debug, Clone)]
pub struct MemoryElement {
    pub kind: ElementKind,
    pub logical_name: String,
    pub styling_name: String,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    pub text: String,
    pub classes: Vec<(String, Option<StyleScopeId>)>,
    pub style_scope: Option<StyleScopeId>,
    pub style: String,
    pub id: String,
    pub attributes: BTreeMap<String, Value>,
    pub dataset: BTreeMap<String, Value>,
    pub slot_name: Option<String>,
    pub slot_nodes: Vec<ElementId>,
    /// `None` until set; `Some(None)` when assigned to no slot
    pub containing_slot: Option<Option<ElementId>>,
    pub shadow_root: Option<ElementId>,
    pub associated: Option<NodeId>,
    pub inherit_slots: bool,
    pub virtual_host: bool,
    pub external_classes: Vec<String>,
    pub class_aliases: BTreeMap<String, String>,
    pub listener_stats: Vec<(String, bool, MutLevel)>,
    pub model_bindings: Vec<String>,
    pub released: bool,
}

impl MemoryElement {
    fn new(kind: ElementKind, logical_name: &str, styling_name: &str) -> Self {
        Self {
            kind,
            logical_name: logical_name.to_string(),
            styling_name: styling_name.to_string(),
            parent: None,
            children: Vec::new(),
            text: String::new(),
            classes: Vec::new(),
            style_scope: None,
            style: String::new(),
            id: String::new(),
            attributes: BTreeMap::new(),
            dataset: BTreeMap::new(),
            slot_name: None,
            slot_nodes: Vec::new(),
            containing_slot: None,
            shadow_root: None,
            associated: None,
            inherit_slots: false,
            virtual_host: false,
            external_classes: Vec::new(),
            class_aliases: BTreeMap::new(),
            listener_stats: Vec::new(),
            model_bindings: Vec::new(),
            released: false,
        }
    }
}

/// A call received by the recording backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Create { elem: ElementId, kind: ElementKind, name: String },
    Release { elem: ElementId },
    AssociateValue { elem: ElementId, node: NodeId },
    AppendChild { parent: ElementId, child: ElementId },
    RemoveChild { parent: ElementId, child: ElementId },
    InsertBefore { parent: ElementId, child: ElementId, before: ElementId },
    ReplaceChild { parent: ElementId, child: ElementId, old_child: ElementId },
    SpliceBefore {
        parent: ElementId,
        before: ElementId,
        delete_count: usize,
        inserted: Vec<ElementId>,
    },
    SpliceAppend { parent: ElementId, inserted: Vec<ElementId> },
    SpliceRemove { parent: ElementId, before: ElementId, delete_count: usize },
    SetSlotName { elem: ElementId, name: String },
    SetContainingSlot { elem: ElementId, slot: Option<ElementId> },
    ReassignContainingSlot {
        elem: ElementId,
        old_slot: Option<ElementId>,
        new_slot: Option<ElementId>,
        index: usize,
    },
    SpliceBeforeSlotNodes {
        slot: ElementId,
        before: usize,
        delete_count: usize,
        inserted: Vec<ElementId>,
    },
    SpliceAppendSlotNodes { slot: ElementId, inserted: Vec<ElementId> },
    SpliceRemoveSlotNodes { slot: ElementId, before: usize, delete_count: usize },
    SetInheritSlots { elem: ElementId },
    SetVirtualHost { elem: ElementId },
    AddExternalClass { elem: ElementId, name: String },
    SetStyleScope { elem: ElementId, scope: StyleScopeId, host_scope: Option<StyleScopeId> },
    SetStyle { elem: ElementId, text: String },
    AddClass { elem: ElementId, name: String, scope: Option<StyleScopeId> },
    RemoveClass { elem: ElementId, name: String, scope: Option<StyleScopeId> },
    ClearClasses { elem: ElementId },
    SetClassAlias { elem: ElementId, name: String, target: String },
    SetId { elem: ElementId, id: String },
    SetAttribute { elem: ElementId, name: String, value: Value },
    RemoveAttribute { elem: ElementId, name: String },
    SetDataset { elem: ElementId, name: String, value: Value },
    SetText { elem: ElementId, content: String },
    SetModelBindingStat { elem: ElementId, name: String, bound: bool },
    SetListenerStats { elem: ElementId, event_type: String, capture: bool, mut_level: MutLevel },
    RegisterStyleSheet { path: String },
    AppendStyleSheet { path: String, scope: Option<StyleScopeId>, index: usize },
    DisableStyleSheet { index: usize },
}

impl BackendCall {
    /// Whether the call changes the child list of `parent`
    pub fn mutates_children_of(&self, target: ElementId) -> bool {
        match self {
            Self::AppendChild { parent, .. }
            | Self::RemoveChild { parent, .. }
            | Self::InsertBefore { parent, .. }
            | Self::ReplaceChild { parent, .. }
            | Self::SpliceBefore { parent, .. }
            | Self::SpliceAppend { parent, .. }
            | Self::SpliceRemove { parent, .. } => *parent == target,
            _ => false,
        }
    }

    /// Whether the call is a class add/remove/clear
    pub fn is_class_op(&self) -> bool {
        matches!(
            self,
            Self::AddClass { .. } | Self::RemoveClass { .. } | Self::ClearClasses { .. }
        )
    }
}

struct MediaEntry {
    status: MediaQueryStatus,
    listener: Option<MediaQueryListener>,
    observer: Observer,
    matches: bool,
}

struct StyleSheetEntry {
    path: String,
    scope: Option<StyleScopeId>,
    enabled: bool,
}

struct MemoryState {
    mode: BackendMode,
    elements: Vec<MemoryElement>,
    calls: Vec<BackendCall>,
    violations: Vec<String>,
    render_queue: RenderQueue,
    event_listener: Option<EventListener>,
    media_observers: Vec<MediaEntry>,
    intersection_observers: Vec<(Observer, ElementId)>,
    model_bindings: HashMap<(ElementId, String), ModelBindingCallback>,
    style_sheet_contents: HashMap<String, String>,
    style_sheets: Vec<StyleSheetEntry>,
    window_width: f64,
    window_height: f64,
    device_pixel_ratio: f64,
    theme: String,
    destroyed: bool,
}

impl MemoryState {
    fn violation(&mut self, message: String) {
        tracing::warn!("backend contract violation: {}", message);
        self.violations.push(message);
    }

    fn alloc(&mut self, kind: ElementKind, logical_name: &str, styling_name: &str) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        self.elements.push(MemoryElement::new(kind, logical_name, styling_name));
        self.calls.push(BackendCall::Create {
            elem: id,
            kind,
            name: logical_name.to_string(),
        });
        id
    }

    fn elem(&self, id: ElementId) -> Option<&MemoryElement> {
        self.elements.get(id.0 as usize)
    }

    fn elem_mut(&mut self, id: ElementId) -> Option<&mut MemoryElement> {
        self.elements.get_mut(id.0 as usize)
    }

    fn check_exists(&mut self, id: ElementId, op: &str) -> bool {
        match self.elem(id) {
            None => {
                self.violation(format!("{op}: unknown element {id:?}"));
                false
            }
            Some(e) if e.released => {
                self.violation(format!("{op}: element {id:?} already released"));
                false
            }
            Some(_) => true,
        }
    }

    fn position_of(&self, parent: ElementId, child: ElementId) -> Option<usize> {
        self.elem(parent)?.children.iter().position(|&c| c == child)
    }

    fn check_index(&mut self, op: &str, parent: ElementId, pos: usize, index: Option<usize>) {
        if let Some(index) = index {
            if index != pos {
                self.violation(format!(
                    "{op}: index {index} does not match position {pos} in {parent:?}"
                ));
            }
        }
    }

    /// Prepare `child` for insertion; it must be parentless
    fn prepare_insert(&mut self, op: &str, child: ElementId) -> bool {
        if !self.check_exists(child, op) {
            return false;
        }
        if let Some(old_parent) = self.elements[child.0 as usize].parent {
            self.violation(format!("{op}: {child:?} still attached to {old_parent:?}"));
            self.detach(child);
        }
        true
    }

    fn detach(&mut self, child: ElementId) {
        if let Some(parent) = self.elements[child.0 as usize].parent.take() {
            if let Some(p) = self.elem_mut(parent) {
                p.children.retain(|&c| c != child);
            }
        }
    }

    fn insert_at(&mut self, parent: ElementId, pos: usize, children: &[ElementId]) {
        for (i, &child) in children.iter().enumerate() {
            self.elements[child.0 as usize].parent = Some(parent);
            self.elements[parent.0 as usize].children.insert(pos + i, child);
        }
    }

    fn remove_range(&mut self, op: &str, parent: ElementId, pos: usize, count: usize) {
        let len = self.elements[parent.0 as usize].children.len();
        if pos + count > len {
            self.violation(format!(
                "{op}: removing {count} from position {pos} exceeds {len} children of {parent:?}"
            ));
        }
        let end = (pos + count).min(len);
        let removed: Vec<ElementId> = self.elements[parent.0 as usize]
            .children
            .drain(pos..end)
            .collect();
        for child in removed {
            self.elements[child.0 as usize].parent = None;
        }
    }

    /// Drain a fragment, checking it really is one
    fn drain_fragment(&mut self, op: &str, list: ElementId) -> Vec<ElementId> {
        if !self.check_exists(list, op) {
            return Vec::new();
        }
        if self.elements[list.0 as usize].kind != ElementKind::Fragment {
            self.violation(format!("{op}: {list:?} is not a fragment"));
        }
        let children = std::mem::take(&mut self.elements[list.0 as usize].children);
        for &child in &children {
            self.elements[child.0 as usize].parent = None;
        }
        children
    }

    /// Tree-order key of an element; shadow content sorts after light content
    fn order_path(&self, elem: ElementId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut cur = elem;
        loop {
            if let Some(parent) = self.elements[cur.0 as usize].parent {
                let idx = self.position_of(parent, cur).unwrap_or(0);
                path.push(idx);
                cur = parent;
                continue;
            }
            let host = self
                .elements
                .iter()
                .position(|e| e.shadow_root == Some(cur));
            match host {
                Some(host) => {
                    path.push(usize::MAX);
                    cur = ElementId(host as u32);
                }
                None => break,
            }
        }
        path.reverse();
        path
    }

    fn slot_holding(&self, elem: ElementId) -> Option<ElementId> {
        self.elements
            .iter()
            .position(|e| e.slot_nodes.contains(&elem))
            .map(|i| ElementId(i as u32))
    }

    fn insert_slot_nodes(&mut self, op: &str, slot: ElementId, pos: usize, nodes: &[ElementId]) {
        let len = self.elements[slot.0 as usize].slot_nodes.len();
        if pos > len {
            self.violation(format!("{op}: slot position {pos} beyond {len} in {slot:?}"));
        }
        let pos = pos.min(len);
        for (i, &node) in nodes.iter().enumerate() {
            if let Some(other) = self.slot_holding(node) {
                self.violation(format!("{op}: {node:?} already distributed into {other:?}"));
            }
            self.elements[slot.0 as usize].slot_nodes.insert(pos + i, node);
        }
    }

    fn remove_slot_nodes(&mut self, op: &str, slot: ElementId, pos: usize, count: usize) {
        let len = self.elements[slot.0 as usize].slot_nodes.len();
        if pos + count > len {
            self.violation(format!(
                "{op}: removing {count} slot nodes from {pos} exceeds {len} in {slot:?}"
            ));
        }
        let end = (pos + count).min(len);
        self.elements[slot.0 as usize].slot_nodes.drain(pos.min(end)..end);
    }
}

/// In-memory recording backend
#[derive(Clone)]
pub struct MemoryBackend {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryBackend {
    pub fn new(mode: BackendMode) -> Self {
        let mut state = MemoryState {
            mode,
            elements: Vec::new(),
            calls: Vec::new(),
            violations: Vec::new(),
            render_queue: RenderQueue::new(),
            event_listener: None,
            media_observers: Vec::new(),
            intersection_observers: Vec::new(),
            model_bindings: HashMap::new(),
            style_sheet_contents: HashMap::new(),
            style_sheets: Vec::new(),
            window_width: 1.0,
            window_height: 1.0,
            device_pixel_ratio: 1.0,
            theme: "light".to_string(),
            destroyed: false,
        };
        state.alloc(ElementKind::VirtualNode, "", "");
        state.calls.clear();
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Seed the display metrics without notifying observers
    pub fn with_window(
        self,
        width: f64,
        height: f64,
        device_pixel_ratio: f64,
        theme: &str,
    ) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.window_width = width;
            state.window_height = height;
            state.device_pixel_ratio = device_pixel_ratio;
            state.theme = theme.to_string();
        }
        self
    }

    /// Snapshot of an element
    pub fn element(&self, id: ElementId) -> Option<MemoryElement> {
        self.state.borrow().elem(id).cloned()
    }

    pub fn children(&self, id: ElementId) -> Vec<ElementId> {
        self.element(id).map(|e| e.children).unwrap_or_default()
    }

    pub fn slot_nodes(&self, id: ElementId) -> Vec<ElementId> {
        self.element(id).map(|e| e.slot_nodes).unwrap_or_default()
    }

    pub fn classes(&self, id: ElementId) -> Vec<(String, Option<StyleScopeId>)> {
        self.element(id).map(|e| e.classes).unwrap_or_default()
    }

    /// Class names only, in insertion order
    pub fn class_names(&self, id: ElementId) -> Vec<String> {
        self.classes(id).into_iter().map(|(name, _)| name).collect()
    }

    pub fn text(&self, id: ElementId) -> String {
        self.element(id).map(|e| e.text).unwrap_or_default()
    }

    /// Element associated with a logical node
    pub fn element_of(&self, node: NodeId) -> Option<ElementId> {
        let state = self.state.borrow();
        state
            .elements
            .iter()
            .position(|e| e.associated == Some(node) && !e.released)
            .map(|i| ElementId(i as u32))
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.borrow().calls.clone()
    }

    pub fn take_calls(&self) -> Vec<BackendCall> {
        std::mem::take(&mut self.state.borrow_mut().calls)
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn violations(&self) -> Vec<String> {
        self.state.borrow().violations.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.borrow().destroyed
    }

    /// Paths of enabled stylesheets with their scopes, in order
    pub fn active_style_sheets(&self) -> Vec<(String, Option<StyleScopeId>)> {
        self.state
            .borrow()
            .style_sheets
            .iter()
            .filter(|s| s.enabled)
            .map(|s| (s.path.clone(), s.scope))
            .collect()
    }

    pub fn style_sheet_content(&self, path: &str) -> Option<String> {
        self.state.borrow().style_sheet_contents.get(path).cloned()
    }

    pub fn pending_render_callbacks(&self) -> usize {
        self.state.borrow().render_queue.len()
    }

    /// Complete a render pass: fire every callback queued before this call
    pub fn tick(&self) -> usize {
        let (callbacks, destroyed) = {
            let mut state = self.state.borrow_mut();
            (state.render_queue.take(), state.destroyed)
        };
        let count = callbacks.len();
        for cb in callbacks {
            if destroyed {
                cb(Err(crate::BackendError::Destroyed));
            } else {
                cb(Ok(()));
            }
        }
        count
    }

    /// Resize the display area, notifying media-query observers whose state
    /// changed
    pub fn set_window_size(&self, width: f64, height: f64) {
        let mut to_fire = Vec::new();
        {
            let mut state = self.state.borrow_mut();
            state.window_width = width;
            state.window_height = height;
            state.media_observers.retain(|entry| entry.observer.is_connected());
            for (i, entry) in state.media_observers.iter_mut().enumerate() {
                let matches = entry.status.matches(width, height);
                if matches != entry.matches {
                    entry.matches = matches;
                    to_fire.push((i, matches));
                }
            }
        }
        for (i, matches) in to_fire {
            let listener = self.state.borrow_mut().media_observers[i].listener.take();
            if let Some(mut listener) = listener {
                listener(matches);
                self.state.borrow_mut().media_observers[i].listener = Some(listener);
            }
        }
    }

    /// Deliver an event to the global listener
    pub fn dispatch_event(
        &self,
        target: ElementId,
        event_type: &str,
        detail: Value,
        options: EventOptions,
    ) -> EventBubbleStatus {
        let (listener, node) = {
            let mut state = self.state.borrow_mut();
            let node = state.elem(target).and_then(|e| e.associated);
            (state.event_listener.take(), node)
        };
        let Some(mut listener) = listener else {
            return EventBubbleStatus::Normal;
        };
        let event = BackendEvent {
            target: node,
            event_type: event_type.to_string(),
            detail,
            options,
        };
        let status = listener(&event);
        let mut state = self.state.borrow_mut();
        if state.event_listener.is_none() {
            state.event_listener = Some(listener);
        }
        status
    }

    /// Simulate a user edit of a two-way bound field
    pub fn trigger_model_binding(&self, elem: ElementId, field: &str, value: Value) -> bool {
        let callback = self
            .state
            .borrow()
            .model_bindings
            .get(&(elem, field.to_string()))
            .cloned();
        match callback {
            Some(cb) => {
                cb(&value);
                true
            }
            None => false,
        }
    }

    /// Number of intersection observers still connected
    pub fn connected_intersection_observers(&self) -> usize {
        self.state
            .borrow()
            .intersection_observers
            .iter()
            .filter(|(o, _)| o.is_connected())
            .count()
    }

    /// Markup-like rendering of the children of `id`
    pub fn serialize_children(&self, id: ElementId) -> String {
        let state = self.state.borrow();
        let mut out = String::new();
        if let Some(e) = state.elem(id) {
            for &child in &e.children {
                serialize_into(&state, child, &mut out);
            }
        }
        out
    }

    /// Markup-like rendering of `id` itself
    pub fn serialize(&self, id: ElementId) -> String {
        let state = self.state.borrow();
        let mut out = String::new();
        serialize_into(&state, id, &mut out);
        out
    }

    fn record(&self, call: BackendCall) {
        self.state.borrow_mut().calls.push(call);
    }
}

fn serialize_into(state: &MemoryState, id: ElementId, out: &mut String) {
    let Some(e) = state.elem(id) else { return };
    match e.kind {
        ElementKind::TextNode => out.push_str(&e.text),
        ElementKind::Fragment => {
            for &child in &e.children {
                serialize_into(state, child, out);
            }
        }
        _ => {
            out.push('<');
            out.push_str(&e.logical_name);
            out.push('>');
            for &child in &e.children {
                serialize_into(state, child, out);
            }
            out.push_str("</");
            out.push_str(&e.logical_name);
            out.push('>');
        }
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MemoryBackend")
            .field("mode", &state.mode)
            .field("elements", &state.elements.len())
            .field("calls", &state.calls.len())
            .field("violations", &state.violations.len())
            .finish()
    }
}

impl Backend for MemoryBackend {
    fn mode(&self) -> BackendMode {
        self.state.borrow().mode
    }

    fn destroy(&mut self) {
        self.state.borrow_mut().destroyed = true;
    }

    fn window_width(&self) -> f64 {
        self.state.borrow().window_width
    }

    fn window_height(&self) -> f64 {
        self.state.borrow().window_height
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.state.borrow().device_pixel_ratio
    }

    fn theme(&self) -> String {
        self.state.borrow().theme.clone()
    }

    fn register_style_sheet_content(&mut self, path: &str, content: &str) {
        let mut state = self.state.borrow_mut();
        state
            .style_sheet_contents
            .insert(path.to_string(), content.to_string());
        state.calls.push(BackendCall::RegisterStyleSheet {
            path: path.to_string(),
        });
    }

    fn append_style_sheet_path(&mut self, path: &str, style_scope: Option<StyleScopeId>) -> usize {
        let mut state = self.state.borrow_mut();
        let scope = style_scope.and_then(StyleScopeId::non_global);
        state.style_sheets.push(StyleSheetEntry {
            path: path.to_string(),
            scope,
            enabled: true,
        });
        let index = state.style_sheets.len();
        state.calls.push(BackendCall::AppendStyleSheet {
            path: path.to_string(),
            scope,
            index,
        });
        index
    }

    fn disable_style_sheet(&mut self, index: usize) {
        let mut state = self.state.borrow_mut();
        let known = index >= 1 && index <= state.style_sheets.len();
        if known {
            state.style_sheets[index - 1].enabled = false;
        } else {
            state.violation(format!("disable_style_sheet: unknown index {index}"));
        }
        state.calls.push(BackendCall::DisableStyleSheet { index });
    }

    fn render(&mut self, cb: RenderCallback) {
        self.state.borrow_mut().render_queue.push(cb);
    }

    fn root_node(&self) -> ElementId {
        ElementId(0)
    }

    fn create_fragment(&mut self) -> ElementId {
        self.state
            .borrow_mut()
            .alloc(ElementKind::Fragment, "", "")
    }

    fn create_element(
        &mut self,
        _owner: Option<ElementId>,
        logical_name: &str,
        styling_name: &str,
    ) -> ElementId {
        self.state
            .borrow_mut()
            .alloc(ElementKind::Element, logical_name, styling_name)
    }

    fn create_text_node(&mut self, _owner: Option<ElementId>, content: &str) -> ElementId {
        let mut state = self.state.borrow_mut();
        let id = state.alloc(ElementKind::TextNode, "#text", "#text");
        state.elements[id.0 as usize].text = content.to_string();
        id
    }

    fn create_component(&mut self, _owner: Option<ElementId>, tag_name: &str) -> ElementId {
        let mut state = self.state.borrow_mut();
        let id = state.alloc(ElementKind::Component, tag_name, tag_name);
        if state.mode == BackendMode::Shadow {
            let shadow_root = state.alloc(ElementKind::VirtualNode, "#shadow-root", "");
            state.elements[id.0 as usize].shadow_root = Some(shadow_root);
        }
        id
    }

    fn create_virtual_node(&mut self, _owner: Option<ElementId>, virtual_name: &str) -> ElementId {
        self.state
            .borrow_mut()
            .alloc(ElementKind::VirtualNode, virtual_name, virtual_name)
    }

    fn shadow_root(&self, component: ElementId) -> Option<ElementId> {
        self.state.borrow().elem(component).and_then(|e| e.shadow_root)
    }

    fn on_event(&mut self, listener: EventListener) {
        self.state.borrow_mut().event_listener = Some(listener);
    }

    fn create_media_query_observer(
        &mut self,
        status: MediaQueryStatus,
        mut listener: MediaQueryListener,
    ) -> Observer {
        let matches = {
            let state = self.state.borrow();
            status.matches(state.window_width, state.window_height)
        };
        listener(matches);
        let observer = Observer::new();
        self.state.borrow_mut().media_observers.push(MediaEntry {
            status,
            listener: Some(listener),
            observer: observer.clone(),
            matches,
        });
        observer
    }

    fn release(&mut self, elem: ElementId) {
        let mut state = self.state.borrow_mut();
        if state.check_exists(elem, "release") {
            state.elements[elem.0 as usize].released = true;
            state.model_bindings.retain(|(e, _), _| *e != elem);
        }
        state.calls.push(BackendCall::Release { elem });
    }

    fn associate_value(&mut self, elem: ElementId, node: NodeId) {
        let mut state = self.state.borrow_mut();
        if state.check_exists(elem, "associate_value") {
            let kind = state.elements[elem.0 as usize].kind;
            let associated = state.elements[elem.0 as usize].associated.is_some();
            if kind == ElementKind::TextNode {
                state.violation(format!("associate_value: {elem:?} is a text node"));
            } else if associated {
                state.violation(format!("associate_value: {elem:?} associated twice"));
            }
            state.elements[elem.0 as usize].associated = Some(node);
        }
        state.calls.push(BackendCall::AssociateValue { elem, node });
    }

    fn append_child(&mut self, parent: ElementId, child: ElementId) {
        let mut state = self.state.borrow_mut();
        state.calls.push(BackendCall::AppendChild { parent, child });
        if state.check_exists(parent, "append_child")
            && state.prepare_insert("append_child", child)
        {
            let pos = state.elements[parent.0 as usize].children.len();
            state.insert_at(parent, pos, &[child]);
        }
    }

    fn remove_child(&mut self, parent: ElementId, child: ElementId, index: Option<usize>) {
        let mut state = self.state.borrow_mut();
        state.calls.push(BackendCall::RemoveChild { parent, child });
        match state.position_of(parent, child) {
            Some(pos) => {
                state.check_index("remove_child", parent, pos, index);
                state.remove_range("remove_child", parent, pos, 1);
            }
            None => {
                state.violation(format!("remove_child: {child:?} is not a child of {parent:?}"))
            }
        }
    }

    fn insert_before(
        &mut self,
        parent: ElementId,
        child: ElementId,
        before: ElementId,
        index: Option<usize>,
    ) {
        let mut state = self.state.borrow_mut();
        state.calls.push(BackendCall::InsertBefore { parent, child, before });
        let Some(pos) = state.position_of(parent, before) else {
            state.violation(format!("insert_before: {before:?} is not a child of {parent:?}"));
            return;
        };
        state.check_index("insert_before", parent, pos, index);
        if state.prepare_insert("insert_before", child) {
            let pos = state.position_of(parent, before).unwrap_or(pos);
            state.insert_at(parent, pos, &[child]);
        }
    }

    fn replace_child(
        &mut self,
        parent: ElementId,
        child: ElementId,
        old_child: ElementId,
        index: Option<usize>,
    ) {
        let mut state = self.state.borrow_mut();
        state.calls.push(BackendCall::ReplaceChild { parent, child, old_child });
        let Some(pos) = state.position_of(parent, old_child) else {
            state.violation(format!("replace_child: {old_child:?} is not a child of {parent:?}"));
            return;
        };
        state.check_index("replace_child", parent, pos, index);
        if state.prepare_insert("replace_child", child) {
            let pos = state.position_of(parent, old_child).unwrap_or(pos);
            state.remove_range("replace_child", parent, pos, 1);
            state.insert_at(parent, pos, &[child]);
        }
    }

    fn splice_before(
        &mut self,
        parent: ElementId,
        before: ElementId,
        delete_count: usize,
        list: ElementId,
    ) {
        let mut state = self.state.borrow_mut();
        let inserted = state.drain_fragment("splice_before", list);
        state.calls.push(BackendCall::SpliceBefore {
            parent,
            before,
            delete_count,
            inserted: inserted.clone(),
        });
        let Some(pos) = state.position_of(parent, before) else {
            state.violation(format!("splice_before: {before:?} is not a child of {parent:?}"));
            return;
        };
        state.remove_range("splice_before", parent, pos, delete_count);
        state.insert_at(parent, pos, &inserted);
    }

    fn splice_append(&mut self, parent: ElementId, list: ElementId) {
        let mut state = self.state.borrow_mut();
        let inserted = state.drain_fragment("splice_append", list);
        state.calls.push(BackendCall::SpliceAppend {
            parent,
            inserted: inserted.clone(),
        });
        if state.check_exists(parent, "splice_append") {
            let pos = state.elements[parent.0 as usize].children.len();
            state.insert_at(parent, pos, &inserted);
        }
    }

    fn splice_remove(&mut self, parent: ElementId, before: ElementId, delete_count: usize) {
        let mut state = self.state.borrow_mut();
        state.calls.push(BackendCall::SpliceRemove { parent, before, delete_count });
        match state.position_of(parent, before) {
            Some(pos) => state.remove_range("splice_remove", parent, pos, delete_count),
            None => {
                state.violation(format!("splice_remove: {before:?} is not a child of {parent:?}"))
            }
        }
    }

    fn set_slot_name(&mut self, elem: ElementId, name: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(e) = state.elem_mut(elem) {
            e.slot_name = Some(name.to_string());
        }
        state.calls.push(BackendCall::SetSlotName {
            elem,
            name: name.to_string(),
        });
    }

    fn set_containing_slot(&mut self, elem: ElementId, slot: Option<ElementId>) {
        let mut state = self.state.borrow_mut();
        state.calls.push(BackendCall::SetContainingSlot { elem, slot });
        if !state.check_exists(elem, "set_containing_slot") {
            return;
        }
        if let Some(old) = state.slot_holding(elem) {
            state.elements[old.0 as usize].slot_nodes.retain(|&n| n != elem);
        }
        if let Some(slot) = slot {
            let path = state.order_path(elem);
            let pos = state.elements[slot.0 as usize]
                .slot_nodes
                .iter()
                .filter(|&&n| state.order_path(n) < path)
                .count();
            state.elements[slot.0 as usize].slot_nodes.insert(pos, elem);
        }
        state.elements[elem.0 as usize].containing_slot = Some(slot);
    }

    fn reassign_containing_slot(
        &mut self,
        elem: ElementId,
        old_slot: Option<ElementId>,
        new_slot: Option<ElementId>,
        index: usize,
    ) {
        let mut state = self.state.borrow_mut();
        state.calls.push(BackendCall::ReassignContainingSlot {
            elem,
            old_slot,
            new_slot,
            index,
        });
        if let Some(old) = old_slot {
            match state.elem(old).and_then(|s| s.slot_nodes.iter().position(|&n| n == elem)) {
                Some(pos) => {
                    state.elements[old.0 as usize].slot_nodes.remove(pos);
                }
                None => state.violation(format!(
                    "reassign_containing_slot: {elem:?} is not distributed into {old:?}"
                )),
            }
        }
        if let Some(new) = new_slot {
            state.insert_slot_nodes("reassign_containing_slot", new, index, &[elem]);
        }
        if let Some(e) = state.elem_mut(elem) {
            e.containing_slot = Some(new_slot);
        }
    }

    fn splice_before_slot_nodes(
        &mut self,
        slot: ElementId,
        before: usize,
        delete_count: usize,
        list: ElementId,
    ) {
        let mut state = self.state.borrow_mut();
        let inserted = state.drain_fragment("splice_before_slot_nodes", list);
        state.calls.push(BackendCall::SpliceBeforeSlotNodes {
            slot,
            before,
            delete_count,
            inserted: inserted.clone(),
        });
        if state.check_exists(slot, "splice_before_slot_nodes") {
            state.remove_slot_nodes("splice_before_slot_nodes", slot, before, delete_count);
            state.insert_slot_nodes("splice_before_slot_nodes", slot, before, &inserted);
        }
    }

    fn splice_append_slot_nodes(&mut self, slot: ElementId, list: ElementId) {
        let mut state = self.state.borrow_mut();
        let inserted = state.drain_fragment("splice_append_slot_nodes", list);
        state.calls.push(BackendCall::SpliceAppendSlotNodes {
            slot,
            inserted: inserted.clone(),
        });
        if state.check_exists(slot, "splice_append_slot_nodes") {
            let pos = state.elements[slot.0 as usize].slot_nodes.len();
            state.insert_slot_nodes("splice_append_slot_nodes", slot, pos, &inserted);
        }
    }

    fn splice_remove_slot_nodes(&mut self, slot: ElementId, before: usize, delete_count: usize) {
        let mut state = self.state.borrow_mut();
        state.calls.push(BackendCall::SpliceRemoveSlotNodes {
            slot,
            before,
            delete_count,
        });
        if state.check_exists(slot, "splice_remove_slot_nodes") {
            state.remove_slot_nodes("splice_remove_slot_nodes", slot, before, delete_count);
        }
    }

    fn set_inherit_slots(&mut self, elem: ElementId) {
        let mut state = self.state.borrow_mut();
        if state.elem(elem).is_some_and(|e| !e.children.is_empty()) {
            state.violation(format!("set_inherit_slots: {elem:?} already has children"));
        }
        if let Some(e) = state.elem_mut(elem) {
            e.inherit_slots = true;
        }
        state.calls.push(BackendCall::SetInheritSlots { elem });
    }

    fn set_virtual_host(&mut self, elem: ElementId) {
        let mut state = self.state.borrow_mut();
        if state.elem(elem).is_some_and(|e| e.associated.is_some()) {
            state.violation(format!("set_virtual_host: {elem:?} already associated"));
        }
        if let Some(e) = state.elem_mut(elem) {
            e.virtual_host = true;
        }
        state.calls.push(BackendCall::SetVirtualHost { elem });
    }

    fn add_external_class(&mut self, elem: ElementId, class_name: &str) {
        let mut state = self.state.borrow_mut();
        if state.elem(elem).is_some_and(|e| e.associated.is_some()) {
            state.violation(format!("add_external_class: {elem:?} already associated"));
        }
        if let Some(e) = state.elem_mut(elem) {
            e.external_classes.push(class_name.to_string());
        }
        state.calls.push(BackendCall::AddExternalClass {
            elem,
            name: class_name.to_string(),
        });
    }

    fn set_style_scope(
        &mut self,
        elem: ElementId,
        style_scope: StyleScopeId,
        host_style_scope: Option<StyleScopeId>,
    ) {
        let mut state = self.state.borrow_mut();
        if state.elem(elem).is_some_and(|e| e.style_scope.is_some()) {
            state.violation(format!("set_style_scope: {elem:?} scoped twice"));
        }
        if let Some(e) = state.elem_mut(elem) {
            e.style_scope = style_scope.non_global();
        }
        state.calls.push(BackendCall::SetStyleScope {
            elem,
            scope: style_scope,
            host_scope: host_style_scope,
        });
    }

    fn set_style(&mut self, elem: ElementId, style_text: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(e) = state.elem_mut(elem) {
            e.style = style_text.to_string();
        }
        state.calls.push(BackendCall::SetStyle {
            elem,
            text: style_text.to_string(),
        });
    }

    fn add_class(&mut self, elem: ElementId, class_name: &str, style_scope: Option<StyleScopeId>) {
        let mut state = self.state.borrow_mut();
        let scope = style_scope.and_then(StyleScopeId::non_global);
        state.calls.push(BackendCall::AddClass {
            elem,
            name: class_name.to_string(),
            scope,
        });
        if !state.check_exists(elem, "add_class") {
            return;
        }
        let entry = (class_name.to_string(), scope);
        if state.elements[elem.0 as usize].classes.contains(&entry) {
            state.violation(format!("add_class: {elem:?} already has {entry:?}"));
        } else {
            state.elements[elem.0 as usize].classes.push(entry);
        }
    }

    fn remove_class(
        &mut self,
        elem: ElementId,
        class_name: &str,
        style_scope: Option<StyleScopeId>,
    ) {
        let mut state = self.state.borrow_mut();
        let scope = style_scope.and_then(StyleScopeId::non_global);
        state.calls.push(BackendCall::RemoveClass {
            elem,
            name: class_name.to_string(),
            scope,
        });
        if !state.check_exists(elem, "remove_class") {
            return;
        }
        let entry = (class_name.to_string(), scope);
        let found = state.elements[elem.0 as usize]
            .classes
            .iter()
            .position(|c| *c == entry);
        match found {
            Some(pos) => {
                state.elements[elem.0 as usize].classes.remove(pos);
            }
            None => state.violation(format!("remove_class: {elem:?} does not have {entry:?}")),
        }
    }

    fn clear_classes(&mut self, elem: ElementId) {
        let mut state = self.state.borrow_mut();
        if let Some(e) = state.elem_mut(elem) {
            e.classes.clear();
        }
        state.calls.push(BackendCall::ClearClasses { elem });
    }

    fn set_class_alias(&mut self, elem: ElementId, class_name: &str, target: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(e) = state.elem_mut(elem) {
            e.class_aliases
                .insert(class_name.to_string(), target.to_string());
        }
        state.calls.push(BackendCall::SetClassAlias {
            elem,
            name: class_name.to_string(),
            target: target.to_string(),
        });
    }

    fn set_id(&mut self, elem: ElementId, id: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(e) = state.elem_mut(elem) {
            e.id = id.to_string();
        }
        state.calls.push(BackendCall::SetId {
            elem,
            id: id.to_string(),
        });
    }

    fn set_attribute(&mut self, elem: ElementId, name: &str, value: &Value) {
        let mut state = self.state.borrow_mut();
        if let Some(e) = state.elem_mut(elem) {
            e.attributes.insert(name.to_string(), value.clone());
        }
        state.calls.push(BackendCall::SetAttribute {
            elem,
            name: name.to_string(),
            value: value.clone(),
        });
    }

    fn remove_attribute(&mut self, elem: ElementId, name: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(e) = state.elem_mut(elem) {
            e.attributes.remove(name);
        }
        state.calls.push(BackendCall::RemoveAttribute {
            elem,
            name: name.to_string(),
        });
    }

    fn set_dataset(&mut self, elem: ElementId, name: &str, value: &Value) {
        let mut state = self.state.borrow_mut();
        if let Some(e) = state.elem_mut(elem) {
            e.dataset.insert(name.to_string(), value.clone());
        }
        state.calls.push(BackendCall::SetDataset {
            elem,
            name: name.to_string(),
            value: value.clone(),
        });
    }

    fn set_text(&mut self, elem: ElementId, content: &str) {
        let mut state = self.state.borrow_mut();
        if state.check_exists(elem, "set_text") {
            if state.elements[elem.0 as usize].kind != ElementKind::TextNode {
                state.violation(format!("set_text: {elem:?} is not a text node"));
            }
            state.elements[elem.0 as usize].text = content.to_string();
        }
        state.calls.push(BackendCall::SetText {
            elem,
            content: content.to_string(),
        });
    }

    fn set_model_binding_stat(
        &mut self,
        elem: ElementId,
        attribute_name: &str,
        listener: Option<ModelBindingCallback>,
    ) {
        let mut state = self.state.borrow_mut();
        let key = (elem, attribute_name.to_string());
        let bound = listener.is_some();
        match listener {
            Some(cb) => {
                state.model_bindings.insert(key, cb);
                if let Some(e) = state.elem_mut(elem) {
                    if !e.model_bindings.iter().any(|n| n == attribute_name) {
                        e.model_bindings.push(attribute_name.to_string());
                    }
                }
            }
            None => {
                state.model_bindings.remove(&key);
                if let Some(e) = state.elem_mut(elem) {
                    e.model_bindings.retain(|n| n != attribute_name);
                }
            }
        }
        state.calls.push(BackendCall::SetModelBindingStat {
            elem,
            name: attribute_name.to_string(),
            bound,
        });
    }

    fn set_listener_stats(
        &mut self,
        elem: ElementId,
        event_type: &str,
        capture: bool,
        mut_level: MutLevel,
    ) {
        let mut state = self.state.borrow_mut();
        if let Some(e) = state.elem_mut(elem) {
            e.listener_stats
                .retain(|(t, c, _)| !(t == event_type && *c == capture));
            e.listener_stats
                .push((event_type.to_string(), capture, mut_level));
        }
        state.calls.push(BackendCall::SetListenerStats {
            elem,
            event_type: event_type.to_string(),
            capture,
            mut_level,
        });
    }

    fn create_intersection_observer(
        &mut self,
        elem: ElementId,
        _relative: Option<ElementId>,
        _relative_margin: &str,
        _thresholds: &[f64],
        mut listener: IntersectionListener,
    ) -> Observer {
        listener(&IntersectionStatus::default());
        let observer = Observer::new();
        self.state
            .borrow_mut()
            .intersection_observers
            .push((observer.clone(), elem));
        observer
    }
}

impl MemoryBackend {
    /// Record an arbitrary call; used by wrappers that forward to this backend
    pub fn note(&self, call: BackendCall) {
        self.record(call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::BackendError;

    #[test]
    fn test_splice_before_empties_fragment() {
        let mut backend = MemoryBackend::new(BackendMode::Composed);
        let root = backend.root_node();
        let a = backend.create_element(None, "a", "a");
        let d = backend.create_element(None, "d", "d");
        backend.append_child(root, a);
        backend.append_child(root, d);

        let frag = backend.create_fragment();
        let b = backend.create_element(None, "b", "b");
        let c = backend.create_element(None, "c", "c");
        backend.append_child(frag, b);
        backend.append_child(frag, c);
        backend.splice_before(root, d, 0, frag);

        assert_eq!(backend.children(root), vec![a, b, c, d]);
        assert!(backend.children(frag).is_empty());
        assert!(backend.violations().is_empty());
    }

    #[test]
    fn test_violations_are_recorded() {
        let mut backend = MemoryBackend::new(BackendMode::Composed);
        let root = backend.root_node();
        let a = backend.create_element(None, "a", "a");
        backend.remove_child(root, a, None);
        backend.add_class(a, "x", None);
        backend.add_class(a, "x", None);
        backend.remove_class(a, "y", Some(StyleScopeId(2)));
        assert_eq!(backend.violations().len(), 3);
    }

    #[test]
    fn test_slot_nodes_never_in_two_slots() {
        let mut backend = MemoryBackend::new(BackendMode::Shadow);
        let s1 = backend.create_virtual_node(None, "slot");
        let s2 = backend.create_virtual_node(None, "slot");
        let x = backend.create_element(None, "x", "x");
        let frag = backend.create_fragment();
        backend.append_child(frag, x);
        backend.splice_append_slot_nodes(s1, frag);
        backend.reassign_containing_slot(x, Some(s1), Some(s2), 0);
        assert!(backend.slot_nodes(s1).is_empty());
        assert_eq!(backend.slot_nodes(s2), vec![x]);
        assert!(backend.violations().is_empty());

        let frag = backend.create_fragment();
        backend.append_child(frag, x);
        backend.splice_append_slot_nodes(s1, frag);
        assert_eq!(backend.violations().len(), 1);
    }

    #[test]
    fn test_media_query_fires_initially_then_on_change() {
        let mut backend =
            MemoryBackend::new(BackendMode::Composed).with_window(400.0, 300.0, 2.0, "dark");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let observer = backend.create_media_query_observer(
            MediaQueryStatus {
                min_width: Some(500.0),
                ..Default::default()
            },
            Box::new(move |m: bool| s.borrow_mut().push(m)),
        );
        assert_eq!(*seen.borrow(), vec![false]);
        backend.set_window_size(600.0, 300.0);
        backend.set_window_size(700.0, 300.0);
        assert_eq!(*seen.borrow(), vec![false, true]);
        observer.disconnect();
        backend.set_window_size(100.0, 300.0);
        assert_eq!(*seen.borrow(), vec![false, true]);
        assert_eq!(backend.theme(), "dark");
    }

    #[test]
    fn test_render_callbacks_wait_for_tick() {
        let mut backend = MemoryBackend::new(BackendMode::Shadow);
        let fired = Rc::new(Cell::new(0));
        for _ in 0..2 {
            let f = fired.clone();
            backend.render(Box::new(move |res: Result<(), BackendError>| {
                assert!(res.is_ok());
                f.set(f.get() + 1);
            }));
        }
        assert_eq!(fired.get(), 0);
        assert_eq!(backend.pending_render_callbacks(), 2);
        assert_eq!(backend.tick(), 2);
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn test_event_target_is_associated_node() {
        let mut backend = MemoryBackend::new(BackendMode::Composed);
        let a = backend.create_element(None, "a", "a");
        backend.associate_value(a, NodeId(7));
        let seen = Rc::new(Cell::new(None));
        let s = seen.clone();
        backend.on_event(Box::new(move |ev: &BackendEvent| {
            s.set(ev.target);
            EventBubbleStatus::Stop
        }));
        let status = backend.dispatch_event(a, "tap", Value::Null, EventOptions::default());
        assert_eq!(status, EventBubbleStatus::Stop);
        assert_eq!(seen.get(), Some(NodeId(7)));
    }
}
