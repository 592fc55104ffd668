//! Node types
//!
//! One arena entry per logical node. Logical relations (`parent`,
//! `children`) and composed relations (`slot_state`, `composed_parent`) are
//! stored side by side; the tree keeps the composed ones up to date.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use quill_backend::{ElementId, StyleScopeId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::NodeId;
use crate::class_list::ClassList;

/// Listener for a two-way bound field
pub type ModelBindingListener = Rc<dyn Fn(&Value)>;

/// Per-node table of model-binding listeners, shared with the backend
/// callbacks so they always reach the listener registered last
#[derive(Clone, Default)]
pub(crate) struct ModelBindingTable(pub(crate) Rc<RefCell<HashMap<String, ModelBindingListener>>>);

impl ModelBindingTable {
    pub(crate) fn get(&self, field: &str) -> Option<ModelBindingListener> {
        self.0.borrow().get(field).cloned()
    }
}

impl std::fmt::Debug for ModelBindingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.0.borrow().keys()).finish()
    }
}

/// Index of an inline style segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StyleSegment(pub usize);

impl StyleSegment {
    /// The segment written by templates
    pub const MAIN: StyleSegment = StyleSegment(0);
}

/// Per-component options fixed at creation time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentOptions {
    /// Default scope of nodes in this component's shadow tree
    pub style_scope: StyleScopeId,
    /// Additional scope every unprefixed class is also emitted under
    pub extra_style_scope: Option<StyleScopeId>,
    /// Class names the owner of this component may remap
    pub external_classes: Vec<String>,
    /// The host has no rendering surface of its own
    pub virtual_host: bool,
    /// Route light content by `slot` name instead of to the first slot
    pub multiple_slots: bool,
}

/// Slot membership of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    /// Not light content of any component
    #[default]
    Unassigned,
    /// Distributed into this slot
    Slot(NodeId),
    /// Light content with no matching slot; absent from the composed tree
    Detached,
}

impl SlotState {
    pub fn slot(self) -> Option<NodeId> {
        match self {
            SlotState::Slot(slot) => Some(slot),
            _ => None,
        }
    }
}

/// Slot data carried by a structural node
#[derive(Debug, Clone, Default)]
pub struct SlotData {
    pub name: String,
    /// Distributed nodes in light-tree order
    pub nodes: Vec<NodeId>,
}

/// What a node is
#[derive(Debug, Clone)]
pub enum NodeKind {
    Native {
        tag: String,
    },
    Text {
        content: String,
    },
    Virtual {
        name: String,
        slot: Option<SlotData>,
        inherit_slots: bool,
    },
    Component {
        tag: String,
        options: ComponentOptions,
        shadow_root: NodeId,
    },
    ShadowRoot {
        host: NodeId,
    },
}

/// A logical node
#[derive(Debug)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) be: Option<ElementId>,
    /// Shadow root this node belongs to; `None` for the root component
    pub(crate) owner: Option<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) slot_state: SlotState,
    pub(crate) composed_parent: Option<NodeId>,
    pub(crate) associated: bool,
    pub(crate) destroy_on_detach: bool,
    pub(crate) slot_name: String,
    pub(crate) id: String,
    pub(crate) class_list: Option<ClassList>,
    pub(crate) style: Vec<String>,
    pub(crate) attributes: BTreeMap<String, Value>,
    pub(crate) dataset: BTreeMap<String, Value>,
    pub(crate) model_bindings: ModelBindingTable,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, owner: Option<NodeId>, be: Option<ElementId>) -> Self {
        let class_list = match &kind {
            NodeKind::Native { .. } => Some(ClassList::new(Vec::new())),
            NodeKind::Component { options, .. } => {
                Some(ClassList::new(options.external_classes.clone()))
            }
            _ => None,
        };
        Self {
            kind,
            be,
            owner,
            parent: None,
            children: Vec::new(),
            slot_state: SlotState::Unassigned,
            composed_parent: None,
            associated: false,
            destroy_on_detach: false,
            slot_name: String::new(),
            id: String::new(),
            class_list,
            style: Vec::new(),
            attributes: BTreeMap::new(),
            dataset: BTreeMap::new(),
            model_bindings: ModelBindingTable::default(),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Backend element, if this node has one
    pub fn backend_element(&self) -> Option<ElementId> {
        self.be
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    pub fn slot_state(&self) -> SlotState {
        self.slot_state
    }

    /// Value of the `slot` attribute used for slot matching
    pub fn slot_name(&self) -> &str {
        &self.slot_name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn dataset(&self, name: &str) -> Option<&Value> {
        self.dataset.get(name)
    }

    pub fn is_associated(&self) -> bool {
        self.associated
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text { .. })
    }

    pub fn is_component(&self) -> bool {
        matches!(self.kind, NodeKind::Component { .. })
    }

    pub fn is_shadow_root(&self) -> bool {
        matches!(self.kind, NodeKind::ShadowRoot { .. })
    }

    pub fn is_slot(&self) -> bool {
        matches!(self.kind, NodeKind::Virtual { slot: Some(_), .. })
    }

    pub fn is_inherit_slots(&self) -> bool {
        matches!(self.kind, NodeKind::Virtual { inherit_slots: true, .. })
    }

    /// Whether the node may hold logical children
    pub fn is_container(&self) -> bool {
        !self.is_text()
    }

    /// Tag, virtual name or `#text` / `#shadow-root`
    pub fn name(&self) -> &str {
        match &self.kind {
            NodeKind::Native { tag } | NodeKind::Component { tag, .. } => tag,
            NodeKind::Virtual { name, .. } => name,
            NodeKind::Text { .. } => "#text",
            NodeKind::ShadowRoot { .. } => "#shadow-root",
        }
    }

    pub(crate) fn slot_data(&self) -> Option<&SlotData> {
        match &self.kind {
            NodeKind::Virtual { slot, .. } => slot.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn slot_data_mut(&mut self) -> Option<&mut SlotData> {
        match &mut self.kind {
            NodeKind::Virtual { slot, .. } => slot.as_mut(),
            _ => None,
        }
    }

    pub(crate) fn component_options(&self) -> Option<&ComponentOptions> {
        match &self.kind {
            NodeKind::Component { options, .. } => Some(options),
            _ => None,
        }
    }

    pub(crate) fn shadow_root(&self) -> Option<NodeId> {
        match &self.kind {
            NodeKind::Component { shadow_root, .. } => Some(*shadow_root),
            _ => None,
        }
    }

    /// Non-empty style segments joined with `;`
    pub(crate) fn style_text(&self) -> String {
        self.style
            .iter()
            .filter(|s| !s.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(";")
    }
}
