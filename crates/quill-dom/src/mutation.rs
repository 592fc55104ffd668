//! Mutation Observer Relay
//!
//! Observers register for a node, optionally its whole subtree, and receive
//! one record per logical mutation.

use crate::NodeId;

/// Which mutations an observer wants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationObserverInit {
    /// Class, style, id, attribute and dataset changes
    pub properties: bool,
    /// Text content changes
    pub character_data: bool,
    /// Logical child list changes
    pub child_list: bool,
    /// Also observe logical descendants
    pub subtree: bool,
}

/// A logical mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    Properties {
        target: NodeId,
        attribute_name: String,
    },
    CharacterData {
        target: NodeId,
    },
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
}

impl MutationRecord {
    pub fn target(&self) -> NodeId {
        match self {
            Self::Properties { target, .. }
            | Self::CharacterData { target }
            | Self::ChildList { target, .. } => *target,
        }
    }

    fn wanted_by(&self, init: &MutationObserverInit) -> bool {
        match self {
            Self::Properties { .. } => init.properties,
            Self::CharacterData { .. } => init.character_data,
            Self::ChildList { .. } => init.child_list,
        }
    }
}

/// Observer callback
pub type MutationCallback = Box<dyn FnMut(&MutationRecord)>;

/// Handle returned by [`crate::NodeTree::observe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutationObserverId(u32);

struct Registration {
    id: MutationObserverId,
    target: NodeId,
    init: MutationObserverInit,
    callback: MutationCallback,
}

/// Registered observers of one tree
#[derive(Default)]
pub struct MutationRelay {
    next_id: u32,
    observers: Vec<Registration>,
}

impl MutationRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(
        &mut self,
        target: NodeId,
        init: MutationObserverInit,
        callback: MutationCallback,
    ) -> MutationObserverId {
        let id = MutationObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push(Registration {
            id,
            target,
            init,
            callback,
        });
        id
    }

    /// Returns whether the observer was registered
    pub fn disconnect(&mut self, id: MutationObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|r| r.id != id);
        self.observers.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Deliver `record` once to every matching observer. `ancestors` lists
    /// the logical ancestors of the target, nearest first.
    pub fn deliver(&mut self, record: &MutationRecord, ancestors: &[NodeId]) {
        let target = record.target();
        for registration in &mut self.observers {
            if !record.wanted_by(&registration.init) {
                continue;
            }
            let matches = registration.target == target
                || (registration.init.subtree && ancestors.contains(&registration.target));
            if matches {
                (registration.callback)(record);
            }
        }
    }
}

impl std::fmt::Debug for MutationRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationRelay")
            .field("observers", &self.observers.len())
            .finish()
    }
}
