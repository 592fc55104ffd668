//! Quill DOM - Component Node Model
//!
//! Logical node tree of a component engine, projected onto a
//! [`quill_backend::Backend`]:
//!
//! - components own a shadow tree; their logical children are light
//!   content distributed into slots;
//! - every child-list change is one batched splice, replayed on the backend
//!   in the form its mode expects;
//! - class tokens resolve against the owner chain into scoped class pairs.

mod class_list;
mod error;
mod mutation;
mod node;
mod projector;
mod scope;
mod strategy;
mod tree;

pub use class_list::{ClassList, ClassSegment, strip_prefixes};
pub use error::{DomError, DomResult};
pub use mutation::{MutationCallback, MutationObserverId, MutationObserverInit, MutationRecord};
pub use node::{
    ComponentOptions, ModelBindingListener, Node, NodeKind, SlotData, SlotState, StyleSegment,
};
pub use quill_backend::{ElementId, NodeId, StyleScopeId};
pub use scope::StyleScopeManager;
pub use strategy::{
    CLASS_PREFIX_ATTR, ComposedStrategy, DomlikeStrategy, ShadowStrategy, TreeStrategy,
    strategy_for,
};
pub use tree::{NodeTree, TreeOptions};
