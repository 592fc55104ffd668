//! Usage errors of the node model

use crate::NodeId;

/// A violated precondition. The tree is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Class name contains space characters: {0:?}")]
    ClassNameWhitespace(String),

    #[error("Node {0:?} is already associated with its backend element")]
    AlreadyAssociated(NodeId),

    #[error("Node {0:?} already has children")]
    HasChildren(NodeId),

    #[error("Node {0:?} is not a structural node of the required kind")]
    NotStructural(NodeId),

    #[error("Node {0:?} is not a component")]
    NotAComponent(NodeId),

    #[error("Node {0:?} is not a text node")]
    NotATextNode(NodeId),

    #[error("Node {0:?} cannot hold children")]
    NotAContainer(NodeId),

    #[error("Node {0:?} has no class list")]
    NotAnElement(NodeId),

    #[error("Cannot insert {child:?} into {parent:?}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("Node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Index {index} out of range for {len} children")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("Component {component:?} declares no external class {name:?}")]
    UnknownExternalClass { component: NodeId, name: String },
}

/// Result type for node-model operations
pub type DomResult<T> = Result<T, DomError>;
