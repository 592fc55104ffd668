//! Quill Backend Protocol
//!
//! The operation contract a rendering surface implements so the node model
//! can drive it. Three physical representations exist (shadow, composed,
//! DOM-like) behind the one [`Backend`] trait.

mod empty;
mod event;
mod memory;
mod mode;
mod protocol;
mod render;

pub use empty::EmptyBackend;
pub use event::{BackendEvent, EventBubbleStatus, EventListener, EventOptions, MutLevel};
pub use memory::{BackendCall, ElementKind, MemoryBackend, MemoryElement};
pub use mode::{
    BackendMode, BoundingClientRect, IntersectionListener, IntersectionStatus,
    MediaQueryListener, MediaQueryStatus, Observer,
};
pub use protocol::{Backend, ModelBindingCallback};
pub use render::{RenderCallback, RenderQueue};

use serde::{Deserialize, Serialize};

/// Handle of a backend-owned element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

/// Identifier of a logical node, handed to the backend through
/// [`Backend::associate_value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Arena index of this node
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Style scope identifier
///
/// `0` is the global scope: in stylesheets it marks global rules, on nodes it
/// matches nothing but global rules. Any other value is opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleScopeId(pub u32);

impl StyleScopeId {
    /// The global scope
    pub const GLOBAL: StyleScopeId = StyleScopeId(0);

    pub fn is_global(self) -> bool {
        self.0 == 0
    }

    /// `None` for the global scope, which backends treat as "no scope"
    pub fn non_global(self) -> Option<StyleScopeId> {
        if self.is_global() { None } else { Some(self) }
    }
}

/// Error reported to render callbacks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("Backend context destroyed")]
    Destroyed,

    #[error("Render failed: {0}")]
    Render(String),
}
