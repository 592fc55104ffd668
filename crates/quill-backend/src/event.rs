//! Event delivery types

use serde_json::Value;

use crate::NodeId;

/// Returned by the global event listener to steer bubbling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventBubbleStatus {
    /// Continue as usual
    #[default]
    Normal,
    /// Continue bubbling but prevent the default behavior
    NoDefault,
    /// Stop bubbling here
    Stop,
}

/// Mutual-exclusion level of a listener registration
///
/// `Mut` listeners exclude each other within one bubbling pass; a `Final`
/// listener stops bubbling and prevents the default behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MutLevel {
    #[default]
    None,
    Mut,
    Final,
}

/// Options of a dispatched event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventOptions {
    pub bubbles: bool,
    pub composed: bool,
    pub capture_phase: bool,
}

/// An event delivered from the backend to the global listener
#[derive(Debug, Clone, PartialEq)]
pub struct BackendEvent {
    /// Node associated with the target element, if any
    pub target: Option<NodeId>,
    pub event_type: String,
    pub detail: Value,
    pub options: EventOptions,
}

/// The single global event listener of a backend context
pub type EventListener = Box<dyn FnMut(&BackendEvent) -> EventBubbleStatus>;
