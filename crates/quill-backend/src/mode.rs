//! Backend modes, geometry records and observer handles

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Physical node-tree representation a backend maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Every component instance owns an isolated shadow sub-context; the
    /// backend receives the logical tree plus slot distribution.
    Shadow,
    /// The backend receives the composed tree only.
    #[default]
    Composed,
    /// Like `Composed`, but classes are emitted as prefixed plain names and no
    /// style scope is set on nodes.
    Domlike,
}

impl BackendMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shadow => "shadow",
            Self::Composed => "composed",
            Self::Domlike => "domlike",
        }
    }
}

/// Rectangle in display coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingClientRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Result delivered to intersection observers
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntersectionStatus {
    pub intersection_ratio: f64,
    pub bounding_client_rect: BoundingClientRect,
    pub intersection_rect: BoundingClientRect,
    pub relative_rect: BoundingClientRect,
    pub time: f64,
}

/// Media query conditions; unset fields always match
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaQueryStatus {
    pub min_width: Option<f64>,
    pub max_width: Option<f64>,
    pub width: Option<f64>,
    pub min_height: Option<f64>,
    pub max_height: Option<f64>,
    pub height: Option<f64>,
    pub orientation: Option<String>,
}

impl MediaQueryStatus {
    /// Evaluate the query against a viewport size
    pub fn matches(&self, width: f64, height: f64) -> bool {
        let orientation = if width > height { "landscape" } else { "portrait" };
        self.min_width.is_none_or(|v| width >= v)
            && self.max_width.is_none_or(|v| width <= v)
            && self.width.is_none_or(|v| width == v)
            && self.min_height.is_none_or(|v| height >= v)
            && self.max_height.is_none_or(|v| height <= v)
            && self.height.is_none_or(|v| height == v)
            && self.orientation.as_deref().is_none_or(|o| o == orientation)
    }
}

/// Media query listener, called with the current `matches` state
pub type MediaQueryListener = Box<dyn FnMut(bool)>;

/// Intersection listener
pub type IntersectionListener = Box<dyn FnMut(&IntersectionStatus)>;

/// Handle returned by observer registrations
///
/// Dropping the handle does not disconnect; only [`Observer::disconnect`] does.
#[derive(Debug, Clone)]
pub struct Observer {
    connected: Rc<Cell<bool>>,
}

impl Observer {
    pub fn new() -> Self {
        Self {
            connected: Rc::new(Cell::new(true)),
        }
    }

    /// A handle that is already disconnected
    pub fn detached() -> Self {
        let observer = Self::new();
        observer.disconnect();
        observer
    }

    pub fn disconnect(&self) {
        self.connected.set(false);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }
}

impl Default for Observer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_query_matches() {
        let query = MediaQueryStatus {
            min_width: Some(300.0),
            orientation: Some("landscape".to_string()),
            ..Default::default()
        };
        assert!(query.matches(800.0, 600.0));
        assert!(!query.matches(200.0, 100.0));
        assert!(!query.matches(400.0, 600.0));
    }

    #[test]
    fn test_observer_disconnect_is_shared() {
        let observer = Observer::new();
        let held = observer.clone();
        assert!(held.is_connected());
        observer.disconnect();
        assert!(!held.is_connected());
        assert!(!Observer::detached().is_connected());
    }
}
