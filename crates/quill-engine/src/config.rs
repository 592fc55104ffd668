//! Engine Configuration

use std::path::Path;

use quill_backend::BackendMode;
use quill_dom::TreeOptions;
use serde::{Deserialize, Serialize};

/// Display metrics seeded into the recording backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
    pub theme: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 375.0,
            height: 667.0,
            device_pixel_ratio: 2.0,
            theme: "light".to_string(),
        }
    }
}

/// Engine configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Physical representation the backend keeps
    pub backend_mode: BackendMode,

    /// `tracing` filter directive, e.g. `quill_dom=debug`
    pub log_filter: String,

    /// Write the class prefix of scoped nodes to an attribute
    pub write_extra_info_to_attr: bool,

    pub window: WindowConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_mode: BackendMode::Composed,
            log_filter: "info".to_string(),
            write_extra_info_to_attr: false,
            window: WindowConfig::default(),
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Options handed to the node tree
    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            write_extra_info_to_attr: self.write_extra_info_to_attr,
        }
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{"backend_mode": "shadow", "window": {"width": 800}}"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.backend_mode, BackendMode::Shadow);
        assert_eq!(config.window.width, 800.0);
        assert_eq!(config.window.height, 667.0);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let err = Config::from_json_str(r#"{"backend_mode": "canvas"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_json_file("/nonexistent/quill.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/quill.json"));
    }
}
