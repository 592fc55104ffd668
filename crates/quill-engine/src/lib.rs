//! Quill Engine
//!
//! Facade over the component node model: configuration, logging and an
//! [`Engine`] owning one node tree.
//!
//! # Example
//! ```rust,ignore
//! use quill_engine::{Config, Engine};
//!
//! let config = Config::default();
//! quill_engine::logging::init(&config.log_filter);
//! let mut engine = Engine::new(config);
//! let root = engine.create_root("app", Default::default())?;
//! ```

mod config;
mod engine;
pub mod logging;

pub use config::{Config, ConfigError, WindowConfig};
pub use engine::{Engine, EngineError};

// Re-export sub-crates for advanced usage
pub use quill_backend as backend;
pub use quill_dom as dom;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
