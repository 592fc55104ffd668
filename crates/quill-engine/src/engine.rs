//! Engine - Main entry point

use std::path::Path;

use quill_backend::{Backend, MemoryBackend, StyleScopeId};
use quill_dom::{ComponentOptions, DomError, NodeId, NodeTree};

use crate::config::{Config, ConfigError};

/// The Quill component engine
pub struct Engine {
    config: Config,
    tree: NodeTree,
    recorder: Option<MemoryBackend>,
}

impl Engine {
    /// Create an engine over the recording backend
    pub fn new(config: Config) -> Self {
        let window = &config.window;
        let recorder = MemoryBackend::new(config.backend_mode).with_window(
            window.width,
            window.height,
            window.device_pixel_ratio,
            &window.theme,
        );
        let tree = NodeTree::new(Box::new(recorder.clone()), config.tree_options());
        tracing::info!("Quill Engine {} initialized", crate::VERSION);
        Self {
            config,
            tree,
            recorder: Some(recorder),
        }
    }

    /// Create an engine over a caller-provided backend. The backend's own
    /// mode takes precedence over the configured one.
    pub fn with_backend(config: Config, backend: Box<dyn Backend>) -> Self {
        if backend.mode() != config.backend_mode {
            tracing::warn!(
                "Configured {} mode, backend runs in {} mode",
                config.backend_mode.as_str(),
                backend.mode().as_str()
            );
        }
        let tree = NodeTree::new(backend, config.tree_options());
        tracing::info!("Quill Engine {} initialized", crate::VERSION);
        Self {
            config,
            tree,
            recorder: None,
        }
    }

    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        Ok(Self::new(Config::from_json_file(path)?))
    }

    /// Get engine configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    /// The recording backend, when the engine created it
    pub fn recorder(&self) -> Option<&MemoryBackend> {
        self.recorder.as_ref()
    }

    /// Register a named style scope in the tree's registry
    pub fn register_style_scope(&self, name: &str) -> StyleScopeId {
        self.tree.scopes().register(name)
    }

    /// Create the root component and mount it
    pub fn create_root(
        &mut self,
        tag: &str,
        options: ComponentOptions,
    ) -> Result<NodeId, EngineError> {
        let root = self.tree.create_root_component(tag, options);
        self.tree.mount(root)?;
        Ok(root)
    }

    /// Complete a render pass on the recording backend
    pub fn tick(&self) -> usize {
        self.recorder.as_ref().map(MemoryBackend::tick).unwrap_or(0)
    }

    /// Destroy the backend context
    pub fn shutdown(mut self) {
        self.tree.destroy();
        self.tick();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Engine error
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Node tree error: {0}")]
    Dom(#[from] DomError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
