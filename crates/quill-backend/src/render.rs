//! Render-completion callback queue

use crate::BackendError;

/// Callback fired after the next render pass
pub type RenderCallback = Box<dyn FnOnce(Result<(), BackendError>)>;

/// Callbacks waiting for the next render tick
///
/// Callbacks registered while a flush is running land in the following tick.
#[derive(Default)]
pub struct RenderQueue {
    pending: Vec<RenderCallback>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cb: RenderCallback) {
        self.pending.push(cb);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Detach every pending callback, in registration order
    pub fn take(&mut self) -> Vec<RenderCallback> {
        std::mem::take(&mut self.pending)
    }

    /// Fire every pending callback with `result`
    pub fn flush(&mut self, result: Result<(), BackendError>) -> usize {
        let callbacks = self.take();
        let count = callbacks.len();
        for cb in callbacks {
            cb(result.clone());
        }
        count
    }
}

impl std::fmt::Debug for RenderQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderQueue")
            .field("pending", &self.pending.len())
            .finish()
    }
}
