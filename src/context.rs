//! Render-time context passed through every stage.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};

/// Render-time values. Accepted by renderers, ignored by the mem renderer.
pub type Values = Map<String, Value>;

/// Cooperative cancellation shared between a caller and an in-flight render.
///
/// Clones share the same flag, so a caller can keep one handle and hand
/// another to `process`.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    cancelled: Arc<AtomicBool>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
