//! Cooperative cancellation of a running request.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cloneable flag shared between the caller and the engine's workers.
///
/// Once [`cancel`](Self::cancel) is called, the walk stops at the next entry,
/// queued reads are abandoned before they open their file, and the request
/// returns [`DirconcatError::Cancelled`](crate::DirconcatError::Cancelled)
/// without persisting an artifact.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<AtomicBool>,
}
impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Relaxed)
    }
}
