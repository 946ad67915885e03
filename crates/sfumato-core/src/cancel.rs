//! Cooperative cancellation flag.

#[cfg(not(feature = "std"))]
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "std")]
use std::sync::Arc;

/// Shared cancellation flag.
///
/// Clones observe the same flag, so one can be handed to another thread (a
/// Ctrl-C handler, a UI) while the sampling loop polls the other. The sampler
/// checks it at the top of every step and the tiled decoder before every
/// tile. Cancelling is a request, never an error.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// True once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
