//! Progress reporting and cancellation plumbing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{BuildError, Result};

/// Synchronous progress callback invoked from within the async pipeline.
///
/// `total` is 0 when the total is unknown (hierarchy walks discover their
/// size as they go). The pipeline does not await the callback; callers must
/// only update local state here, never block or perform further awaits.
pub type ProgressFn = dyn Fn(&str, usize, usize) + Send + Sync;

pub(crate) fn report(progress: Option<&ProgressFn>, phase: &str, current: usize, total: usize) {
    if let Some(f) = progress {
        f(phase, current, total);
    }
}

/// Cooperative cancellation token checked at every loop boundary of the
/// walker, reconciler and expander. Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Error out of the current stage if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(BuildError::Cancelled)
        } else {
            Ok(())
        }
    }
}
