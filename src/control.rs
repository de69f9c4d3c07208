use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use crate::error::{Error, Result};

/// Shared cancellation flag and progress gauge for a background task.
///
/// Clones observe the same state, so a controller can keep one clone and
/// hand another to the worker.
#[derive(Debug, Clone, Default)]
pub struct TaskControl {
    canceled: Arc<AtomicBool>,
    progress: Arc<AtomicU64>,
}

impl TaskControl {
    pub fn new() -> Self { Self::default() }

    /// Request cancellation; the worker stops at its next checkpoint.
    pub fn cancel(&self) { self.canceled.store(true, Ordering::Relaxed) }

    #[inline] pub fn is_canceled(&self) -> bool { self.canceled.load(Ordering::Relaxed) }

    /// Checkpoint: fail with [`Error::Canceled`] once cancellation was requested.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_canceled() { Err(Error::Canceled) } else { Ok(()) }
    }

    /// Record progress as a percentage, clamped to `0..=100`.
    pub fn set_progress(&self, percent: f64) {
        self.progress.store(percent.clamp(0.0, 100.0).to_bits(), Ordering::Relaxed)
    }

    #[inline] pub fn progress(&self) -> f64 { f64::from_bits(self.progress.load(Ordering::Relaxed)) }
}
