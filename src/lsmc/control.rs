//! Cooperative cancellation and progress reporting for long-running valuations.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::{StorageError, StorageResult};

/// Shared flag polled by the engine between periods.
///
/// Clones share state, so a token handed to a valuation can be cancelled from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(StorageError::Cancelled)` once cancelled.
    pub fn check(&self) -> StorageResult<()> {
        if self.is_cancelled() {
            Err(StorageError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Receives the fraction of work completed, in `(0, 1]`.
pub type ProgressFn = dyn Fn(f64) + Send + Sync;

/// Optional progress callback.
#[derive(Clone, Default)]
pub struct ProgressCallback(Option<Arc<ProgressFn>>);

impl ProgressCallback {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        let callback: Arc<ProgressFn> = Arc::new(callback);
        Self(Some(callback))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub(crate) fn report(&self, progress: f64) {
        if let Some(callback) = &self.0 {
            callback(progress);
        }
    }
}

impl fmt::Debug for ProgressCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProgressCallback")
            .field(&self.0.as_ref().map(|_| "Fn(f64)"))
            .finish()
    }
}

/// Counts completed steps out of a known total.
#[derive(Debug)]
pub(crate) struct ProgressTracker<'a> {
    callback: &'a ProgressCallback,
    completed: usize,
    total: usize,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(callback: &'a ProgressCallback, total: usize) -> Self {
        Self {
            callback,
            completed: 0,
            total,
        }
    }

    pub(crate) fn step(&mut self) {
        self.completed += 1;
        let progress = if self.completed >= self.total {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        };
        self.callback.report(progress);
    }
}
