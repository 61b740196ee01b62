//! Progress reporting.
//!
//! Observers are best-effort: they are called from the orchestrating thread
//! and must not influence results.

/// Receives progress updates as `(done, total)`.
pub trait ProgressObserver: Send + Sync {
    /// Called after a unit of work completes.
    fn update_progress(&self, done: usize, total: usize);
}

/// Observer that ignores all updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    #[inline]
    fn update_progress(&self, _done: usize, _total: usize) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn update_progress(&self, done: usize, total: usize) {
        self(done, total)
    }
}
