//! Rayon parallelisation settings.
//!
//! Path-evaluated trades of one sample and batch-evaluated trades of a run
//! are independent and are evaluated with Rayon once their count reaches
//! the configured threshold.

use rayon::prelude::*;
use serde::Deserialize;

/// Default minimum number of trades before evaluating in parallel.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 8;

/// Configuration for parallel execution.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Master switch
    pub enabled: bool,
    /// Minimum items before using parallelism
    pub parallel_threshold: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl ParallelConfig {
    /// Creates a new parallel configuration.
    pub fn new(parallel_threshold: usize) -> Self {
        Self {
            enabled: true,
            parallel_threshold: parallel_threshold.max(1),
        }
    }

    /// Always sequential.
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Returns whether to use parallel processing for the given item count.
    #[inline]
    pub fn should_parallelize(&self, n_items: usize) -> bool {
        self.enabled && n_items >= self.parallel_threshold
    }

    /// Maps every item, in parallel when `should_parallelize` holds.
    /// Results keep the input order.
    pub fn map<T, R, F>(&self, items: &[T], mapper: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(usize, &T) -> R + Sync + Send,
    {
        if self.should_parallelize(items.len()) {
            items.par_iter().enumerate().map(|(i, t)| mapper(i, t)).collect()
        } else {
            items.iter().enumerate().map(|(i, t)| mapper(i, t)).collect()
        }
    }

    /// Mutable variant of [`map`](Self::map) keeping only `Some` results.
    pub fn filter_map_mut<T, R, F>(&self, items: &mut [T], mapper: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(usize, &mut T) -> Option<R> + Sync + Send,
    {
        if self.should_parallelize(items.len()) {
            items
                .par_iter_mut()
                .enumerate()
                .filter_map(|(i, t)| mapper(i, t))
                .collect()
        } else {
            items
                .iter_mut()
                .enumerate()
                .filter_map(|(i, t)| mapper(i, t))
                .collect()
        }
    }
}
