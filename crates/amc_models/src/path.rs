//! Simulated paths and the all-sample path cache.
//!
//! # Memory Layout
//!
//! A [`Path`] stores one sample, state-major:
//!
//! ```text
//! values[state * n_times + t]      t = 0 is time zero
//! ```
//!
//! A [`PathCache`] stores every sample for the simulation times excluding
//! time zero, sample-fastest so one (time, state) slice is contiguous:
//!
//! ```text
//! data[(t * n_states + state) * samples + sample]
//! ```

use crate::error::ModelError;

/// One simulated sample: states × time points (including time zero).
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    times: Vec<f64>,
    n_states: usize,
    values: Vec<f64>,
}

impl Path {
    /// Zero-filled path on `times`.
    pub fn new(times: Vec<f64>, n_states: usize) -> Self {
        let n = times.len() * n_states;
        Self {
            times,
            n_states,
            values: vec![0.0; n],
        }
    }

    /// Path from state-major values.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if `values.len() != n_states * times.len()`.
    pub fn from_values(
        times: Vec<f64>,
        n_states: usize,
        values: Vec<f64>,
    ) -> Result<Self, ModelError> {
        let expected = n_states * times.len();
        if values.len() != expected {
            return Err(ModelError::DimensionMismatch {
                expected,
                got: values.len(),
            });
        }
        Ok(Self {
            times,
            n_states,
            values,
        })
    }

    /// Number of time points, including time zero.
    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// True for a path without time points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Number of state variables.
    #[inline]
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// The path's time grid.
    #[inline]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Time of point `t`.
    #[inline]
    pub fn time(&self, t: usize) -> f64 {
        self.times[t]
    }

    /// Value of `state` at point `t`.
    #[inline]
    pub fn value(&self, state: usize, t: usize) -> f64 {
        self.values[state * self.times.len() + t]
    }

    /// Sets the value of `state` at point `t`.
    #[inline]
    pub fn set(&mut self, state: usize, t: usize, value: f64) {
        let n = self.times.len();
        self.values[state * n + t] = value;
    }

    /// Whole trajectory of one state variable.
    #[inline]
    pub fn state_path(&self, state: usize) -> &[f64] {
        let n = self.times.len();
        &self.values[state * n..(state + 1) * n]
    }

    /// Sub-path keeping the time points where `keep` is true.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if `keep` does not cover every time point.
    pub fn select(&self, keep: &[bool]) -> Result<Path, ModelError> {
        if keep.len() != self.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.len(),
                got: keep.len(),
            });
        }
        let idx: Vec<usize> = (0..self.len()).filter(|&t| keep[t]).collect();
        let times = idx.iter().map(|&t| self.times[t]).collect();
        let values = (0..self.n_states)
            .flat_map(|k| idx.iter().map(move |&t| self.value(k, t)))
            .collect();
        Ok(Path {
            times,
            n_states: self.n_states,
            values,
        })
    }
}

/// States of every sample at every simulation time after time zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PathCache {
    n_times: usize,
    n_states: usize,
    samples: usize,
    data: Vec<f64>,
}

impl PathCache {
    /// Zero-filled cache for `n_times` times (excluding time zero).
    pub fn new(n_times: usize, n_states: usize, samples: usize) -> Self {
        Self {
            n_times,
            n_states,
            samples,
            data: vec![0.0; n_times * n_states * samples],
        }
    }

    /// Number of cached times (excluding time zero).
    #[inline]
    pub fn n_times(&self) -> usize {
        self.n_times
    }

    /// Number of state variables.
    #[inline]
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// Number of samples.
    #[inline]
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Copies points `1..` of `path` into column `sample`.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if the path shape does not fit the cache.
    pub fn store(&mut self, sample: usize, path: &Path) -> Result<(), ModelError> {
        if path.len() != self.n_times + 1 {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_times + 1,
                got: path.len(),
            });
        }
        if path.n_states() != self.n_states {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_states,
                got: path.n_states(),
            });
        }
        if sample >= self.samples {
            return Err(ModelError::DimensionMismatch {
                expected: self.samples,
                got: sample + 1,
            });
        }
        for t in 0..self.n_times {
            for k in 0..self.n_states {
                self.data[(t * self.n_states + k) * self.samples + sample] = path.value(k, t + 1);
            }
        }
        Ok(())
    }

    /// Values of `state` at cached time `t` across all samples.
    #[inline]
    pub fn values(&self, t: usize, state: usize) -> &[f64] {
        let start = (t * self.n_states + state) * self.samples;
        &self.data[start..start + self.samples]
    }

    /// Value of `state` at cached time `t` for one sample.
    #[inline]
    pub fn value(&self, t: usize, state: usize, sample: usize) -> f64 {
        self.data[(t * self.n_states + state) * self.samples + sample]
    }
}
