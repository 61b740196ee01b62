//! Per-run FX and IR state buffers.
//!
//! Filled once per sample as soon as its path exists and read by the
//! bucketing, fee and scenario-data stages. Storage is flat with the sample
//! index fastest:
//!
//! ```text
//! fx[((c - 1) * n_times + t) * samples + s]   (c >= 1; base is implicit 1.0)
//! ir[(c * n_times + t) * samples + s]
//! ```

use amc_models::{CrossAssetModel, ModelError, Path};

/// FX levels and IR states for every currency, time point and sample.
pub struct ConversionBuffers<'a> {
    model: &'a dyn CrossAssetModel,
    n_ccy: usize,
    n_times: usize,
    samples: usize,
    fx: Vec<f64>,
    ir: Vec<f64>,
}

impl<'a> ConversionBuffers<'a> {
    /// Zero-filled buffers for `n_times` time points (including time zero).
    pub fn new(model: &'a dyn CrossAssetModel, n_times: usize, samples: usize) -> Self {
        let n_ccy = model.currencies().len();
        Self {
            model,
            n_ccy,
            n_times,
            samples,
            fx: vec![0.0; (n_ccy - 1) * n_times * samples],
            ir: vec![0.0; n_ccy * n_times * samples],
        }
    }

    /// Number of time points, including time zero.
    #[inline]
    pub fn n_times(&self) -> usize {
        self.n_times
    }

    /// Number of samples.
    #[inline]
    pub fn samples(&self) -> usize {
        self.samples
    }

    #[inline]
    fn slot(&self, c: usize, t: usize, s: usize) -> usize {
        (c * self.n_times + t) * self.samples + s
    }

    /// Stores the FX and IR states of `path` for `sample`.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if the path does not cover the buffer's time
    /// points or the sample is out of range.
    pub fn fill(&mut self, sample: usize, path: &Path) -> Result<(), ModelError> {
        if path.len() != self.n_times {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_times,
                got: path.len(),
            });
        }
        if sample >= self.samples {
            return Err(ModelError::DimensionMismatch {
                expected: self.samples,
                got: sample + 1,
            });
        }
        for c in 0..self.n_ccy {
            let ir_state = self.model.ir_state_index(c);
            for t in 0..self.n_times {
                let slot = self.slot(c, t, sample);
                self.ir[slot] = path.value(ir_state, t);
            }
        }
        for c in 1..self.n_ccy {
            let fx_state = self.model.fx_state_index(c);
            for t in 0..self.n_times {
                let slot = self.slot(c - 1, t, sample);
                self.fx[slot] = path.value(fx_state, t).exp();
            }
        }
        Ok(())
    }

    /// FX rate (base per unit of currency `c`); exactly 1.0 for the base.
    #[inline]
    pub fn fx(&self, c: usize, t: usize, s: usize) -> f64 {
        if c == 0 {
            1.0
        } else {
            self.fx[self.slot(c - 1, t, s)]
        }
    }

    /// Stored IR state of currency `c`.
    #[inline]
    pub fn ir_state(&self, c: usize, t: usize, s: usize) -> f64 {
        self.ir[self.slot(c, t, s)]
    }

    /// Numeraire of currency `c` at physical time `time`, using the IR state
    /// stored at time point `t`.
    pub fn numeraire(&self, c: usize, t: usize, time: f64, s: usize) -> Result<f64, ModelError> {
        self.model.numeraire(c, time, self.ir_state(c, t, s))
    }

    /// Numeraire of `c` over the base numeraire; exactly 1.0 for the base.
    pub fn numeraire_ratio(
        &self,
        c: usize,
        t: usize,
        time: f64,
        s: usize,
    ) -> Result<f64, ModelError> {
        if c == 0 {
            return Ok(1.0);
        }
        Ok(self.numeraire(c, t, time, s)? / self.numeraire(0, t, time, s)?)
    }

    /// Zero bond of currency `c` from `time` to `maturity`.
    pub fn discount_bond(
        &self,
        c: usize,
        t: usize,
        time: f64,
        maturity: f64,
        s: usize,
    ) -> Result<f64, ModelError> {
        self.model
            .discount_bond(c, time, maturity, self.ir_state(c, t, s))
    }
}
