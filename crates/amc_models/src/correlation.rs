//! Correlation matrices and their Cholesky factors.
//!
//! Independent standard normals `Z` are mapped to correlated normals
//! `W = L Z` where `C = L Lᵀ`.
//!
//! ```
//! use amc_models::correlation::CorrelationMatrix;
//!
//! let corr = CorrelationMatrix::new(&[1.0, 0.5, 0.5, 1.0], 2).unwrap();
//! let chol = corr.cholesky().unwrap();
//! let mut w = [0.0; 2];
//! chol.transform(&[1.0, 0.0], &mut w);
//! assert!((w[1] - 0.5).abs() < 1e-12);
//! ```

use crate::error::ModelError;

const EPSILON: f64 = 1e-10;

/// Validated symmetric correlation matrix (row-major).
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationMatrix {
    data: Vec<f64>,
    dim: usize,
}

impl CorrelationMatrix {
    /// Creates a correlation matrix from `dim * dim` row-major entries.
    ///
    /// # Errors
    ///
    /// `ModelError::DimensionMismatch` for a wrong element count,
    /// `ModelError::Correlation` for a non-unit diagonal, asymmetry or an
    /// entry outside [-1, 1].
    pub fn new(data: &[f64], dim: usize) -> Result<Self, ModelError> {
        if data.len() != dim * dim {
            return Err(ModelError::DimensionMismatch {
                expected: dim * dim,
                got: data.len(),
            });
        }

        for i in 0..dim {
            let diag = data[i * dim + i];
            if (diag - 1.0).abs() > EPSILON {
                return Err(ModelError::Correlation(format!(
                    "diagonal element {} is {}, expected 1.0",
                    i, diag
                )));
            }
            for j in (i + 1)..dim {
                let rho = data[i * dim + j];
                if (rho - data[j * dim + i]).abs() > EPSILON {
                    return Err(ModelError::Correlation(format!(
                        "not symmetric at ({}, {})",
                        i, j
                    )));
                }
                if !(-1.0..=1.0).contains(&rho) {
                    return Err(ModelError::Correlation(format!(
                        "entry ({}, {}) = {} outside [-1, 1]",
                        i, j, rho
                    )));
                }
            }
        }

        Ok(Self {
            data: data.to_vec(),
            dim,
        })
    }

    /// Identity matrix (independent factors).
    pub fn identity(dim: usize) -> Self {
        let mut data = vec![0.0; dim * dim];
        for i in 0..dim {
            data[i * dim + i] = 1.0;
        }
        Self { data, dim }
    }

    /// Matrix dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Entry (i, j).
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.dim + j]
    }

    /// Sets entries (i, j) and (j, i).
    pub fn set(&mut self, i: usize, j: usize, rho: f64) -> Result<(), ModelError> {
        if i == j {
            return Err(ModelError::Correlation(format!(
                "cannot set diagonal element {}",
                i
            )));
        }
        if !(-1.0..=1.0).contains(&rho) {
            return Err(ModelError::Correlation(format!(
                "entry ({}, {}) = {} outside [-1, 1]",
                i, j, rho
            )));
        }
        self.data[i * self.dim + j] = rho;
        self.data[j * self.dim + i] = rho;
        Ok(())
    }

    /// Lower-triangular Cholesky factor.
    ///
    /// # Errors
    ///
    /// `ModelError::Correlation` if the matrix is not positive definite.
    pub fn cholesky(&self) -> Result<CholeskyFactor, ModelError> {
        let n = self.dim;
        let mut lower = vec![0.0; n * n];

        for i in 0..n {
            for j in 0..=i {
                let sum: f64 = (0..j).map(|k| lower[i * n + k] * lower[j * n + k]).sum();
                if i == j {
                    let diag = self.get(i, i) - sum;
                    if diag <= 0.0 {
                        return Err(ModelError::Correlation(
                            "matrix is not positive definite".to_string(),
                        ));
                    }
                    lower[i * n + i] = diag.sqrt();
                } else {
                    lower[i * n + j] = (self.get(i, j) - sum) / lower[j * n + j];
                }
            }
        }

        Ok(CholeskyFactor { data: lower, dim: n })
    }
}

/// Lower-triangular factor `L` with `C = L Lᵀ`.
#[derive(Clone, Debug, PartialEq)]
pub struct CholeskyFactor {
    data: Vec<f64>,
    dim: usize,
}

impl CholeskyFactor {
    /// Factor dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Writes `L z` into `out`.
    pub fn transform(&self, z: &[f64], out: &mut [f64]) {
        let n = self.dim;
        for i in 0..n {
            out[i] = (0..=i).map(|k| self.data[i * n + k] * z[k]).sum();
        }
    }
}
