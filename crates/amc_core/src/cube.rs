//! NPV cube storage.
//!
//! The cube is indexed by (trade row, valuation date, sample, depth) plus a
//! separate time-zero slice indexed by (trade row, depth). Depth 0 holds the
//! valuation-date value, depth 1 the close-out value.
//!
//! [`InMemoryCube`] stores everything in one flat vector:
//!
//! ```text
//! index(id, date, depth, sample) = ((id * n_dates + date) * depth_n + depth) * samples + sample
//! t0[id * depth_n + depth]
//! ```
//!
//! Sample is the fastest-moving dimension so a single (trade, date, depth)
//! profile across samples is contiguous.

use std::collections::HashMap;

use thiserror::Error;

/// Cube access errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CubeError {
    /// An index exceeded the cube's dimensions.
    #[error("Cube index out of range: {dimension} = {index} (size {size})")]
    OutOfRange {
        /// Dimension name
        dimension: &'static str,
        /// Requested index
        index: usize,
        /// Dimension size
        size: usize,
    },

    /// A trade id appeared twice in the id list.
    #[error("Duplicate trade id in cube: {0}")]
    DuplicateId(String),

    /// Zero-sized cube dimension.
    #[error("Cube dimension {0} must be positive")]
    EmptyDimension(&'static str),
}

/// Four-dimensional NPV store written by the exposure engine.
///
/// Implementations must be `Send + Sync` so a finished cube can be handed to
/// downstream aggregation on another thread.
pub trait NpvCube: Send + Sync {
    /// Number of trade rows.
    fn num_ids(&self) -> usize;

    /// Number of valuation dates.
    fn num_dates(&self) -> usize;

    /// Number of Monte Carlo samples.
    fn samples(&self) -> usize;

    /// Number of depth layers.
    fn depth(&self) -> usize;

    /// Row index of a trade id, if present.
    fn index_of(&self, id: &str) -> Option<usize>;

    /// Sets the time-zero value for `(id, depth)`.
    fn set_t0(&mut self, value: f64, id: usize, depth: usize) -> Result<(), CubeError>;

    /// Sets the value for `(id, date, sample, depth)`.
    fn set(
        &mut self,
        value: f64,
        id: usize,
        date: usize,
        sample: usize,
        depth: usize,
    ) -> Result<(), CubeError>;

    /// Returns the time-zero value for `(id, depth)`.
    fn get_t0(&self, id: usize, depth: usize) -> Result<f64, CubeError>;

    /// Returns the value for `(id, date, sample, depth)`.
    fn get(&self, id: usize, date: usize, sample: usize, depth: usize) -> Result<f64, CubeError>;
}

/// Dense in-memory cube.
#[derive(Debug, Clone)]
pub struct InMemoryCube {
    ids: Vec<String>,
    id_index: HashMap<String, usize>,
    num_dates: usize,
    samples: usize,
    depth: usize,
    t0: Vec<f64>,
    data: Vec<f64>,
}

impl InMemoryCube {
    /// Creates a zero-filled cube.
    ///
    /// # Arguments
    ///
    /// * `ids` - Trade ids; row `i` belongs to `ids[i]`
    /// * `num_dates` - Number of valuation dates
    /// * `samples` - Number of Monte Carlo samples
    /// * `depth` - Depth layers (2 when close-out values are stored)
    ///
    /// # Errors
    ///
    /// `DuplicateId` for repeated ids, `EmptyDimension` for zero `samples`
    /// or `depth`.
    pub fn new(
        ids: Vec<String>,
        num_dates: usize,
        samples: usize,
        depth: usize,
    ) -> Result<Self, CubeError> {
        if samples == 0 {
            return Err(CubeError::EmptyDimension("samples"));
        }
        if depth == 0 {
            return Err(CubeError::EmptyDimension("depth"));
        }

        let mut id_index = HashMap::with_capacity(ids.len());
        for (row, id) in ids.iter().enumerate() {
            if id_index.insert(id.clone(), row).is_some() {
                return Err(CubeError::DuplicateId(id.clone()));
            }
        }

        let n = ids.len();
        Ok(Self {
            ids,
            id_index,
            num_dates,
            samples,
            depth,
            t0: vec![0.0; n * depth],
            data: vec![0.0; n * num_dates * depth * samples],
        })
    }

    /// Trade ids in row order.
    #[inline]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Values across all samples for `(id, date, depth)`.
    pub fn sample_values(&self, id: usize, date: usize, depth: usize) -> Result<&[f64], CubeError> {
        let start = self.index(id, date, 0, depth)?;
        Ok(&self.data[start..start + self.samples])
    }

    /// Sample mean for `(id, date, depth)`.
    pub fn mean(&self, id: usize, date: usize, depth: usize) -> Result<f64, CubeError> {
        let values = self.sample_values(id, date, depth)?;
        Ok(values.iter().sum::<f64>() / values.len() as f64)
    }

    fn check(dimension: &'static str, index: usize, size: usize) -> Result<(), CubeError> {
        if index >= size {
            Err(CubeError::OutOfRange {
                dimension,
                index,
                size,
            })
        } else {
            Ok(())
        }
    }

    fn index(&self, id: usize, date: usize, sample: usize, depth: usize) -> Result<usize, CubeError> {
        Self::check("id", id, self.ids.len())?;
        Self::check("date", date, self.num_dates)?;
        Self::check("sample", sample, self.samples)?;
        Self::check("depth", depth, self.depth)?;
        Ok(((id * self.num_dates + date) * self.depth + depth) * self.samples + sample)
    }

    fn t0_index(&self, id: usize, depth: usize) -> Result<usize, CubeError> {
        Self::check("id", id, self.ids.len())?;
        Self::check("depth", depth, self.depth)?;
        Ok(id * self.depth + depth)
    }
}

impl NpvCube for InMemoryCube {
    #[inline]
    fn num_ids(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    fn num_dates(&self) -> usize {
        self.num_dates
    }

    #[inline]
    fn samples(&self) -> usize {
        self.samples
    }

    #[inline]
    fn depth(&self) -> usize {
        self.depth
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.id_index.get(id).copied()
    }

    fn set_t0(&mut self, value: f64, id: usize, depth: usize) -> Result<(), CubeError> {
        let i = self.t0_index(id, depth)?;
        self.t0[i] = value;
        Ok(())
    }

    fn set(
        &mut self,
        value: f64,
        id: usize,
        date: usize,
        sample: usize,
        depth: usize,
    ) -> Result<(), CubeError> {
        let i = self.index(id, date, sample, depth)?;
        self.data[i] = value;
        Ok(())
    }

    fn get_t0(&self, id: usize, depth: usize) -> Result<f64, CubeError> {
        Ok(self.t0[self.t0_index(id, depth)?])
    }

    fn get(&self, id: usize, date: usize, sample: usize, depth: usize) -> Result<f64, CubeError> {
        Ok(self.data[self.index(id, date, sample, depth)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("T{}", i)).collect()
    }

    #[test]
    fn test_cube_dimensions_and_lookup() {
        let cube = InMemoryCube::new(ids(3), 4, 5, 2).unwrap();
        assert_eq!(cube.num_ids(), 3);
        assert_eq!(cube.num_dates(), 4);
        assert_eq!(cube.samples(), 5);
        assert_eq!(cube.depth(), 2);
        assert_eq!(cube.index_of("T2"), Some(2));
        assert_eq!(cube.index_of("missing"), None);
    }

    #[test]
    fn test_set_and_get_do_not_alias() {
        let mut cube = InMemoryCube::new(ids(2), 3, 4, 2).unwrap();
        cube.set(1.5, 1, 2, 3, 1).unwrap();
        cube.set(-2.0, 1, 2, 3, 0).unwrap();
        cube.set_t0(7.0, 0, 1).unwrap();

        assert_eq!(cube.get(1, 2, 3, 1).unwrap(), 1.5);
        assert_eq!(cube.get(1, 2, 3, 0).unwrap(), -2.0);
        assert_eq!(cube.get(0, 2, 3, 1).unwrap(), 0.0);
        assert_eq!(cube.get_t0(0, 1).unwrap(), 7.0);
        assert_eq!(cube.get_t0(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_sample_values_contiguous() {
        let mut cube = InMemoryCube::new(ids(1), 2, 3, 1).unwrap();
        for s in 0..3 {
            cube.set(s as f64, 0, 1, s, 0).unwrap();
        }
        assert_eq!(cube.sample_values(0, 1, 0).unwrap(), &[0.0, 1.0, 2.0]);
        assert_eq!(cube.mean(0, 1, 0).unwrap(), 1.0);
    }

    #[test]
    fn test_out_of_range() {
        let mut cube = InMemoryCube::new(ids(1), 2, 3, 1).unwrap();
        assert_eq!(
            cube.set(1.0, 0, 0, 0, 1),
            Err(CubeError::OutOfRange {
                dimension: "depth",
                index: 1,
                size: 1
            })
        );
        assert!(cube.get(0, 2, 0, 0).is_err());
        assert!(cube.get_t0(1, 0).is_err());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = InMemoryCube::new(vec!["A".into(), "A".into()], 1, 1, 1).unwrap_err();
        assert_eq!(err, CubeError::DuplicateId("A".to_string()));
    }

    #[test]
    fn test_zero_samples_rejected() {
        assert_eq!(
            InMemoryCube::new(ids(1), 1, 0, 1).unwrap_err(),
            CubeError::EmptyDimension("samples")
        );
    }
}
