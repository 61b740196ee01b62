//! Path sources.
//!
//! [`MultiPathGenerator`] evolves a [`StateProcess`] over a time grid with
//! seeded pseudo-random normals, optionally pairing every path with its
//! antithetic twin. [`PrecomputedPaths`] replays paths generated elsewhere.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;
use crate::model::StateProcess;
use crate::path::Path;
use crate::rng::AmcRng;

/// Produces one path per call.
pub trait PathSource {
    /// Returns the next path.
    fn next_path(&mut self) -> Result<Path, ModelError>;
}

/// Random sequence scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SequenceType {
    /// Independent pseudo-random normals for every path.
    #[default]
    PseudoRandom,
    /// Odd paths reuse the negated normals of the preceding even path.
    PseudoRandomAntithetic,
}

impl FromStr for SequenceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pseudorandom" => Ok(SequenceType::PseudoRandom),
            "pseudorandomantithetic" | "antithetic" => Ok(SequenceType::PseudoRandomAntithetic),
            _ => Err(format!("Unknown sequence type: {}", s)),
        }
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceType::PseudoRandom => write!(f, "PseudoRandom"),
            SequenceType::PseudoRandomAntithetic => write!(f, "PseudoRandomAntithetic"),
        }
    }
}

/// Euler path generator over a state process.
///
/// # Examples
///
/// ```
/// use amc_core::types::Currency;
/// use amc_models::curves::FlatCurve;
/// use amc_models::generator::{MultiPathGenerator, PathSource, SequenceType};
/// use amc_models::lgm::LgmComponent;
/// use amc_models::model::GaussianCrossAssetModel;
///
/// let model = GaussianCrossAssetModel::builder(
///     LgmComponent::new(Currency::USD, 0.03, 0.01, FlatCurve::new(0.02)).unwrap(),
/// )
/// .build()
/// .unwrap();
///
/// let mut gen = MultiPathGenerator::new(&model, &[0.0, 0.5, 1.0], 42, SequenceType::PseudoRandom)
///     .unwrap();
/// let path = gen.next_path().unwrap();
/// assert_eq!(path.len(), 3);
/// assert_eq!(path.value(0, 0), 0.0);
/// ```
pub struct MultiPathGenerator<'a, P: StateProcess + ?Sized> {
    process: &'a P,
    times: Vec<f64>,
    rng: AmcRng,
    sequence_type: SequenceType,
    normals: Vec<f64>,
    generated: usize,
}

impl<'a, P: StateProcess + ?Sized> MultiPathGenerator<'a, P> {
    /// Creates a generator.
    ///
    /// # Errors
    ///
    /// `InvalidTimeGrid` unless `times` starts at 0 and strictly increases.
    pub fn new(
        process: &'a P,
        times: &[f64],
        seed: u64,
        sequence_type: SequenceType,
    ) -> Result<Self, ModelError> {
        match times.first() {
            None => return Err(ModelError::InvalidTimeGrid("empty".to_string())),
            Some(&t0) if t0 != 0.0 => {
                return Err(ModelError::InvalidTimeGrid(format!(
                    "first time must be 0, got {}",
                    t0
                )))
            }
            _ => {}
        }
        if let Some(w) = times.windows(2).find(|w| w[1] <= w[0]) {
            return Err(ModelError::InvalidTimeGrid(format!(
                "times not increasing: {} then {}",
                w[0], w[1]
            )));
        }

        let n_draws = (times.len() - 1) * process.factors();
        Ok(Self {
            process,
            times: times.to_vec(),
            rng: AmcRng::from_seed(seed),
            sequence_type,
            normals: vec![0.0; n_draws],
            generated: 0,
        })
    }

    /// Number of paths produced so far.
    #[inline]
    pub fn generated(&self) -> usize {
        self.generated
    }

    fn draw(&mut self) {
        let mirror = self.sequence_type == SequenceType::PseudoRandomAntithetic
            && self.generated % 2 == 1;
        if mirror {
            for z in self.normals.iter_mut() {
                *z = -*z;
            }
        } else {
            self.rng.fill_normal(&mut self.normals);
        }
    }
}

impl<P: StateProcess + ?Sized> PathSource for MultiPathGenerator<'_, P> {
    fn next_path(&mut self) -> Result<Path, ModelError> {
        self.draw();

        let n_states = self.process.size();
        let n_factors = self.process.factors();
        let mut path = Path::new(self.times.clone(), n_states);

        let mut state = self.process.initial_values();
        let mut next = vec![0.0; n_states];
        for (k, &x) in state.iter().enumerate() {
            path.set(k, 0, x);
        }

        for step in 1..self.times.len() {
            let t0 = self.times[step - 1];
            let dt = self.times[step] - t0;
            let z = &self.normals[(step - 1) * n_factors..step * n_factors];
            self.process.evolve(t0, &state, dt, z, &mut next)?;
            std::mem::swap(&mut state, &mut next);
            for (k, &x) in state.iter().enumerate() {
                path.set(k, step, x);
            }
        }

        self.generated += 1;
        Ok(path)
    }
}

/// Replays externally generated paths in order.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedPaths {
    paths: VecDeque<Path>,
    served: usize,
}

impl PrecomputedPaths {
    /// Wraps a list of paths.
    pub fn new(paths: Vec<Path>) -> Self {
        Self {
            paths: paths.into(),
            served: 0,
        }
    }

    /// Paths still available.
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl PathSource for PrecomputedPaths {
    fn next_path(&mut self) -> Result<Path, ModelError> {
        let path = self
            .paths
            .pop_front()
            .ok_or(ModelError::PathsExhausted(self.served))?;
        self.served += 1;
        Ok(path)
    }
}
