//! # AMC Models (L2: Models and Paths)
//!
//! The stochastic side of the exposure engine:
//!
//! - [`curves`]: initial yield curves
//! - [`correlation`]: correlation matrices and Cholesky factors
//! - [`lgm`]: linear Gauss-Markov rates component
//! - [`model`]: [`StateProcess`] / [`CrossAssetModel`] traits and the
//!   [`GaussianCrossAssetModel`]
//! - [`rng`], [`generator`], [`path`]: seeded path generation, single paths
//!   and the all-sample path cache
//! - [`market`]: Ibor index conventions and model-implied index replication
//!
//! ## Example
//!
//! ```
//! use amc_core::types::Currency;
//! use amc_models::{
//!     CrossAssetModel, FlatCurve, FxComponent, GaussianCrossAssetModel, LgmComponent,
//! };
//!
//! let model = GaussianCrossAssetModel::builder(
//!     LgmComponent::new(Currency::USD, 0.03, 0.01, FlatCurve::new(0.04)).unwrap(),
//! )
//! .foreign(
//!     LgmComponent::new(Currency::EUR, 0.02, 0.008, FlatCurve::new(0.02)).unwrap(),
//!     FxComponent::new(1.08, 0.09).unwrap(),
//! )
//! .build()
//! .unwrap();
//!
//! assert_eq!(model.currencies(), &[Currency::USD, Currency::EUR]);
//! assert!((model.numeraire(0, 0.0, 0.0).unwrap() - 1.0).abs() < 1e-12);
//! ```

#![warn(missing_docs)]

pub mod correlation;
pub mod curves;
pub mod error;
pub mod generator;
pub mod lgm;
pub mod market;
pub mod model;
pub mod path;
pub mod rng;

pub use correlation::{CholeskyFactor, CorrelationMatrix};
pub use curves::{FlatCurve, YieldCurve};
pub use error::ModelError;
pub use generator::{MultiPathGenerator, PathSource, PrecomputedPaths, SequenceType};
pub use lgm::LgmComponent;
pub use market::{IborIndexSpec, IndexReplicationCurve, MarketDataProvider, SimpleMarket};
pub use model::{
    CrossAssetModel, FxComponent, GaussianCrossAssetModel, GaussianCrossAssetModelBuilder,
    StateProcess,
};
pub use path::{Path, PathCache};
pub use rng::AmcRng;
