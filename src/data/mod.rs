//! Datasets the models are fitted against.
//!
//! - `dataset`: an in-memory measurement (abscissae, values, covariance) with
//!   the metadata the models and likelihood need
//! - `mock`: seeded synthetic realisations for testing and the `bao fit` demo

pub mod dataset;
pub mod mock;

pub use dataset::*;
pub use mock::*;
