//! Fitting harness.
//!
//! Sampling the full posterior is left to external samplers, which only need
//! [`crate::models::Model::get_likelihood`] and the parameter space. What lives
//! here is a deterministic α profile scan with analytically marginalised
//! broadband terms, evaluated in parallel.

pub mod scan;

pub use scan::*;
