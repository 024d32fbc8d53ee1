//! `bao-fit` library crate.
//!
//! Models of the baryon acoustic oscillation feature in galaxy clustering,
//! the transforms that take them from Fourier to configuration space, and the
//! likelihood plumbing needed to fit the dilation parameter α.
//!
//! The binary (`bao`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - external samplers can drive [`models::Model`] directly

pub mod app;
pub mod cache;
pub mod cli;
pub mod cosmology;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod likelihood;
pub mod math;
pub mod models;
pub mod report;
pub mod transform;
