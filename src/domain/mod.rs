//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - model selection and construction settings (`ModelKind`, `ModelSettings`)
//! - run configuration for each subcommand (`XiConfig`, `FitConfig`)
//! - results (`ScanPoint`, `ScanResult`, `XiTable`, `BenchRow`)

pub mod types;

pub use types::*;
