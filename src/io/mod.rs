//! Input/output helpers.
//!
//! - JSON exports of scan results and ξ tables (`export`)

pub mod export;

pub use export::*;
