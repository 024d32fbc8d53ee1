//! Power spectrum → correlation function transforms.
//!
//! The 3-D isotropic inverse Fourier transform of a power spectrum is
//!
//! ```text
//! ξ(s) = 1/(2π²) ∫ dk k² P(k) sin(ks)/(ks)
//! ```
//!
//! whose integrand oscillates and decays slowly. Two strategies are provided:
//!
//! - [`GaussTransform`]: damps the integrand with `exp(-k²a²)` and integrates a
//!   linear resampling of `P(k)` with the trapezoidal rule. Fast, with a small
//!   smoothing bias controlled by `a` and the resampling density.
//! - [`HankelTransform`]: Ogata's double-exponential quadrature for Hankel
//!   transforms of order 1/2 on a spline of `P(k)`. Slower, used as the
//!   accuracy reference.
//!
//! Both are pure functions of their inputs once constructed. Separations must be
//! strictly positive; the hot path does not check this.

pub mod gauss;
pub mod hankel;

pub use gauss::*;
pub use hankel::*;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Anything that turns a tabulated `P(k)` into `ξ(s)`.
pub trait PowerToCorrelation: Send + Sync {
    /// `ks` must be ascending and aligned with `pk`.
    fn transform(&self, ks: &[f64], pk: &[f64], ss: &[f64]) -> Result<Vec<f64>, AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    Gauss,
    Hankel,
}

impl TransformKind {
    pub fn display_name(self) -> &'static str {
        match self {
            TransformKind::Gauss => "gauss",
            TransformKind::Hankel => "hankel",
        }
    }

    /// The other strategy, used as a cross-check.
    pub fn other(self) -> Self {
        match self {
            TransformKind::Gauss => TransformKind::Hankel,
            TransformKind::Hankel => TransformKind::Gauss,
        }
    }

    /// Build the transform with its default tuning for the wavenumber grid `ks`.
    pub fn build(self, ks: &[f64]) -> Result<Box<dyn PowerToCorrelation>, AppError> {
        Ok(match self {
            TransformKind::Gauss => Box::new(GaussTransform::new(ks, GaussConfig::default())?),
            TransformKind::Hankel => Box::new(HankelTransform::new(HankelConfig::default())?),
        })
    }
}

fn check_aligned(ks: &[f64], pk: &[f64]) -> Result<(), AppError> {
    if ks.len() != pk.len() {
        return Err(AppError::numerical(format!(
            "Power spectrum has {} values for {} wavenumbers.",
            pk.len(),
            ks.len()
        )));
    }
    Ok(())
}
