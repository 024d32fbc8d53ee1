//! Cosmology inputs for the BAO models.
//!
//! The models only depend on two contracts:
//!
//! - [`CosmologySupplier`]: a fixed wavenumber grid plus, for each `Ω_m`, the
//!   linear power spectrum, its no-wiggle counterpart and the wiggle ratio
//! - [`PtSupplier`]: perturbation-theory damping variances and mode-coupling
//!   coefficients for each `Ω_m`
//!
//! Both are deterministic functions of `Ω_m` and memoize their results, since
//! they are far more expensive than a model evaluation. [`EisensteinHu`] and
//! [`LptGenerator`] are the implementations shipped with the crate.

pub mod eisenstein_hu;
pub mod pt;

pub use eisenstein_hu::*;
pub use pt::*;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Fixed cosmology and wavenumber grid. `Ω_m` is the only free input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CosmologyConfig {
    /// Dimensionless Hubble parameter.
    pub h0: f64,
    /// Baryon density parameter.
    pub ob: f64,
    /// Scalar spectral index.
    pub ns: f64,
    /// Amplitude of fluctuations at z = 0 in 8 Mpc/h spheres.
    pub sigma8: f64,
    /// Effective redshift of the sample.
    pub redshift: f64,
    /// CMB temperature in Kelvin.
    pub t_cmb: f64,
    /// Wavenumber grid, h/Mpc.
    pub k_min: f64,
    pub k_max: f64,
    pub k_num: usize,
    /// Number of `Ω_m` values whose spectra are memoized.
    pub cache_size: usize,
}

impl Default for CosmologyConfig {
    fn default() -> Self {
        Self {
            h0: 0.6751,
            ob: 0.0491,
            ns: 0.9653,
            sigma8: 0.8150,
            redshift: 0.61,
            t_cmb: 2.7255,
            k_min: 1e-4,
            k_max: 5.0,
            k_num: 2000,
            cache_size: 64,
        }
    }
}

/// Spectra for one value of `Ω_m`, aligned with the supplier's grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CosmologyData {
    pub om: f64,
    /// Linear power spectrum, (Mpc/h)^3.
    pub pk_lin: Vec<f64>,
    /// No-wiggle ("smooth") linear power spectrum.
    pub pk_smooth_lin: Vec<f64>,
    /// Fractional wiggle content `(pk_lin - pk_smooth_lin) / pk_smooth_lin`.
    pub pk_ratio: Vec<f64>,
}

/// Source of linear power spectra on a fixed wavenumber grid.
pub trait CosmologySupplier: Send {
    /// The wavenumber grid shared by every spectrum this supplier returns.
    fn ks(&self) -> Arc<[f64]>;

    /// Spectra for `om`. Implementations memoize on `om` rounded to five decimals.
    fn get_data(&mut self, om: f64) -> Result<Arc<CosmologyData>, AppError>;
}
