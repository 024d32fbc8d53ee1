//! Gaussian log-likelihood with covariance-estimate corrections.
//!
//! With `χ² = rᵀ C⁻¹ r` for residual `r = data - model`:
//!
//! - `None`:      `-χ²/2`
//! - `Hartlap`:   `-χ²/2 · (n_mocks - n_data - 2)/(n_mocks - 1)` (Hartlap et al. 2007)
//! - `Sellentin`: `-(n_mocks/2) · ln(1 + χ²/(n_mocks - 1))` (Sellentin & Heavens 2016)
//!
//! The corrections account for `C` being estimated from a finite number of
//! mocks, so they need the dataset's mock count.

use clap::ValueEnum;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::data::Dataset;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Correction {
    None,
    Hartlap,
    #[default]
    Sellentin,
}

impl Correction {
    pub fn display_name(self) -> &'static str {
        match self {
            Correction::None => "none",
            Correction::Hartlap => "Hartlap",
            Correction::Sellentin => "Sellentin-Heavens",
        }
    }
}

/// `χ²` of `model` against the dataset. Assumes `model` is aligned with the data.
pub fn chi_squared(data: &Dataset, model: &[f64]) -> f64 {
    let r = DVector::from_iterator(
        data.len(),
        data.data().iter().zip(model).map(|(d, m)| d - m),
    );
    r.dot(&(data.icov() * &r))
}

/// Map a `χ²` to a log-likelihood under `correction`.
pub fn corrected_log_likelihood(
    chi2: f64,
    n_data: usize,
    num_mocks: Option<usize>,
    correction: Correction,
) -> Result<f64, AppError> {
    if correction == Correction::None {
        return Ok(-0.5 * chi2);
    }
    let n_mocks = num_mocks.ok_or_else(|| {
        AppError::data(format!(
            "The {} correction needs the number of mocks behind the covariance.",
            correction.display_name()
        ))
    })? as f64;
    if n_mocks <= 1.0 {
        return Err(AppError::data(format!(
            "Covariance from {n_mocks} mocks cannot be corrected."
        )));
    }

    Ok(match correction {
        Correction::None => -0.5 * chi2,
        Correction::Hartlap => {
            let factor = (n_mocks - n_data as f64 - 2.0) / (n_mocks - 1.0);
            -0.5 * chi2 * factor
        }
        Correction::Sellentin => -0.5 * n_mocks * (1.0 + chi2 / (n_mocks - 1.0)).ln(),
    })
}

/// Log-likelihood of `model` given `data`.
///
/// A non-finite prediction is a rejected proposal (`-∞`), not an error.
pub fn log_likelihood(data: &Dataset, model: &[f64], correction: Correction) -> Result<f64, AppError> {
    if model.len() != data.len() {
        return Err(AppError::numerical(format!(
            "Model has {} values for {} data points.",
            model.len(),
            data.len()
        )));
    }
    if model.iter().any(|v| !v.is_finite()) {
        return Ok(f64::NEG_INFINITY);
    }
    corrected_log_likelihood(chi_squared(data, model), data.len(), data.num_mocks(), correction)
}
