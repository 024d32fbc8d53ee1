//! In-memory datasets.

use clap::ValueEnum;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;

/// What the abscissae of a dataset measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    /// Correlation function at pair separations `s` (Mpc/h).
    Correlation,
    /// Power spectrum at wavenumbers `k` (h/Mpc).
    Power,
}

impl DataKind {
    pub fn display_name(self) -> &'static str {
        match self {
            DataKind::Correlation => "xi(s)",
            DataKind::Power => "P(k)",
        }
    }
}

/// A measured clustering statistic with its covariance.
///
/// Validated once here so the models and likelihood can index freely:
/// abscissae are finite, positive and strictly increasing, all arrays are
/// aligned, and the covariance is symmetric positive definite.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    kind: DataKind,
    x: Vec<f64>,
    data: Vec<f64>,
    cov: DMatrix<f64>,
    chol_l: DMatrix<f64>,
    icov: DMatrix<f64>,
    num_mocks: Option<usize>,
    recon: bool,
    smoothing_scale: Option<f64>,
}

impl Dataset {
    pub fn new(
        name: impl Into<String>,
        kind: DataKind,
        x: Vec<f64>,
        data: Vec<f64>,
        cov: DMatrix<f64>,
    ) -> Result<Self, AppError> {
        let name = name.into();
        let n = x.len();
        if n == 0 {
            return Err(AppError::data(format!("Dataset '{name}' is empty.")));
        }
        if data.len() != n || cov.nrows() != n || cov.ncols() != n {
            return Err(AppError::data(format!(
                "Dataset '{name}' has mismatched shapes: {n} abscissae, {} values, {}x{} covariance.",
                data.len(),
                cov.nrows(),
                cov.ncols()
            )));
        }
        if x.iter().any(|v| !(v.is_finite() && *v > 0.0)) || x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AppError::data(format!(
                "Dataset '{name}' abscissae must be finite, positive and strictly increasing."
            )));
        }
        if data.iter().chain(cov.iter()).any(|v| !v.is_finite()) {
            return Err(AppError::data(format!(
                "Dataset '{name}' contains non-finite values."
            )));
        }
        let asym = (&cov - cov.transpose()).amax();
        if asym > 1e-10 * cov.amax().max(f64::MIN_POSITIVE) {
            return Err(AppError::data(format!(
                "Dataset '{name}' covariance is not symmetric."
            )));
        }

        let chol = cov.clone().cholesky().ok_or_else(|| {
            AppError::data(format!(
                "Dataset '{name}' covariance is not positive definite."
            ))
        })?;
        let chol_l = chol.l();
        let icov = chol.inverse();

        debug!(name = %name, kind = kind.display_name(), points = n, "built dataset");
        Ok(Self {
            name,
            kind,
            x,
            data,
            cov,
            chol_l,
            icov,
            num_mocks: None,
            recon: false,
            smoothing_scale: None,
        })
    }

    /// Number of mock realisations the covariance was estimated from.
    pub fn with_num_mocks(mut self, num_mocks: usize) -> Self {
        self.num_mocks = Some(num_mocks);
        self
    }

    /// Mark the measurement as post-reconstruction, optionally recording the
    /// Gaussian smoothing scale used by the reconstruction.
    pub fn with_reconstruction(mut self, smoothing_scale: Option<f64>) -> Self {
        self.recon = true;
        self.smoothing_scale = smoothing_scale;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DataKind {
        self.kind
    }

    /// Separations or wavenumbers, depending on [`Dataset::kind`].
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn cov(&self) -> &DMatrix<f64> {
        &self.cov
    }

    /// Lower Cholesky factor `L` of the covariance, `C = L Lᵀ`.
    pub fn chol_l(&self) -> &DMatrix<f64> {
        &self.chol_l
    }

    pub fn icov(&self) -> &DMatrix<f64> {
        &self.icov
    }

    pub fn num_mocks(&self) -> Option<usize> {
        self.num_mocks
    }

    pub fn is_reconstructed(&self) -> bool {
        self.recon
    }

    pub fn smoothing_scale(&self) -> Option<f64> {
        self.smoothing_scale
    }
}
