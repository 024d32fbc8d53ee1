//! Seeded synthetic datasets.
//!
//! A mock is a model prediction plus one draw of correlated Gaussian noise:
//!
//! ```text
//! C_ij = σ_i σ_j exp(-|x_i - x_j| / ℓ)
//! y    = m + L z,   z ~ N(0, 1),   C = L Lᵀ
//! ```
//!
//! The exponential correlation keeps `C` positive definite for any grid and
//! any `ℓ ≥ 0` (`ℓ = 0` is uncorrelated noise).

use nalgebra::{DMatrix, DVector};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::{DataKind, Dataset};
use crate::error::AppError;

/// Covariance of per-point errors `sigma` at abscissae `x` with correlation
/// length `corr_length` (same units as `x`).
pub fn exponential_covariance(
    x: &[f64],
    sigma: &[f64],
    corr_length: f64,
) -> Result<DMatrix<f64>, AppError> {
    if x.len() != sigma.len() {
        return Err(AppError::data(format!(
            "Mock has {} abscissae but {} error bars.",
            x.len(),
            sigma.len()
        )));
    }
    if !(corr_length.is_finite() && corr_length >= 0.0) {
        return Err(AppError::config(format!(
            "Invalid correlation length: {corr_length}."
        )));
    }
    if sigma.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
        return Err(AppError::config("Mock error bars must be finite and > 0."));
    }

    let n = x.len();
    Ok(DMatrix::from_fn(n, n, |i, j| {
        let rho = if i == j {
            1.0
        } else if corr_length == 0.0 {
            0.0
        } else {
            (-(x[i] - x[j]).abs() / corr_length).exp()
        };
        rho * sigma[i] * sigma[j]
    }))
}

/// Draw `mean + L z` for the Cholesky factor `chol_l` of the noise covariance.
pub fn draw_correlated(mean: &[f64], chol_l: &DMatrix<f64>, seed: u64) -> Result<Vec<f64>, AppError> {
    let n = mean.len();
    if chol_l.nrows() != n || chol_l.ncols() != n {
        return Err(AppError::data(format!(
            "Noise factor is {}x{} for {n} points.",
            chol_l.nrows(),
            chol_l.ncols()
        )));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::numerical(format!("Noise distribution error: {e}")))?;
    let z = DVector::from_fn(n, |_, _| normal.sample(&mut rng));
    let noise = chol_l * z;
    Ok(mean.iter().zip(noise.iter()).map(|(m, e)| m + e).collect())
}

/// Everything needed to synthesise a dataset around a model prediction.
#[derive(Debug, Clone)]
pub struct MockSpec {
    pub name: String,
    pub kind: DataKind,
    pub x: Vec<f64>,
    pub mean: Vec<f64>,
    pub sigma: Vec<f64>,
    pub corr_length: f64,
    pub num_mocks: Option<usize>,
    pub recon: bool,
    pub smoothing_scale: Option<f64>,
    pub seed: u64,
}

/// Build a [`Dataset`] holding one noisy realisation of `spec.mean`.
pub fn generate_mock(spec: &MockSpec) -> Result<Dataset, AppError> {
    if spec.mean.len() != spec.x.len() {
        return Err(AppError::data(format!(
            "Mock mean has {} values for {} abscissae.",
            spec.mean.len(),
            spec.x.len()
        )));
    }
    let cov = exponential_covariance(&spec.x, &spec.sigma, spec.corr_length)?;
    let chol = cov
        .clone()
        .cholesky()
        .ok_or_else(|| AppError::numerical("Mock covariance is not positive definite."))?;
    let data = draw_correlated(&spec.mean, &chol.l(), spec.seed)?;

    let mut dataset = Dataset::new(spec.name.clone(), spec.kind, spec.x.clone(), data, cov)?;
    if let Some(n) = spec.num_mocks {
        dataset = dataset.with_num_mocks(n);
    }
    if spec.recon {
        dataset = dataset.with_reconstruction(spec.smoothing_scale);
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covariance_has_requested_variances_and_decay() {
        let x = [10.0, 20.0, 40.0];
        let c = exponential_covariance(&x, &[1.0, 2.0, 3.0], 10.0).unwrap();
        assert_eq!(c[(1, 1)], 4.0);
        assert!((c[(0, 1)] - 2.0 * (-1.0f64).exp()).abs() < 1e-12);
        assert!((c[(0, 2)] - 3.0 * (-3.0f64).exp()).abs() < 1e-12);
        assert_eq!(c[(0, 2)], c[(2, 0)]);
    }

    #[test]
    fn zero_correlation_length_is_diagonal() {
        let c = exponential_covariance(&[1.0, 2.0], &[1.0, 1.0], 0.0).unwrap();
        assert_eq!(c, DMatrix::identity(2, 2));
    }

    #[test]
    fn same_seed_same_mock() {
        let spec = MockSpec {
            name: "m".into(),
            kind: DataKind::Correlation,
            x: vec![50.0, 60.0, 70.0, 80.0],
            mean: vec![0.01, 0.005, 0.002, 0.001],
            sigma: vec![0.001; 4],
            corr_length: 15.0,
            num_mocks: Some(500),
            recon: false,
            smoothing_scale: None,
            seed: 7,
        };
        let a = generate_mock(&spec).unwrap();
        let b = generate_mock(&spec).unwrap();
        assert_eq!(a.data(), b.data());
        assert_eq!(a.num_mocks(), Some(500));

        let c = generate_mock(&MockSpec { seed: 8, ..spec }).unwrap();
        assert_ne!(a.data(), c.data());
    }

    #[test]
    fn noise_scale_matches_sigma() {
        let n = 1000;
        let mean = vec![0.0; n];
        let l = DMatrix::from_diagonal_element(n, n, 0.5);
        let y = draw_correlated(&mean, &l, 3).unwrap();
        let var = y.iter().map(|v| v * v).sum::<f64>() / n as f64;
        assert!((var.sqrt() - 0.5).abs() < 0.05);
    }
}
