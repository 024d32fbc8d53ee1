//! Gaussian-damped quadrature.
//!
//! At construction the input grid is resampled onto `interpolate_detail × n`
//! log-spaced nodes and the per-node factor `k exp(-k²a²) / (2π²)` is stored.
//! Each call then only interpolates `P(k)` onto the fine grid and integrates
//!
//! ```text
//! ξ(s) = ∫ dk [k exp(-k²a²) / (2π²)] P(k) sin(ks) / s
//! ```
//!
//! with the trapezoidal rule, independently for every separation.
//!
//! Accuracy trade-off: a smaller `a` reduces the smoothing of ξ but needs more
//! nodes to resolve the undamped high-k oscillations. With the defaults
//! (`a = 0.25`, detail 2) on a 2000-point grid up to k = 5 h/Mpc the result
//! agrees with [`crate::transform::HankelTransform`] to ~0.1% of the peak
//! amplitude over 30 < s < 200 Mpc/h. Coarse input grids need a higher detail.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;
use crate::math::{interp_linear_sorted, log_space};
use crate::transform::{PowerToCorrelation, check_aligned};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussConfig {
    /// Resampling density multiplier.
    pub interpolate_detail: usize,
    /// Gaussian damping width, Mpc/h.
    pub a: f64,
}

impl Default for GaussConfig {
    fn default() -> Self {
        Self {
            interpolate_detail: 2,
            a: 0.25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GaussTransform {
    config: GaussConfig,
    ks2: Vec<f64>,
    precomp: Vec<f64>,
}

impl GaussTransform {
    pub fn new(ks: &[f64], config: GaussConfig) -> Result<Self, AppError> {
        if ks.len() < 2 {
            return Err(AppError::config("Transform needs at least 2 wavenumbers."));
        }
        if config.interpolate_detail == 0 || !(config.a.is_finite() && config.a >= 0.0) {
            return Err(AppError::config(format!(
                "Invalid Gaussian transform settings: detail={}, a={}.",
                config.interpolate_detail, config.a
            )));
        }
        let k_min = ks.iter().copied().fold(f64::INFINITY, f64::min);
        let k_max = ks.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let ks2 = log_space(k_min, k_max, config.interpolate_detail * ks.len())?;
        let a2 = config.a * config.a;
        let precomp = ks2
            .iter()
            .map(|k| k * (-k * k * a2).exp() / (2.0 * PI * PI))
            .collect();

        debug!(
            nodes = ks2.len(),
            a = config.a,
            "built Gaussian-damped transform"
        );
        Ok(Self {
            config,
            ks2,
            precomp,
        })
    }

    pub fn config(&self) -> GaussConfig {
        self.config
    }
}

impl PowerToCorrelation for GaussTransform {
    fn transform(&self, ks: &[f64], pk: &[f64], ss: &[f64]) -> Result<Vec<f64>, AppError> {
        check_aligned(ks, pk)?;
        let pk2 = interp_linear_sorted(ks, pk, &self.ks2);
        let weighted: Vec<f64> = self.precomp.iter().zip(&pk2).map(|(w, p)| w * p).collect();

        let xi = ss
            .iter()
            .map(|&s| {
                let mut total = 0.0;
                let mut prev = weighted[0] * (self.ks2[0] * s).sin();
                for i in 1..self.ks2.len() {
                    let cur = weighted[i] * (self.ks2[i] * s).sin();
                    total += 0.5 * (prev + cur) * (self.ks2[i] - self.ks2[i - 1]);
                    prev = cur;
                }
                total / s
            })
            .collect();
        Ok(xi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lorentzian(ks: &[f64], amplitude: f64) -> Vec<f64> {
        ks.iter().map(|k| amplitude / (1.0 + k * k)).collect()
    }

    #[test]
    fn resampled_grid_spans_input() {
        let ks = log_space(1e-3, 2.0, 50).unwrap();
        let t = GaussTransform::new(&ks, GaussConfig::default()).unwrap();
        assert_eq!(t.ks2.len(), 100);
        assert_eq!(t.ks2[0], 1e-3);
        assert_eq!(*t.ks2.last().unwrap(), 2.0);
        assert_eq!(t.precomp.len(), t.ks2.len());
    }

    #[test]
    fn repeated_calls_are_identical() {
        let ks = log_space(1e-4, 1.0, 200).unwrap();
        let pk = lorentzian(&ks, 2000.0);
        let t = GaussTransform::new(&ks, GaussConfig::default()).unwrap();
        let ss = [20.0, 50.0, 100.0, 150.0];
        let a = t.transform(&ks, &pk, &ss).unwrap();
        let b = t.transform(&ks, &pk, &ss).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn lorentzian_transform_decays_within_zero_separation_bound() {
        let amplitude = 2000.0;
        let ks = log_space(1e-4, 1.0, 200).unwrap();
        let pk = lorentzian(&ks, amplitude);
        let t = GaussTransform::new(&ks, GaussConfig::default()).unwrap();
        let xi = t.transform(&ks, &pk, &[50.0, 100.0, 150.0]).unwrap();

        let bound = amplitude / (2.0 * PI);
        assert!(xi.iter().all(|v| v.is_finite() && v.abs() < bound));
        assert!(xi[0].abs() > xi[1].abs());
        assert!(xi[1].abs() > xi[2].abs());
    }

    #[test]
    fn linear_in_power_spectrum() {
        let ks = log_space(1e-3, 1.0, 100).unwrap();
        let pk = lorentzian(&ks, 1.0);
        let pk3: Vec<f64> = pk.iter().map(|p| 3.0 * p).collect();
        let t = GaussTransform::new(&ks, GaussConfig::default()).unwrap();
        let ss = [10.0, 40.0];
        let a = t.transform(&ks, &pk, &ss).unwrap();
        let b = t.transform(&ks, &pk3, &ss).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((3.0 * x - y).abs() < 1e-12 * y.abs().max(1.0));
        }
    }

    #[test]
    fn rejects_misaligned_spectrum() {
        let ks = log_space(1e-3, 1.0, 10).unwrap();
        let t = GaussTransform::new(&ks, GaussConfig::default()).unwrap();
        let err = t.transform(&ks, &[1.0; 9], &[10.0]).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn rejects_zero_detail() {
        let ks = log_space(1e-3, 1.0, 10).unwrap();
        let config = GaussConfig {
            interpolate_detail: 0,
            a: 0.25,
        };
        assert!(GaussTransform::new(&ks, config).is_err());
    }
}
