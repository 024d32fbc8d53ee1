//! Perturbation-theory inputs for the Seo et al. (2016) propagators.
//!
//! For each `Ω_m` we need:
//!
//! - displacement variances (all `∫ dk ... / 6π²` over the no-wiggle spectrum)
//!   - `sigma`: unreconstructed field
//!   - `sigma_dd`: density field after reconstruction, weighted by `(1 - S)²`
//!   - `sigma_ss`: shifted field, weighted by `S²`
//!   with `S(k) = exp(-k² R² / 2)` the Gaussian reconstruction kernel
//! - the one-loop mode-coupling functions `R1(k)`, `R2(k)` of Matsubara (2008):
//!
//! ```text
//! R_n(k) = k³/(4π²) ∫ dr P(kr) R̃_n(r)
//!        = k²/(4π²) ∫ d(ln q) q P(q) R̃_n(q/k)
//! ```
//!
//! The second form integrates directly over the tabulated spectrum, so no
//! resampling of `P(k)` is needed.

use std::f64::consts::PI;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{LruCache, quantize, round_key};
use crate::cosmology::CosmologySupplier;
use crate::error::AppError;
use crate::math::{simpson, trapezoid};

/// Default Gaussian smoothing scale of the reconstruction, Mpc/h.
pub const DEFAULT_SMOOTHING_SCALE: f64 = 15.0;

/// Perturbation-theory quantities for one `Ω_m`, aligned with the cosmology grid.
#[derive(Debug, Clone, PartialEq)]
pub struct PtData {
    pub om: f64,
    pub sigma: f64,
    pub sigma_dd: f64,
    pub sigma_ss: f64,
    pub r1: Vec<f64>,
    pub r2: Vec<f64>,
}

/// Source of perturbation-theory tables.
pub trait PtSupplier: Send {
    fn get_data(&mut self, om: f64) -> Result<Arc<PtData>, AppError>;
}

/// Computes [`PtData`] from the no-wiggle spectrum of a cosmology supplier.
pub struct LptGenerator {
    cosmology: Box<dyn CosmologySupplier>,
    smoothing_scale: f64,
    cache: LruCache<i64, Arc<PtData>>,
}

impl LptGenerator {
    pub fn new(
        cosmology: Box<dyn CosmologySupplier>,
        smoothing_scale: f64,
        cache_size: usize,
    ) -> Result<Self, AppError> {
        if !(smoothing_scale.is_finite() && smoothing_scale > 0.0) {
            return Err(AppError::config(format!(
                "Invalid reconstruction smoothing scale: {smoothing_scale}."
            )));
        }
        Ok(Self {
            cosmology,
            smoothing_scale,
            cache: LruCache::new(cache_size),
        })
    }

    pub fn smoothing_scale(&self) -> f64 {
        self.smoothing_scale
    }
}

impl PtSupplier for LptGenerator {
    fn get_data(&mut self, om: f64) -> Result<Arc<PtData>, AppError> {
        let om = round_key(om);
        let cosmology = &mut self.cosmology;
        let smoothing_scale = self.smoothing_scale;
        let data = self.cache.get_or_try_insert_with(quantize(om), || {
            let ks = cosmology.ks();
            let spectra = cosmology.get_data(om)?;
            debug!(om, smoothing_scale, "computing perturbation-theory table");
            Ok::<_, AppError>(Arc::new(compute_pt(
                om,
                &ks,
                &spectra.pk_smooth_lin,
                smoothing_scale,
            )))
        })?;
        Ok(Arc::clone(data))
    }
}

fn compute_pt(om: f64, ks: &[f64], pk: &[f64], smoothing_scale: f64) -> PtData {
    let norm = 6.0 * PI * PI;
    let kernel: Vec<f64> = ks
        .iter()
        .map(|k| (-k * k * smoothing_scale * smoothing_scale / 2.0).exp())
        .collect();

    let sigma = simpson(pk, ks) / norm;
    let dd: Vec<f64> = pk
        .iter()
        .zip(&kernel)
        .map(|(p, s)| p * (1.0 - s) * (1.0 - s))
        .collect();
    let ss: Vec<f64> = pk.iter().zip(&kernel).map(|(p, s)| p * s * s).collect();
    let sigma_dd = simpson(&dd, ks) / norm;
    let sigma_ss = simpson(&ss, ks) / norm;

    let ln_q: Vec<f64> = ks.iter().map(|q| q.ln()).collect();
    let qp: Vec<f64> = ks.iter().zip(pk).map(|(q, p)| q * p).collect();
    let mut r1 = Vec::with_capacity(ks.len());
    let mut r2 = Vec::with_capacity(ks.len());
    let mut buf1 = vec![0.0; ks.len()];
    let mut buf2 = vec![0.0; ks.len()];
    for &k in ks {
        for (j, &q) in ks.iter().enumerate() {
            let (a, b) = matsubara_kernels(q / k);
            buf1[j] = qp[j] * a;
            buf2[j] = qp[j] * b;
        }
        let pre = k * k / (4.0 * PI * PI);
        r1.push(pre * trapezoid(&buf1, &ln_q));
        r2.push(pre * trapezoid(&buf2, &ln_q));
    }

    PtData {
        om,
        sigma,
        sigma_dd,
        sigma_ss,
        r1,
        r2,
    }
}

/// The kernels `(R̃1(r), R̃2(r))`.
///
/// The closed forms cancel catastrophically for small and large `r`, where we
/// switch to their series expansions. At `r = 1` the logarithm is singular but
/// multiplied by a vanishing factor.
pub fn matsubara_kernels(r: f64) -> (f64, f64) {
    if r < 0.1 {
        let r2 = r * r;
        let r1_val = r2 * (16.0 / 15.0 + r2 * (-16.0 / 35.0 + r2 * 16.0 / 315.0));
        let r2_val = r2 * (4.0 / 15.0 + r2 * (-12.0 / 35.0 + r2 * 4.0 / 63.0));
        return (r1_val, r2_val);
    }
    if r > 10.0 {
        let x2 = 1.0 / (r * r);
        let r1_val = 16.0 / 15.0 + x2 * (-16.0 / 35.0 + x2 * (16.0 / 315.0 + x2 * 16.0 / 3465.0));
        let r2_val = -4.0 / 15.0 + x2 * (12.0 / 35.0 + x2 * (-4.0 / 63.0 - x2 * 4.0 / 495.0));
        return (r1_val, r2_val);
    }
    if (r - 1.0).abs() < 1e-12 {
        return (2.0 / 3.0, 0.0);
    }

    let r2 = r * r;
    let log = ((1.0 + r) / (1.0 - r)).abs().ln();
    let d = r2 - 1.0;
    let r1_val = -(1.0 + r2) * (3.0 - 14.0 * r2 + 3.0 * r2 * r2) / (24.0 * r2)
        + d.powi(4) * log / (16.0 * r2 * r);
    let r2_val = (1.0 - r2) * (3.0 - 2.0 * r2 + 3.0 * r2 * r2) / (24.0 * r2)
        + d.powi(3) * (1.0 + r2) * log / (16.0 * r2 * r);
    (r1_val, r2_val)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosmology::{CosmologyConfig, EisensteinHu};

    #[test]
    fn kernels_match_reference_values() {
        // Reference values from 40-digit evaluations of the closed forms.
        let cases = [
            (0.05, 0.002_663_810_317_640_797, 0.000_664_524_801_903_192_6),
            (0.3, 0.092_334_480_877_954_71, 0.021_269_687_739_592_7),
            (0.9, 0.593_578_825_644_893_7, 0.029_591_187_277_592_1),
            (1.1, 0.726_876_415_806_510, -0.033_030_735_242_598_5),
            (3.0, 1.016_506_600_864_67, -0.229_366_748_919_167),
            (20.0, 1.065_524_127_056_32, -0.265_809_920_761_277),
        ];
        for (r, want1, want2) in cases {
            let (a, b) = matsubara_kernels(r);
            assert!((a - want1).abs() < 1e-9, "R1({r}) = {a}, want {want1}");
            assert!((b - want2).abs() < 1e-9, "R2({r}) = {b}, want {want2}");
        }
    }

    #[test]
    fn kernels_are_continuous_across_branches() {
        for &edge in &[0.1, 1.0, 10.0] {
            let lo = matsubara_kernels(edge * (1.0 - 1e-7));
            let hi = matsubara_kernels(edge * (1.0 + 1e-7));
            assert!((lo.0 - hi.0).abs() < 1e-5, "R1 jump at {edge}");
            assert!((lo.1 - hi.1).abs() < 1e-5, "R2 jump at {edge}");
        }
    }

    #[test]
    fn generator_produces_ordered_variances() {
        let config = CosmologyConfig {
            k_num: 300,
            ..CosmologyConfig::default()
        };
        let cosmology = EisensteinHu::new(config).unwrap();
        let n = cosmology.ks().len();
        let mut pt = LptGenerator::new(Box::new(cosmology), DEFAULT_SMOOTHING_SCALE, 4).unwrap();
        let data = pt.get_data(0.31).unwrap();

        assert!(data.sigma > 0.0);
        assert!(data.sigma_dd > 0.0 && data.sigma_dd < data.sigma);
        assert!(data.sigma_ss > 0.0 && data.sigma_ss < data.sigma);
        assert_eq!(data.r1.len(), n);
        assert_eq!(data.r2.len(), n);
        assert!(data.r1.iter().chain(&data.r2).all(|v| v.is_finite()));

        let again = pt.get_data(0.310_000_2).unwrap();
        assert!(Arc::ptr_eq(&data, &again));
    }

    #[test]
    fn rejects_non_positive_smoothing_scale() {
        let cosmology = EisensteinHu::new(CosmologyConfig {
            k_num: 50,
            ..CosmologyConfig::default()
        })
        .unwrap();
        assert!(LptGenerator::new(Box::new(cosmology), 0.0, 4).is_err());
    }
}
