//! Linear power spectra from the Eisenstein & Hu (1998) fitting formulae.
//!
//! The full transfer function (cold dark matter + baryons, with acoustic
//! oscillations) gives the linear spectrum; the zero-baryon "no-wiggle" fit with
//! the same sound horizon gives the smooth spectrum the BAO models use as their
//! baseline. Both share one amplitude, normalized to `σ8` at z = 0 and scaled to
//! the configured redshift with the Carroll, Press & Turner growth factor.
//!
//! Wavenumbers are in h/Mpc everywhere outside this module's internals.

use std::f64::consts::{E, PI};
use std::sync::Arc;

use tracing::debug;

use crate::cache::{LruCache, quantize, round_key};
use crate::cosmology::{CosmologyConfig, CosmologyData, CosmologySupplier};
use crate::error::AppError;
use crate::math::{log_space, trapezoid};

/// Integration range (h/Mpc) and resolution for the σ8 normalization.
const SIGMA8_K_MIN: f64 = 1e-5;
const SIGMA8_K_MAX: f64 = 1e2;
const SIGMA8_STEPS: usize = 4000;

/// Eisenstein & Hu linear power spectrum supplier with a bounded memo cache.
#[derive(Debug)]
pub struct EisensteinHu {
    config: CosmologyConfig,
    ks: Arc<[f64]>,
    cache: LruCache<i64, Arc<CosmologyData>>,
}

impl EisensteinHu {
    pub fn new(config: CosmologyConfig) -> Result<Self, AppError> {
        let c = &config;
        if !(c.h0.is_finite() && c.h0 > 0.0) {
            return Err(AppError::config(format!("Invalid h0: {}.", c.h0)));
        }
        if !(c.ob.is_finite() && c.ob > 0.0) {
            return Err(AppError::config(format!("Invalid baryon density: {}.", c.ob)));
        }
        if !(c.sigma8.is_finite() && c.sigma8 > 0.0) {
            return Err(AppError::config(format!("Invalid sigma8: {}.", c.sigma8)));
        }
        if !(c.redshift.is_finite() && c.redshift >= 0.0) {
            return Err(AppError::config(format!("Invalid redshift: {}.", c.redshift)));
        }
        if !(c.ns.is_finite() && c.t_cmb.is_finite() && c.t_cmb > 0.0) {
            return Err(AppError::config("Invalid spectral index or CMB temperature."));
        }

        let ks: Arc<[f64]> = log_space(c.k_min, c.k_max, c.k_num)?.into();
        debug!(
            k_min = c.k_min,
            k_max = c.k_max,
            k_num = c.k_num,
            redshift = c.redshift,
            "built Eisenstein-Hu supplier"
        );

        let cache = LruCache::new(config.cache_size);
        Ok(Self { config, ks, cache })
    }

    pub fn config(&self) -> &CosmologyConfig {
        &self.config
    }
}

impl CosmologySupplier for EisensteinHu {
    fn ks(&self) -> Arc<[f64]> {
        Arc::clone(&self.ks)
    }

    fn get_data(&mut self, om: f64) -> Result<Arc<CosmologyData>, AppError> {
        let om = round_key(om);
        let config = &self.config;
        let ks = &self.ks;
        let data = self
            .cache
            .get_or_try_insert_with(quantize(om), || compute_spectra(config, ks, om).map(Arc::new))?;
        Ok(Arc::clone(data))
    }
}

fn compute_spectra(c: &CosmologyConfig, ks: &[f64], om: f64) -> Result<CosmologyData, AppError> {
    if !(om.is_finite() && om > c.ob && om < 1.0) {
        return Err(AppError::config(format!(
            "Omega_m must lie in ({}, 1), got {om}.",
            c.ob
        )));
    }
    debug!(om, "computing Eisenstein-Hu spectra");

    let tf = Transfer::new(om, c.ob, c.h0, c.t_cmb);
    let amplitude = sigma8_amplitude(&tf, c.ns, c.sigma8)?;
    let d = growth_factor(om, c.redshift);
    let norm = amplitude * d * d;

    let n = ks.len();
    let mut pk_lin = Vec::with_capacity(n);
    let mut pk_smooth_lin = Vec::with_capacity(n);
    let mut pk_ratio = Vec::with_capacity(n);
    for &k in ks {
        let prim = norm * k.powf(c.ns);
        let t = tf.wiggle(k);
        let t_nw = tf.no_wiggle(k);
        let p = prim * t * t;
        let p_nw = prim * t_nw * t_nw;
        pk_lin.push(p);
        pk_smooth_lin.push(p_nw);
        pk_ratio.push((p - p_nw) / p_nw);
    }

    if pk_ratio.iter().any(|v| !v.is_finite()) {
        return Err(AppError::numerical(format!(
            "Non-finite power spectrum for Omega_m={om}."
        )));
    }

    Ok(CosmologyData {
        om,
        pk_lin,
        pk_smooth_lin,
        pk_ratio,
    })
}

/// `Ω_m(z)` in a flat ΛCDM universe.
pub fn omega_m_z(om: f64, z: f64) -> f64 {
    let a3 = (1.0 + z).powi(3);
    om * a3 / (om * a3 + 1.0 - om)
}

/// Linear growth factor normalized to `D(0) = 1` (Carroll, Press & Turner 1992).
pub fn growth_factor(om: f64, z: f64) -> f64 {
    let g = |zz: f64| {
        let omz = omega_m_z(om, zz);
        let olz = 1.0 - omz;
        2.5 * omz / (omz.powf(4.0 / 7.0) - olz + (1.0 + omz / 2.0) * (1.0 + olz / 70.0))
    };
    g(z) / (g(0.0) * (1.0 + z))
}

/// Primordial amplitude such that the z = 0 spectrum has the requested `σ8`.
fn sigma8_amplitude(tf: &Transfer, ns: f64, sigma8: f64) -> Result<f64, AppError> {
    let ks = log_space(SIGMA8_K_MIN, SIGMA8_K_MAX, SIGMA8_STEPS)?;
    let ln_k: Vec<f64> = ks.iter().map(|k| k.ln()).collect();
    let integrand: Vec<f64> = ks
        .iter()
        .map(|&k| {
            let t = tf.wiggle(k);
            let w = top_hat_window(8.0 * k);
            k.powi(3) * k.powf(ns) * t * t * w * w / (2.0 * PI * PI)
        })
        .collect();
    let sigma2 = trapezoid(&integrand, &ln_k);
    if !(sigma2.is_finite() && sigma2 > 0.0) {
        return Err(AppError::numerical("Failed to normalize power spectrum to sigma8."));
    }
    Ok(sigma8 * sigma8 / sigma2)
}

fn top_hat_window(x: f64) -> f64 {
    if x < 1e-3 {
        1.0 - x * x / 10.0
    } else {
        3.0 * (x.sin() - x * x.cos()) / (x * x * x)
    }
}

/// Derived Eisenstein & Hu quantities for one cosmology (lengths in Mpc).
#[derive(Debug, Clone)]
struct Transfer {
    h: f64,
    om: f64,
    theta: f64,
    f_b: f64,
    f_c: f64,
    k_eq: f64,
    sound_horizon: f64,
    k_silk: f64,
    alpha_c: f64,
    beta_c: f64,
    alpha_b: f64,
    beta_b: f64,
    beta_node: f64,
    alpha_gamma: f64,
    sound_horizon_fit: f64,
}

impl Transfer {
    fn new(om: f64, ob: f64, h: f64, t_cmb: f64) -> Self {
        let theta = t_cmb / 2.7;
        let omh2 = om * h * h;
        let obh2 = ob * h * h;
        let f_b = ob / om;
        let f_c = (om - ob) / om;

        let z_eq = 2.5e4 * omh2 * theta.powi(-4);
        let k_eq = 7.46e-2 * omh2 * theta.powi(-2);

        let b1 = 0.313 * omh2.powf(-0.419) * (1.0 + 0.607 * omh2.powf(0.674));
        let b2 = 0.238 * omh2.powf(0.223);
        let z_d = 1291.0 * omh2.powf(0.251) / (1.0 + 0.659 * omh2.powf(0.828))
            * (1.0 + b1 * obh2.powf(b2));

        let baryon_ratio = |z: f64| 31.5 * obh2 * theta.powi(-4) * (1e3 / z);
        let r_d = baryon_ratio(z_d);
        let r_eq = baryon_ratio(z_eq);

        let sound_horizon = 2.0 / (3.0 * k_eq)
            * (6.0 / r_eq).sqrt()
            * (((1.0 + r_d).sqrt() + (r_d + r_eq).sqrt()) / (1.0 + r_eq.sqrt())).ln();

        let k_silk =
            1.6 * obh2.powf(0.52) * omh2.powf(0.73) * (1.0 + (10.4 * omh2).powf(-0.95));

        let a1 = (46.9 * omh2).powf(0.670) * (1.0 + (32.1 * omh2).powf(-0.532));
        let a2 = (12.0 * omh2).powf(0.424) * (1.0 + (45.0 * omh2).powf(-0.582));
        let alpha_c = a1.powf(-f_b) * a2.powf(-f_b.powi(3));

        let bb1 = 0.944 / (1.0 + (458.0 * omh2).powf(-0.708));
        let bb2 = (0.395 * omh2).powf(-0.0266);
        let beta_c = 1.0 / (1.0 + bb1 * (f_c.powf(bb2) - 1.0));

        let y = (1.0 + z_eq) / (1.0 + z_d);
        let sy = (1.0 + y).sqrt();
        let g = y * (-6.0 * sy + (2.0 + 3.0 * y) * ((sy + 1.0) / (sy - 1.0)).ln());
        let alpha_b = 2.07 * k_eq * sound_horizon * (1.0 + r_d).powf(-0.75) * g;

        let beta_node = 8.41 * omh2.powf(0.435);
        let beta_b = 0.5 + f_b + (3.0 - 2.0 * f_b) * ((17.2 * omh2).powi(2) + 1.0).sqrt();

        let alpha_gamma = 1.0 - 0.328 * (431.0 * omh2).ln() * f_b
            + 0.38 * (22.3 * omh2).ln() * f_b * f_b;
        let sound_horizon_fit =
            44.5 * (9.83 / omh2).ln() / (1.0 + 10.0 * obh2.powf(0.75)).sqrt();

        Self {
            h,
            om,
            theta,
            f_b,
            f_c,
            k_eq,
            sound_horizon,
            k_silk,
            alpha_c,
            beta_c,
            alpha_b,
            beta_b,
            beta_node,
            alpha_gamma,
            sound_horizon_fit,
        }
    }

    fn t0_tilde(&self, q: f64, alpha: f64, beta: f64) -> f64 {
        let l = (E + 1.8 * beta * q).ln();
        let c = 14.2 / alpha + 386.0 / (1.0 + 69.9 * q.powf(1.08));
        l / (l + c * q * q)
    }

    /// Full transfer function at `k_h` (h/Mpc).
    fn wiggle(&self, k_h: f64) -> f64 {
        let k = k_h * self.h;
        let s = self.sound_horizon;
        let q = k / (13.41 * self.k_eq);

        let f = 1.0 / (1.0 + (k * s / 5.4).powi(4));
        let t_c = f * self.t0_tilde(q, 1.0, self.beta_c)
            + (1.0 - f) * self.t0_tilde(q, self.alpha_c, self.beta_c);

        let ks = k * s;
        let s_tilde = s / (1.0 + (self.beta_node / ks).powi(3)).cbrt();
        let x = k * s_tilde;
        let j0 = if x.abs() < 1e-8 { 1.0 } else { x.sin() / x };
        let t_b = (self.t0_tilde(q, 1.0, 1.0) / (1.0 + (ks / 5.2).powi(2))
            + self.alpha_b / (1.0 + (self.beta_b / ks).powi(3)) * (-(k / self.k_silk).powf(1.4)).exp())
            * j0;

        self.f_b * t_b + self.f_c * t_c
    }

    /// Zero-baryon ("no-wiggle") transfer function at `k_h` (h/Mpc).
    fn no_wiggle(&self, k_h: f64) -> f64 {
        let k = k_h * self.h;
        let gamma_eff = self.om
            * self.h
            * (self.alpha_gamma
                + (1.0 - self.alpha_gamma) / (1.0 + (0.43 * k * self.sound_horizon_fit).powi(4)));
        let q = k_h * self.theta * self.theta / gamma_eff;
        let l0 = (2.0 * E + 1.8 * q).ln();
        let c0 = 14.2 + 731.0 / (1.0 + 62.5 * q);
        l0 / (l0 + c0 * q * q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> CosmologyConfig {
        CosmologyConfig {
            k_num: 400,
            ..CosmologyConfig::default()
        }
    }

    #[test]
    fn growth_factor_is_normalized_and_decreasing() {
        assert!((growth_factor(0.31, 0.0) - 1.0).abs() < 1e-12);
        let d1 = growth_factor(0.31, 0.5);
        let d2 = growth_factor(0.31, 1.0);
        assert!(d1 < 1.0 && d2 < d1 && d2 > 0.0);
    }

    #[test]
    fn transfer_functions_tend_to_one_on_large_scales() {
        let tf = Transfer::new(0.31, 0.0491, 0.6751, 2.7255);
        assert!((tf.wiggle(1e-5) - 1.0).abs() < 1e-2);
        assert!((tf.no_wiggle(1e-5) - 1.0).abs() < 1e-2);
        assert!(tf.wiggle(1.0) < 0.01);
    }

    #[test]
    fn spectra_are_positive_with_small_wiggles() {
        let mut supplier = EisensteinHu::new(small_config()).unwrap();
        let data = supplier.get_data(0.31).unwrap();
        let ks = supplier.ks();
        assert_eq!(data.pk_lin.len(), ks.len());
        assert!(data.pk_lin.iter().all(|p| *p > 0.0 && p.is_finite()));
        assert!(data.pk_smooth_lin.iter().all(|p| *p > 0.0));

        // Wiggles live around the BAO scale and stay at the few-percent level.
        let max_ratio = data.pk_ratio.iter().fold(0.0f64, |m, r| m.max(r.abs()));
        assert!(max_ratio > 0.01 && max_ratio < 0.2, "max ratio {max_ratio}");

        // Spectrum peaks at k of order 0.02 h/Mpc.
        let (i_peak, _) = data
            .pk_lin
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |acc, (i, p)| if *p > acc.1 { (i, *p) } else { acc });
        assert!(ks[i_peak] > 0.005 && ks[i_peak] < 0.05);
    }

    #[test]
    fn sigma8_normalization_is_applied_at_z0() {
        let config = CosmologyConfig {
            redshift: 0.0,
            ..small_config()
        };
        let tf = Transfer::new(0.31, config.ob, config.h0, config.t_cmb);
        let amp = sigma8_amplitude(&tf, config.ns, 0.8).unwrap();
        let amp2 = sigma8_amplitude(&tf, config.ns, 1.6).unwrap();
        assert!((amp2 / amp - 4.0).abs() < 1e-10);
    }

    #[test]
    fn results_are_cached_on_rounded_omega_m() {
        let mut supplier = EisensteinHu::new(small_config()).unwrap();
        let a = supplier.get_data(0.310_000_1).unwrap();
        let b = supplier.get_data(0.309_999_9).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.om, 0.31);
    }

    #[test]
    fn rejects_unphysical_omega_m() {
        let mut supplier = EisensteinHu::new(small_config()).unwrap();
        assert!(supplier.get_data(0.01).is_err());
        assert!(supplier.get_data(1.2).is_err());
    }
}
