//! `ξ(s)` model with the LPT propagators of Seo et al. (2016).
//!
//! The anisotropic spectrum is built on a `μ × k` grid and collapsed to 1-D
//! with Simpson's rule over `μ ∈ [0, 1]`:
//!
//! ```text
//! fog(μ, k)  = 1 / (1 + μ²k²Σ_s²/2)²
//! P(μ, k)    = b² P_nw(k) fog(μ, k) (1 + R(k) G²(μ, k))
//! P_1d(k)    = ∫ dμ P(μ, k)
//! ξ(d)       = T[P_1d](α d) + a1/d² + a2/d + a3
//! ```
//!
//! Bias enters only through `P(μ, k)`; `ξ` is not multiplied by `b` again.
//!
//! The propagator `G` depends on reconstruction. With the Gaussian smoothing
//! kernel `S(k)` of the reconstruction:
//!
//! ```text
//! post: G = (1 + f/b μ² (1 - S)) D_dd + S/b (D_ss - D_dd)
//! pre:  G = (1 + 3/7 (R1 (1 - 4/(9b)) + R2)
//!            + μ² (f/b + 3/7 f R1 (2 - 1/(3b)) + 6/7 f R2)) D
//! ```
//!
//! where the `D` tables come from the model's [`DampingCache`].

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::round_key;
use crate::cosmology::{CosmologySupplier, PtSupplier};
use crate::data::{DataKind, Dataset};
use crate::error::AppError;
use crate::math::{lin_space, simpson};
use crate::models::{
    DampingCache, DampingCapacities, Model, ModelCore, ModelOptions, Params, Reconstruction,
    correlation_broadband,
};
use crate::transform::PowerToCorrelation;

/// Number of `μ` samples on `[0, 1]`.
pub const NUM_MU: usize = 100;

/// Relative difference above which a dataset's smoothing scale is reported.
const SMOOTHING_SCALE_TOLERANCE: f64 = 1e-6;

pub struct CorrSeo2016 {
    core: ModelCore,
    cosmology: Box<dyn CosmologySupplier>,
    transform: Box<dyn PowerToCorrelation>,
    reconstruction: Reconstruction,
    cache: DampingCache,
    mu: Arc<[f64]>,
    /// `S(k)` on the cosmology grid; empty before reconstruction.
    smoothing_kernel: Vec<f64>,
}

impl CorrSeo2016 {
    pub const NAME: &'static str = "Corr Seo 2016";

    pub fn new(
        cosmology: Box<dyn CosmologySupplier>,
        pt: Box<dyn PtSupplier>,
        transform: Box<dyn PowerToCorrelation>,
        reconstruction: Reconstruction,
        options: ModelOptions,
        capacities: DampingCapacities,
    ) -> Result<Self, AppError> {
        let mut core = ModelCore::new(Self::NAME, options)?;
        let params = core.params_mut();
        params.add_param("f", "f", 0.01, 1.0, 0.5)?;
        params.add_param("sigma_s", "Σ_s", 0.01, 10.0, 5.0)?;
        params.add_param("a1", "a_1", -100.0, 100.0, 0.0)?;
        params.add_param("a2", "a_2", -2.0, 2.0, 0.0)?;
        params.add_param("a3", "a_3", -0.2, 0.2, 0.0)?;
        params.fix("om")?;
        params.fix("f")?;

        let ks = cosmology.ks();
        let smoothing_kernel = match reconstruction {
            Reconstruction::Pre => Vec::new(),
            Reconstruction::Post { smoothing_scale } => {
                if !(smoothing_scale.is_finite() && smoothing_scale > 0.0) {
                    return Err(AppError::config(format!(
                        "Invalid reconstruction smoothing scale: {smoothing_scale}."
                    )));
                }
                ks.iter()
                    .map(|k| (-k * k * smoothing_scale * smoothing_scale / 2.0).exp())
                    .collect()
            }
        };

        let mu: Arc<[f64]> = lin_space(0.0, 1.0, NUM_MU)?.into();
        let cache = DampingCache::new(pt, ks, Arc::clone(&mu), capacities);
        debug!(
            model = Self::NAME,
            recon = reconstruction.is_post(),
            "built Seo model"
        );
        Ok(Self {
            core,
            cosmology,
            transform,
            reconstruction,
            cache,
            mu,
            smoothing_kernel,
        })
    }

    pub fn reconstruction(&self) -> Reconstruction {
        self.reconstruction
    }

    pub fn damping_cache(&self) -> &DampingCache {
        &self.cache
    }

    pub fn transform(&self) -> &dyn PowerToCorrelation {
        self.transform.as_ref()
    }

    /// The μ-integrated spectrum on the cosmology grid.
    pub fn compute_pk1d(&mut self, p: &Params, smooth: bool) -> Result<(Arc<[f64]>, Vec<f64>), AppError> {
        let om = round_key(p.get("om")?);
        let growth = round_key(p.get("f")?);
        let b = p.get("b")?;
        let sigma_s = p.get("sigma_s")?;

        let ks = self.cosmology.ks();
        let cosmo = self.cosmology.get_data(om)?;
        let propagator = if smooth {
            None
        } else {
            Some(self.propagator(growth, om, b)?)
        };

        let nmu = self.mu.len();
        let mut column = vec![0.0; nmu];
        let mut pk1d = Vec::with_capacity(ks.len());
        for (j, &k) in ks.iter().enumerate() {
            let base = b * b * cosmo.pk_smooth_lin[j];
            for (i, &mu) in self.mu.iter().enumerate() {
                let fog = 1.0 / (1.0 + mu * mu * k * k * sigma_s * sigma_s / 2.0).powi(2);
                let wiggle = match &propagator {
                    Some(g2) => cosmo.pk_ratio[j] * g2[i * ks.len() + j],
                    None => 0.0,
                };
                column[i] = base * fog * (1.0 + wiggle);
            }
            pk1d.push(simpson(&column, &self.mu));
        }
        Ok((ks, pk1d))
    }

    /// `G²` as a row-major `nmu × nk` table.
    fn propagator(&mut self, growth: f64, om: f64, b: f64) -> Result<Vec<f64>, AppError> {
        let nk = self.cache.ks().len();
        let mut out = Vec::with_capacity(self.mu.len() * nk);
        match self.reconstruction {
            Reconstruction::Post { .. } => {
                let dd = self.cache.damping_dd(growth, om)?;
                let ss = self.cache.damping_ss(om)?;
                for (i, &mu) in self.mu.iter().enumerate() {
                    for (j, &kernel) in self.smoothing_kernel.iter().enumerate() {
                        let kaiser = 1.0 + growth / b * mu * mu * (1.0 - kernel);
                        let d = dd[(i, j)];
                        let g = kaiser * d + kernel / b * (ss[j] - d);
                        out.push(g * g);
                    }
                }
            }
            Reconstruction::Pre => {
                let damping = self.cache.damping(growth, om)?;
                let pt = self.cache.pt_data(om)?;
                if pt.r1.len() != nk || pt.r2.len() != nk {
                    return Err(AppError::numerical(format!(
                        "Perturbation-theory table has {} entries for {nk} wavenumbers.",
                        pt.r1.len()
                    )));
                }
                for (i, &mu) in self.mu.iter().enumerate() {
                    for j in 0..nk {
                        let (r1, r2) = (pt.r1[j], pt.r2[j]);
                        let prefac_k = 1.0 + 3.0 / 7.0 * (r1 * (1.0 - 4.0 / (9.0 * b)) + r2);
                        let prefac_mu = mu
                            * mu
                            * (growth / b
                                + 3.0 / 7.0 * growth * r1 * (2.0 - 1.0 / (3.0 * b))
                                + 6.0 / 7.0 * growth * r2);
                        let g = (prefac_k + prefac_mu) * damping[(i, j)];
                        out.push(g * g);
                    }
                }
            }
        }
        Ok(out)
    }

    /// `ξ` at the undilated separations `d`.
    pub fn compute_correlation_function(
        &mut self,
        d: &[f64],
        p: &Params,
        smooth: bool,
    ) -> Result<Vec<f64>, AppError> {
        let alpha = p.get("alpha")?;
        let (ks, pk1d) = self.compute_pk1d(p, smooth)?;
        let dilated: Vec<f64> = d.iter().map(|d| d * alpha).collect();
        let xi = self.transform.transform(&ks, &pk1d, &dilated)?;
        let shape = correlation_broadband(d, p)?;
        Ok(xi.iter().zip(&shape).map(|(xi, s)| xi + s).collect())
    }
}

impl Model for CorrSeo2016 {
    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore {
        &mut self.core
    }

    fn set_data(&mut self, data: Arc<Dataset>) -> Result<(), AppError> {
        if data.is_reconstructed() != self.reconstruction.is_post() {
            warn!(
                model = Self::NAME,
                dataset = data.name(),
                "reconstruction setting of model and dataset differ"
            );
        }
        if let (Some(ours), Some(theirs)) =
            (self.reconstruction.smoothing_scale(), data.smoothing_scale())
        {
            if ((ours - theirs) / ours).abs() > SMOOTHING_SCALE_TOLERANCE {
                warn!(
                    model = Self::NAME,
                    model_scale = ours,
                    dataset_scale = theirs,
                    "dataset was reconstructed with a different smoothing scale"
                );
            }
        }
        debug!(model = Self::NAME, dataset = data.name(), "binding dataset");
        self.core.bind(data, DataKind::Correlation)
    }

    fn get_model(&mut self, p: &Params, smooth: bool) -> Result<Vec<f64>, AppError> {
        let data = Arc::clone(self.core.data()?);
        self.compute_correlation_function(data.x(), p, smooth)
    }

    fn broadband_params(&self) -> &'static [&'static str] {
        &["a1", "a2", "a3"]
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::DMatrix;

    use super::*;
    use crate::cosmology::{CosmologyConfig, DEFAULT_SMOOTHING_SCALE, EisensteinHu, LptGenerator};
    use crate::models::DampingOccupancy;
    use crate::transform::TransformKind;

    fn config() -> CosmologyConfig {
        CosmologyConfig {
            k_num: 300,
            ..CosmologyConfig::default()
        }
    }

    fn model(reconstruction: Reconstruction) -> Result<CorrSeo2016, AppError> {
        let cosmology = EisensteinHu::new(config())?;
        let transform = TransformKind::Gauss.build(&cosmology.ks())?;
        let pt = LptGenerator::new(
            Box::new(EisensteinHu::new(config())?),
            reconstruction.smoothing_scale().unwrap_or(DEFAULT_SMOOTHING_SCALE),
            4,
        )?;
        CorrSeo2016::new(
            Box::new(cosmology),
            Box::new(pt),
            transform,
            reconstruction,
            ModelOptions::default(),
            DampingCapacities::default(),
        )
    }

    fn dataset() -> Arc<Dataset> {
        let x = vec![60.0, 90.0, 105.0, 120.0, 150.0];
        Arc::new(Dataset::new("xi", DataKind::Correlation, x, vec![0.0; 5], DMatrix::identity(5, 5)).unwrap())
    }

    #[test]
    fn rejects_bad_smoothing_scale_and_wrong_data() {
        let bad = model(Reconstruction::Post { smoothing_scale: 0.0 });
        assert_eq!(bad.err().map(|e| e.exit_code()), Some(2));

        let mut m = model(Reconstruction::Pre).unwrap();
        let x = vec![0.05, 0.1];
        let power = Dataset::new("pk", DataKind::Power, x, vec![1.0; 2], DMatrix::identity(2, 2)).unwrap();
        assert_eq!(m.set_data(Arc::new(power)).unwrap_err().exit_code(), 3);
        assert!(m.params().is_fixed("f"));
        assert!(m.params().is_fixed("om"));
    }

    #[test]
    fn bias_enters_only_through_the_spectrum() {
        let mut m = model(Reconstruction::Pre).unwrap();
        m.set_data(dataset()).unwrap();
        let p = m.params().defaults();
        let one = m.get_model(&p, true).unwrap();
        let two = m.get_model(&p.clone().with("b", 2.0), true).unwrap();
        for (a, b) in one.iter().zip(&two) {
            assert!((b - 4.0 * a).abs() <= 1e-12 * b.abs(), "{b} vs 4 × {a}");
        }
    }

    #[test]
    fn pre_reconstruction_fills_full_damping_cache() {
        let mut m = model(Reconstruction::Pre).unwrap();
        m.set_data(dataset()).unwrap();
        let p = m.params().defaults();
        let xi = m.get_model(&p, false).unwrap();
        assert!(xi.iter().all(|v| v.is_finite()));
        m.get_model(&p.with("f", 0.500_000_1), false).unwrap();
        assert_eq!(
            m.damping_cache().occupancy(),
            DampingOccupancy {
                pt_data: 1,
                damping_dd: 0,
                damping: 1,
                damping_ss: 0,
            }
        );
    }

    #[test]
    fn post_reconstruction_uses_displacement_tables() {
        let mut m = model(Reconstruction::Post {
            smoothing_scale: 15.0,
        })
        .unwrap();
        m.set_data(dataset()).unwrap();
        let p = m.params().defaults();
        let full = m.get_model(&p, false).unwrap();
        let smooth = m.get_model(&p, true).unwrap();
        assert!(full.iter().all(|v| v.is_finite()));
        assert!(full.iter().zip(&smooth).any(|(a, b)| (a - b).abs() > 1e-6 * b.abs()));
        assert_eq!(
            m.damping_cache().occupancy(),
            DampingOccupancy {
                pt_data: 1,
                damping_dd: 1,
                damping: 0,
                damping_ss: 1,
            }
        );
    }

    #[test]
    fn shape_terms_use_undilated_separations() {
        let mut m = model(Reconstruction::Pre).unwrap();
        let data = dataset();
        m.set_data(Arc::clone(&data)).unwrap();
        let p = m.params().defaults().with("alpha", 1.1);
        let zero = m.get_model(&p, true).unwrap();
        let shifted = m.get_model(&p.clone().with("a2", 0.5), true).unwrap();
        for (i, d) in data.x().iter().enumerate() {
            assert!((shifted[i] - zero[i] - 0.5 / d).abs() < 1e-12);
        }
    }
}
