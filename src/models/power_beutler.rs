//! `P(k)` model after Beutler et al. (2017).
//!
//! ```text
//! fog(k)      = 1 / (1 + k²Σ_s²/2)²
//! P_smooth(k) = b² P_nw(k) fog(k)
//! shape(k)    = a1 k + a2 + a3/k + a4/k² + a5/k³      (pre-reconstruction)
//!             = a1 k² + a2 + a3/k + a4/k² + a5/k³     (post-reconstruction)
//! P(k)        = (P_smooth + shape) (1 + R(k) exp(-k²Σ_nl²/2))
//! ```
//!
//! with `R = P_lin/P_nw - 1` the wiggle ratio. The result lives on the
//! cosmology grid; α is applied by evaluating a spline of it at `k_data/α`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cosmology::{CosmologyData, CosmologySupplier};
use crate::data::{DataKind, Dataset};
use crate::error::AppError;
use crate::math::LogSpline;
use crate::models::{Model, ModelCore, ModelOptions, Params, basic_power_spectrum};

pub struct PowerBeutler2017 {
    core: ModelCore,
    cosmology: Box<dyn CosmologySupplier>,
    recon: bool,
}

impl PowerBeutler2017 {
    pub const NAME: &'static str = "Pk Beutler 2017";

    pub fn new(
        cosmology: Box<dyn CosmologySupplier>,
        recon: bool,
        options: ModelOptions,
    ) -> Result<Self, AppError> {
        let mut core = ModelCore::new(Self::NAME, options)?;
        let params = core.params_mut();
        params.add_param("sigma_nl", "Σ_nl", 0.01, 20.0, 10.0)?;
        params.add_param("sigma_s", "Σ_s", 0.01, 20.0, 10.0)?;
        params.add_param("a1", "a_1", -10000.0, 30000.0, 0.0)?;
        params.add_param("a2", "a_2", -20000.0, 10000.0, 0.0)?;
        params.add_param("a3", "a_3", -1000.0, 5000.0, 0.0)?;
        params.add_param("a4", "a_4", -200.0, 200.0, 0.0)?;
        params.add_param("a5", "a_5", -3.0, 3.0, 0.0)?;
        params.fix("om")?;

        Ok(Self {
            core,
            cosmology,
            recon,
        })
    }

    pub fn is_reconstructed(&self) -> bool {
        self.recon
    }

    /// The smooth linear spectrum and wiggle ratio for `om`.
    pub fn basic_power_spectrum(&mut self, om: f64) -> Result<(Arc<[f64]>, Arc<CosmologyData>), AppError> {
        basic_power_spectrum(self.cosmology.as_mut(), om)
    }

    /// `P(k)` on the cosmology grid, before dilation.
    pub fn compute_power_spectrum(
        &mut self,
        p: &Params,
        smooth: bool,
    ) -> Result<(Arc<[f64]>, Vec<f64>), AppError> {
        let (ks, cosmo) = self.basic_power_spectrum(p.get("om")?)?;
        let b = p.get("b")?;
        let sigma_s = p.get("sigma_s")?;
        let sigma_nl = p.get("sigma_nl")?;
        let a = [p.get("a1")?, p.get("a2")?, p.get("a3")?, p.get("a4")?, p.get("a5")?];
        let recon = self.recon;

        let pk = ks
            .iter()
            .zip(&cosmo.pk_smooth_lin)
            .zip(&cosmo.pk_ratio)
            .map(|((&k, &pk_nw), &ratio)| {
                let fog = 1.0 / (1.0 + k * k * sigma_s * sigma_s / 2.0).powi(2);
                let pk_smooth = b * b * pk_nw * fog;
                let lead = if recon { k * k } else { k };
                let shape = a[0] * lead + a[1] + a[2] / k + a[3] / (k * k) + a[4] / (k * k * k);
                if smooth {
                    pk_smooth + shape
                } else {
                    let propagator = (-0.5 * k * k * sigma_nl * sigma_nl).exp();
                    (pk_smooth + shape) * (1.0 + ratio * propagator)
                }
            })
            .collect();
        Ok((ks, pk))
    }
}

impl Model for PowerBeutler2017 {
    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore {
        &mut self.core
    }

    fn set_data(&mut self, data: Arc<Dataset>) -> Result<(), AppError> {
        if data.is_reconstructed() != self.recon {
            warn!(
                model = Self::NAME,
                dataset = data.name(),
                "reconstruction setting of model and dataset differ"
            );
        }
        debug!(model = Self::NAME, dataset = data.name(), "binding dataset");
        self.core.bind(data, DataKind::Power)
    }

    fn get_model(&mut self, p: &Params, smooth: bool) -> Result<Vec<f64>, AppError> {
        let data = Arc::clone(self.core.data()?);
        let alpha = p.get("alpha")?;
        let (ks, pk) = self.compute_power_spectrum(p, smooth)?;
        let spline = LogSpline::new(&ks, &pk)?;
        Ok(data.x().iter().map(|k| spline.eval(k / alpha)).collect())
    }

    fn broadband_params(&self) -> &'static [&'static str] {
        &["a1", "a2", "a3", "a4", "a5"]
    }
}
