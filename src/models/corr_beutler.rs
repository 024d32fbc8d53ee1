//! `ξ(s)` model after Beutler et al. (2017) and Ross et al. (2015).
//!
//! ```text
//! w(k)     = exp(-(kΣ_nl)²/2)
//! P_1d(k)  = (w (1 + R) + (1 - w)) P_nw
//! ξ(d)     = b · T[P_1d](α d) + a1/d² + a2/d + a3
//! ```
//!
//! `T` is the configured [`PowerToCorrelation`] transform. α only rescales the
//! separations handed to the transform; the broadband terms use the undilated
//! `d`. The basic spectrum comes from an owned [`PowerBeutler2017`] which
//! receives every dataset this model is bound to.

use std::sync::Arc;

use tracing::debug;

use crate::cosmology::CosmologySupplier;
use crate::data::{DataKind, Dataset};
use crate::error::AppError;
use crate::models::{
    Model, ModelCore, ModelOptions, Params, PowerBeutler2017, correlation_broadband,
};
use crate::transform::PowerToCorrelation;

pub struct CorrBeutler2017 {
    core: ModelCore,
    parent: PowerBeutler2017,
    transform: Box<dyn PowerToCorrelation>,
}

impl CorrBeutler2017 {
    pub const NAME: &'static str = "Corr Beutler 2017";

    pub fn new(
        cosmology: Box<dyn CosmologySupplier>,
        transform: Box<dyn PowerToCorrelation>,
        options: ModelOptions,
    ) -> Result<Self, AppError> {
        let mut core = ModelCore::new(Self::NAME, options)?;
        let params = core.params_mut();
        params.add_param("sigma_nl", "Σ_nl", 1.0, 20.0, 1.0)?;
        params.add_param("a1", "a_1", -100.0, 100.0, 0.0)?;
        params.add_param("a2", "a_2", -2.0, 2.0, 0.0)?;
        params.add_param("a3", "a_3", -0.2, 0.2, 0.0)?;
        params.fix("om")?;

        // The reconstruction flag only changes the parent's broadband terms,
        // which are not used here.
        let parent = PowerBeutler2017::new(cosmology, true, options)?;
        Ok(Self {
            core,
            parent,
            transform,
        })
    }

    pub fn parent(&self) -> &PowerBeutler2017 {
        &self.parent
    }

    pub fn transform(&self) -> &dyn PowerToCorrelation {
        self.transform.as_ref()
    }

    /// The damped 1-D spectrum on the cosmology grid.
    pub fn compute_pk1d(&mut self, p: &Params, smooth: bool) -> Result<(Arc<[f64]>, Vec<f64>), AppError> {
        let (ks, cosmo) = self.parent.basic_power_spectrum(p.get("om")?)?;
        if smooth {
            return Ok((ks, cosmo.pk_smooth_lin.clone()));
        }
        let sigma_nl = p.get("sigma_nl")?;
        let pk1d = ks
            .iter()
            .zip(&cosmo.pk_smooth_lin)
            .zip(&cosmo.pk_ratio)
            .map(|((&k, &pk_nw), &ratio)| {
                let weight = (-0.5 * (k * sigma_nl).powi(2)).exp();
                (weight * (1.0 + ratio) + (1.0 - weight)) * pk_nw
            })
            .collect();
        Ok((ks, pk1d))
    }

    /// `ξ` at the undilated separations `d`.
    pub fn compute_correlation_function(
        &mut self,
        d: &[f64],
        p: &Params,
        smooth: bool,
    ) -> Result<Vec<f64>, AppError> {
        let alpha = p.get("alpha")?;
        let b = p.get("b")?;
        let (ks, pk1d) = self.compute_pk1d(p, smooth)?;
        let dilated: Vec<f64> = d.iter().map(|d| d * alpha).collect();
        let xi = self.transform.transform(&ks, &pk1d, &dilated)?;
        let shape = correlation_broadband(d, p)?;
        Ok(xi.iter().zip(&shape).map(|(xi, s)| b * xi + s).collect())
    }
}

impl Model for CorrBeutler2017 {
    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore {
        &mut self.core
    }

    fn set_data(&mut self, data: Arc<Dataset>) -> Result<(), AppError> {
        debug!(model = Self::NAME, dataset = data.name(), "binding dataset");
        self.core.bind(Arc::clone(&data), DataKind::Correlation)?;
        self.parent.core_mut().attach(data);
        Ok(())
    }

    fn get_model(&mut self, p: &Params, smooth: bool) -> Result<Vec<f64>, AppError> {
        let data = Arc::clone(self.core.data()?);
        self.compute_correlation_function(data.x(), p, smooth)
    }

    fn broadband_params(&self) -> &'static [&'static str] {
        &["a1", "a2", "a3"]
    }
}
