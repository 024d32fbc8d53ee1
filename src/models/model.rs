//! The interface every BAO model implements.
//!
//! A model owns its parameter declarations, the dataset it is bound to and its
//! memoization caches. Evaluation takes `&mut self` because the caches are
//! filled lazily; models are never shared between threads, each worker builds
//! its own (see [`crate::fit::scan_alpha`]).

use std::sync::Arc;

use crate::cosmology::{CosmologyData, CosmologySupplier};
use crate::data::{DataKind, Dataset};
use crate::error::AppError;
use crate::likelihood::{Correction, log_likelihood};
use crate::models::{ParamSpace, Params};

/// Construction options shared by all models.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModelOptions {
    pub correction: Correction,
    /// Evaluate the no-wiggle prediction in [`Model::get_likelihood`].
    pub smooth: bool,
}

/// Whether the data were reconstructed, and with which Gaussian smoothing
/// scale (Mpc/h).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reconstruction {
    Pre,
    Post { smoothing_scale: f64 },
}

impl Reconstruction {
    pub fn is_post(self) -> bool {
        matches!(self, Reconstruction::Post { .. })
    }

    pub fn smoothing_scale(self) -> Option<f64> {
        match self {
            Reconstruction::Pre => None,
            Reconstruction::Post { smoothing_scale } => Some(smoothing_scale),
        }
    }
}

/// State every model carries: declarations, options and the bound dataset.
#[derive(Debug, Clone)]
pub struct ModelCore {
    name: String,
    params: ParamSpace,
    options: ModelOptions,
    data: Option<Arc<Dataset>>,
}

impl ModelCore {
    /// Declares the parameters shared by every model: `om`, `alpha`, `b`.
    pub fn new(name: &str, options: ModelOptions) -> Result<Self, AppError> {
        let mut params = ParamSpace::new();
        params.add_param("om", "Ω_m", 0.1, 0.5, 0.31)?;
        params.add_param("alpha", "α", 0.8, 1.2, 1.0)?;
        params.add_param("b", "b", 0.01, 10.0, 1.0)?;
        Ok(Self {
            name: name.to_string(),
            params,
            options,
            data: None,
        })
    }

    pub fn params_mut(&mut self) -> &mut ParamSpace {
        &mut self.params
    }

    /// Bind `data`, checking it measures what the model predicts.
    pub fn bind(&mut self, data: Arc<Dataset>, expected: DataKind) -> Result<(), AppError> {
        if data.kind() != expected {
            return Err(AppError::data(format!(
                "Model '{}' predicts {} but dataset '{}' holds {}.",
                self.name,
                expected.display_name(),
                data.name(),
                data.kind().display_name()
            )));
        }
        self.attach(data);
        Ok(())
    }

    /// Bind without the kind check, for models composed inside another model.
    pub fn attach(&mut self, data: Arc<Dataset>) {
        self.data = Some(data);
    }

    pub fn data(&self) -> Result<&Arc<Dataset>, AppError> {
        self.data
            .as_ref()
            .ok_or_else(|| AppError::config(format!("Model '{}' has no dataset bound.", self.name)))
    }
}

pub trait Model: Send {
    fn core(&self) -> &ModelCore;

    fn core_mut(&mut self) -> &mut ModelCore;

    /// Bind a dataset. Expensive per-dataset precomputation happens here.
    fn set_data(&mut self, data: Arc<Dataset>) -> Result<(), AppError>;

    /// Prediction at the bound dataset's abscissae.
    fn get_model(&mut self, p: &Params, smooth: bool) -> Result<Vec<f64>, AppError>;

    /// Parameters the prediction depends on linearly.
    fn broadband_params(&self) -> &'static [&'static str];

    fn name(&self) -> &str {
        &self.core().name
    }

    fn params(&self) -> &ParamSpace {
        &self.core().params
    }

    fn params_mut(&mut self) -> &mut ParamSpace {
        self.core_mut().params_mut()
    }

    fn options(&self) -> ModelOptions {
        self.core().options
    }

    fn data(&self) -> Option<Arc<Dataset>> {
        self.core().data.clone()
    }

    fn get_likelihood(&mut self, p: &Params) -> Result<f64, AppError> {
        let data = Arc::clone(self.core().data()?);
        let options = self.options();
        let model = self.get_model(p, options.smooth)?;
        log_likelihood(&data, &model, options.correction)
    }
}

/// `(ks, pk_smooth_lin, pk_ratio)` for `om` from `cosmology`.
pub fn basic_power_spectrum(
    cosmology: &mut dyn CosmologySupplier,
    om: f64,
) -> Result<(Arc<[f64]>, Arc<CosmologyData>), AppError> {
    let ks = cosmology.ks();
    let data = cosmology.get_data(om)?;
    Ok((ks, data))
}

/// `a1/d² + a2/d + a3` at the undilated separations `d`.
pub fn correlation_broadband(d: &[f64], p: &Params) -> Result<Vec<f64>, AppError> {
    let (a1, a2, a3) = (p.get("a1")?, p.get("a2")?, p.get("a3")?);
    Ok(d.iter().map(|d| a1 / (d * d) + a2 / d + a3).collect())
}
