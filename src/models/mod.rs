//! BAO model implementations.
//!
//! - `params`: parameter declarations and values
//! - `model`: the [`Model`] trait and shared pieces
//! - `damping`: the memoized LPT damping tables of the Seo model
//! - `power_beutler`, `corr_beutler`, `corr_seo`: the three models
//!
//! [`build_model`] constructs any of them from [`ModelSettings`], which is how
//! the α scan gives every worker its own instance.

pub mod corr_beutler;
pub mod corr_seo;
pub mod damping;
pub mod model;
pub mod params;
pub mod power_beutler;

pub use corr_beutler::*;
pub use corr_seo::*;
pub use damping::*;
pub use model::*;
pub use params::*;
pub use power_beutler::*;

use crate::cosmology::{CosmologySupplier, DEFAULT_SMOOTHING_SCALE, EisensteinHu, LptGenerator};
use crate::domain::{ModelKind, ModelSettings};
use crate::error::AppError;

/// Build a fresh, unbound model with its own suppliers and caches.
pub fn build_model(settings: &ModelSettings) -> Result<Box<dyn Model>, AppError> {
    let options = ModelOptions {
        correction: settings.correction,
        smooth: settings.smooth,
    };
    let cosmology = EisensteinHu::new(settings.cosmology.clone())?;

    let mut model: Box<dyn Model> = match settings.kind {
        ModelKind::PowerBeutler => Box::new(PowerBeutler2017::new(
            Box::new(cosmology),
            settings.recon,
            options,
        )?),
        ModelKind::CorrBeutler => {
            let transform = settings.transform.build(&cosmology.ks())?;
            Box::new(CorrBeutler2017::new(Box::new(cosmology), transform, options)?)
        }
        ModelKind::CorrSeo => {
            let transform = settings.transform.build(&cosmology.ks())?;
            let reconstruction = settings.reconstruction();
            let pt_scale = reconstruction
                .smoothing_scale()
                .unwrap_or(DEFAULT_SMOOTHING_SCALE);
            let pt_source = EisensteinHu::new(settings.cosmology.clone())?;
            let pt = LptGenerator::new(
                Box::new(pt_source),
                pt_scale,
                DampingCapacities::default().pt_data,
            )?;
            Box::new(CorrSeo2016::new(
                Box::new(cosmology),
                Box::new(pt),
                transform,
                reconstruction,
                options,
                settings.capacities,
            )?)
        }
    };

    for (name, value) in &settings.defaults {
        model.params_mut().set_default(name, *value)?;
    }
    for name in &settings.fixed {
        model.params_mut().fix(name)?;
    }
    Ok(model)
}
