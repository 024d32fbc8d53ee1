//! Shared pipeline logic behind the subcommands.
//!
//! Keeping the workflows here lets the CLI layer focus on presentation:
//!
//! - `xi`: cosmology -> linear spectrum -> transform
//! - `fit`: model -> truth at `α_true` -> mock dataset -> α scan -> residuals
//! - `bench`: timed transforms and likelihood calls

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::cache::round_key;
use crate::cosmology::{CosmologyConfig, CosmologySupplier, EisensteinHu};
use crate::data::{Dataset, MockSpec, generate_mock};
use crate::domain::{BenchRow, FitConfig, ModelKind, ModelSettings, ScanResult, XiConfig, XiTable};
use crate::error::AppError;
use crate::fit::scan_alpha;
use crate::math::lin_space;
use crate::models::{Model, Params, build_model};
use crate::report::{Residual, compute_residuals};
use crate::transform::TransformKind;

/// All computed outputs of a single `bao fit` run.
#[derive(Debug, Clone)]
pub struct FitRun {
    pub dataset: Arc<Dataset>,
    /// Noise-free prediction the mock was drawn around.
    pub truth: Vec<f64>,
    pub scan: ScanResult,
    /// Data against the best-fit prediction.
    pub residuals: Vec<Residual>,
}

/// Tabulate `ξ(s)` of the linear spectrum.
pub fn run_xi(config: &XiConfig) -> Result<XiTable, AppError> {
    if config.s_min <= 0.0 {
        return Err(AppError::config(format!(
            "Separations must be positive, got s_min={}.",
            config.s_min
        )));
    }
    let ss = lin_space(config.s_min, config.s_max, config.s_steps)?;

    let mut cosmology = EisensteinHu::new(config.cosmology.clone())?;
    let ks = cosmology.ks();
    let spectra = cosmology.get_data(round_key(config.om))?;

    let xi = config.transform.build(&ks)?.transform(&ks, &spectra.pk_lin, &ss)?;
    let reference = if config.compare {
        let other = config.transform.other().build(&ks)?;
        Some(other.transform(&ks, &spectra.pk_lin, &ss)?)
    } else {
        None
    };

    Ok(XiTable {
        om: spectra.om,
        transform: config.transform,
        s: ss,
        xi,
        reference,
    })
}

/// Draw a mock from the model at `α_true` and scan α against it.
pub fn run_fit(config: &FitConfig) -> Result<FitRun, AppError> {
    if !(config.noise.is_finite() && config.noise > 0.0) {
        return Err(AppError::config(format!(
            "Noise fraction must be positive, got {}.",
            config.noise
        )));
    }
    let alphas = lin_space(config.alpha_min, config.alpha_max, config.alpha_steps)?;

    let mut model = build_model(&config.model)?;
    let base = model.params().defaults();
    let (dataset, truth) = mock_dataset(&mut *model, &base, config)?;
    info!(
        dataset = dataset.name(),
        points = dataset.len(),
        "generated mock dataset"
    );

    let scan = scan_alpha(|| build_model(&config.model), Arc::clone(&dataset), &base, &alphas)?;

    let mut best = base.with("alpha", scan.best.alpha);
    for (name, value) in &scan.best.broadband {
        best.set(name, *value);
    }
    model.set_data(Arc::clone(&dataset))?;
    let prediction = model.get_model(&best, false)?;
    let residuals = compute_residuals(&dataset, &prediction)?;

    Ok(FitRun {
        dataset,
        truth,
        scan,
        residuals,
    })
}

/// Build the noise-free prediction at `α_true` and one noisy realisation of it.
fn mock_dataset(
    model: &mut dyn Model,
    base: &Params,
    config: &FitConfig,
) -> Result<(Arc<Dataset>, Vec<f64>), AppError> {
    let kind = config.model.kind.data_kind();
    let x = lin_space(config.x_min, config.x_max, config.x_steps)?;
    if x[0] <= 0.0 {
        return Err(AppError::config(format!(
            "Data abscissae must be positive, got x_min={}.",
            config.x_min
        )));
    }

    // Evaluation needs a bound dataset; only its abscissae matter here.
    let placeholder = Dataset::new(
        "placeholder",
        kind,
        x.clone(),
        vec![0.0; x.len()],
        nalgebra::DMatrix::identity(x.len(), x.len()),
    )?;
    model.set_data(Arc::new(with_recon(placeholder, &config.model)))?;
    let truth = model.get_model(&base.clone().with("alpha", config.true_alpha), false)?;

    let rms = (truth.iter().map(|v| v * v).sum::<f64>() / truth.len() as f64).sqrt();
    if !(rms.is_finite() && rms > 0.0) {
        return Err(AppError::numerical("Model prediction has no usable amplitude for the mock."));
    }

    let spec = MockSpec {
        name: format!("{} mock (α={})", model.name(), config.true_alpha),
        kind,
        sigma: vec![config.noise * rms; x.len()],
        x,
        mean: truth.clone(),
        corr_length: config.corr_length,
        num_mocks: config.num_mocks,
        recon: config.model.recon,
        smoothing_scale: config.model.recon.then_some(config.model.smoothing_scale),
        seed: config.seed,
    };
    Ok((Arc::new(generate_mock(&spec)?), truth))
}

fn with_recon(dataset: Dataset, settings: &ModelSettings) -> Dataset {
    if settings.recon {
        dataset.with_reconstruction(Some(settings.smoothing_scale))
    } else {
        dataset
    }
}

/// Time the expensive operations on the default grids.
pub fn run_bench(cosmology: &CosmologyConfig, calls: usize) -> Result<Vec<BenchRow>, AppError> {
    if calls == 0 {
        return Err(AppError::config("Benchmark needs at least one call."));
    }
    let mut rows = Vec::new();

    let mut supplier = EisensteinHu::new(cosmology.clone())?;
    let ks = supplier.ks();
    let mut om_index = 0usize;
    rows.push(time("Eisenstein-Hu spectra (uncached)", calls, || {
        om_index += 1;
        supplier.get_data(round_key(0.25 + 1e-3 * om_index as f64))?;
        Ok(())
    })?);

    let spectra = supplier.get_data(0.31)?;
    let ss = lin_space(30.0, 200.0, 35)?;
    for kind in [TransformKind::Gauss, TransformKind::Hankel] {
        let transform = kind.build(&ks)?;
        rows.push(time(&format!("{} transform, 35 separations", kind.display_name()), calls, || {
            transform.transform(&ks, &spectra.pk_lin, &ss)?;
            Ok(())
        })?);
    }

    for kind in [ModelKind::PowerBeutler, ModelKind::CorrBeutler, ModelKind::CorrSeo] {
        let mut settings = ModelSettings::new(kind);
        settings.cosmology = cosmology.clone();
        let config = FitConfig::new(settings);

        let mut model = build_model(&config.model)?;
        let base = model.params().defaults();
        let (dataset, _) = mock_dataset(&mut *model, &base, &config)?;

        // Fresh caches for the cold call.
        let mut model = build_model(&config.model)?;
        model.set_data(dataset)?;
        rows.push(time(&format!("{}: first likelihood", kind.display_name()), 1, || {
            model.get_likelihood(&base)?;
            Ok(())
        })?);
        let mut step = 0usize;
        rows.push(time(&format!("{}: cached likelihood", kind.display_name()), calls, || {
            step += 1;
            let alpha = 0.95 + 0.1 * (step % 10) as f64 / 10.0;
            model.get_likelihood(&base.clone().with("alpha", alpha))?;
            Ok(())
        })?);
    }

    Ok(rows)
}

fn time<F>(label: &str, calls: usize, mut f: F) -> Result<BenchRow, AppError>
where
    F: FnMut() -> Result<(), AppError>,
{
    let start = Instant::now();
    for _ in 0..calls {
        f()?;
    }
    let mean_ms = start.elapsed().as_secs_f64() * 1e3 / calls as f64;
    info!(label, mean_ms, "timed");
    Ok(BenchRow {
        label: label.to_string(),
        calls,
        mean_ms,
    })
}
