//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - built from CLI arguments
//! - passed to worker threads to construct models
//! - exported to JSON

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::cosmology::CosmologyConfig;
use crate::data::DataKind;
use crate::likelihood::Correction;
use crate::models::{CorrBeutler2017, CorrSeo2016, DampingCapacities, PowerBeutler2017, Reconstruction};
use crate::transform::TransformKind;

/// Which BAO model to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    PowerBeutler,
    CorrBeutler,
    CorrSeo,
}

impl ModelKind {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::PowerBeutler => PowerBeutler2017::NAME,
            ModelKind::CorrBeutler => CorrBeutler2017::NAME,
            ModelKind::CorrSeo => CorrSeo2016::NAME,
        }
    }

    /// What the model predicts.
    pub fn data_kind(self) -> DataKind {
        match self {
            ModelKind::PowerBeutler => DataKind::Power,
            ModelKind::CorrBeutler | ModelKind::CorrSeo => DataKind::Correlation,
        }
    }
}

/// Everything needed to construct a model from scratch.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub kind: ModelKind,
    pub cosmology: CosmologyConfig,
    pub recon: bool,
    /// Gaussian smoothing scale of the reconstruction, Mpc/h.
    pub smoothing_scale: f64,
    pub transform: TransformKind,
    pub correction: Correction,
    pub smooth: bool,
    pub capacities: DampingCapacities,
    /// Overrides of declared parameter defaults.
    pub defaults: Vec<(String, f64)>,
    /// Parameters pinned at their defaults, on top of each model's own.
    pub fixed: Vec<String>,
}

impl ModelSettings {
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            cosmology: CosmologyConfig::default(),
            recon: false,
            smoothing_scale: crate::cosmology::DEFAULT_SMOOTHING_SCALE,
            transform: TransformKind::Gauss,
            correction: Correction::default(),
            smooth: false,
            capacities: DampingCapacities::default(),
            defaults: Vec::new(),
            fixed: Vec::new(),
        }
    }

    pub fn reconstruction(&self) -> Reconstruction {
        if self.recon {
            Reconstruction::Post {
                smoothing_scale: self.smoothing_scale,
            }
        } else {
            Reconstruction::Pre
        }
    }
}

/// `bao xi`: tabulate the correlation function of the linear spectrum.
#[derive(Debug, Clone)]
pub struct XiConfig {
    pub cosmology: CosmologyConfig,
    pub om: f64,
    pub s_min: f64,
    pub s_max: f64,
    pub s_steps: usize,
    pub transform: TransformKind,
    /// Also evaluate the other transform and report the difference.
    pub compare: bool,
    pub export: Option<PathBuf>,
}

/// `bao fit`: α scan of a mock dataset.
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub model: ModelSettings,
    /// α used to generate the mock.
    pub true_alpha: f64,
    pub alpha_min: f64,
    pub alpha_max: f64,
    pub alpha_steps: usize,
    /// Data abscissae: separations (Mpc/h) or wavenumbers (h/Mpc).
    pub x_min: f64,
    pub x_max: f64,
    pub x_steps: usize,
    /// Error bar per point as a fraction of the RMS of the mock mean.
    pub noise: f64,
    /// Correlation length of the mock errors, in units of the abscissae.
    pub corr_length: f64,
    pub num_mocks: Option<usize>,
    pub seed: u64,
    pub export: Option<PathBuf>,
}

impl FitConfig {
    /// Defaults for `model`, with the data range chosen by what it predicts.
    pub fn new(model: ModelSettings) -> Self {
        let (x_min, x_max) = default_data_range(model.kind.data_kind());
        Self {
            model,
            true_alpha: 1.0,
            alpha_min: 0.9,
            alpha_max: 1.1,
            alpha_steps: 41,
            x_min,
            x_max,
            x_steps: 30,
            noise: 0.05,
            corr_length: 0.0,
            num_mocks: Some(1000),
            seed: 42,
            export: None,
        }
    }
}

/// Fitting range: separations in Mpc/h or wavenumbers in h/Mpc.
pub fn default_data_range(kind: DataKind) -> (f64, f64) {
    match kind {
        DataKind::Correlation => (50.0, 170.0),
        DataKind::Power => (0.02, 0.30),
    }
}

/// One α of a profile scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanPoint {
    pub index: usize,
    pub alpha: f64,
    pub chi2: f64,
    pub log_likelihood: f64,
    /// Best-fit broadband coefficients at this α.
    pub broadband: BTreeMap<String, f64>,
}

/// Result of [`crate::fit::scan_alpha`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub model: String,
    pub dataset: String,
    pub points: Vec<ScanPoint>,
    pub best: ScanPoint,
    /// α range with `χ² ≤ χ²_min + 1`, when it lies inside the scan.
    pub interval: Option<(f64, f64)>,
}

/// A tabulated correlation function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XiTable {
    pub om: f64,
    pub transform: TransformKind,
    pub s: Vec<f64>,
    pub xi: Vec<f64>,
    /// `ξ` from the other transform, when compared.
    pub reference: Option<Vec<f64>>,
}

/// One timing line of `bao bench`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchRow {
    pub label: String,
    pub calls: usize,
    pub mean_ms: f64,
}
