//! Command-line parsing for the `bao` binary.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! modeling code: every subcommand's arguments are converted into a plain config
//! struct from [`crate::domain`] before anything is computed.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::ModelKind;
use crate::likelihood::Correction;
use crate::transform::TransformKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "bao", version, about = "BAO model evaluation and α profile fitting")]
pub struct Cli {
    /// Log progress to stderr (`RUST_LOG` takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Tabulate the correlation function of the linear power spectrum.
    Xi(XiArgs),
    /// Fit α to a mock dataset drawn from a model.
    Fit(FitArgs),
    /// Time the transforms and one likelihood evaluation per model.
    Bench(BenchArgs),
}

/// Cosmology shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct CosmologyArgs {
    /// Dimensionless Hubble parameter.
    #[arg(long, default_value_t = 0.6751)]
    pub h0: f64,

    /// Baryon density parameter.
    #[arg(long, default_value_t = 0.0491)]
    pub ob: f64,

    /// Scalar spectral index.
    #[arg(long, default_value_t = 0.9653)]
    pub ns: f64,

    /// σ8 at z = 0.
    #[arg(long, default_value_t = 0.8150)]
    pub sigma8: f64,

    /// Effective redshift.
    #[arg(short = 'z', long, default_value_t = 0.61)]
    pub redshift: f64,

    /// Number of wavenumbers in the log-spaced k grid.
    #[arg(long, default_value_t = 2000)]
    pub k_num: usize,
}

#[derive(Debug, Args, Clone)]
pub struct XiArgs {
    #[command(flatten)]
    pub cosmology: CosmologyArgs,

    /// Matter density parameter.
    #[arg(long, default_value_t = 0.31)]
    pub om: f64,

    /// Smallest separation, Mpc/h.
    #[arg(long, default_value_t = 30.0)]
    pub s_min: f64,

    /// Largest separation, Mpc/h.
    #[arg(long, default_value_t = 200.0)]
    pub s_max: f64,

    /// Number of separations.
    #[arg(long, default_value_t = 35)]
    pub s_steps: usize,

    #[arg(long, value_enum, default_value_t = TransformKind::Gauss)]
    pub transform: TransformKind,

    /// Also run the other transform and print the difference.
    #[arg(long)]
    pub compare: bool,

    /// Write the table to JSON.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub cosmology: CosmologyArgs,

    #[arg(short, long, value_enum, default_value_t = ModelKind::CorrBeutler)]
    pub model: ModelKind,

    /// Model and mock are post-reconstruction.
    #[arg(long)]
    pub recon: bool,

    /// Reconstruction smoothing scale, Mpc/h.
    #[arg(long, default_value_t = 15.0)]
    pub smoothing_scale: f64,

    #[arg(long, value_enum, default_value_t = TransformKind::Gauss)]
    pub transform: TransformKind,

    #[arg(long, value_enum, default_value_t = Correction::Sellentin)]
    pub correction: Correction,

    /// Override a parameter default, e.g. `--set b=2.1`. Repeatable.
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, f64)>,

    /// Fix a parameter at its default. Repeatable.
    #[arg(long = "fix", value_name = "NAME")]
    pub fix: Vec<String>,

    /// α used to draw the mock.
    #[arg(long, default_value_t = 1.0)]
    pub true_alpha: f64,

    #[arg(long, default_value_t = 0.9)]
    pub alpha_min: f64,

    #[arg(long, default_value_t = 1.1)]
    pub alpha_max: f64,

    #[arg(long, default_value_t = 41)]
    pub alpha_steps: usize,

    /// Smallest data abscissa (defaults per data kind).
    #[arg(long)]
    pub x_min: Option<f64>,

    /// Largest data abscissa (defaults per data kind).
    #[arg(long)]
    pub x_max: Option<f64>,

    /// Number of data points.
    #[arg(long, default_value_t = 30)]
    pub x_steps: usize,

    /// Error bar as a fraction of the RMS of the mock mean.
    #[arg(long, default_value_t = 0.05)]
    pub noise: f64,

    /// Correlation length of the errors, in units of the abscissae.
    #[arg(long, default_value_t = 0.0)]
    pub corr_length: f64,

    /// Number of mocks behind the covariance (needed by hartlap/sellentin).
    #[arg(long, default_value_t = 1000)]
    pub num_mocks: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Write the scan to JSON.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct BenchArgs {
    #[command(flatten)]
    pub cosmology: CosmologyArgs,

    /// Calls per timed operation.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub calls: usize,
}

/// Parse `NAME=VALUE`.
fn parse_assignment(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in '{s}'"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value in '{s}': {e}"))?;
    Ok((name.to_string(), value))
}
