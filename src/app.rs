//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - installs the log subscriber
//! - converts arguments into run configuration
//! - runs the pipelines and prints reports
//! - writes optional exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{BenchArgs, Command, CosmologyArgs, FitArgs, XiArgs};
use crate::cosmology::CosmologyConfig;
use crate::domain::{FitConfig, ModelSettings, XiConfig, default_data_range};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `bao` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Xi(args) => handle_xi(args),
        Command::Fit(args) => handle_fit(args),
        Command::Bench(args) => handle_bench(args),
    }
}

/// Log to stderr. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second initialisation (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_xi(args: XiArgs) -> Result<(), AppError> {
    let config = xi_config_from_args(&args);
    let table = pipeline::run_xi(&config)?;

    println!("{}", crate::report::format_xi_table(&table));

    if let Some(path) = &config.export {
        crate::io::write_xi_json(path, &table)?;
    }
    Ok(())
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;

    println!("{}", crate::report::format_scan_summary(&run.scan, &config));
    println!("{}", crate::report::format_scan_profile(&run.scan));
    println!("{}", crate::report::format_residuals(&run.residuals));

    if let Some(path) = &config.export {
        crate::io::write_scan_json(path, &run.scan)?;
    }
    Ok(())
}

fn handle_bench(args: BenchArgs) -> Result<(), AppError> {
    let cosmology = cosmology_from_args(&args.cosmology);
    let rows = pipeline::run_bench(&cosmology, args.calls)?;
    println!("{}", crate::report::format_bench(&rows));
    Ok(())
}

pub fn cosmology_from_args(args: &CosmologyArgs) -> CosmologyConfig {
    CosmologyConfig {
        h0: args.h0,
        ob: args.ob,
        ns: args.ns,
        sigma8: args.sigma8,
        redshift: args.redshift,
        k_num: args.k_num,
        ..CosmologyConfig::default()
    }
}

pub fn xi_config_from_args(args: &XiArgs) -> XiConfig {
    XiConfig {
        cosmology: cosmology_from_args(&args.cosmology),
        om: args.om,
        s_min: args.s_min,
        s_max: args.s_max,
        s_steps: args.s_steps,
        transform: args.transform,
        compare: args.compare,
        export: args.export.clone(),
    }
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    let mut model = ModelSettings::new(args.model);
    model.cosmology = cosmology_from_args(&args.cosmology);
    model.recon = args.recon;
    model.smoothing_scale = args.smoothing_scale;
    model.transform = args.transform;
    model.correction = args.correction;
    model.defaults = args.set.clone();
    model.fixed = args.fix.clone();

    let (x_min, x_max) = default_data_range(args.model.data_kind());
    FitConfig {
        model,
        true_alpha: args.true_alpha,
        alpha_min: args.alpha_min,
        alpha_max: args.alpha_max,
        alpha_steps: args.alpha_steps,
        x_min: args.x_min.unwrap_or(x_min),
        x_max: args.x_max.unwrap_or(x_max),
        x_steps: args.x_steps,
        noise: args.noise,
        corr_length: args.corr_length,
        num_mocks: Some(args.num_mocks),
        seed: args.seed,
        export: args.export.clone(),
    }
}
