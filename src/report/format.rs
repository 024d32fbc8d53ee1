//! Formatted terminal output.
//!
//! We keep formatting code in one place so the math and fitting code stays
//! free of presentation concerns.

use crate::data::Dataset;
use crate::domain::{BenchRow, FitConfig, ScanResult, XiTable};
use crate::error::AppError;

/// One data point against the best-fit prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Residual {
    pub x: f64,
    pub data: f64,
    pub model: f64,
    /// `(data - model) / σ` with `σ` from the covariance diagonal.
    pub pull: f64,
}

/// Compare a model prediction with the data, point by point.
pub fn compute_residuals(data: &Dataset, model: &[f64]) -> Result<Vec<Residual>, AppError> {
    if model.len() != data.len() {
        return Err(AppError::numerical(format!(
            "Model has {} points but dataset '{}' has {}.",
            model.len(),
            data.name(),
            data.len()
        )));
    }
    let cov = data.cov();
    let mut out = Vec::with_capacity(model.len());
    for (i, (&m, (&x, &d))) in model.iter().zip(data.x().iter().zip(data.data())).enumerate() {
        if !m.is_finite() {
            return Err(AppError::numerical("Non-finite model prediction during residual computation."));
        }
        out.push(Residual {
            x,
            data: d,
            model: m,
            pull: (d - m) / cov[(i, i)].sqrt(),
        });
    }
    Ok(out)
}

/// Summary of an α scan: configuration, best fit and interval.
pub fn format_scan_summary(scan: &ScanResult, config: &FitConfig) -> String {
    let mut out = String::new();

    out.push_str("=== bao - α profile scan ===\n");
    out.push_str(&format!("Model: {}\n", scan.model));
    out.push_str(&format!(
        "Reconstruction: {}\n",
        match config.model.reconstruction().smoothing_scale() {
            Some(scale) => format!("post (Σ_smooth = {scale:.1} Mpc/h)"),
            None => "pre".to_string(),
        }
    ));
    out.push_str(&format!("Likelihood correction: {}\n", config.model.correction.display_name()));
    out.push_str(&format!("Dataset: {}\n", scan.dataset));
    out.push_str(&format!(
        "Mock: α_true={:.4} | noise={:.3}·rms | seed={}\n",
        config.true_alpha, config.noise, config.seed
    ));
    out.push_str(&format!(
        "Scan: α=[{:.3}, {:.3}] | n={}\n",
        config.alpha_min,
        config.alpha_max,
        scan.points.len()
    ));

    out.push_str("\nBest fit:\n");
    out.push_str(&format!("- α    : {:.5}\n", scan.best.alpha));
    out.push_str(&format!("- χ²   : {:.3}\n", scan.best.chi2));
    out.push_str(&format!("- ln L : {:.3}\n", scan.best.log_likelihood));
    match scan.interval {
        Some((lo, hi)) => out.push_str(&format!("- Δχ²=1: [{lo:.5}, {hi:.5}]\n")),
        None => out.push_str("- Δχ²=1: reaches the scan edge\n"),
    }
    for (name, value) in &scan.best.broadband {
        out.push_str(&format!("- {name:<5}: {value:.6}\n"));
    }
    out.push('\n');

    out
}

/// χ² profile, one row per α.
pub fn format_scan_profile(scan: &ScanResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:>10} {:>12} {:>12}\n", "alpha", "chi2", "delta"));
    out.push_str(&format!("{:-<10} {:-<12} {:-<12}\n", "", "", ""));
    for p in &scan.points {
        let marker = if p.index == scan.best.index { " *" } else { "" };
        out.push_str(&format!(
            "{:>10.5} {:>12.3} {:>12.3}{marker}\n",
            p.alpha,
            p.chi2,
            p.chi2 - scan.best.chi2
        ));
    }
    out
}

/// Data against the best-fit model.
pub fn format_residuals(rows: &[Residual]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:>10} {:>14} {:>14} {:>8}\n", "x", "data", "model", "pull"));
    out.push_str(&format!("{:-<10} {:-<14} {:-<14} {:-<8}\n", "", "", "", ""));
    for r in rows {
        out.push_str(&format!(
            "{:>10.4} {:>14.6e} {:>14.6e} {:>8.2}\n",
            r.x, r.data, r.model, r.pull
        ));
    }
    out
}

/// A ξ table, with the difference to the reference transform when present.
pub fn format_xi_table(table: &XiTable) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== bao - ξ(s) | Ω_m={:.4} | transform={} ===\n",
        table.om,
        table.transform.display_name()
    ));
    match &table.reference {
        Some(reference) => {
            out.push_str(&format!("{:>10} {:>14} {:>14} {:>12}\n", "s", "xi", "reference", "diff"));
            out.push_str(&format!("{:-<10} {:-<14} {:-<14} {:-<12}\n", "", "", "", ""));
            for ((s, xi), r) in table.s.iter().zip(&table.xi).zip(reference) {
                out.push_str(&format!("{s:>10.3} {xi:>14.6e} {r:>14.6e} {:>12.3e}\n", xi - r));
            }
            let peak = table.xi.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
            let worst = table
                .xi
                .iter()
                .zip(reference)
                .fold(0.0_f64, |m, (a, b)| m.max((a - b).abs()));
            if peak > 0.0 {
                out.push_str(&format!("\nmax |diff| / max |ξ| = {:.3e}\n", worst / peak));
            }
        }
        None => {
            out.push_str(&format!("{:>10} {:>14}\n", "s", "xi"));
            out.push_str(&format!("{:-<10} {:-<14}\n", "", ""));
            for (s, xi) in table.s.iter().zip(&table.xi) {
                out.push_str(&format!("{s:>10.3} {xi:>14.6e}\n"));
            }
        }
    }
    out
}

/// Timing table of `bao bench`.
pub fn format_bench(rows: &[BenchRow]) -> String {
    let mut out = String::new();
    out.push_str("=== bao - timings ===\n");
    out.push_str(&format!("{:<40} {:>6} {:>12}\n", "operation", "calls", "mean [ms]"));
    out.push_str(&format!("{:-<40} {:-<6} {:-<12}\n", "", "", ""));
    for r in rows {
        out.push_str(&format!("{:<40} {:>6} {:>12.3}\n", truncate(&r.label, 40), r.calls, r.mean_ms));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
