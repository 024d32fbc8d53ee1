//! α profile scan.
//!
//! For each α on a grid we:
//! - evaluate the model with every broadband parameter set to zero
//! - build one design column per broadband parameter by unit perturbation
//!   (the prediction is linear in them)
//! - solve the covariance-weighted least-squares problem for the broadband
//!   coefficients and record the minimized `χ²`
//!
//! Grid points are independent, so they are evaluated in parallel. Models are
//! not `Sync` (their caches fill lazily), so every rayon worker builds its own
//! instance through the factory.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::data::Dataset;
use crate::domain::{ScanPoint, ScanResult};
use crate::error::AppError;
use crate::likelihood::corrected_log_likelihood;
use crate::math::solve_generalized_least_squares;
use crate::models::{Model, Params};

/// Scan `alphas` for the dataset `data`.
///
/// `base` supplies every non-broadband parameter; its `alpha` and broadband
/// entries are overwritten. `factory` must build identically configured models.
pub fn scan_alpha<F>(
    factory: F,
    data: Arc<Dataset>,
    base: &Params,
    alphas: &[f64],
) -> Result<ScanResult, AppError>
where
    F: Fn() -> Result<Box<dyn Model>, AppError> + Sync,
{
    if alphas.is_empty() {
        return Err(AppError::config("α grid is empty."));
    }

    let init = || -> Result<Box<dyn Model>, AppError> {
        let mut model = factory()?;
        model.set_data(Arc::clone(&data))?;
        Ok(model)
    };

    let model_name = OnceLock::new();
    let points: Vec<ScanPoint> = alphas
        .par_iter()
        .enumerate()
        .map_init(init, |model, (index, &alpha)| {
            let model = model.as_mut().map_err(|e| e.clone())?;
            model_name.get_or_init(|| model.name().to_string());
            evaluate_alpha(&mut **model, &data, base, index, alpha)
        })
        .collect::<Result<_, AppError>>()?;

    // Deterministic selection: pick the minimum χ²; break ties by grid index.
    let mut best = &points[0];
    for p in &points[1..] {
        if p.chi2 < best.chi2 || (p.chi2 == best.chi2 && p.index < best.index) {
            best = p;
        }
    }
    let best = best.clone();
    let interval = delta_chi2_interval(&points, best.chi2);

    let name = model_name.into_inner().unwrap_or_default();
    info!(
        model = %name,
        alpha = best.alpha,
        chi2 = best.chi2,
        "α scan finished"
    );
    Ok(ScanResult {
        model: name,
        dataset: data.name().to_string(),
        points,
        best,
        interval,
    })
}

fn evaluate_alpha(
    model: &mut dyn Model,
    data: &Dataset,
    base: &Params,
    index: usize,
    alpha: f64,
) -> Result<ScanPoint, AppError> {
    let broadband = model.broadband_params();
    let mut p = base.clone().with("alpha", alpha);
    for name in broadband {
        p.set(name, 0.0);
    }

    let m0 = model.get_model(&p, false)?;
    let n = m0.len();
    let mut x = DMatrix::<f64>::zeros(n, broadband.len());
    for (j, name) in broadband.iter().enumerate() {
        let unit = model.get_model(&p.clone().with(name, 1.0), false)?;
        for i in 0..n {
            x[(i, j)] = unit[i] - m0[i];
        }
    }
    let y = DVector::from_iterator(n, data.data().iter().zip(&m0).map(|(d, m)| d - m));

    let (coeffs, chi2) = solve_generalized_least_squares(&x, &y, data.chol_l()).ok_or_else(|| {
        AppError::numerical(format!("Broadband solve failed at α = {alpha}."))
    })?;
    let log_likelihood = corrected_log_likelihood(
        chi2,
        n,
        data.num_mocks(),
        model.options().correction,
    )?;
    debug!(alpha, chi2, "scan point");

    Ok(ScanPoint {
        index,
        alpha,
        chi2,
        log_likelihood,
        broadband: broadband
            .iter()
            .zip(coeffs.iter())
            .map(|(name, c)| (name.to_string(), *c))
            .collect::<BTreeMap<_, _>>(),
    })
}

/// The α range with `χ² ≤ χ²_min + 1`, unless it touches the scan edges.
fn delta_chi2_interval(points: &[ScanPoint], chi2_min: f64) -> Option<(f64, f64)> {
    let inside: Vec<&ScanPoint> = points.iter().filter(|p| p.chi2 <= chi2_min + 1.0).collect();
    let lo = inside.iter().map(|p| p.index).min()?;
    let hi = inside.iter().map(|p| p.index).max()?;
    if lo == 0 || hi == points.len() - 1 {
        return None;
    }
    Some((points[lo].alpha, points[hi].alpha))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(index: usize, alpha: f64, chi2: f64) -> ScanPoint {
        ScanPoint {
            index,
            alpha,
            chi2,
            log_likelihood: -0.5 * chi2,
            broadband: BTreeMap::new(),
        }
    }

    #[test]
    fn interval_spans_delta_chi2_of_one() {
        let points: Vec<ScanPoint> = [9.0, 4.0, 0.5, 0.0, 0.8, 3.0, 7.0]
            .iter()
            .enumerate()
            .map(|(i, c)| point(i, 0.9 + 0.05 * i as f64, *c))
            .collect();
        let (lo, hi) = delta_chi2_interval(&points, 0.0).unwrap();
        assert!((lo - 1.0).abs() < 1e-12);
        assert!((hi - 1.1).abs() < 1e-12);
    }

    #[test]
    fn interval_touching_edge_is_unbounded() {
        let points: Vec<ScanPoint> = [0.0, 0.5, 4.0]
            .iter()
            .enumerate()
            .map(|(i, c)| point(i, 1.0 + 0.1 * i as f64, *c))
            .collect();
        assert!(delta_chi2_interval(&points, 0.0).is_none());
    }
}
