//! Sample grid generation.

use crate::error::AppError;

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
///
/// The endpoints are written exactly so that interpolating a table defined on
/// `[min, max]` onto this grid never steps outside the table.
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > min) {
        return Err(AppError::config(format!(
            "Invalid log grid range: min={min}, max={max} (must be finite, >0, and max>min)."
        )));
    }
    if steps < 2 {
        return Err(AppError::config("Log grid needs at least 2 steps."));
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out: Vec<f64> = (0..steps)
        .map(|i| (ln_min + step * i as f64).exp())
        .collect();
    out[0] = min;
    out[steps - 1] = max;
    Ok(out)
}

/// Generate `steps` evenly spaced points between `min` and `max` (inclusive).
pub fn lin_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && max > min) {
        return Err(AppError::config(format!(
            "Invalid linear grid range: min={min}, max={max}."
        )));
    }
    if steps < 2 {
        return Err(AppError::config("Linear grid needs at least 2 steps."));
    }
    let step = (max - min) / (steps as f64 - 1.0);
    let mut out: Vec<f64> = (0..steps).map(|i| min + step * i as f64).collect();
    out[steps - 1] = max;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(1e-4, 5.0, 7).unwrap();
        assert_eq!(v[0], 1e-4);
        assert_eq!(v[6], 5.0);
        for w in v.windows(2) {
            assert!(w[1] > w[0]);
        }
        // Constant ratio between neighbours.
        let r0 = v[1] / v[0];
        let r5 = v[6] / v[5];
        assert!((r0 - r5).abs() < 1e-10);
    }

    #[test]
    fn log_space_rejects_bad_ranges() {
        assert!(log_space(0.0, 1.0, 10).is_err());
        assert!(log_space(2.0, 1.0, 10).is_err());
        assert!(log_space(1.0, 2.0, 1).is_err());
    }

    #[test]
    fn lin_space_spacing() {
        let v = lin_space(0.0, 1.0, 5).unwrap();
        assert_eq!(v, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }
}
