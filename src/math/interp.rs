//! Interpolation of tabulated functions.
//!
//! Two flavours are needed:
//! - piecewise linear interpolation onto a (usually much finer) sorted grid,
//!   used by the Gaussian-damped transform on every call
//! - natural cubic splines, used wherever a smooth continuous `P(k)` is needed
//!   (the Hankel transform and α-dilated power spectra)
//!
//! For power spectra the spline is built in `ln k` (the grids are log-spaced, so
//! the knots are evenly spaced there) and extended beyond the table with power
//! laws matched to the two outermost samples. See [`LogSpline`].

use crate::error::AppError;

/// Linearly interpolate the table `(xp, fp)` at the ascending points `x`.
///
/// Points outside `[xp[0], xp[n-1]]` take the nearest end value. Both `xp` and
/// `x` must be sorted ascending; this lets us walk the table once instead of
/// binary-searching every point.
pub fn interp_linear_sorted(xp: &[f64], fp: &[f64], x: &[f64]) -> Vec<f64> {
    let n = xp.len();
    let mut out = Vec::with_capacity(x.len());
    let mut j = 0usize;
    for &xi in x {
        if xi <= xp[0] {
            out.push(fp[0]);
            continue;
        }
        if xi >= xp[n - 1] {
            out.push(fp[n - 1]);
            continue;
        }
        while j + 1 < n - 1 && xp[j + 1] <= xi {
            j += 1;
        }
        let t = (xi - xp[j]) / (xp[j + 1] - xp[j]);
        out.push(fp[j] + t * (fp[j + 1] - fp[j]));
    }
    out
}

/// Natural cubic spline through `(x_i, y_i)`.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the knots (zero at both ends).
    m: Vec<f64>,
}

impl CubicSpline {
    /// Fit a natural cubic spline. `x` must be strictly increasing.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, AppError> {
        let n = x.len();
        if n != y.len() {
            return Err(AppError::numerical(format!(
                "Spline abscissa/ordinate length mismatch: {n} vs {}.",
                y.len()
            )));
        }
        if n < 2 {
            return Err(AppError::numerical("Spline needs at least 2 knots."));
        }

        let mut m = vec![0.0; n];
        if n > 2 {
            // Thomas algorithm on the interior equations
            // h[i-1] m[i-1] + 2 (h[i-1] + h[i]) m[i] + h[i] m[i+1] = 6 (s[i] - s[i-1]).
            let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
            let mut diag = vec![0.0; n];
            let mut rhs = vec![0.0; n];
            for i in 1..n - 1 {
                diag[i] = 2.0 * (h[i - 1] + h[i]);
                rhs[i] = 6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
            }
            for i in 2..n - 1 {
                let w = h[i - 1] / diag[i - 1];
                diag[i] -= w * h[i - 1];
                rhs[i] -= w * rhs[i - 1];
            }
            m[n - 2] = rhs[n - 2] / diag[n - 2];
            for i in (1..n - 2).rev() {
                m[i] = (rhs[i] - h[i] * m[i + 1]) / diag[i];
            }
        }

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
        })
    }

    /// Evaluate the spline. Outside the knot range the end cubic is extended.
    pub fn eval(&self, xv: f64) -> f64 {
        let n = self.x.len();
        let j = self
            .x
            .partition_point(|&v| v <= xv)
            .saturating_sub(1)
            .min(n - 2);
        let h = self.x[j + 1] - self.x[j];
        let a = (self.x[j + 1] - xv) / h;
        let b = (xv - self.x[j]) / h;
        a * self.y[j]
            + b * self.y[j + 1]
            + ((a * a * a - a) * self.m[j] + (b * b * b - b) * self.m[j + 1]) * h * h / 6.0
    }
}

/// A cubic spline of `P(k)` in `ln k` with power-law tails.
///
/// Below the table the spectrum continues as `P(k_0) (k/k_0)^n_lo`, above it as
/// `P(k_N) (k/k_N)^n_hi`, with the slopes taken from the two outermost samples.
/// A tail is dropped (zero) when the end samples change sign or vanish, and the
/// high-k tail is dropped when it does not decay.
#[derive(Debug, Clone)]
pub struct LogSpline {
    spline: CubicSpline,
    k_lo: f64,
    k_hi: f64,
    p_lo: f64,
    p_hi: f64,
    n_lo: Option<f64>,
    n_hi: Option<f64>,
}

impl LogSpline {
    pub fn new(ks: &[f64], pk: &[f64]) -> Result<Self, AppError> {
        let n = ks.len();
        if n < 2 || pk.len() != n {
            return Err(AppError::numerical(format!(
                "Power spectrum table mismatch: {} wavenumbers vs {} values.",
                n,
                pk.len()
            )));
        }
        let ln_k: Vec<f64> = ks.iter().map(|k| k.ln()).collect();
        let spline = CubicSpline::new(&ln_k, pk)?;

        let n_lo = power_law_slope(ks[0], ks[1], pk[0], pk[1]);
        let n_hi = power_law_slope(ks[n - 2], ks[n - 1], pk[n - 2], pk[n - 1]).filter(|s| *s < 0.0);

        Ok(Self {
            spline,
            k_lo: ks[0],
            k_hi: ks[n - 1],
            p_lo: pk[0],
            p_hi: pk[n - 1],
            n_lo,
            n_hi,
        })
    }

    pub fn eval(&self, k: f64) -> f64 {
        if k < self.k_lo {
            return match self.n_lo {
                Some(n) => self.p_lo * (k / self.k_lo).powf(n),
                None => 0.0,
            };
        }
        if k > self.k_hi {
            return match self.n_hi {
                Some(n) => self.p_hi * (k / self.k_hi).powf(n),
                None => 0.0,
            };
        }
        self.spline.eval(k.ln())
    }
}

fn power_law_slope(k0: f64, k1: f64, p0: f64, p1: f64) -> Option<f64> {
    let ratio = p1 / p0;
    if !(ratio.is_finite() && ratio > 0.0) {
        return None;
    }
    let slope = ratio.ln() / (k1 / k0).ln();
    slope.is_finite().then_some(slope)
}
