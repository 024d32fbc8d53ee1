//! Linear least squares.
//!
//! The α scan repeatedly solves small linear problems for the broadband
//! coefficients of a model:
//!
//! ```text
//! minimize (y - X a)^T C^{-1} (y - X a)
//! ```
//!
//! With the Cholesky factor `C = L L^T` this is an ordinary least squares problem
//! in the whitened quantities `L^{-1} X` and `L^{-1} y`, which we solve by SVD so
//! that nearly collinear broadband columns (e.g. `1/s^2` and `1/s` over a narrow
//! separation range) do not break the fit.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Progressively looser tolerances for nearly singular designs.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Generalized least squares given the lower Cholesky factor `L` of the data
/// covariance. Returns the coefficients and the minimized `χ²`.
pub fn solve_generalized_least_squares(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    chol_l: &DMatrix<f64>,
) -> Option<(DVector<f64>, f64)> {
    let xw = chol_l.solve_lower_triangular(x)?;
    let yw = chol_l.solve_lower_triangular(y)?;

    let coeffs = if x.ncols() == 0 {
        DVector::zeros(0)
    } else {
        solve_least_squares(&xw, &yw)?
    };
    let resid = &yw - &xw * &coeffs;
    let chi2 = resid.norm_squared();
    chi2.is_finite().then_some((coeffs, chi2))
}
