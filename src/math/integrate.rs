//! Quadrature over tabulated samples.

/// Trapezoidal rule for samples `y` at abscissae `x`.
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xw, yw)| 0.5 * (yw[0] + yw[1]) * (xw[1] - xw[0]))
        .sum()
}

/// Composite Simpson's rule for samples `y` at (possibly uneven) abscissae `x`.
///
/// With an odd number of intervals, Simpson's rule covers all but the last
/// interval and the last one is integrated with the parabola through the final
/// three samples. Fewer than three samples fall back to the trapezoidal rule.
pub fn simpson(y: &[f64], x: &[f64]) -> f64 {
    let n = x.len();
    if n < 3 {
        return trapezoid(y, x);
    }

    let intervals = n - 1;
    let paired = intervals - intervals % 2;

    let mut total = 0.0;
    let mut i = 0;
    while i < paired {
        let h0 = x[i + 1] - x[i];
        let h1 = x[i + 2] - x[i + 1];
        let hs = h0 + h1;
        total += hs / 6.0
            * (y[i] * (2.0 - h1 / h0) + y[i + 1] * hs * hs / (h0 * h1) + y[i + 2] * (2.0 - h0 / h1));
        i += 2;
    }

    if intervals % 2 == 1 {
        let h1 = x[n - 2] - x[n - 3];
        let h2 = x[n - 1] - x[n - 2];
        let alpha = (2.0 * h2 * h2 + 3.0 * h1 * h2) / (6.0 * (h1 + h2));
        let beta = (h2 * h2 + 3.0 * h1 * h2) / (6.0 * h1);
        let eta = h2 * h2 * h2 / (6.0 * h1 * (h1 + h2));
        total += alpha * y[n - 1] + beta * y[n - 2] - eta * y[n - 3];
    }

    total
}
