//! Ogata (2005) double-exponential quadrature for the order-1/2 Hankel
//! transform.
//!
//! Substituting `x = ks` in the isotropic inverse Fourier transform gives
//!
//! ```text
//! ξ(s) = 1/(2π² s³) ∫ dx x P(x/s) sin(x)
//! ```
//!
//! The spherical Bessel function `sin(x)` has its zeros at `nπ`, so Ogata's
//! nodes are `x_n = (π/h) ψ(hn)` with `ψ(t) = t tanh(π/2 sinh t)`, and
//!
//! ```text
//! ∫ dx f(x) sin(x) ≈ π Σ_n f(x_n) sin(x_n) ψ'(hn)
//! ```
//!
//! Nodes and weights depend only on `h` and the node count, so they are built
//! once. `P(k)` enters through a [`LogSpline`] rebuilt on every call.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;
use crate::math::LogSpline;
use crate::transform::{PowerToCorrelation, check_aligned};

/// Default step of the double-exponential substitution.
pub const DEFAULT_STEP: f64 = 0.001;

/// Beyond this the exponentials overflow and the terms have vanished anyway.
const EXP_CUTOFF: f64 = 700.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HankelConfig {
    /// Number of quadrature nodes; `None` means `⌊3.2/h⌋`.
    pub num_nodes: Option<usize>,
    /// Integration step size.
    pub h: f64,
}

impl Default for HankelConfig {
    fn default() -> Self {
        Self {
            num_nodes: None,
            h: DEFAULT_STEP,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HankelTransform {
    config: HankelConfig,
    nodes: Vec<f64>,
    /// `π ψ'(t_n) sin(x_n) x_n`, i.e. everything but `P(x_n/s)`.
    weights: Vec<f64>,
}

impl HankelTransform {
    pub fn new(config: HankelConfig) -> Result<Self, AppError> {
        let h = config.h;
        if !(h.is_finite() && h > 0.0) {
            return Err(AppError::config(format!("Invalid Hankel step size: {h}.")));
        }
        let n = config.num_nodes.unwrap_or((3.2 / h).floor() as usize);
        if n == 0 {
            return Err(AppError::config("Hankel transform needs at least one node."));
        }

        let mut nodes = Vec::with_capacity(n);
        let mut weights = Vec::with_capacity(n);
        for i in 1..=n {
            let t = h * i as f64;
            let y = PI * t.sinh();
            let x = (PI / h) * t * (0.5 * y).tanh();

            // sin(x) = ±sin(δ) with δ = nπ - x, which stays accurate where x
            // itself sits within rounding of a multiple of π.
            let delta = if y < EXP_CUTOFF {
                (PI / h) * t * 2.0 / (y.exp() + 1.0)
            } else {
                0.0
            };
            let sign = if i % 2 == 1 { 1.0 } else { -1.0 };
            let sin_x = sign * delta.sin();

            let dpsi = if y < EXP_CUTOFF {
                PI * t * t.cosh() / (1.0 + y.cosh())
            } else {
                0.0
            } + (0.5 * y).tanh();

            nodes.push(x);
            weights.push(PI * dpsi * sin_x * x);
        }

        debug!(nodes = n, h, "built Hankel transform");
        Ok(Self {
            config,
            nodes,
            weights,
        })
    }

    pub fn config(&self) -> HankelConfig {
        self.config
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }
}

impl PowerToCorrelation for HankelTransform {
    fn transform(&self, ks: &[f64], pk: &[f64], ss: &[f64]) -> Result<Vec<f64>, AppError> {
        check_aligned(ks, pk)?;
        let spline = LogSpline::new(ks, pk)?;
        let xi = ss
            .iter()
            .map(|&s| {
                let sum: f64 = self
                    .nodes
                    .iter()
                    .zip(&self.weights)
                    .map(|(x, w)| w * spline.eval(x / s))
                    .sum();
                sum / (2.0 * PI * PI * s * s * s)
            })
            .collect();
        Ok(xi)
    }
}
