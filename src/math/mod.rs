//! Numerical building blocks shared by the transform engine, the cosmology
//! supplier and the models.
//!
//! - `grid`: linear and logarithmic sample grids
//! - `interp`: linear interpolation and natural cubic splines
//! - `integrate`: trapezoidal and Simpson quadrature over tabulated samples
//! - `ols`: (generalized) least squares via SVD

pub mod grid;
pub mod integrate;
pub mod interp;
pub mod ols;

pub use grid::*;
pub use integrate::*;
pub use interp::*;
pub use ols::*;
