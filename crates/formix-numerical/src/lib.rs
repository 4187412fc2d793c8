//! Numerical algorithms selected by calculus marks
//!
//! Every routine is generic over a [`Domain`](formix_types::Domain) and takes
//! the integrand as a fallible closure, so the evaluator can feed procedure
//! calls straight in.
//!
//! ## Differentiation
//! - central_difference: central finite difference of arbitrary order
//!
//! ## Integration
//! - trapezoid: composite trapezoidal rule
//! - trapezoid_adjusted: trapezoid with Euler-Maclaurin end correction
//! - tanh_sinh: double-exponential quadrature with level doubling
//! - clenshaw_curtis: Chebyshev-point quadrature with cosine weights
//!
//! ## Iteration
//! - interval_points / sample_interval: evenly spaced samples of a range
//! - iterate_sum / iterate_product: accumulate over sampled points

pub mod differentiation;
pub mod iteration;
pub mod quadrature;

pub use differentiation::central_difference;
pub use iteration::{interval_points, iterate_product, iterate_sum, sample_interval, Samples};
pub use quadrature::{clenshaw_curtis, tanh_sinh, trapezoid, trapezoid_adjusted, TanhSinhOutcome};
