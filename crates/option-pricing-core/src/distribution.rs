//! Standard normal distribution.
//!
//! Every Φ and φ used by the pricing model comes from this module, so price
//! and Greeks are always computed against the same approximation.

use std::f64::consts::{PI, SQRT_2};

// Abramowitz & Stegun 7.1.26 coefficients (|error| <= 1.5e-7)
const A1: f64 = 0.254829592;
const A2: f64 = -0.284496736;
const A3: f64 = 1.421413741;
const A4: f64 = -1.453152027;
const A5: f64 = 1.061405429;
const P: f64 = 0.3275911;

/// Error function via the Abramowitz & Stegun rational approximation.
///
/// Evaluated on |x| and re-signed, so `erf(-x) == -erf(x)` exactly for x != 0.
/// At zero the approximation gives `1 - (a1 + ... + a5)`, about 1e-9, for both signs.
pub fn erf(x: f64) -> f64 {
    let sign = if x >= 0.0 { 1.0 } else { -1.0 };
    let abs_x = x.abs();

    let t = 1.0 / (1.0 + P * abs_x);
    // Horner form: t * (a1 + t * (a2 + t * (a3 + t * (a4 + t * a5))))
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    let y = 1.0 - poly * (-abs_x * abs_x).exp();

    sign * y
}

/// Standard normal CDF: Phi(x) = (1 + erf(x / sqrt(2))) / 2
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Standard normal PDF: phi(x) = exp(-x^2/2) / sqrt(2*pi)
pub fn norm_pdf(x: f64) -> f64 {
    (1.0 / (2.0 * PI).sqrt()) * (-0.5 * x * x).exp()
}
