//! Black-Scholes valuation core for the trading journal.
//!
//! - [`distribution`]: standard normal CDF/PDF
//! - [`expiry`]: calendar expiry dates to year fractions
//! - [`black_scholes`]: price, Greeks and implied volatility
//!
//! Rates and volatilities are in percentage points throughout (2.0 = 2%).
//! The numerical functions never fail; only the JSON-facing `price_option`,
//! `implied_volatility` and `year_fraction` entry points return errors, and
//! only for malformed requests.

pub mod black_scholes;
pub mod distribution;
pub mod error;
pub mod expiry;
pub mod types;

pub use error::PricingError;
pub use types::*;

/// Standard result type for all option-pricing operations
pub type PricingResult<T> = Result<T, PricingError>;
