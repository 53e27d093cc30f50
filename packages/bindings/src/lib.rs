use napi::Result as NapiResult;
use napi_derive::napi;

use option_pricing_core::black_scholes::implied_vol::{self, ImpliedVolInput};
use option_pricing_core::black_scholes::pricing::{self, OptionInput};
use option_pricing_core::expiry::{self, YearFractionInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

#[napi]
pub fn price_option(input_json: String) -> NapiResult<String> {
    let input: OptionInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = pricing::price_option(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn implied_volatility(input_json: String) -> NapiResult<String> {
    let input: ImpliedVolInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = implied_vol::implied_volatility(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

#[napi]
pub fn year_fraction(input_json: String) -> NapiResult<String> {
    let input: YearFractionInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = expiry::year_fraction(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
