pub mod model;
pub mod pricing;

#[cfg(feature = "implied_vol")]
pub mod implied_vol;

pub use model::*;

/// Warnings for inputs the model accepts but that are economically meaningless.
///
/// Nothing is rejected: the model still runs and NaN/infinite values flow
/// through to the result.
pub(crate) fn terms_warnings(terms: &ContractTerms) -> Vec<String> {
    let mut warnings = Vec::new();
    if terms.spot.is_nan() || terms.spot <= 0.0 {
        warnings.push(format!(
            "spot {} is not positive; results are undefined",
            terms.spot
        ));
    }
    if terms.strike.is_nan() || terms.strike <= 0.0 {
        warnings.push(format!(
            "strike {} is not positive; results are undefined",
            terms.strike
        ));
    }
    if terms.time_to_expiry <= 0.0 {
        warnings.push(format!(
            "time_to_expiry {} floored to {MIN_TIME_TO_EXPIRY} years",
            terms.time_to_expiry
        ));
    }
    warnings
}
