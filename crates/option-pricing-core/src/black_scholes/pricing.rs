use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::model::{BlackScholesModel, ContractTerms, Greeks, OptionContract, OptionType};
use super::terms_warnings;
use crate::expiry::resolve_time_to_expiry;
use crate::types::*;
use crate::PricingResult;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionInput {
    pub spot: Money,
    pub strike: Money,
    /// Year fraction; mutually exclusive with `expiry_date`
    #[serde(default)]
    pub time_to_expiry: Option<Years>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    /// Instant `expiry_date` is measured from; defaults to now
    #[serde(default)]
    pub valuation_time: Option<DateTime<Utc>>,
    pub risk_free_rate: Percent,
    pub volatility: Percent,
    pub option_type: OptionType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Moneyness {
    Itm,
    Atm,
    Otm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionOutput {
    pub price: Money,
    pub intrinsic_value: Money,
    pub time_value: Money,
    pub greeks: Greeks,
    /// Price of the opposite leg (put for a call, call for a put) via parity
    pub put_call_parity_price: Money,
    pub moneyness: Moneyness,
    pub breakeven: Money,
    pub d1: f64,
    pub d2: f64,
    /// Time to expiry used by the model, after flooring
    pub time_to_expiry: Years,
}

// ---------------------------------------------------------------------------
// Moneyness and intrinsic value helpers
// ---------------------------------------------------------------------------

fn classify_moneyness(s: Money, k: Money, option_type: OptionType) -> Moneyness {
    let ratio = s / k;
    // ATM band: within 1% of strike
    let atm_lo = 0.99;
    let atm_hi = 1.01;
    match option_type {
        OptionType::Call => {
            if ratio > atm_hi {
                Moneyness::Itm
            } else if ratio < atm_lo {
                Moneyness::Otm
            } else {
                Moneyness::Atm
            }
        }
        OptionType::Put => {
            if ratio < atm_lo {
                Moneyness::Itm
            } else if ratio > atm_hi {
                Moneyness::Otm
            } else {
                Moneyness::Atm
            }
        }
    }
}

fn breakeven(k: Money, premium: Money, option_type: OptionType) -> Money {
    match option_type {
        OptionType::Call => k + premium,
        OptionType::Put => k - premium,
    }
}

// ---------------------------------------------------------------------------
// Public API: price_option
// ---------------------------------------------------------------------------

pub fn price_option(input: &OptionInput) -> PricingResult<ComputationOutput<OptionOutput>> {
    let start = Instant::now();

    let t = resolve_time_to_expiry(
        input.time_to_expiry,
        input.expiry_date,
        input.valuation_time,
    )?;
    let contract = OptionContract {
        spot: input.spot,
        strike: input.strike,
        time_to_expiry: t,
        risk_free_rate: input.risk_free_rate,
        volatility: input.volatility,
        option_type: input.option_type,
    };

    let model = BlackScholesModel::new(&contract);
    let price = model.price();
    let greeks = model.greeks();

    // C - P = S - K*e^(-rT)
    let forward_gap = input.spot - model.discounted_strike();
    let parity_price = match input.option_type {
        OptionType::Call => price - forward_gap,
        OptionType::Put => price + forward_gap,
    };

    let intrinsic = input.option_type.intrinsic(input.spot, input.strike);
    let output = OptionOutput {
        price,
        intrinsic_value: intrinsic,
        time_value: price - intrinsic,
        greeks,
        put_call_parity_price: parity_price,
        moneyness: classify_moneyness(input.spot, input.strike, input.option_type),
        breakeven: breakeven(input.strike, price, input.option_type),
        d1: model.d1(),
        d2: model.d2(),
        time_to_expiry: model.time_to_expiry(),
    };

    let mut warnings = terms_warnings(&ContractTerms::from(&contract));
    if input.volatility.is_nan() || input.volatility <= 0.0 {
        warnings.push(format!(
            "volatility {} is not positive; d1/d2 are undefined",
            input.volatility
        ));
    }
    let greek_values = [greeks.delta, greeks.gamma, greeks.theta, greeks.vega];
    if !price.is_finite() || greek_values.iter().any(|g| !g.is_finite()) {
        warnings.push("Non-finite price or Greeks; serialized as null".into());
    }

    let assumptions = serde_json::json!({
        "model": "Black-Scholes (closed-form, no dividends)",
        "risk_free_rate_pct": input.risk_free_rate,
        "volatility_pct": input.volatility,
        "gamma_unit": "delta change per 1% spot move",
        "theta_unit": "per calendar day (annual / 365)",
        "vega_unit": "per 1 volatility point",
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Black-Scholes (closed-form)",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PricingError;
    use chrono::TimeZone;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    fn default_call() -> OptionInput {
        OptionInput {
            spot: 100.0,
            strike: 100.0,
            time_to_expiry: Some(1.0),
            expiry_date: None,
            valuation_time: None,
            risk_free_rate: 5.0,
            volatility: 20.0,
            option_type: OptionType::Call,
        }
    }

    fn default_put() -> OptionInput {
        OptionInput {
            option_type: OptionType::Put,
            ..default_call()
        }
    }

    #[test]
    fn test_call_atm_price() {
        let result = price_option(&default_call()).unwrap();
        let price = result.result.price;
        assert!(approx_eq(price, 10.45, 0.01), "ATM call price {price} not near 10.45");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_parity_price_matches_other_leg() {
        let call = price_option(&default_call()).unwrap().result;
        let put = price_option(&default_put()).unwrap().result;
        assert!(approx_eq(call.put_call_parity_price, put.price, 1e-9));
        assert!(approx_eq(put.put_call_parity_price, call.price, 1e-9));
    }

    #[test]
    fn test_intrinsic_and_time_value() {
        let input = OptionInput {
            spot: 120.0,
            ..default_call()
        };
        let out = price_option(&input).unwrap().result;
        assert_eq!(out.intrinsic_value, 20.0);
        assert!(approx_eq(out.time_value, out.price - 20.0, 1e-12));
        assert!(out.time_value > 0.0);
        assert_eq!(out.moneyness, Moneyness::Itm);
    }

    #[test]
    fn test_moneyness_classification() {
        assert_eq!(classify_moneyness(100.5, 100.0, OptionType::Call), Moneyness::Atm);
        assert_eq!(classify_moneyness(90.0, 100.0, OptionType::Call), Moneyness::Otm);
        assert_eq!(classify_moneyness(90.0, 100.0, OptionType::Put), Moneyness::Itm);
        assert_eq!(classify_moneyness(110.0, 100.0, OptionType::Put), Moneyness::Otm);
    }

    #[test]
    fn test_breakeven() {
        let call = price_option(&default_call()).unwrap().result;
        let put = price_option(&default_put()).unwrap().result;
        assert!(approx_eq(call.breakeven, 100.0 + call.price, 1e-12));
        assert!(approx_eq(put.breakeven, 100.0 - put.price, 1e-12));
    }

    #[test]
    fn test_expiry_date_input() {
        let input = OptionInput {
            time_to_expiry: None,
            expiry_date: NaiveDate::from_ymd_opt(2026, 3, 20),
            valuation_time: Some(Utc.with_ymd_and_hms(2026, 2, 12, 0, 0, 0).unwrap()),
            ..default_call()
        };
        let out = price_option(&input).unwrap().result;
        assert!(approx_eq(out.time_to_expiry, 36.0 / 365.0, 1e-12));
    }

    #[test]
    fn test_missing_expiry_is_error() {
        let input = OptionInput {
            time_to_expiry: None,
            ..default_call()
        };
        assert!(matches!(
            price_option(&input),
            Err(PricingError::MissingExpiry)
        ));
    }

    #[test]
    fn test_expired_contract_warns_and_prices_intrinsic() {
        let input = OptionInput {
            spot: 110.0,
            time_to_expiry: Some(0.0),
            ..default_call()
        };
        let out = price_option(&input).unwrap();
        assert!(approx_eq(out.result.price, 10.0, 1e-3));
        assert_eq!(out.result.time_to_expiry, 1e-6);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_negative_spot_warns_not_errors() {
        let input = OptionInput {
            spot: -5.0,
            ..default_call()
        };
        let out = price_option(&input).unwrap();
        assert!(out.result.price.is_nan());
        // non-positive spot + non-finite output
        assert_eq!(out.warnings.len(), 2, "{:?}", out.warnings);
    }

    #[test]
    fn test_deserialize_request() {
        let json = r#"{
            "spot": 18000, "strike": 18000, "expiry_date": "2026-03-20",
            "valuation_time": "2026-02-12T00:00:00Z",
            "risk_free_rate": 2, "volatility": 20, "option_type": "put"
        }"#;
        let input: OptionInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.option_type, OptionType::Put);
        assert!(input.time_to_expiry.is_none());
        let out = price_option(&input).unwrap();
        assert!(out.result.price > 0.0);
    }

    #[test]
    fn test_moneyness_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Moneyness::Atm).unwrap(), "\"ATM\"");
    }
}
