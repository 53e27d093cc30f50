//! Closed-form Black-Scholes valuation of European options.
//!
//! Inputs follow the journal's conventions: rate and volatility are given in
//! percentage points, time in years. Greeks are scaled for display and
//! portfolio aggregation rather than in textbook units:
//!
//! | Greek | Unit                                            |
//! |-------|-------------------------------------------------|
//! | delta | per 1 unit of spot                              |
//! | gamma | change in delta for a 1% move in spot           |
//! | theta | per calendar day (annual / 365)                 |
//! | vega  | per 1 percentage point of volatility            |

use serde::{Deserialize, Serialize};

use crate::distribution::{norm_cdf, norm_pdf};
use crate::expiry::DAYS_PER_YEAR;
use crate::types::*;

/// Smallest time to expiry the model accepts; anything at or below zero is floored to this.
pub const MIN_TIME_TO_EXPIRY: Years = 1e-6;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    #[serde(alias = "call", alias = "CALL")]
    Call,
    #[serde(alias = "put", alias = "PUT")]
    Put,
}

impl OptionType {
    /// Intrinsic value at the given spot
    pub fn intrinsic(&self, spot: Money, strike: Money) -> Money {
        match self {
            OptionType::Call => (spot - strike).max(0.0),
            OptionType::Put => (strike - spot).max(0.0),
        }
    }
}

/// Contract and market parameters for a single valuation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    pub spot: Money,
    pub strike: Money,
    pub time_to_expiry: Years,
    pub risk_free_rate: Percent,
    pub volatility: Percent,
    pub option_type: OptionType,
}

/// Everything about a contract except its volatility, e.g. the unknowns of an
/// implied volatility search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContractTerms {
    pub spot: Money,
    pub strike: Money,
    pub time_to_expiry: Years,
    pub risk_free_rate: Percent,
    pub option_type: OptionType,
}

impl ContractTerms {
    pub fn with_volatility(&self, volatility: Percent) -> OptionContract {
        OptionContract {
            spot: self.spot,
            strike: self.strike,
            time_to_expiry: self.time_to_expiry,
            risk_free_rate: self.risk_free_rate,
            volatility,
            option_type: self.option_type,
        }
    }
}

impl From<&OptionContract> for ContractTerms {
    fn from(contract: &OptionContract) -> Self {
        Self {
            spot: contract.spot,
            strike: contract.strike,
            time_to_expiry: contract.time_to_expiry,
            risk_free_rate: contract.risk_free_rate,
            option_type: contract.option_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A priced contract: inputs converted to fractions with `d1`/`d2` computed once.
///
/// No input validation happens here. A non-positive spot or strike yields NaN
/// or infinite outputs, which are passed through to the caller untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackScholesModel {
    s: f64,
    k: f64,
    t: f64,
    r: f64,
    sigma: f64,
    option_type: OptionType,
    sqrt_t: f64,
    discount: f64,
    d1: f64,
    d2: f64,
}

impl BlackScholesModel {
    pub fn new(contract: &OptionContract) -> Self {
        let t = if contract.time_to_expiry > 0.0 {
            contract.time_to_expiry
        } else {
            MIN_TIME_TO_EXPIRY
        };
        let r = contract.risk_free_rate / 100.0;
        let sigma = contract.volatility / 100.0;

        let sqrt_t = t.sqrt();
        let sigma_sqrt_t = sigma * sqrt_t;
        let d1 = ((contract.spot / contract.strike).ln() + (r + 0.5 * sigma * sigma) * t)
            / sigma_sqrt_t;
        let d2 = d1 - sigma_sqrt_t;

        Self {
            s: contract.spot,
            k: contract.strike,
            t,
            r,
            sigma,
            option_type: contract.option_type,
            sqrt_t,
            discount: (-r * t).exp(),
            d1,
            d2,
        }
    }

    pub fn d1(&self) -> f64 {
        self.d1
    }

    pub fn d2(&self) -> f64 {
        self.d2
    }

    /// Time to expiry actually used, after flooring
    pub fn time_to_expiry(&self) -> Years {
        self.t
    }

    pub fn option_type(&self) -> OptionType {
        self.option_type
    }

    /// Present value of the strike, K * e^(-rT)
    pub fn discounted_strike(&self) -> Money {
        self.k * self.discount
    }

    pub fn call_price(&self) -> Money {
        self.s * norm_cdf(self.d1) - self.discounted_strike() * norm_cdf(self.d2)
    }

    pub fn put_price(&self) -> Money {
        self.discounted_strike() * norm_cdf(-self.d2) - self.s * norm_cdf(-self.d1)
    }

    /// Price of the contract's own option type
    pub fn price(&self) -> Money {
        match self.option_type {
            OptionType::Call => self.call_price(),
            OptionType::Put => self.put_price(),
        }
    }

    pub fn call_greeks(&self) -> Greeks {
        Greeks {
            delta: norm_cdf(self.d1),
            gamma: self.gamma(),
            theta: (self.decay_term() - self.r * self.discounted_strike() * norm_cdf(self.d2))
                / DAYS_PER_YEAR,
            vega: self.vega(),
        }
    }

    pub fn put_greeks(&self) -> Greeks {
        Greeks {
            delta: norm_cdf(self.d1) - 1.0,
            gamma: self.gamma(),
            theta: (self.decay_term() + self.r * self.discounted_strike() * norm_cdf(-self.d2))
                / DAYS_PER_YEAR,
            vega: self.vega(),
        }
    }

    /// Greeks of the contract's own option type
    pub fn greeks(&self) -> Greeks {
        match self.option_type {
            OptionType::Call => self.call_greeks(),
            OptionType::Put => self.put_greeks(),
        }
    }

    // phi(d1) / (S * sigma * sqrt(T)) rescaled by S/100: delta change per 1% spot move
    fn gamma(&self) -> f64 {
        norm_pdf(self.d1) / (100.0 * self.sigma * self.sqrt_t)
    }

    // S * sqrt(T) * phi(d1) per percentage point of volatility
    fn vega(&self) -> f64 {
        self.s * self.sqrt_t * norm_pdf(self.d1) / 100.0
    }

    // Annualised -S * phi(d1) * sigma / (2 * sqrt(T)), shared by call and put theta
    fn decay_term(&self) -> f64 {
        -(self.s * norm_pdf(self.d1) * self.sigma) / (2.0 * self.sqrt_t)
    }
}
