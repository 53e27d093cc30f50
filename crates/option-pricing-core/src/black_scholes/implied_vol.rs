//! Implied volatility by Newton-Raphson on the Black-Scholes price.
//!
//! Volatility is searched in percentage points. Because the model's vega is
//! already expressed per percentage point, the Newton step
//! `vol - (price - target) / vega` needs no rescaling.
//!
//! The solver never fails. It either converges or stops with a best-effort
//! estimate and says why, so callers can decide whether to trust it, retry
//! from another initial guess, or reject it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, trace};

use super::model::{BlackScholesModel, ContractTerms, OptionType};
use super::terms_warnings;
use crate::error::PricingError;
use crate::expiry::resolve_time_to_expiry;
use crate::types::*;
use crate::PricingResult;

// ---------------------------------------------------------------------------
// Solver configuration
// ---------------------------------------------------------------------------

/// Newton-Raphson parameters. Volatilities are in percentage points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Starting volatility (default 20%)
    pub initial_guess: Percent,
    pub max_iterations: u32,
    /// Absolute price difference accepted as converged
    pub tolerance: Money,
    /// Below this vega the Newton step is unreliable and the search stops
    pub min_vega: f64,
    /// Substituted whenever a step drives volatility to zero or below
    pub volatility_floor: Percent,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            initial_guess: 20.0,
            max_iterations: 100,
            tolerance: 0.001,
            min_vega: 1e-4,
            volatility_floor: 0.1,
        }
    }
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_initial_guess(mut self, initial_guess: Percent) -> Self {
        self.initial_guess = initial_guess;
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Money) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_min_vega(mut self, min_vega: f64) -> Self {
        self.min_vega = min_vega;
        self
    }

    #[must_use]
    pub fn with_volatility_floor(mut self, volatility_floor: Percent) -> Self {
        self.volatility_floor = volatility_floor;
        self
    }
}

// ---------------------------------------------------------------------------
// Solver result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Vega fell below `min_vega`, typically deep in or out of the money
    VegaTooSmall,
    /// `max_iterations` passes without meeting the tolerance
    MaxIterations,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ImpliedVolatility {
    Converged {
        volatility: Percent,
        iterations: u32,
    },
    BestEffort {
        volatility: Percent,
        iterations: u32,
        reason: StopReason,
    },
}

impl ImpliedVolatility {
    /// The volatility found, converged or not
    pub fn volatility(&self) -> Percent {
        match *self {
            ImpliedVolatility::Converged { volatility, .. }
            | ImpliedVolatility::BestEffort { volatility, .. } => volatility,
        }
    }

    /// Number of model evaluations performed
    pub fn iterations(&self) -> u32 {
        match *self {
            ImpliedVolatility::Converged { iterations, .. }
            | ImpliedVolatility::BestEffort { iterations, .. } => iterations,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, ImpliedVolatility::Converged { .. })
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match *self {
            ImpliedVolatility::Converged { .. } => None,
            ImpliedVolatility::BestEffort { reason, .. } => Some(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct ImpliedVolatilitySolver {
    config: SolverConfig,
}

impl ImpliedVolatilitySolver {
    /// The config is used as given. `initial_guess` and `volatility_floor`
    /// must be positive; request-supplied configs are checked by
    /// [`implied_volatility`].
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Find the volatility whose model price matches `target_price`.
    pub fn solve(&self, target_price: Money, terms: &ContractTerms) -> ImpliedVolatility {
        let cfg = &self.config;
        let mut vol = cfg.initial_guess;

        for i in 0..cfg.max_iterations {
            let iterations = i + 1;
            let model = BlackScholesModel::new(&terms.with_volatility(vol));
            let diff = model.price() - target_price;
            trace!(iteration = iterations, vol, diff, "implied vol step");

            if diff.abs() < cfg.tolerance {
                debug!(vol, iterations, "implied volatility converged");
                return ImpliedVolatility::Converged {
                    volatility: vol,
                    iterations,
                };
            }

            let vega = model.greeks().vega;
            if vega.abs() < cfg.min_vega {
                debug!(vol, iterations, vega, "vega too small, stopping");
                return ImpliedVolatility::BestEffort {
                    volatility: vol,
                    iterations,
                    reason: StopReason::VegaTooSmall,
                };
            }

            vol -= diff / vega;
            if vol <= 0.0 {
                vol = cfg.volatility_floor;
            }
        }

        debug!(
            vol,
            max_iterations = cfg.max_iterations,
            "implied volatility did not converge"
        );
        ImpliedVolatility::BestEffort {
            volatility: vol,
            iterations: cfg.max_iterations,
            reason: StopReason::MaxIterations,
        }
    }
}

/// Solve with the default configuration.
pub fn solve_implied_volatility(target_price: Money, terms: &ContractTerms) -> ImpliedVolatility {
    ImpliedVolatilitySolver::default().solve(target_price, terms)
}

// ---------------------------------------------------------------------------
// Public API: implied_volatility
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpliedVolInput {
    pub market_price: Money,
    pub spot: Money,
    pub strike: Money,
    #[serde(default)]
    pub time_to_expiry: Option<Years>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub valuation_time: Option<DateTime<Utc>>,
    pub risk_free_rate: Percent,
    pub option_type: OptionType,
    #[serde(default)]
    pub solver: SolverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpliedVolOutput {
    pub implied_volatility: Percent,
    pub converged: bool,
    pub iterations: u32,
    pub stop_reason: Option<StopReason>,
    /// Model price at `implied_volatility` minus the market price
    pub price_error: Money,
    pub time_to_expiry: Years,
}

pub fn implied_volatility(
    input: &ImpliedVolInput,
) -> PricingResult<ComputationOutput<ImpliedVolOutput>> {
    let start = Instant::now();
    validate_solver_config(&input.solver)?;

    let t = resolve_time_to_expiry(
        input.time_to_expiry,
        input.expiry_date,
        input.valuation_time,
    )?;
    let terms = ContractTerms {
        spot: input.spot,
        strike: input.strike,
        time_to_expiry: t,
        risk_free_rate: input.risk_free_rate,
        option_type: input.option_type,
    };

    let solved = ImpliedVolatilitySolver::new(input.solver).solve(input.market_price, &terms);
    let vol = solved.volatility();
    let price_error =
        BlackScholesModel::new(&terms.with_volatility(vol)).price() - input.market_price;

    let mut warnings = terms_warnings(&terms);
    if input.market_price <= 0.0 {
        warnings.push("market_price is not positive".into());
    }
    let lower_bound = no_arbitrage_floor(&terms);
    if input.market_price < lower_bound {
        warnings.push(format!(
            "market_price {} is below the no-arbitrage floor {:.4}; no volatility reproduces it",
            input.market_price, lower_bound
        ));
    }
    match solved.stop_reason() {
        Some(StopReason::VegaTooSmall) => warnings.push(format!(
            "Stopped after {} iterations: vega below {}; result is a best-effort estimate",
            solved.iterations(),
            input.solver.min_vega
        )),
        Some(StopReason::MaxIterations) => warnings.push(format!(
            "Did not converge within {} iterations; result is a best-effort estimate",
            input.solver.max_iterations
        )),
        None => {}
    }

    let output = ImpliedVolOutput {
        implied_volatility: vol,
        converged: solved.is_converged(),
        iterations: solved.iterations(),
        stop_reason: solved.stop_reason(),
        price_error,
        time_to_expiry: t,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "model": "Newton-Raphson on Black-Scholes (vega per 1 vol point)",
        "initial_vol_pct": input.solver.initial_guess,
        "max_iterations": input.solver.max_iterations,
        "tolerance": input.solver.tolerance,
        "min_vega": input.solver.min_vega,
        "volatility_floor_pct": input.solver.volatility_floor,
    });

    Ok(with_metadata(
        "Newton-Raphson implied volatility",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

/// The solver must only ever evaluate the model at a positive, finite volatility.
fn validate_solver_config(cfg: &SolverConfig) -> PricingResult<()> {
    let positive = [
        ("solver.initial_guess", cfg.initial_guess),
        ("solver.volatility_floor", cfg.volatility_floor),
    ];
    for (field, value) in positive {
        if !(value.is_finite() && value > 0.0) {
            return Err(PricingError::InvalidInput {
                field: field.into(),
                reason: format!("must be a positive finite volatility, got {value}"),
            });
        }
    }

    let non_negative = [
        ("solver.tolerance", cfg.tolerance),
        ("solver.min_vega", cfg.min_vega),
    ];
    for (field, value) in non_negative {
        if value.is_nan() || value < 0.0 {
            return Err(PricingError::InvalidInput {
                field: field.into(),
                reason: format!("must be zero or positive, got {value}"),
            });
        }
    }
    Ok(())
}

/// Lowest price any positive volatility can produce: the discounted intrinsic value
fn no_arbitrage_floor(terms: &ContractTerms) -> Money {
    let pv_strike = BlackScholesModel::new(&terms.with_volatility(1.0)).discounted_strike();
    match terms.option_type {
        OptionType::Call => (terms.spot - pv_strike).max(0.0),
        OptionType::Put => (pv_strike - terms.spot).max(0.0),
    }
}
