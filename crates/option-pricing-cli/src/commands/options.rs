use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, ValueEnum};
use serde_json::Value;

use option_pricing_core::black_scholes::implied_vol::{self, ImpliedVolInput, SolverConfig};
use option_pricing_core::black_scholes::pricing::{self, OptionInput};
use option_pricing_core::black_scholes::OptionType;
use option_pricing_core::expiry::{self, YearFractionInput};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OptionTypeArg {
    Call,
    Put,
}

impl From<OptionTypeArg> for OptionType {
    fn from(arg: OptionTypeArg) -> Self {
        match arg {
            OptionTypeArg::Call => OptionType::Call,
            OptionTypeArg::Put => OptionType::Put,
        }
    }
}

/// Expiry given either as a year fraction or as a calendar date
#[derive(Args)]
pub struct ExpiryArgs {
    /// Time to expiry in years (e.g. 0.0986 for 36 days)
    #[arg(long, conflicts_with = "expiry_date")]
    pub time_to_expiry: Option<f64>,

    /// Expiry date (YYYY-MM-DD, taken at 00:00 UTC)
    #[arg(long, value_parser = parse_date)]
    pub expiry_date: Option<NaiveDate>,

    /// Valuation instant (RFC 3339); defaults to now
    #[arg(long, requires = "expiry_date")]
    pub valuation_time: Option<DateTime<Utc>>,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    expiry::parse_expiry_date(s).map_err(|e| e.to_string())
}

/// Arguments for option pricing
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct PriceArgs {
    /// Underlying price
    #[arg(long)]
    pub spot: Option<f64>,

    /// Strike price
    #[arg(long)]
    pub strike: Option<f64>,

    #[command(flatten)]
    pub expiry: ExpiryArgs,

    /// Risk-free rate in percent (e.g. 2 for 2%)
    #[arg(long, alias = "rate", default_value = "0")]
    pub risk_free_rate: f64,

    /// Volatility in percent (e.g. 20 for 20%)
    #[arg(long, alias = "vol")]
    pub volatility: Option<f64>,

    /// Option type
    #[arg(long = "type", value_enum, default_value = "call")]
    pub option_type: OptionTypeArg,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for implied volatility
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ImpliedVolArgs {
    /// Observed option price
    #[arg(long, alias = "price")]
    pub market_price: Option<f64>,

    /// Underlying price
    #[arg(long)]
    pub spot: Option<f64>,

    /// Strike price
    #[arg(long)]
    pub strike: Option<f64>,

    #[command(flatten)]
    pub expiry: ExpiryArgs,

    /// Risk-free rate in percent (e.g. 2 for 2%)
    #[arg(long, alias = "rate", default_value = "0")]
    pub risk_free_rate: f64,

    /// Option type
    #[arg(long = "type", value_enum, default_value = "call")]
    pub option_type: OptionTypeArg,

    /// Starting volatility in percent
    #[arg(long)]
    pub initial_guess: Option<f64>,

    /// Newton-Raphson iteration cap
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Absolute price tolerance for convergence
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for year-fraction conversion
#[derive(Args)]
pub struct YearFractionArgs {
    /// Expiry date (YYYY-MM-DD, taken at 00:00 UTC)
    #[arg(long, value_parser = parse_date)]
    pub expiry_date: Option<NaiveDate>,

    /// Valuation instant (RFC 3339); defaults to now
    #[arg(long)]
    pub valuation_time: Option<DateTime<Utc>>,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_price(args: PriceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let opt_input: OptionInput = match input::load_request(args.input.as_deref())? {
        Some(request) => request,
        None => OptionInput {
            spot: args.spot.ok_or("--spot is required (or provide --input)")?,
            strike: args.strike.ok_or("--strike is required (or provide --input)")?,
            time_to_expiry: args.expiry.time_to_expiry,
            expiry_date: args.expiry.expiry_date,
            valuation_time: args.expiry.valuation_time,
            risk_free_rate: args.risk_free_rate,
            volatility: args
                .volatility
                .ok_or("--volatility is required (or provide --input)")?,
            option_type: args.option_type.into(),
        },
    };
    let result = pricing::price_option(&opt_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_implied_vol(args: ImpliedVolArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let iv_input: ImpliedVolInput = match input::load_request(args.input.as_deref())? {
        Some(request) => request,
        None => {
            let mut solver = SolverConfig::default();
            if let Some(guess) = args.initial_guess {
                solver = solver.with_initial_guess(guess);
            }
            if let Some(max_iterations) = args.max_iterations {
                solver = solver.with_max_iterations(max_iterations);
            }
            if let Some(tolerance) = args.tolerance {
                solver = solver.with_tolerance(tolerance);
            }
            ImpliedVolInput {
                market_price: args
                    .market_price
                    .ok_or("--market-price is required (or provide --input)")?,
                spot: args.spot.ok_or("--spot is required (or provide --input)")?,
                strike: args.strike.ok_or("--strike is required (or provide --input)")?,
                time_to_expiry: args.expiry.time_to_expiry,
                expiry_date: args.expiry.expiry_date,
                valuation_time: args.expiry.valuation_time,
                risk_free_rate: args.risk_free_rate,
                option_type: args.option_type.into(),
                solver,
            }
        }
    };
    let result = implied_vol::implied_volatility(&iv_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_year_fraction(args: YearFractionArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let yf_input: YearFractionInput = match input::load_request(args.input.as_deref())? {
        Some(request) => request,
        None => YearFractionInput {
            expiry_date: args
                .expiry_date
                .ok_or("--expiry-date is required (or provide --input)")?,
            valuation_time: args.valuation_time,
        },
    };
    let result = expiry::year_fraction(&yf_input)?;
    Ok(serde_json::to_value(result)?)
}
