mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::options::{ImpliedVolArgs, PriceArgs, YearFractionArgs};

/// Black-Scholes option pricing, Greeks and implied volatility
#[derive(Parser)]
#[command(
    name = "opx",
    version,
    about = "Black-Scholes option pricing, Greeks and implied volatility",
    long_about = "Prices European options under Black-Scholes, reports Greeks in \
                  journal units (gamma per 1% spot move, theta per day, vega per \
                  vol point) and solves implied volatility by Newton-Raphson. \
                  Rates and volatilities are given in percent."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Increase log verbosity on stderr (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a European option and compute its Greeks
    Price(PriceArgs),
    /// Solve the implied volatility that reproduces a market price
    ImpliedVol(ImpliedVolArgs),
    /// Convert an expiry date into a year fraction
    YearFraction(YearFractionArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "option_pricing_core={default_level},opx={default_level}"
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Price(args) => commands::options::run_price(args),
        Commands::ImpliedVol(args) => commands::options::run_implied_vol(args),
        Commands::YearFraction(args) => commands::options::run_year_fraction(args),
        Commands::Version => {
            println!("opx {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
