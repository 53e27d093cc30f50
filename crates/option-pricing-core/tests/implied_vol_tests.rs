use approx::assert_abs_diff_eq;
use chrono::{NaiveDate, TimeZone, Utc};
use option_pricing_core::black_scholes::implied_vol::{
    self, solve_implied_volatility, ImpliedVolInput, ImpliedVolatilitySolver, SolverConfig,
    StopReason,
};
use option_pricing_core::black_scholes::{BlackScholesModel, ContractTerms, OptionType};
use option_pricing_core::expiry::year_fraction_between;

// ===========================================================================
// Reference scenario
// ===========================================================================

#[test]
fn test_dax_reference_calculator() {
    // DAX call valued 2026-02-12, expiring 2026-03-20 (36 calendar days).
    // Reference calculator: ~13.67%
    let t = year_fraction_between(
        NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
        Utc.with_ymd_and_hms(2026, 2, 12, 0, 0, 0).unwrap(),
    );
    assert_abs_diff_eq!(t, 36.0 / 365.0, epsilon = 1e-12);

    let terms = ContractTerms {
        spot: 25003.0,
        strike: 25100.0,
        time_to_expiry: t,
        risk_free_rate: 2.0,
        option_type: OptionType::Call,
    };
    let iv = solve_implied_volatility(405.0, &terms);

    assert!(iv.is_converged());
    assert!(
        iv.volatility() > 13.6 && iv.volatility() < 13.7,
        "IV {} outside 13.6%-13.7%",
        iv.volatility()
    );
    let repriced = BlackScholesModel::new(&terms.with_volatility(iv.volatility())).price();
    assert!((repriced - 405.0).abs() < 0.001);
}

#[test]
fn test_dax_reference_by_expiry_date() {
    let json = serde_json::json!({
        "market_price": 405.0,
        "spot": 25003.0,
        "strike": 25100.0,
        "expiry_date": "2026-03-20",
        "valuation_time": "2026-02-12T00:00:00Z",
        "risk_free_rate": 2.0,
        "option_type": "call"
    });
    let input: ImpliedVolInput = serde_json::from_value(json).unwrap();
    let out = implied_vol::implied_volatility(&input).unwrap().result;
    assert!(out.converged);
    assert!(out.iterations <= 5);
    assert_abs_diff_eq!(out.implied_volatility, 13.66, epsilon = 0.01);
}

// ===========================================================================
// Round trip
// ===========================================================================

#[test]
fn test_round_trip_recovers_volatility() {
    // With a 0.001 price tolerance the solver can only pin volatility to
    // 0.01 points when vega (per vol point) is at least ~0.1; contracts below
    // 0.5 are skipped.
    let vols = [5.0, 10.0, 15.0, 20.0, 30.0, 40.0, 60.0, 80.0];
    let times = [0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0];
    let strikes = [17500.0, 18000.0, 18500.0];

    let mut checked = 0;
    for &vol in &vols {
        for &t in &times {
            for &strike in &strikes {
                for option_type in [OptionType::Call, OptionType::Put] {
                    let terms = ContractTerms {
                        spot: 18000.0,
                        strike,
                        time_to_expiry: t,
                        risk_free_rate: 2.0,
                        option_type,
                    };
                    let model = BlackScholesModel::new(&terms.with_volatility(vol));
                    if model.greeks().vega < 0.5 {
                        continue;
                    }
                    let iv = solve_implied_volatility(model.price(), &terms);
                    assert!(iv.is_converged(), "{vol} {t} {strike} {option_type:?}: {iv:?}");
                    assert!(
                        (iv.volatility() - vol).abs() < 0.01,
                        "{vol} {t} {strike} {option_type:?}: got {}",
                        iv.volatility()
                    );
                    checked += 1;
                }
            }
        }
    }
    assert!(checked > 250, "only {checked} contracts checked");
}

// ===========================================================================
// Non-convergence
// ===========================================================================

#[test]
fn test_unreachable_put_target() {
    // Put intrinsic ~19.9; 12 is below anything a positive vol produces
    let terms = ContractTerms {
        spot: 80.0,
        strike: 100.0,
        time_to_expiry: 0.25,
        risk_free_rate: 2.0,
        option_type: OptionType::Put,
    };
    let iv = solve_implied_volatility(12.0, &terms);
    assert!(!iv.is_converged());
    assert!(iv.volatility() >= 0.1);
    assert!(iv.iterations() <= 100);
}

#[test]
fn test_target_above_spot_never_converges() {
    // A call can never be worth more than the underlying
    let terms = ContractTerms {
        spot: 100.0,
        strike: 100.0,
        time_to_expiry: 0.5,
        risk_free_rate: 2.0,
        option_type: OptionType::Call,
    };
    let iv = solve_implied_volatility(150.0, &terms);
    assert!(!iv.is_converged());
    assert!(iv.volatility() > 0.0);
}

#[test]
fn test_envelope_reports_best_effort() {
    let input = ImpliedVolInput {
        market_price: 12.0,
        spot: 80.0,
        strike: 100.0,
        time_to_expiry: Some(0.25),
        expiry_date: None,
        valuation_time: None,
        risk_free_rate: 2.0,
        option_type: OptionType::Put,
        solver: SolverConfig::default(),
    };
    let out = implied_vol::implied_volatility(&input).unwrap();
    assert!(!out.result.converged);
    assert!(out.result.stop_reason.is_some());
    assert!(out.result.price_error.abs() > 1.0);
    assert!(out.warnings.iter().any(|w| w.contains("best-effort")));

    let value = serde_json::to_value(&out).unwrap();
    assert_eq!(value["result"]["converged"], false);
    assert_eq!(value["assumptions"]["max_iterations"], 100);
}

#[test]
fn test_retry_with_different_initial_guess() {
    // A tight iteration budget from 20% fails; starting near the answer succeeds
    let terms = ContractTerms {
        spot: 100.0,
        strike: 130.0,
        time_to_expiry: 0.25,
        risk_free_rate: 2.0,
        option_type: OptionType::Call,
    };
    let target = BlackScholesModel::new(&terms.with_volatility(70.0)).price();

    let tight = ImpliedVolatilitySolver::new(SolverConfig::new().with_max_iterations(1));
    let first = tight.solve(target, &terms);
    assert_eq!(first.stop_reason(), Some(StopReason::MaxIterations));

    let retry = ImpliedVolatilitySolver::new(SolverConfig::new().with_initial_guess(69.0));
    let second = retry.solve(target, &terms);
    assert!(second.is_converged());
    assert_abs_diff_eq!(second.volatility(), 70.0, epsilon = 0.01);
}
