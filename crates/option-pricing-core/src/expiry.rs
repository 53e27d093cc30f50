//! Calendar expiry dates to year fractions.
//!
//! Expiry dates are taken at midnight UTC and compared with "now" on the same
//! UTC epoch-millisecond scale, so the local timezone of the caller never
//! shifts the result by a fraction of a day.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PricingError;
use crate::types::*;
use crate::PricingResult;

/// Milliseconds in a 365-day year
pub const MILLIS_PER_YEAR: f64 = 1000.0 * 60.0 * 60.0 * 24.0 * 365.0;

/// Days per year used for year fractions and per-day theta
pub const DAYS_PER_YEAR: f64 = 365.0;

// ---------------------------------------------------------------------------
// Year fractions
// ---------------------------------------------------------------------------

/// Milliseconds between `now` and midnight UTC of `expiry`. Negative once expired.
fn millis_until(expiry: NaiveDate, now: DateTime<Utc>) -> i64 {
    let expiry_utc = expiry.and_time(NaiveTime::MIN).and_utc();
    expiry_utc.timestamp_millis() - now.timestamp_millis()
}

/// Year fraction from `now` until midnight UTC on `expiry`.
///
/// Returns exactly `0.0` once the expiry instant has been reached.
pub fn year_fraction_between(expiry: NaiveDate, now: DateTime<Utc>) -> Years {
    let diff_ms = millis_until(expiry, now);
    if diff_ms <= 0 {
        return 0.0;
    }
    diff_ms as f64 / MILLIS_PER_YEAR
}

/// Year fraction until `expiry` measured from the current UTC wall clock.
pub fn time_to_expiry(expiry: NaiveDate) -> Years {
    year_fraction_between(expiry, Utc::now())
}

/// Parse an ISO `YYYY-MM-DD` expiry date.
pub fn parse_expiry_date(s: &str) -> PricingResult<NaiveDate> {
    Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)
}

/// Resolve a request's time to expiry from either an explicit year fraction
/// or an expiry date (optionally evaluated at `valuation_time`).
pub fn resolve_time_to_expiry(
    time_to_expiry: Option<Years>,
    expiry_date: Option<NaiveDate>,
    valuation_time: Option<DateTime<Utc>>,
) -> PricingResult<Years> {
    match (time_to_expiry, expiry_date) {
        (Some(t), None) => Ok(t),
        (None, Some(date)) => Ok(year_fraction_between(
            date,
            valuation_time.unwrap_or_else(Utc::now),
        )),
        (Some(_), Some(_)) => Err(PricingError::InvalidInput {
            field: "expiry_date".into(),
            reason: "provide either time_to_expiry or expiry_date, not both".into(),
        }),
        (None, None) => Err(PricingError::MissingExpiry),
    }
}

// ---------------------------------------------------------------------------
// Public API: year_fraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearFractionInput {
    pub expiry_date: NaiveDate,
    /// Evaluation instant; the current UTC time when absent
    #[serde(default)]
    pub valuation_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearFractionOutput {
    pub year_fraction: Years,
    pub days_to_expiry: f64,
    pub expired: bool,
}

pub fn year_fraction(
    input: &YearFractionInput,
) -> PricingResult<ComputationOutput<YearFractionOutput>> {
    let start = Instant::now();
    let now = input.valuation_time.unwrap_or_else(Utc::now);

    let year_fraction = year_fraction_between(input.expiry_date, now);
    let output = YearFractionOutput {
        year_fraction,
        days_to_expiry: year_fraction * DAYS_PER_YEAR,
        expired: millis_until(input.expiry_date, now) <= 0,
    };

    let mut warnings = Vec::new();
    if output.expired {
        warnings.push(format!(
            "Expiry {} is not after valuation time {}; year fraction is 0",
            input.expiry_date,
            now.to_rfc3339()
        ));
    }

    let assumptions = serde_json::json!({
        "day_count": "ACT/365 (UTC epoch milliseconds)",
        "expiry_time": "00:00 UTC",
        "valuation_time": now.to_rfc3339(),
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Calendar year fraction",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_whole_days_at_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 2, 12, 0, 0, 0).unwrap();
        let t = year_fraction_between(date(2026, 3, 20), now);
        assert!((t - 36.0 / 365.0).abs() < 1e-12);
    }

    #[test]
    fn test_intraday_now_counts_partial_day() {
        // 18:00 UTC leaves a quarter of the day before midnight
        let now = Utc.with_ymd_and_hms(2026, 3, 19, 18, 0, 0).unwrap();
        let t = year_fraction_between(date(2026, 3, 20), now);
        assert!((t - 0.25 / 365.0).abs() < 1e-12);
    }

    #[test]
    fn test_expired_is_zero() {
        let now = Utc.with_ymd_and_hms(2026, 3, 21, 9, 30, 0).unwrap();
        assert_eq!(year_fraction_between(date(2026, 3, 20), now), 0.0);
    }

    #[test]
    fn test_expiry_instant_is_zero() {
        let now = Utc.with_ymd_and_hms(2026, 3, 20, 0, 0, 0).unwrap();
        assert_eq!(year_fraction_between(date(2026, 3, 20), now), 0.0);
    }

    #[test]
    fn test_time_to_expiry_now() {
        let now = Utc::now();
        let far = now.date_naive() + chrono::Duration::days(400);
        let t = year_fraction_between(far, now);
        assert!(t > 399.0 / 365.0 && t <= 400.0 / 365.0);

        // reads the clock again, so allow for a UTC midnight in between
        let live = time_to_expiry(far);
        assert!(live > 398.0 / 365.0 && live <= 400.0 / 365.0);
        assert_eq!(time_to_expiry(date(2000, 1, 1)), 0.0);
    }

    #[test]
    fn test_parse_expiry_date() {
        assert_eq!(parse_expiry_date("2026-03-20").unwrap(), date(2026, 3, 20));
        assert_eq!(parse_expiry_date(" 2026-03-20 ").unwrap(), date(2026, 3, 20));
        assert!(matches!(
            parse_expiry_date("20/03/2026"),
            Err(PricingError::DateError(_))
        ));
    }

    #[test]
    fn test_resolve_time_to_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 2, 12, 0, 0, 0).unwrap();
        assert_eq!(resolve_time_to_expiry(Some(0.5), None, None).unwrap(), 0.5);

        let t = resolve_time_to_expiry(None, Some(date(2026, 3, 20)), Some(now)).unwrap();
        assert!((t - 36.0 / 365.0).abs() < 1e-12);

        assert!(matches!(
            resolve_time_to_expiry(None, None, None),
            Err(PricingError::MissingExpiry)
        ));
        assert!(matches!(
            resolve_time_to_expiry(Some(0.5), Some(date(2026, 3, 20)), None),
            Err(PricingError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_year_fraction_envelope() {
        let input = YearFractionInput {
            expiry_date: date(2026, 3, 20),
            valuation_time: Some(Utc.with_ymd_and_hms(2026, 2, 12, 0, 0, 0).unwrap()),
        };
        let out = year_fraction(&input).unwrap();
        assert!((out.result.days_to_expiry - 36.0).abs() < 1e-9);
        assert!(!out.result.expired);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_year_fraction_envelope_expired_warns() {
        let input = YearFractionInput {
            expiry_date: date(2026, 3, 20),
            valuation_time: Some(Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap()),
        };
        let out = year_fraction(&input).unwrap();
        assert_eq!(out.result.year_fraction, 0.0);
        assert!(out.result.expired);
        assert_eq!(out.warnings.len(), 1);
    }
}
