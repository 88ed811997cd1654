//! Standard 5-field cron evaluation (minute, hour, day-of-month, month,
//! day-of-week). No seconds precision, no year field.

use chrono::{DateTime, Utc};
use cron::Schedule as CronSchedule;
use std::str::FromStr;
use tempo_core::error::{Error, Result};

/// Next fire time strictly after `now`, or `invalid-cron` on parse failure.
/// Pure: no I/O, no state beyond the `now` argument.
pub fn next_run_time(cron_expr: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let schedule = parse(cron_expr)?;
    schedule
        .after(&now)
        .next()
        .ok_or_else(|| Error::invalid_cron(cron_expr, "expression has no future fire time"))
}

/// Parses a 5-field expression, rejecting anything with seconds or a year
/// field by prepending a fixed `0` seconds column before handing it to the
/// `cron` crate, which natively expects six or seven fields.
fn parse(cron_expr: &str) -> Result<CronSchedule> {
    let fields: Vec<&str> = cron_expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(Error::invalid_cron(
            cron_expr,
            format!("expected 5 fields (minute hour day-of-month month day-of-week), got {}", fields.len()),
        ));
    }
    let six_field = format!("0 {cron_expr}");
    CronSchedule::from_str(&six_field)
        .map_err(|e| Error::invalid_cron(cron_expr, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn every_five_minutes_lands_on_the_next_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 3, 0).unwrap();
        let next = next_run_time("*/5 * * * *", now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 1, 12, 5, 0).unwrap());
    }

    #[test]
    fn result_is_always_strictly_after_now() {
        let now = Utc::now();
        let next = next_run_time("0 0 * * *", now).unwrap();
        assert!(next > now);
    }

    #[test]
    fn identical_expression_and_instant_produce_identical_results() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 8, 0, 0).unwrap();
        let a = next_run_time("30 9 * * 1-5", now).unwrap();
        let b = next_run_time("30 9 * * 1-5", now).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn wrong_field_count_is_invalid_cron() {
        let err = next_run_time("* * * *", Utc::now()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CRON");
    }

    #[test]
    fn garbage_expression_is_invalid_cron() {
        let err = next_run_time("not a cron", Utc::now()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CRON");
    }
}
