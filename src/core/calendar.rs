//! Calendar-day bucketing for care history
//!
//! Care days are UTC calendar dates. Both partners' devices must agree on
//! which day an action belongs to, so the host timezone never enters into it.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Calendar day (UTC) a timestamp falls on
pub fn care_day(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

/// The calendar day immediately before `day`
///
/// Saturates at `NaiveDate::MIN`.
pub fn previous_day(day: NaiveDate) -> NaiveDate {
    day.pred_opt().unwrap_or(day)
}

/// Whole calendar days from `earlier` to `later` (negative if reversed)
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

/// Hours elapsed between two instants as a fraction
///
/// Negative spans (clock skew between devices) count as zero.
pub fn elapsed_hours(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let span: Duration = to - from;
    (span.num_milliseconds().max(0) as f64) / 3_600_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_care_day_uses_utc() {
        // 23:30 UTC stays on the same UTC date regardless of host timezone
        let late = Utc.with_ymd_and_hms(2024, 3, 10, 23, 30, 0).unwrap();
        assert_eq!(care_day(late), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());

        let early = Utc.with_ymd_and_hms(2024, 3, 11, 0, 5, 0).unwrap();
        assert_eq!(care_day(early), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
    }

    #[test]
    fn test_previous_day_crosses_month() {
        let first = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(previous_day(first), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_days_between() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        assert_eq!(days_between(a, b), 3);
        assert_eq!(days_between(b, a), -3);
    }

    #[test]
    fn test_elapsed_hours_clamps_negative() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let t1 = t0 + Duration::minutes(90);
        assert!((elapsed_hours(t0, t1) - 1.5).abs() < 1e-9);
        assert_eq!(elapsed_hours(t1, t0), 0.0);
    }
}
