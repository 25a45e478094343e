//! Period helpers: calendar-month bounds in epoch milliseconds.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

/// Inclusive `[from, to]` bounds of a calendar month in UTC milliseconds:
/// first day 00:00:00.000 through last day 23:59:59.000. Returns `None` for
/// an out-of-range month.
pub fn month_bounds(year: i32, month: u32) -> Option<(i64, i64)> {
    let start = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let next = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()?;
    let end = next - Duration::seconds(1);
    Some((start.timestamp_millis(), end.timestamp_millis()))
}

/// Bounds of the month containing `now`.
pub fn current_month(now: DateTime<Utc>) -> (i64, i64) {
    month_bounds(now.year(), now.month()).unwrap_or((0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leap_february_runs_through_the_29th() {
        let (from, to) = month_bounds(2024, 2).unwrap();
        assert_eq!(
            from,
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0)
                .unwrap()
                .timestamp_millis()
        );
        assert_eq!(
            to,
            Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59)
                .unwrap()
                .timestamp_millis()
        );
    }

    #[test]
    fn december_rolls_into_the_next_year() {
        let (_, to) = month_bounds(2025, 12).unwrap();
        assert_eq!(
            to,
            Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59)
                .unwrap()
                .timestamp_millis()
        );
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert!(month_bounds(2025, 13).is_none());
        assert!(month_bounds(2025, 0).is_none());
    }

    #[test]
    fn current_month_contains_now() {
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap();
        let (from, to) = current_month(now);
        assert!(from <= now.timestamp_millis());
        assert!(now.timestamp_millis() <= to);
    }
}
