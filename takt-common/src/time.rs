//! Time helpers for the production-site clock
//!
//! All session timestamps are wall-clock times at the production site,
//! stored as naive local datetimes. Duration math must tolerate the
//! cross-midnight case where a shift ends on the following day.

use chrono::{Local, NaiveDateTime, Timelike};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Current wall-clock time at the production site, truncated to whole seconds
pub fn now_local() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Worked minutes between session start and end
///
/// A negative difference means the interval crossed midnight with the
/// end recorded on the "same" clock face (e.g. 23:50 to 00:10), so one
/// full day is added back.
pub fn duration_minutes(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    let minutes = end.signed_duration_since(start).num_minutes();
    if minutes < 0 {
        minutes + MINUTES_PER_DAY
    } else {
        minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_duration_same_day() {
        let start = ts(2025, 3, 14, 9, 0);
        let end = ts(2025, 3, 14, 9, 45);
        assert_eq!(duration_minutes(start, end), 45);
    }

    #[test]
    fn test_duration_zero() {
        let start = ts(2025, 3, 14, 9, 0);
        assert_eq!(duration_minutes(start, start), 0);
    }

    #[test]
    fn test_duration_cross_midnight_wrap() {
        // End recorded on the same date as start, clock wrapped past midnight
        let start = ts(2025, 3, 14, 23, 50);
        let end = ts(2025, 3, 14, 0, 10);
        assert_eq!(duration_minutes(start, end), 20);
    }

    #[test]
    fn test_duration_cross_midnight_real_dates() {
        // When the end carries the correct next-day date, no wrap is needed
        let start = ts(2025, 3, 14, 23, 50);
        let end = ts(2025, 3, 15, 0, 10);
        assert_eq!(duration_minutes(start, end), 20);
    }

    #[test]
    fn test_now_local_has_whole_seconds() {
        assert_eq!(now_local().nanosecond(), 0);
    }
}
