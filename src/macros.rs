//! Datetime macros (`@now`, `@todayStart`, ...).
//!
//! Macros are resolved per evaluation from an injected [`Clock`], always in
//! UTC. Datetime macros yield strings in the record datetime layout so
//! they compare against stored timestamps; the calendar-part macros
//! (`@second` .. `@year`) yield integers.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Timelike, Utc};

use crate::{
    ast::Macro,
    value::{Value, format_datetime},
};

/// Source of the current instant.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Resolves `m` relative to `now`.
pub fn resolve_macro(m: Macro, now: DateTime<Utc>) -> Value {
    let today = now.date_naive();
    let instant = match m {
        Macro::Second => return Value::Integer(i64::from(now.second())),
        Macro::Minute => return Value::Integer(i64::from(now.minute())),
        Macro::Hour => return Value::Integer(i64::from(now.hour())),
        Macro::Weekday => return Value::Integer(i64::from(now.weekday().num_days_from_sunday())),
        Macro::Day => return Value::Integer(i64::from(now.day())),
        Macro::Month => return Value::Integer(i64::from(now.month())),
        Macro::Year => return Value::Integer(i64::from(now.year())),
        Macro::Now => Some(now),
        Macro::Yesterday => now.checked_sub_signed(Duration::days(1)),
        Macro::Tomorrow => now.checked_add_signed(Duration::days(1)),
        Macro::TodayStart => start_of(today),
        Macro::TodayEnd => end_of(today),
        Macro::MonthStart => today.with_day(1).and_then(start_of),
        Macro::MonthEnd => today
            .with_day(1)
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .and_then(|next| next.pred_opt())
            .and_then(end_of),
        Macro::YearStart => NaiveDate::from_ymd_opt(today.year(), 1, 1).and_then(start_of),
        Macro::YearEnd => NaiveDate::from_ymd_opt(today.year(), 12, 31).and_then(end_of),
    };
    instant.map_or(Value::Null, |dt| Value::String(format_datetime(&dt)))
}

fn start_of(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_milli_opt(0, 0, 0, 0).map(|dt| dt.and_utc())
}

fn end_of(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_milli_opt(23, 59, 59, 999).map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_calendar_parts() {
        // 2024-02-29 was a Thursday
        let now = at(2024, 2, 29, 13, 45, 7);
        assert_eq!(resolve_macro(Macro::Second, now), Value::Integer(7));
        assert_eq!(resolve_macro(Macro::Minute, now), Value::Integer(45));
        assert_eq!(resolve_macro(Macro::Hour, now), Value::Integer(13));
        assert_eq!(resolve_macro(Macro::Weekday, now), Value::Integer(4));
        assert_eq!(resolve_macro(Macro::Day, now), Value::Integer(29));
        assert_eq!(resolve_macro(Macro::Month, now), Value::Integer(2));
        assert_eq!(resolve_macro(Macro::Year, now), Value::Integer(2024));
    }

    #[test]
    fn test_datetime_boundaries() {
        let now = at(2024, 2, 29, 13, 45, 7);
        let cases = [
            (Macro::Now, "2024-02-29 13:45:07.000Z"),
            (Macro::Yesterday, "2024-02-28 13:45:07.000Z"),
            (Macro::Tomorrow, "2024-03-01 13:45:07.000Z"),
            (Macro::TodayStart, "2024-02-29 00:00:00.000Z"),
            (Macro::TodayEnd, "2024-02-29 23:59:59.999Z"),
            (Macro::MonthStart, "2024-02-01 00:00:00.000Z"),
            (Macro::MonthEnd, "2024-02-29 23:59:59.999Z"),
            (Macro::YearStart, "2024-01-01 00:00:00.000Z"),
            (Macro::YearEnd, "2024-12-31 23:59:59.999Z"),
        ];
        for (m, expected) in cases {
            assert_eq!(resolve_macro(m, now), Value::from(expected), "@{}", m.name());
        }
    }

    #[test]
    fn test_month_end_in_december() {
        let now = at(2023, 12, 5, 0, 0, 0);
        assert_eq!(
            resolve_macro(Macro::MonthEnd, now),
            Value::from("2023-12-31 23:59:59.999Z")
        );
    }
}
