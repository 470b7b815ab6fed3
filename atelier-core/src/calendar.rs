//! Business-calendar arithmetic
//!
//! Deadlines expressed in business days skip weekends. Holidays are out of
//! scope; the calendar is Monday–Friday.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

/// Add `n` business days to `date`, skipping Saturdays and Sundays.
pub fn add_business_days(date: DateTime<Utc>, n: u32) -> DateTime<Utc> {
    let mut current = date;
    let mut remaining = n;
    while remaining > 0 {
        current += Duration::days(1);
        if !is_weekend(current) {
            remaining -= 1;
        }
    }
    current
}

fn is_weekend(date: DateTime<Utc>) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
