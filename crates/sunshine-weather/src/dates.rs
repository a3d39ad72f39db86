//! Date normalization and display helpers.
//!
//! Forecast rows are keyed by a *normalized date*: the UTC millisecond
//! timestamp of midnight at the start of a calendar day. The calendar day a
//! row describes is therefore simply the UTC date of its key, regardless of
//! the viewer's time zone.

use chrono::{DateTime, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

pub const SECOND_IN_MILLIS: i64 = 1000;
pub const MINUTE_IN_MILLIS: i64 = SECOND_IN_MILLIS * 60;
pub const HOUR_IN_MILLIS: i64 = MINUTE_IN_MILLIS * 60;
pub const DAY_IN_MILLIS: i64 = HOUR_IN_MILLIS * 24;

/// Truncate a UTC timestamp to the start of its UTC day.
pub fn normalize_date(millis: i64) -> i64 {
    millis.div_euclid(DAY_IN_MILLIS) * DAY_IN_MILLIS
}

pub fn is_date_normalized(millis: i64) -> bool {
    millis.rem_euclid(DAY_IN_MILLIS) == 0
}

/// Normalized key for a calendar date.
pub fn normalized_from_date(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

/// Calendar date described by a normalized key.
pub fn date_from_normalized(millis: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .date_naive()
}

/// The viewer's current calendar date, as a normalized key.
///
/// A user in UTC-7 at 20:00 on June 8 still gets June 8, even though the
/// UTC clock already reads June 9.
pub fn normalized_utc_date_for_today<Tz: TimeZone>(now: &DateTime<Tz>) -> i64 {
    normalized_from_date(now.date_naive())
}

/// Offset of `tz` from UTC at the given instant, in millis.
pub fn offset_millis<Tz: TimeZone>(tz: &Tz, utc_millis: i64) -> i64 {
    let instant = DateTime::<Utc>::from_timestamp_millis(utc_millis).unwrap_or_default();
    let offset = tz.offset_from_utc_datetime(&instant.naive_utc()).fix();
    i64::from(offset.local_minus_utc()) * SECOND_IN_MILLIS
}

/// Days since the epoch of the local date containing `millis`.
pub fn day_number<Tz: TimeZone>(millis: i64, tz: &Tz) -> i64 {
    (millis + offset_millis(tz, millis)).div_euclid(DAY_IN_MILLIS)
}

/// Shift a UTC timestamp so that it reads as the same wall-clock time in `tz`.
pub fn local_date_from_utc<Tz: TimeZone>(utc_millis: i64, tz: &Tz) -> i64 {
    utc_millis - offset_millis(tz, utc_millis)
}

/// Inverse of [`local_date_from_utc`].
pub fn utc_date_from_local<Tz: TimeZone>(local_millis: i64, tz: &Tz) -> i64 {
    local_millis + offset_millis(tz, local_millis)
}

/// Name for a day relative to today: "Today", "Tomorrow", or the weekday.
pub fn day_name(day: NaiveDate, today: NaiveDate) -> String {
    match (day - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => day.format("%A").to_string(),
    }
}

/// User-facing representation of a normalized date.
///
/// - Today, or any day when `show_full_date` is set: `"Saturday, June 8"`,
///   with the weekday replaced by "Today"/"Tomorrow" when it applies.
/// - Within the coming week: just the day name (`"Tomorrow"`, `"Wednesday"`).
/// - Further out: abbreviated, `"Sun, Jun 16"`.
pub fn friendly_date_string<Tz: TimeZone>(
    normalized_millis: i64,
    show_full_date: bool,
    now: &DateTime<Tz>,
) -> String {
    let day = date_from_normalized(normalized_millis);
    let today = now.date_naive();
    let days_ahead = (day - today).num_days();

    if days_ahead == 0 || show_full_date {
        if days_ahead < 2 {
            format!("{}, {}", day_name(day, today), day.format("%B %-d"))
        } else {
            day.format("%A, %B %-d").to_string()
        }
    } else if days_ahead < 7 {
        day_name(day, today)
    } else {
        day.format("%a, %b %-d").to_string()
    }
}
