// ABOUTME: Parses listing date headers and match times into UTC timestamps.
// ABOUTME: The site renders local wall-clock time, so the caller supplies the offset explicitly.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Formats tried for `"<date> <time>"`, most specific first.
const LISTING_FORMATS: &[&str] = &[
    // "Sat, October 17, 2026 10:00 AM"
    "%a, %B %d, %Y %I:%M %p",
    // "October 17, 2026 10:00 AM"
    "%B %d, %Y %I:%M %p",
    // "Sat, October 17, 2026 22:00"
    "%a, %B %d, %Y %H:%M",
];

/// Combines a listing date header and a match time into a UTC timestamp.
///
/// `start_date` is the day header ("Sat, October 17, 2026"), `start_time`
/// the match time ("10:00 AM"), both in the wall-clock time of `timezone`.
/// Returns None when either part is missing or nothing parses (e.g. "TBD").
pub fn parse_listing_time(
    start_date: Option<&str>,
    start_time: Option<&str>,
    timezone: FixedOffset,
) -> Option<DateTime<Utc>> {
    let date = start_date.map(str::trim).filter(|s| !s.is_empty())?;
    let time = start_time.map(str::trim).filter(|s| !s.is_empty())?;
    let joined = format!("{} {}", date, time);

    for fmt in LISTING_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&joined, fmt) {
            let local = timezone.from_local_datetime(&naive).single()?;
            return Some(local.with_timezone(&Utc));
        }
    }
    None
}

/// Parses a window boundary given on the command line or in config.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` and bare `YYYY-MM-DD` (midnight);
/// the last two are read in `timezone`.
pub fn parse_boundary(s: &str, timezone: FixedOffset) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return timezone
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc));
    }

    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0)?;
        return timezone
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc));
    }

    None
}
