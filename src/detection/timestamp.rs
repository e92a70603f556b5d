//! Turning log-native timestamp text into comparable instants.
//!
//! Two shapes reach the detectors:
//! - syslog: `Nov 27 12:00:01` (no year, no zone)
//! - combined access log: `12/Feb/2025:14:20:33 +0100`
//!
//! Syslog timestamps carry no year. The policy is to stamp them with the
//! year current at the start of the scan and to treat them as UTC. Events
//! that straddle a year boundary therefore compare wrongly; this is a known
//! limitation of the log format, not something the detectors try to repair.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// "Mon DD HH:MM:SS", day may be space padded.
static RE_SYSLOG_TS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z][a-z]{2})\s+(\d{1,2})\s+(\d{2}):(\d{2}):(\d{2})").expect("regex")
});

/// "DD/Mon/YYYY:HH:MM:SS +ZZZZ"
static RE_COMBINED_TS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2})/([A-Z][a-z]{2})/(\d{4}):(\d{2}):(\d{2}):(\d{2}) ([+-]\d{4})$")
        .expect("regex")
});

/// Parse a timestamp using the current year for year-less syslog text.
pub fn parse_event_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    parse_event_timestamp_in_year(ts, Utc::now().year())
}

/// Parse a timestamp, stamping year-less syslog text with `year`.
///
/// Returns `None` for anything that is not one of the two known shapes or
/// that names an impossible date (e.g. `Feb 30`).
pub fn parse_event_timestamp_in_year(ts: &str, year: i32) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if let Some(caps) = RE_COMBINED_TS.captures(ts) {
        let day: u32 = caps.get(1)?.as_str().parse().ok()?;
        let month = month_number(caps.get(2)?.as_str())?;
        let year: i32 = caps.get(3)?.as_str().parse().ok()?;
        let time = hms(caps.get(4)?.as_str(), caps.get(5)?.as_str(), caps.get(6)?.as_str())?;
        let offset = parse_offset(caps.get(7)?.as_str())?;
        let naive = NaiveDateTime::new(NaiveDate::from_ymd_opt(year, month, day)?, time);
        let dt = offset.from_local_datetime(&naive).single()?;
        return Some(dt.with_timezone(&Utc));
    }

    let caps = RE_SYSLOG_TS.captures(ts)?;
    let month = month_number(caps.get(1)?.as_str())?;
    let day: u32 = caps.get(2)?.as_str().parse().ok()?;
    let time = hms(caps.get(3)?.as_str(), caps.get(4)?.as_str(), caps.get(5)?.as_str())?;
    let naive = NaiveDateTime::new(NaiveDate::from_ymd_opt(year, month, day)?, time);
    Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

fn month_number(month: &str) -> Option<u32> {
    let n = match month {
        "Jan" => 1, "Feb" => 2, "Mar" => 3, "Apr" => 4,
        "May" => 5, "Jun" => 6, "Jul" => 7, "Aug" => 8,
        "Sep" => 9, "Oct" => 10, "Nov" => 11, "Dec" => 12,
        _ => return None,
    };
    Some(n)
}

fn hms(h: &str, m: &str, s: &str) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(h.parse().ok()?, m.parse().ok()?, s.parse().ok()?)
}

fn parse_offset(tz: &str) -> Option<FixedOffset> {
    let sign: i32 = if tz.starts_with('-') { -1 } else { 1 };
    let hours: i32 = tz.get(1..3)?.parse().ok()?;
    let minutes: i32 = tz.get(3..5)?.parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
