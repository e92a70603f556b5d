//! # Sliding Time-Window Detectors
//!
//! For each subject, finds the largest number of failed logins that fit in
//! a window of `window_seconds`, and the span those attempts actually cover.
//!
//! Per subject the instants are sorted, then a two-pointer sweep runs: for
//! every start `i` the end pointer `j` advances while
//! `t[j] - t[i] <= window`. `j` never moves backwards across starts, so the
//! sweep is linear in the subject's event count after sorting. The best
//! window is only replaced on a strict improvement, so ties resolve to the
//! earliest window.
//!
//! Feed order is not trusted: a collection with out-of-order timestamps is
//! sorted per subject before windowing. Events whose timestamp does not
//! parse are left out of the scan.

use chrono::{DateTime, Datelike, Duration, Utc};
use std::collections::BTreeMap;

use super::timestamp::parse_event_timestamp_in_year;
use super::{GroupBy, WindowHit, WindowResult};
use crate::NormalizedEvent;

/// Densest-window scan grouped by `group_by`.
///
/// A subject is reported when its best window holds at least `threshold`
/// failed logins.
pub fn detect_time_window(
    events: &[NormalizedEvent],
    group_by: GroupBy,
    threshold: usize,
    window_seconds: u64,
) -> WindowResult {
    let year = Utc::now().year();
    let mut grouped: BTreeMap<&str, Vec<DateTime<Utc>>> = BTreeMap::new();

    for event in events.iter().filter(|e| e.is_failed_login()) {
        let Some(key) = group_by.key(event) else {
            continue;
        };
        let Some(raw_ts) = event.timestamp.as_deref() else {
            continue;
        };
        match parse_event_timestamp_in_year(raw_ts, year) {
            Some(instant) => grouped.entry(key).or_default().push(instant),
            None => log::debug!("Skipping event for {} with unparseable timestamp {:?}", key, raw_ts),
        }
    }

    let window = i64::try_from(window_seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX);
    let mut result = WindowResult::new();
    for (key, mut instants) in grouped {
        instants.sort_unstable();
        if let Some(hit) = densest_window(&instants, window) {
            if hit.count >= threshold {
                result.insert(key.to_string(), hit);
            }
        }
    }
    result
}

/// Failed logins per IP within a sliding window.
pub fn detect_bruteforce_time_window(
    events: &[NormalizedEvent],
    threshold: usize,
    window_seconds: u64,
) -> WindowResult {
    detect_time_window(events, GroupBy::Ip, threshold, window_seconds)
}

/// Failed logins per user within a sliding window.
pub fn detect_suspicious_users_time_window(
    events: &[NormalizedEvent],
    threshold: usize,
    window_seconds: u64,
) -> WindowResult {
    detect_time_window(events, GroupBy::User, threshold, window_seconds)
}

/// Two-pointer sweep over ascending `instants`.
///
/// Returns `None` only for an empty slice.
pub fn densest_window(instants: &[DateTime<Utc>], window: Duration) -> Option<WindowHit> {
    let n = instants.len();
    if n == 0 {
        return None;
    }

    let mut best_count = 0usize;
    let mut best_span = (0usize, 0usize);
    let mut j = 0usize;

    for i in 0..n {
        if j < i {
            j = i;
        }
        while j < n && instants[j] - instants[i] <= window {
            j += 1;
        }
        // instants[i..j] all fit in the window starting at i
        let count = j - i;
        if count > best_count {
            best_count = count;
            best_span = (i, j - 1);
        }
    }

    let duration = instants[best_span.1] - instants[best_span.0];
    Some(WindowHit {
        count: best_count,
        duration_seconds: duration.num_seconds(),
    })
}
