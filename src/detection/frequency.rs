//! # Frequency Detectors
//!
//! Cumulative counts over the whole event collection. Timestamps are never
//! parsed here, so events with malformed or missing timestamps still count.
//!
//! Also home to the top-N ranking used by the `analyze` report.

use std::collections::{BTreeMap, HashMap};

use super::{FrequencyResult, GroupBy};
use crate::NormalizedEvent;

/// Count failed logins per subject and keep those at or above `threshold`.
///
/// Events missing the grouping key are skipped.
pub fn detect_failed_logins(
    events: &[NormalizedEvent],
    group_by: GroupBy,
    threshold: usize,
) -> FrequencyResult {
    let counts = count_by(
        events.iter().filter(|e| e.is_failed_login()),
        |e| group_by.key(e),
    );
    counts.into_iter().filter(|(_, count)| *count >= threshold).collect()
}

/// Failed logins per source IP. Default threshold in callers is 3.
pub fn detect_bruteforce_ips(events: &[NormalizedEvent], threshold: usize) -> FrequencyResult {
    detect_failed_logins(events, GroupBy::Ip, threshold)
}

/// Failed logins per non-empty username.
pub fn detect_suspicious_users(events: &[NormalizedEvent], threshold: usize) -> FrequencyResult {
    detect_failed_logins(events, GroupBy::User, threshold)
}

/// Events of any type per source IP.
///
/// Catches noisy sources whose traffic is not classified as failed logins,
/// e.g. access-log floods.
pub fn detect_high_frequency_ips(events: &[NormalizedEvent], threshold: usize) -> FrequencyResult {
    let counts = count_by(events.iter(), |e| GroupBy::Ip.key(e));
    counts.into_iter().filter(|(_, count)| *count >= threshold).collect()
}

fn count_by<'a, I, F>(events: I, key: F) -> BTreeMap<String, usize>
where
    I: Iterator<Item = &'a NormalizedEvent>,
    F: Fn(&'a NormalizedEvent) -> Option<&'a str>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for event in events {
        if let Some(k) = key(event) {
            *counts.entry(k.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

// ---------------------------------------------------------------------------
// Top-N ranking
// ---------------------------------------------------------------------------

/// The `n` most frequent source IPs across all events.
pub fn top_ips(events: &[NormalizedEvent], n: usize) -> Vec<(String, usize)> {
    top_n(events.iter().filter_map(|e| e.ip.as_deref()), n)
}

/// The `n` most frequent usernames across all events.
pub fn top_users(events: &[NormalizedEvent], n: usize) -> Vec<(String, usize)> {
    top_n(events.iter().filter_map(|e| e.user.as_deref()), n)
}

/// The `n` most requested URLs across all events.
pub fn top_urls(events: &[NormalizedEvent], n: usize) -> Vec<(String, usize)> {
    top_n(events.iter().filter_map(|e| e.url.as_deref()), n)
}

/// Ties are broken alphabetically so the ranking is stable.
fn top_n<'a>(values: impl Iterator<Item = &'a str>, n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values.filter(|v| !v.is_empty()) {
        *counts.entry(v).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, c)| (k.to_string(), c))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}
