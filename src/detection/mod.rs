//! # Detection Engine
//!
//! Pure analytic transforms over a collection of [`NormalizedEvent`]s. No
//! state survives between calls: each detector receives the full current
//! collection, scans it, and returns a fresh mapping of offending subject
//! (IP address or username) to evidence.
//!
//! Two families:
//! - [`frequency`] counts qualifying events per subject over the whole
//!   collection.
//! - [`window`] finds, per subject, the densest span of qualifying events
//!   that fits inside a sliding window of fixed width.
//!
//! A qualifying event is one with `event_type == failed_login`. Results use
//! ordered maps so that alerts derived from them come out in a stable order.

pub mod frequency;
pub mod timestamp;
pub mod window;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::NormalizedEvent;

pub use frequency::{
    detect_bruteforce_ips, detect_high_frequency_ips, detect_suspicious_users, top_ips,
    top_urls, top_users,
};
pub use window::{detect_bruteforce_time_window, detect_suspicious_users_time_window};

/// Which event field a detector groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupBy {
    Ip,
    User,
}

impl GroupBy {
    /// The grouping key of `event`, or `None` when it is absent or empty.
    pub fn key<'a>(&self, event: &'a NormalizedEvent) -> Option<&'a str> {
        let value = match self {
            GroupBy::Ip => event.ip.as_deref(),
            GroupBy::User => event.user.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Evidence from a time-window detector.
///
/// `count` is the largest number of qualifying events inside any window of
/// the configured width; `duration_seconds` is the span actually covered by
/// the attempts realizing that maximum (never more than the window width).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowHit {
    pub count: usize,
    pub duration_seconds: i64,
}

/// Subject -> number of qualifying events.
pub type FrequencyResult = BTreeMap<String, usize>;

/// Subject -> densest window found.
pub type WindowResult = BTreeMap<String, WindowHit>;
