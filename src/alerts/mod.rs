//! # Alerts
//!
//! Detection results become [`Alert`]s here: one record per offending
//! subject per detector, carrying the evidence, a deterministic risk score
//! and a severity label.
//!
//! - [`scoring`] turns evidence into a risk score and severity.
//! - [`engine`] drives the detectors in batch and streaming mode, applies
//!   streaming dedup, and dispatches to a notifier.

pub mod engine;
pub mod scoring;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::detection::{GroupBy, WindowHit};

pub use engine::{AlertEngine, BatchThresholds, DeliveryFailure, ProcessReport, StreamOptions};

/// Which detector produced an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertType {
    /// Failed logins per IP over the whole collection.
    BruteForceAttack,
    /// Failed logins per user over the whole collection.
    SuspiciousUserActivity,
    /// Failed logins per IP inside a sliding window.
    BruteForceTimeWindow,
    /// Failed logins per user inside a sliding window.
    SuspiciousUserTimeWindow,
    /// Any events per IP over the whole collection (live-mode frequency check).
    HighFrequencyIp,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::BruteForceAttack => "BruteForceAttack",
            AlertType::SuspiciousUserActivity => "SuspiciousUserActivity",
            AlertType::BruteForceTimeWindow => "BruteForceTimeWindow",
            AlertType::SuspiciousUserTimeWindow => "SuspiciousUserTimeWindow",
            AlertType::HighFrequencyIp => "HighFrequencyIp",
        }
    }

    /// The event field this alert type is keyed on.
    pub fn group_by(&self) -> GroupBy {
        match self {
            AlertType::BruteForceAttack
            | AlertType::BruteForceTimeWindow
            | AlertType::HighFrequencyIp => GroupBy::Ip,
            AlertType::SuspiciousUserActivity | AlertType::SuspiciousUserTimeWindow => {
                GroupBy::User
            }
        }
    }

    /// Wrap a detection key in the subject variant this type reports on.
    pub fn subject(&self, key: &str) -> Subject {
        match self.group_by() {
            GroupBy::Ip => Subject::SourceIp(key.to_string()),
            GroupBy::User => Subject::User(key.to_string()),
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The IP or username an alert is about.
///
/// Serialized flattened into the alert as either `"source_ip"` or `"user"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    SourceIp(String),
    User(String),
}

impl Subject {
    pub fn value(&self) -> &str {
        match self {
            Subject::SourceIp(v) | Subject::User(v) => v,
        }
    }

    /// Wire name of the subject field.
    pub fn field_name(&self) -> &'static str {
        match self {
            Subject::SourceIp(_) => "source_ip",
            Subject::User(_) => "user",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// Detection payload attached to an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub count: usize,

    /// Present only for time-window detections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
}

impl Evidence {
    pub fn frequency(count: usize) -> Self {
        Self { count, duration_seconds: None }
    }
}

impl From<WindowHit> for Evidence {
    fn from(hit: WindowHit) -> Self {
        Self {
            count: hit.count,
            duration_seconds: Some(hit.duration_seconds),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected incident. Never mutated once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_type: AlertType,

    #[serde(flatten)]
    pub subject: Subject,

    pub evidence: Evidence,

    /// 0..=100, see [`scoring::risk_score`].
    pub risk_score: u8,

    pub severity: Severity,

    /// Wall-clock time the alert was generated, not the event time.
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Build a scored alert stamped with the current time.
    pub fn new(alert_type: AlertType, key: &str, evidence: Evidence) -> Self {
        let risk_score = scoring::risk_score(&evidence);
        Self {
            alert_type,
            subject: alert_type.subject(key),
            evidence,
            risk_score,
            severity: scoring::severity_for(risk_score),
            timestamp: Utc::now(),
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(self.alert_type, self.subject.value())
    }
}

/// `(alert_type, subject)`: at most one notification per pair in a
/// streaming run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    pub alert_type: AlertType,
    pub subject: String,
}

impl DedupKey {
    pub fn new(alert_type: AlertType, subject: &str) -> Self {
        Self { alert_type, subject: subject.to_string() }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.alert_type, self.subject)
    }
}
