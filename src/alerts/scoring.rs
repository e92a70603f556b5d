//! # Risk Scorer
//!
//! Combines attempt count and attack tempo into a single integer ranking.
//!
//! ## Scoring Model
//!
//! ```text
//! count    = evidence.count
//! duration = evidence.duration_seconds, or 60 when absent
//! score    = min(100, count * 12 + max(0, 60 - duration) * 2)
//! ```
//!
//! Each attempt adds 12 points. Window detections that packed their attempts
//! into less than a minute earn 2 extra points per second under 60. Plain
//! frequency detections carry no duration and get no tempo bonus.
//!
//! | score   | severity |
//! |---------|----------|
//! | >= 70   | HIGH     |
//! | >= 40   | MEDIUM   |
//! | < 40    | LOW      |

use super::{Alert, Evidence, Severity};

const POINTS_PER_ATTEMPT: i64 = 12;
const TEMPO_BASELINE_SECS: i64 = 60;
const POINTS_PER_FAST_SECOND: i64 = 2;
const MAX_SCORE: i64 = 100;

/// Deterministic risk score in `[0, 100]`.
pub fn risk_score(evidence: &Evidence) -> u8 {
    let count = i64::try_from(evidence.count).unwrap_or(i64::MAX);
    let duration = evidence.duration_seconds.unwrap_or(TEMPO_BASELINE_SECS);
    let tempo = (TEMPO_BASELINE_SECS - duration).max(0);

    let score = count
        .saturating_mul(POINTS_PER_ATTEMPT)
        .saturating_add(tempo.saturating_mul(POINTS_PER_FAST_SECOND))
        .clamp(0, MAX_SCORE);
    score as u8
}

/// Severity band for a risk score.
pub fn severity_for(score: u8) -> Severity {
    match score {
        s if s >= 70 => Severity::High,
        s if s >= 40 => Severity::Medium,
        _ => Severity::Low,
    }
}

/// Compact one-line summary for logging.
///
/// Example: "RISK 100 HIGH [count=5 duration=10s]"
pub fn format_score(alert: &Alert) -> String {
    match alert.evidence.duration_seconds {
        Some(d) => format!(
            "RISK {} {} [count={} duration={}s]",
            alert.risk_score, alert.severity, alert.evidence.count, d
        ),
        None => format!(
            "RISK {} {} [count={}]",
            alert.risk_score, alert.severity, alert.evidence.count
        ),
    }
}
