//! Parser for Linux `/var/log/auth.log` (and `/var/log/secure` on RHEL).
//!
//! Every line carrying a syslog header becomes an event. sshd password and
//! publickey outcomes are classified; anything else keeps `event_type`
//! absent so it still counts toward per-IP activity.
//!
//! Design: substring checks first, regex only for field extraction.
//!
//! Copyright (c) 2026 CIPS Corps. All rights reserved.

use crate::log_sources::LogSource;
use crate::{EventType, NormalizedEvent};
use regex::Regex;
use std::sync::LazyLock;

// ---------------------------------------------------------------------------
// Compiled regexes
// ---------------------------------------------------------------------------

/// Syslog header: "Mon DD HH:MM:SS hostname process[PID]: message"
static RE_SYSLOG_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z][a-z]{2}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2})\s+\S+\s+(.*)$").expect("regex")
});

/// Username after "for", skipping the "invalid user" qualifier.
static RE_USER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bfor\s+(?:invalid user\s+)?(\S+)").expect("regex"));

static RE_IPV4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\b").expect("regex"));

// ---------------------------------------------------------------------------
// AuthLogSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthLogSource;

impl AuthLogSource {
    pub fn new() -> Self {
        Self
    }
}

impl LogSource for AuthLogSource {
    fn name(&self) -> &str {
        "auth.log"
    }

    fn parse_line(&self, line: &str) -> Option<NormalizedEvent> {
        let header = RE_SYSLOG_HEADER.captures(line)?;
        let timestamp = header.get(1)?.as_str();
        let message = header.get(2)?.as_str();

        let event_type = classify(message);
        let user = event_type
            .and_then(|_| RE_USER.captures(message))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        let ip = RE_IPV4
            .captures_iter(message)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .find(|s| s.parse::<std::net::Ipv4Addr>().is_ok())
            .map(str::to_string);

        Some(NormalizedEvent {
            timestamp: Some(normalize_spaces(timestamp)),
            ip,
            event_type,
            user,
            ..NormalizedEvent::default()
        })
    }
}

fn classify(message: &str) -> Option<EventType> {
    if message.contains("Failed password") {
        Some(EventType::FailedLogin)
    } else if message.contains("Accepted password") || message.contains("Accepted publickey") {
        Some(EventType::SuccessfulLogin)
    } else {
        None
    }
}

/// "Jan  5 14:23:01" -> "Jan 5 14:23:01"
fn normalize_spaces(ts: &str) -> String {
    ts.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
