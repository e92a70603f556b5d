//! Parser for Apache/Nginx access logs (common and combined format).
//!
//! Format: `IP - - [DD/Mon/YYYY:HH:MM:SS +ZZZZ] "METHOD /path HTTP/x.x" status size ["referer" "user-agent"]`
//!
//! Web requests carry no login outcome, so `event_type` stays absent. They
//! feed the per-IP activity counters and the top-N tables.
//!
//! Copyright (c) 2026 CIPS Corps. All rights reserved.

use crate::log_sources::LogSource;
use crate::NormalizedEvent;
use regex::Regex;
use std::sync::LazyLock;

static RE_ACCESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\S+) \S+ (\S+) \[([^\]]+)\] "(\S+) (\S+)(?: [^"]*)?" (\d{3}) (\S+)"#)
        .expect("regex")
});

#[derive(Debug, Clone, Default)]
pub struct WebLogSource {
    name: String,
}

impl WebLogSource {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string() }
    }
}

impl LogSource for WebLogSource {
    fn name(&self) -> &str {
        if self.name.is_empty() { "web-access" } else { &self.name }
    }

    fn parse_line(&self, line: &str) -> Option<NormalizedEvent> {
        let caps = RE_ACCESS.captures(line)?;
        let ip = caps.get(1)?.as_str();
        let auth_user = caps.get(2)?.as_str();
        let timestamp = caps.get(3)?.as_str();
        let method = caps.get(4)?.as_str();
        let url = caps.get(5)?.as_str();
        let status: u16 = caps.get(6)?.as_str().parse().ok()?;
        let size = caps.get(7)?.as_str().parse::<u64>().ok();

        Some(NormalizedEvent {
            timestamp: Some(timestamp.to_string()),
            ip: ip.parse::<std::net::IpAddr>().ok().map(|_| ip.to_string()),
            event_type: None,
            user: (auth_user != "-").then(|| auth_user.to_string()),
            method: Some(method.to_string()),
            url: Some(url.to_string()),
            status: Some(status),
            size,
        })
    }
}
