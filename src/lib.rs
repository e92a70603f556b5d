//! # Log Sentinel - Core Library
//!
//! Brute-force detection over SSH authentication and HTTP access logs.
//!
//! Log lines are normalized into [`NormalizedEvent`]s by the adapters in
//! [`log_sources`], scanned by the stateless detectors in [`detection`]
//! (cumulative frequency and sliding time window), and turned into scored,
//! deduplicated alerts by [`alerts::AlertEngine`], which hands them to a
//! [`notify::Notifier`].
//!
//! ## Pipeline
//! ```text
//! log_sources  ->  detection  ->  alerts  ->  notify
//!  (parse)         (scan)        (score,      (console, jsonl,
//!                                 dedup)       webhook, email)
//! ```

pub mod alerts;
pub mod detection;
pub mod log_sources;
pub mod notify;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Unified error type for Log Sentinel.
#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Log parse error: {0}")]
    LogParse(String),

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

pub type SentinelResult<T> = Result<T, SentinelError>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Top-level configuration for Log Sentinel.
///
/// Loaded from `log-sentinel.toml` in the working directory or a path
/// supplied via CLI flag. Every section has defaults, so a partial file is
/// accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    /// Detector thresholds and window width.
    pub detection: DetectionConfig,

    /// Live monitoring (file tail) settings.
    pub monitor: MonitorConfig,

    /// Alert delivery channels.
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Failed logins per IP before a brute-force alert.
    pub bruteforce_threshold: usize,

    /// Failed logins per user before a suspicious-user alert.
    pub suspicious_user_threshold: usize,

    /// Failed logins inside one window before a time-window alert.
    pub time_window_threshold: usize,

    /// Width of the sliding window in seconds.
    pub window_seconds: u64,

    /// Events per IP before a high-frequency alert in live mode.
    pub frequency_threshold: usize,

    /// Run the high-frequency check alongside the window detectors in live mode.
    pub show_frequency: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            bruteforce_threshold: 3,
            suspicious_user_threshold: 3,
            time_window_threshold: 3,
            window_seconds: 60,
            frequency_threshold: 20,
            show_frequency: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// How often the tailed file is checked for new lines.
    pub poll_interval_ms: u64,

    /// Capacity of the bounded channel between the tail producer and the
    /// alert engine.
    pub channel_capacity: usize,

    /// Read the file from the beginning instead of only new lines.
    pub from_start: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            channel_capacity: 1024,
            from_start: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Print every alert to stdout.
    pub console: bool,

    /// Append every alert as a JSON line to this file.
    pub alert_log_path: Option<PathBuf>,

    /// POST every alert as JSON to this URL.
    pub webhook_url: Option<String>,

    /// Deliver on a background worker instead of the detection thread.
    pub queued: bool,

    pub email: EmailConfig,

    pub retry: RetryConfig,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            console: true,
            alert_log_path: None,
            webhook_url: None,
            queued: false,
            email: EmailConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,

    /// Log the message instead of queueing it.
    pub dry_run: bool,

    /// Sender address. Falls back to `EMAIL_FROM`.
    pub from_addr: Option<String>,

    /// Recipients. Falls back to the comma-separated `EMAIL_TO`.
    pub to_addrs: Vec<String>,

    /// Spool directory where `.eml` files are dropped for the local MTA.
    pub queue_dir: PathBuf,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dry_run: true,
            from_addr: None,
            to_addrs: Vec::new(),
            queue_dir: PathBuf::from("./sentinel-data/email_queue"),
        }
    }
}

/// Backoff schedule for transports that may fail transiently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            multiplier: 2.0,
            max_backoff_ms: 5000,
        }
    }
}

impl SentinelConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> SentinelResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SentinelConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> SentinelResult<Self> {
        if path.exists() {
            log::info!("Loading configuration from: {}", path.display());
            Self::from_file(path)
        } else {
            log::info!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Write the default configuration to a TOML file.
    pub fn write_default(path: &Path) -> SentinelResult<()> {
        let config = Self::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| SentinelError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the detectors cannot work with.
    pub fn validate(&self) -> SentinelResult<()> {
        let d = &self.detection;
        let thresholds = [
            ("bruteforce_threshold", d.bruteforce_threshold),
            ("suspicious_user_threshold", d.suspicious_user_threshold),
            ("time_window_threshold", d.time_window_threshold),
            ("frequency_threshold", d.frequency_threshold),
        ];
        for (name, value) in thresholds {
            if value == 0 {
                return Err(SentinelError::Config(format!("{} must be at least 1", name)));
            }
        }
        if d.window_seconds == 0 {
            return Err(SentinelError::Config("window_seconds must be at least 1".into()));
        }
        if self.monitor.channel_capacity == 0 {
            return Err(SentinelError::Config("channel_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Core Types
// ---------------------------------------------------------------------------

/// Outcome classification carried by a normalized event.
///
/// Only [`EventType::FailedLogin`] drives detection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    FailedLogin,
    SuccessfulLogin,
}

/// A log line reduced to the fields every adapter agrees on.
///
/// Produced by a [`log_sources::LogSource`], read (never mutated) by the
/// detectors. `timestamp` keeps the log-native text; the detectors parse it
/// on demand, see [`detection::timestamp`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub timestamp: Option<String>,
    pub ip: Option<String>,
    pub event_type: Option<EventType>,
    pub user: Option<String>,
    pub method: Option<String>,
    pub url: Option<String>,
    pub status: Option<u16>,
    pub size: Option<u64>,
}

impl NormalizedEvent {
    /// A bare failed-login event, the shape the detectors care about.
    pub fn failed_login(ip: Option<&str>, user: Option<&str>, timestamp: Option<&str>) -> Self {
        Self {
            timestamp: timestamp.map(str::to_string),
            ip: ip.map(str::to_string),
            event_type: Some(EventType::FailedLogin),
            user: user.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn is_failed_login(&self) -> bool {
        self.event_type == Some(EventType::FailedLogin)
    }
}
