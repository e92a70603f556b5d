//! # Alert Engine
//!
//! Stateful coordinator between the detectors and the notifier.
//!
//! ## Batch mode
//! Each `generate_*` call runs one detector over the held events and
//! appends one scored alert per reported subject. Nothing is deduplicated:
//! calling the same generator twice reports the same subjects twice.
//!
//! ## Streaming mode
//! [`AlertEngine::process_event`] appends one event, re-runs both
//! time-window detectors (and optionally the high-frequency check) over the
//! whole collection, and emits each `(alert_type, subject)` pair at most once
//! for the lifetime of the engine. Registering the dedup key, recording the
//! alert and handing it to the notifier happen together in one call with no
//! yield point between them.
//!
//! The engine is single-writer: callers must not run `process_event`
//! concurrently. The dedup set is never pruned, so it grows with the number
//! of distinct pairs ever alerted.

use std::collections::HashSet;

use super::{Alert, AlertType, DedupKey, Evidence};
use crate::detection::{self, FrequencyResult, WindowResult};
use crate::notify::{ConsoleNotifier, Notifier};
use crate::{DetectionConfig, NormalizedEvent, SentinelError};

/// Thresholds for [`AlertEngine::generate_all`]. Every detector is tuned
/// independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchThresholds {
    pub bruteforce_threshold: usize,
    pub suspicious_user_threshold: usize,
    pub bruteforce_window_threshold: usize,
    pub bruteforce_window_seconds: u64,
    pub user_window_threshold: usize,
    pub user_window_seconds: u64,
}

impl Default for BatchThresholds {
    fn default() -> Self {
        Self::from(&DetectionConfig::default())
    }
}

impl From<&DetectionConfig> for BatchThresholds {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            bruteforce_threshold: config.bruteforce_threshold,
            suspicious_user_threshold: config.suspicious_user_threshold,
            bruteforce_window_threshold: config.time_window_threshold,
            bruteforce_window_seconds: config.window_seconds,
            user_window_threshold: config.time_window_threshold,
            user_window_seconds: config.window_seconds,
        }
    }
}

/// Parameters for [`AlertEngine::process_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOptions {
    pub time_window_threshold: usize,
    pub window_seconds: u64,
    pub frequency_threshold: usize,
    /// Also run the high-frequency IP check in the same pass.
    pub show_frequency: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self::from(&DetectionConfig::default())
    }
}

impl From<&DetectionConfig> for StreamOptions {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            time_window_threshold: config.time_window_threshold,
            window_seconds: config.window_seconds,
            frequency_threshold: config.frequency_threshold,
            show_frequency: config.show_frequency,
        }
    }
}

/// A notifier error for an alert that was nonetheless recorded as emitted.
#[derive(Debug)]
pub struct DeliveryFailure {
    pub key: DedupKey,
    pub error: SentinelError,
}

/// What one `process_event` call did.
#[derive(Debug, Default)]
pub struct ProcessReport {
    /// Alerts newly emitted (and handed to the notifier), in order.
    pub emitted: Vec<Alert>,

    /// Detections dropped because their dedup key was already registered.
    pub suppressed: usize,

    pub delivery_failures: Vec<DeliveryFailure>,
}

impl ProcessReport {
    pub fn is_clean(&self) -> bool {
        self.delivery_failures.is_empty()
    }
}

pub struct AlertEngine {
    events: Vec<NormalizedEvent>,
    alerts: Vec<Alert>,
    seen: HashSet<DedupKey>,
    notifier: Box<dyn Notifier>,
}

impl AlertEngine {
    /// Engine over `events`, printing streamed alerts to the console.
    pub fn new(events: Vec<NormalizedEvent>) -> Self {
        Self::with_notifier(events, ConsoleNotifier)
    }

    pub fn with_notifier(events: Vec<NormalizedEvent>, notifier: impl Notifier + 'static) -> Self {
        Self::with_boxed_notifier(events, Box::new(notifier))
    }

    pub fn with_boxed_notifier(events: Vec<NormalizedEvent>, notifier: Box<dyn Notifier>) -> Self {
        Self {
            events,
            alerts: Vec::new(),
            seen: HashSet::new(),
            notifier,
        }
    }

    pub fn events(&self) -> &[NormalizedEvent] {
        &self.events
    }

    /// Every alert emitted so far, oldest first.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    /// Number of registered dedup keys.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn has_seen(&self, key: &DedupKey) -> bool {
        self.seen.contains(key)
    }

    /// Drop the notifier (flushing any queued deliveries) and return the
    /// emitted alerts.
    pub fn finish(self) -> Vec<Alert> {
        drop(self.notifier);
        self.alerts
    }

    // -----------------------------------------------------------------------
    // Batch mode
    // -----------------------------------------------------------------------

    /// Failed logins per IP. Returns the alerts appended by this call.
    pub fn generate_bruteforce_alerts(&mut self, threshold: usize) -> &[Alert] {
        let result = detection::detect_bruteforce_ips(&self.events, threshold);
        self.append_frequency(AlertType::BruteForceAttack, result)
    }

    /// Failed logins per user.
    pub fn generate_suspicious_user_alerts(&mut self, threshold: usize) -> &[Alert] {
        let result = detection::detect_suspicious_users(&self.events, threshold);
        self.append_frequency(AlertType::SuspiciousUserActivity, result)
    }

    /// Failed logins per IP inside a sliding window.
    pub fn generate_bruteforce_time_window_alerts(
        &mut self,
        threshold: usize,
        window_seconds: u64,
    ) -> &[Alert] {
        let result = detection::detect_bruteforce_time_window(&self.events, threshold, window_seconds);
        self.append_window(AlertType::BruteForceTimeWindow, result)
    }

    /// Failed logins per user inside a sliding window.
    pub fn generate_suspicious_user_time_window_alerts(
        &mut self,
        threshold: usize,
        window_seconds: u64,
    ) -> &[Alert] {
        let result =
            detection::detect_suspicious_users_time_window(&self.events, threshold, window_seconds);
        self.append_window(AlertType::SuspiciousUserTimeWindow, result)
    }

    /// Run all four detectors. Returns everything appended by this call.
    pub fn generate_all(&mut self, thresholds: &BatchThresholds) -> &[Alert] {
        let start = self.alerts.len();
        self.generate_bruteforce_alerts(thresholds.bruteforce_threshold);
        self.generate_suspicious_user_alerts(thresholds.suspicious_user_threshold);
        self.generate_bruteforce_time_window_alerts(
            thresholds.bruteforce_window_threshold,
            thresholds.bruteforce_window_seconds,
        );
        self.generate_suspicious_user_time_window_alerts(
            thresholds.user_window_threshold,
            thresholds.user_window_seconds,
        );
        &self.alerts[start..]
    }

    fn append_frequency(&mut self, alert_type: AlertType, result: FrequencyResult) -> &[Alert] {
        let start = self.alerts.len();
        for (key, count) in result {
            self.alerts.push(Alert::new(alert_type, &key, Evidence::frequency(count)));
        }
        &self.alerts[start..]
    }

    fn append_window(&mut self, alert_type: AlertType, result: WindowResult) -> &[Alert] {
        let start = self.alerts.len();
        for (key, hit) in result {
            self.alerts.push(Alert::new(alert_type, &key, Evidence::from(hit)));
        }
        &self.alerts[start..]
    }

    // -----------------------------------------------------------------------
    // Streaming mode
    // -----------------------------------------------------------------------

    /// Accept one new event and alert on every subject newly over threshold.
    ///
    /// Already-alerted `(alert_type, subject)` pairs are suppressed before
    /// scoring. A notifier failure is reported in the returned
    /// [`ProcessReport`]; the alert still counts as emitted and will not be
    /// raised again.
    pub fn process_event(&mut self, event: NormalizedEvent, options: &StreamOptions) -> ProcessReport {
        self.events.push(event);

        let mut candidates: Vec<(AlertType, String, Evidence)> = Vec::new();

        let by_ip = detection::detect_bruteforce_time_window(
            &self.events,
            options.time_window_threshold,
            options.window_seconds,
        );
        candidates.extend(
            by_ip
                .into_iter()
                .map(|(k, hit)| (AlertType::BruteForceTimeWindow, k, Evidence::from(hit))),
        );

        let by_user = detection::detect_suspicious_users_time_window(
            &self.events,
            options.time_window_threshold,
            options.window_seconds,
        );
        candidates.extend(
            by_user
                .into_iter()
                .map(|(k, hit)| (AlertType::SuspiciousUserTimeWindow, k, Evidence::from(hit))),
        );

        if options.show_frequency {
            let noisy = detection::detect_high_frequency_ips(&self.events, options.frequency_threshold);
            candidates.extend(
                noisy
                    .into_iter()
                    .map(|(k, count)| (AlertType::HighFrequencyIp, k, Evidence::frequency(count))),
            );
        }

        let mut report = ProcessReport::default();
        for (alert_type, key, evidence) in candidates {
            let dedup_key = DedupKey::new(alert_type, &key);
            if self.seen.contains(&dedup_key) {
                report.suppressed += 1;
                continue;
            }
            self.seen.insert(dedup_key.clone());

            let alert = Alert::new(alert_type, &key, evidence);
            self.alerts.push(alert.clone());

            if let Err(error) = self.notifier.notify(&alert) {
                log::warn!("Alert {} recorded but delivery failed: {}", dedup_key, error);
                report.delivery_failures.push(DeliveryFailure { key: dedup_key, error });
            }
            report.emitted.push(alert);
        }
        report
    }
}
