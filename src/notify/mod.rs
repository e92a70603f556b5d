//! # Alert Delivery
//!
//! Every alert the engine emits is handed to a [`Notifier`]. The default is
//! [`ConsoleNotifier`], which prints one line per alert; any closure of the
//! shape `FnMut(&Alert) -> SentinelResult<()>` works too.
//!
//! Transports:
//! - [`jsonl::JsonlNotifier`] appends alerts to a JSON-lines file.
//! - [`webhook::WebhookNotifier`] POSTs alerts as JSON (Slack, Teams, generic).
//! - [`email::EmailNotifier`] builds an RFC 822 message and either logs it
//!   (dry-run) or drops it in a spool directory for the local MTA.
//!
//! Wrappers:
//! - [`retry::Retrying`] redelivers with exponential backoff.
//! - [`queued::QueuedNotifier`] moves delivery onto a worker thread behind a
//!   bounded queue.
//! - [`FanoutNotifier`] delivers to several channels in order.

pub mod email;
pub mod jsonl;
pub mod queued;
pub mod retry;
pub mod webhook;

use crate::alerts::Alert;
use crate::{NotifyConfig, SentinelResult};

/// Capability to deliver one finished alert.
///
/// Called synchronously, in emission order, once per non-suppressed alert.
/// An `Err` is reported back to the caller of the engine; it never causes
/// the alert to be emitted again.
pub trait Notifier {
    fn notify(&mut self, alert: &Alert) -> SentinelResult<()>;
}

impl<F> Notifier for F
where
    F: FnMut(&Alert) -> SentinelResult<()>,
{
    fn notify(&mut self, alert: &Alert) -> SentinelResult<()> {
        self(alert)
    }
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Prints one human-readable line per alert to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, alert: &Alert) -> SentinelResult<()> {
        println!("{}", render_alert_line(alert));
        Ok(())
    }
}

/// `[HIGH] BruteForceTimeWindow id=1.2.3.4 | score=100 | count=5 | duration_seconds=10 | <ts>`
pub fn render_alert_line(alert: &Alert) -> String {
    let mut parts = vec![
        format!("[{}] {} id={}", alert.severity, alert.alert_type, alert.subject),
        format!("score={}", alert.risk_score),
        format!("count={}", alert.evidence.count),
    ];
    if let Some(d) = alert.evidence.duration_seconds {
        parts.push(format!("duration_seconds={}", d));
    }
    parts.push(alert.timestamp.to_rfc3339());
    parts.join(" | ")
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

/// Delivers each alert to every registered channel, in registration order.
///
/// A failing channel does not stop the others. The first error is returned
/// once all channels have been tried.
#[derive(Default)]
pub struct FanoutNotifier {
    channels: Vec<(String, Box<dyn Notifier + Send>)>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, notifier: impl Notifier + Send + 'static) {
        log::info!("Registered alert channel: {}", name);
        self.channels.push((name.to_string(), Box::new(notifier)));
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl Notifier for FanoutNotifier {
    fn notify(&mut self, alert: &Alert) -> SentinelResult<()> {
        let mut first_error = None;
        for (name, channel) in &mut self.channels {
            if let Err(e) = channel.notify(alert) {
                log::error!("[NOTIFY] {} failed for {}: {}", name, alert.dedup_key(), e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Assemble the delivery stack described by `config`.
pub fn build_notifier(config: &NotifyConfig) -> SentinelResult<Box<dyn Notifier>> {
    let policy = retry::RetryPolicy::from(&config.retry);
    let mut fanout = FanoutNotifier::new();

    if config.console {
        fanout.add("console", ConsoleNotifier);
    }
    if let Some(ref path) = config.alert_log_path {
        fanout.add("jsonl", jsonl::JsonlNotifier::new(path.clone()));
    }
    if let Some(ref url) = config.webhook_url {
        let webhook = webhook::WebhookNotifier::new(url)?;
        fanout.add("webhook", retry::Retrying::new(webhook, policy.clone()));
    }
    if config.email.enabled {
        let email = email::EmailNotifier::from_config(&config.email);
        fanout.add("email", retry::Retrying::new(email, policy));
    }

    if config.queued {
        Ok(Box::new(queued::QueuedNotifier::spawn(fanout, queued::DEFAULT_QUEUE_CAPACITY)?))
    } else {
        Ok(Box::new(fanout))
    }
}

/// Get the system hostname, falling back to "unknown" on error.
pub(crate) fn hostname_string() -> String {
    if cfg!(target_os = "windows") {
        std::env::var("COMPUTERNAME").unwrap_or_else(|_| "unknown".to_string())
    } else {
        std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("HOST"))
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertType, Evidence};
    use crate::SentinelError;
    use std::sync::{Arc, Mutex};

    fn test_alert() -> Alert {
        Alert::new(
            AlertType::BruteForceTimeWindow,
            "203.0.113.50",
            Evidence { count: 5, duration_seconds: Some(10) },
        )
    }

    #[test]
    fn test_render_alert_line() {
        let alert = test_alert();
        let line = render_alert_line(&alert);
        assert!(line.starts_with("[HIGH] BruteForceTimeWindow id=203.0.113.50"));
        assert!(line.contains("score=100"));
        assert!(line.contains("count=5"));
        assert!(line.contains("duration_seconds=10"));
    }

    #[test]
    fn test_render_frequency_alert_has_no_duration() {
        let alert = Alert::new(AlertType::SuspiciousUserActivity, "alice", Evidence::frequency(3));
        let line = render_alert_line(&alert);
        assert!(line.starts_with("[LOW] SuspiciousUserActivity id=alice"));
        assert!(!line.contains("duration_seconds"));
    }

    #[test]
    fn test_closure_is_a_notifier() {
        let mut seen = Vec::new();
        {
            let mut notifier = |a: &Alert| -> SentinelResult<()> {
                seen.push(a.subject.value().to_string());
                Ok(())
            };
            notifier.notify(&test_alert()).unwrap();
        }
        assert_eq!(seen, vec!["203.0.113.50"]);
    }

    #[test]
    fn test_fanout_continues_after_failure() {
        let delivered = Arc::new(Mutex::new(0));
        let counter = delivered.clone();

        let mut fanout = FanoutNotifier::new();
        fanout.add("broken", |_: &Alert| -> SentinelResult<()> {
            Err(SentinelError::Notify("down".into()))
        });
        fanout.add("counter", move |_: &Alert| -> SentinelResult<()> {
            *counter.lock().unwrap() += 1;
            Ok(())
        });

        let result = fanout.notify(&test_alert());
        assert!(result.is_err());
        assert_eq!(*delivered.lock().unwrap(), 1);
        assert_eq!(fanout.channel_names(), vec!["broken", "counter"]);
    }

    #[test]
    fn test_build_notifier_rejects_bad_webhook() {
        let config = NotifyConfig {
            webhook_url: Some("ftp://bad.example.com".into()),
            ..NotifyConfig::default()
        };
        assert!(build_notifier(&config).is_err());
    }

    #[test]
    fn test_build_notifier_default() {
        let mut notifier = build_notifier(&NotifyConfig::default()).unwrap();
        assert!(notifier.notify(&test_alert()).is_ok());
    }

    #[test]
    fn test_hostname_returns_something() {
        assert!(!hostname_string().is_empty());
    }
}
