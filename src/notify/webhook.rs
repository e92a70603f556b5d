//! Webhook delivery via HTTP POST.
//!
//! Sends a JSON payload compatible with Slack, Discord, Microsoft Teams and
//! generic HTTP endpoints: a `text` summary line plus the full alert.
//! Timeout: 5 seconds. A non-2xx response or transport error is returned
//! as [`SentinelError::Notify`] so [`super::retry::Retrying`] can redeliver.

use std::time::Duration;

use super::{hostname_string, Notifier};
use crate::alerts::Alert;
use crate::{SentinelError, SentinelResult};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct WebhookNotifier {
    url: String,
    agent: ureq::Agent,
}

impl WebhookNotifier {
    /// Fails unless `url` starts with `http://` or `https://`.
    pub fn new(url: &str) -> SentinelResult<Self> {
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(SentinelError::Config(format!(
                "Webhook URL must start with http:// or https://, got: {}",
                url
            )));
        }
        let agent = ureq::AgentBuilder::new().timeout(WEBHOOK_TIMEOUT).build();
        Ok(Self { url: url.to_string(), agent })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// The JSON body POSTed for `alert`.
pub fn webhook_payload(alert: &Alert) -> SentinelResult<serde_json::Value> {
    let mut payload = serde_json::to_value(alert)?;
    if let Some(obj) = payload.as_object_mut() {
        obj.insert(
            "text".into(),
            serde_json::Value::String(format!(
                "Log Sentinel Alert: [{}] {} from {} (risk {})",
                alert.severity, alert.alert_type, alert.subject, alert.risk_score
            )),
        );
        obj.insert("hostname".into(), serde_json::Value::String(hostname_string()));
    }
    Ok(payload)
}

impl Notifier for WebhookNotifier {
    fn notify(&mut self, alert: &Alert) -> SentinelResult<()> {
        let payload_str = serde_json::to_string(&webhook_payload(alert)?)?;

        match self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .send_string(&payload_str)
        {
            Ok(response) => {
                log::info!(
                    "[WEBHOOK] POST to {} succeeded (status {}): {}",
                    self.url,
                    response.status(),
                    alert.dedup_key(),
                );
                Ok(())
            }
            Err(e) => Err(SentinelError::Notify(format!(
                "webhook POST to {} failed: {}",
                self.url, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertType, Evidence};

    #[test]
    fn test_webhook_rejects_bad_url() {
        assert!(WebhookNotifier::new("ftp://bad.example.com").is_err());
        assert!(WebhookNotifier::new("not-a-url").is_err());
    }

    #[test]
    fn test_webhook_accepts_valid_urls() {
        let n = WebhookNotifier::new("https://hooks.example.com/test").unwrap();
        assert_eq!(n.url(), "https://hooks.example.com/test");
        assert!(WebhookNotifier::new("http://localhost:9000/hook").is_ok());
    }

    #[test]
    fn test_payload_carries_alert_and_text() {
        let alert = Alert::new(AlertType::SuspiciousUserTimeWindow, "root", Evidence {
            count: 4,
            duration_seconds: Some(30),
        });
        let payload = webhook_payload(&alert).unwrap();
        assert_eq!(payload["user"], "root");
        assert_eq!(payload["alert_type"], "SuspiciousUserTimeWindow");
        let text = payload["text"].as_str().unwrap();
        assert!(text.contains("SuspiciousUserTimeWindow"));
        assert!(text.contains("root"));
        assert!(payload["hostname"].is_string());
    }

    #[test]
    fn test_unreachable_endpoint_is_an_error() {
        // Port 9 (discard) on localhost is not expected to run an HTTP server.
        let mut n = WebhookNotifier::new("http://127.0.0.1:9/hook").unwrap();
        let alert = Alert::new(AlertType::BruteForceAttack, "1.2.3.4", Evidence::frequency(3));
        assert!(matches!(n.notify(&alert), Err(SentinelError::Notify(_))));
    }
}
