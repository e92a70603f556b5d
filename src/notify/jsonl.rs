//! JSON-lines alert log: one alert object per line, easy to feed to jq.

use std::io::Write;
use std::path::PathBuf;

use super::Notifier;
use crate::alerts::{scoring, Alert};
use crate::SentinelResult;

pub struct JsonlNotifier {
    path: PathBuf,
}

impl JsonlNotifier {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Notifier for JsonlNotifier {
    /// Creates the file and parent directories if they don't exist.
    fn notify(&mut self, alert: &Alert) -> SentinelResult<()> {
        let json_line = serde_json::to_string(alert)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json_line)?;
        file.flush()?;

        log::warn!(
            "[ALERT] {} | {} | {} | {}",
            alert.timestamp.to_rfc3339(),
            alert.alert_type,
            alert.subject,
            scoring::format_score(alert),
        );

        Ok(())
    }
}
