//! Email alerts.
//!
//! Messages are written to a spool directory as `.eml` files; a separate
//! process (sendmail pickup, cron, systemd timer) delivers them via SMTP.
//! In dry-run mode, or when no recipient is configured, the message is
//! logged instead and nothing touches the disk.

use chrono::Utc;
use std::io::Write;
use std::path::PathBuf;

use super::{hostname_string, Notifier};
use crate::alerts::Alert;
use crate::{EmailConfig, SentinelResult};

pub struct EmailNotifier {
    from_addr: String,
    to_addrs: Vec<String>,
    queue_dir: PathBuf,
    dry_run: bool,
}

impl EmailNotifier {
    pub fn new(from_addr: &str, to_addrs: Vec<String>, queue_dir: PathBuf, dry_run: bool) -> Self {
        Self {
            from_addr: from_addr.to_string(),
            to_addrs,
            queue_dir,
            dry_run,
        }
    }

    /// Build from config, falling back to `EMAIL_FROM` / `EMAIL_TO`.
    pub fn from_config(config: &EmailConfig) -> Self {
        let from_addr = config
            .from_addr
            .clone()
            .or_else(|| std::env::var("EMAIL_FROM").ok())
            .unwrap_or_else(|| format!("sentinel@{}", hostname_string()));

        let to_addrs = if config.to_addrs.is_empty() {
            std::env::var("EMAIL_TO")
                .map(|v| split_recipients(&v))
                .unwrap_or_default()
        } else {
            config.to_addrs.clone()
        };

        Self::new(&from_addr, to_addrs, config.queue_dir.clone(), config.dry_run)
    }

    /// True when messages are only logged.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run || self.to_addrs.is_empty()
    }

    /// Render the full RFC 822 message for `alert`.
    ///
    /// `multipart/mixed`: a plain/HTML alternative for humans, then the
    /// alert itself attached as `alert.json`.
    pub fn build_message(&self, alert: &Alert) -> SentinelResult<String> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S +0000").to_string();
        let subject = format!("[{}] {} - {}", alert.severity, alert.alert_type, alert.subject);
        let json = serde_json::to_string_pretty(alert)?;

        let mut fields = vec![
            ("Alert".to_string(), alert.alert_type.to_string()),
            ("Severity".to_string(), alert.severity.to_string()),
            ("Risk score".to_string(), alert.risk_score.to_string()),
            (alert.subject.field_name().to_string(), alert.subject.to_string()),
            ("count".to_string(), alert.evidence.count.to_string()),
        ];
        if let Some(d) = alert.evidence.duration_seconds {
            fields.push(("duration_seconds".to_string(), d.to_string()));
        }
        fields.push(("Timestamp".to_string(), alert.timestamp.to_rfc3339()));

        let mut text = String::new();
        for (name, value) in &fields {
            text.push_str(&format!("{}: {}\r\n", name, value));
        }
        text.push_str("\r\nThe full alert is attached as alert.json.\r\n");

        let mut html = String::from("<html><body>\r\n");
        html.push_str(&format!("<h2>{}</h2>\r\n<table>\r\n", html_escape(&subject)));
        for (name, value) in &fields {
            html.push_str(&format!(
                "<tr><th align=\"left\">{}</th><td>{}</td></tr>\r\n",
                html_escape(name),
                html_escape(value)
            ));
        }
        html.push_str("</table>\r\n</body></html>\r\n");

        // No line of any part starts with "--", so the boundaries only need
        // to be unique per message.
        let stamp = alert.timestamp.format("%Y%m%d%H%M%S%f");
        let mixed = format!("sentinel-mixed-{}", stamp);
        let alt = format!("sentinel-alt-{}", stamp);

        Ok(format!(
            "From: Log Sentinel <{from}>\r\n\
             To: {to}\r\n\
             Subject: {subject}\r\n\
             Date: {date}\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/mixed; boundary=\"{mixed}\"\r\n\
             X-Sentinel-Severity: {severity}\r\n\
             \r\n\
             --{mixed}\r\n\
             Content-Type: multipart/alternative; boundary=\"{alt}\"\r\n\
             \r\n\
             --{alt}\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             Content-Transfer-Encoding: 8bit\r\n\
             \r\n\
             {text}\
             --{alt}\r\n\
             Content-Type: text/html; charset=utf-8\r\n\
             Content-Transfer-Encoding: 8bit\r\n\
             \r\n\
             {html}\
             --{alt}--\r\n\
             \r\n\
             --{mixed}\r\n\
             Content-Type: application/json; charset=utf-8; name=\"alert.json\"\r\n\
             Content-Disposition: attachment; filename=\"alert.json\"\r\n\
             Content-Transfer-Encoding: 8bit\r\n\
             \r\n\
             {json}\r\n\
             --{mixed}--\r\n",
            from = self.from_addr,
            to = self.to_addrs.join(", "),
            subject = subject,
            date = date,
            mixed = mixed,
            severity = alert.severity,
            alt = alt,
            text = text,
            html = html,
            json = json,
        ))
    }
}

impl Notifier for EmailNotifier {
    fn notify(&mut self, alert: &Alert) -> SentinelResult<()> {
        let message = self.build_message(alert)?;

        if self.is_dry_run() {
            log::info!("[EMAIL-DRY-RUN] To: {}", self.to_addrs.join(", "));
            log::info!("[EMAIL-DRY-RUN] Message:\n{}", message);
            return Ok(());
        }

        if !self.queue_dir.exists() {
            std::fs::create_dir_all(&self.queue_dir)?;
        }

        // Same alert content always maps to the same file, so a retried
        // delivery overwrites rather than duplicates.
        let filename = format!(
            "sentinel_{}_{}_{}.eml",
            alert.timestamp.format("%Y%m%d_%H%M%S%.f"),
            alert.alert_type,
            alert.subject.value().replace([':', '/', '\\'], "-"),
        );
        let eml_path = self.queue_dir.join(&filename);

        let mut file = std::fs::File::create(&eml_path)?;
        file.write_all(message.as_bytes())?;
        file.flush()?;

        log::info!(
            "[EMAIL] Queued alert email to {} at {:?}: {} {}",
            self.to_addrs.join(", "),
            eml_path,
            alert.severity,
            alert.subject,
        );
        Ok(())
    }
}

fn html_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn split_recipients(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}
