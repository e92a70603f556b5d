//! Live tail producer.
//!
//! Polls one log file for appended lines, parses them, and pushes the
//! events into a bounded channel. When the channel is full the producer
//! waits, so a slow consumer throttles reading instead of growing memory.
//! The task ends when the shutdown flag is raised or the receiver is
//! dropped; either way the sender is dropped and the channel closes.
//!
//! Copyright (c) 2026 CIPS Corps. All rights reserved.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{FileTailer, LogFormat, LogSource};
use crate::{MonitorConfig, NormalizedEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailOptions {
    pub poll_interval: Duration,
    /// Read the existing content first instead of starting at end of file.
    pub from_start: bool,
}

impl From<&MonitorConfig> for TailOptions {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            from_start: config.from_start,
        }
    }
}

/// Spawn the producer. Returns the number of events it delivered.
///
/// With `format` unset, the format is sniffed from the first batch of new
/// lines that contains a recognizable one; earlier batches are dropped.
pub fn spawn_tail(
    path: PathBuf,
    format: Option<LogFormat>,
    options: TailOptions,
    tx: mpsc::Sender<NormalizedEvent>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut tailer = if options.from_start {
            FileTailer::new()
        } else {
            FileTailer::at_end(&path)
        };
        let mut format = format;
        let mut sent: u64 = 0;

        log::info!("Tailing {} (offset {})", path.display(), tailer.offset());

        while !shutdown.load(Ordering::SeqCst) {
            let lines = tailer.read_new_lines(&path);

            if format.is_none() && !lines.is_empty() {
                format = LogFormat::sniff(lines.iter().map(String::as_str));
                match format {
                    Some(f) => log::info!("Detected {} format for {}", f.name(), path.display()),
                    None => log::debug!("Format of {} still unknown, dropped {} lines", path.display(), lines.len()),
                }
            }

            if let Some(fmt) = format {
                for line in &lines {
                    let Some(event) = fmt.parse_line(line) else {
                        log::debug!("Skipping unparseable line: {}", line);
                        continue;
                    };
                    if tx.send(event).await.is_err() {
                        log::debug!("Event consumer gone, tail of {} stopping", path.display());
                        return sent;
                    }
                    sent += 1;
                }
            }

            tokio::time::sleep(options.poll_interval).await;
        }

        log::info!("Tail of {} stopped after {} events", path.display(), sent);
        sent
    })
}
