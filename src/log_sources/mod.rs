//! Log source abstraction layer for Log Sentinel.
//!
//! Copyright (c) 2026 CIPS Corps. All rights reserved.

pub mod auth_log;
pub mod tail;
pub mod web_log;

use regex::Regex;
use std::borrow::Cow;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::LazyLock;

use crate::{NormalizedEvent, SentinelError, SentinelResult};

pub use auth_log::AuthLogSource;
pub use tail::{spawn_tail, TailOptions};
pub use web_log::WebLogSource;

/// Turns one raw log line into a [`NormalizedEvent`], or `None` if the line
/// is not in this source's format.
pub trait LogSource: Send + Sync {
    fn name(&self) -> &str;
    fn parse_line(&self, line: &str) -> Option<NormalizedEvent>;
}

// ---------------------------------------------------------------------------
// Format sniffing
// ---------------------------------------------------------------------------

/// `IP ident user [` at the start of an access log line.
static RE_ACCESS_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+ \S+ \S+ \[").expect("regex"));

/// `Mon DD HH:MM:SS` at the start of a syslog line.
static RE_SYSLOG_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][a-z]{2}\s+\d{1,2}\s+\d{1,2}:\d{2}:\d{2}").expect("regex")
});

/// The log formats Log Sentinel understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    AuthLog,
    WebAccess,
}

impl LogFormat {
    /// Pick a format from the first line that looks like either one.
    pub fn sniff<'a, I>(lines: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        lines.into_iter().find_map(|line| {
            if RE_ACCESS_PREFIX.is_match(line) {
                Some(LogFormat::WebAccess)
            } else if RE_SYSLOG_PREFIX.is_match(line) {
                Some(LogFormat::AuthLog)
            } else {
                None
            }
        })
    }
}

impl LogSource for LogFormat {
    fn name(&self) -> &str {
        match self {
            LogFormat::AuthLog => "auth.log",
            LogFormat::WebAccess => "web-access",
        }
    }

    fn parse_line(&self, line: &str) -> Option<NormalizedEvent> {
        match self {
            LogFormat::AuthLog => AuthLogSource.parse_line(line),
            LogFormat::WebAccess => WebLogSource::default().parse_line(line),
        }
    }
}

/// Split raw log bytes on `\n` and decode each line on its own.
///
/// A trailing `\r` is dropped. Invalid UTF-8 (attacker-typed usernames end
/// up in auth.log verbatim) is replaced with U+FFFD, so one bad byte costs at
/// most its own line.
pub fn decode_lines(bytes: &[u8]) -> impl Iterator<Item = Cow<'_, str>> {
    bytes.split(|b| *b == b'\n').map(|raw| {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        String::from_utf8_lossy(raw)
    })
}

/// Sniff the format of an existing file from its current content.
pub fn sniff_file(path: &Path) -> SentinelResult<Option<LogFormat>> {
    let bytes = std::fs::read(path)?;
    let lines: Vec<Cow<'_, str>> = decode_lines(&bytes).collect();
    Ok(LogFormat::sniff(lines.iter().map(|l| l.as_ref())))
}

/// Read a whole log file into normalized events.
///
/// The format is sniffed from the file's own lines. Lines the chosen parser
/// rejects are skipped.
pub fn read_events(path: &Path) -> SentinelResult<Vec<NormalizedEvent>> {
    let bytes = std::fs::read(path)?;
    let lines: Vec<Cow<'_, str>> = decode_lines(&bytes)
        .filter(|l| !l.trim().is_empty())
        .collect();

    let format = LogFormat::sniff(lines.iter().map(|l| l.as_ref())).ok_or_else(|| {
        SentinelError::LogParse(format!("Unrecognized log format: {}", path.display()))
    })?;
    log::info!("Reading {} as {}", path.display(), format.name());

    let events: Vec<NormalizedEvent> = lines.iter().filter_map(|l| format.parse_line(l)).collect();

    let skipped = lines.len() - events.len();
    if skipped > 0 {
        log::debug!("Skipped {} unparseable lines in {}", skipped, path.display());
    }
    Ok(events)
}

// ---------------------------------------------------------------------------
// FileTailer
// ---------------------------------------------------------------------------

/// Follows one growing log file by byte offset.
///
/// The offset only ever advances past a `\n`, so it always sits on a line
/// boundary. If the file becomes shorter than the offset it was truncated or
/// replaced, and reading restarts at 0.
#[derive(Debug, Default)]
pub struct FileTailer {
    offset: u64,
}

impl FileTailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at the current end of `path` so only future writes are read.
    pub fn at_end(path: &Path) -> Self {
        let offset = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        Self { offset }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Complete lines appended since the previous call.
    ///
    /// An unterminated last line stays unread until its `\n` arrives. I/O
    /// errors (missing file included) are logged and yield nothing; the next
    /// poll tries again from the same offset.
    pub fn read_new_lines(&mut self, path: &Path) -> Vec<String> {
        match self.poll(path) {
            Ok(lines) => lines,
            Err(e) => {
                log::warn!("Tail of {} failed: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    fn poll(&mut self, path: &Path) -> SentinelResult<Vec<String>> {
        let len = std::fs::metadata(path)?.len();
        if len < self.offset {
            log::info!(
                "{} shrank to {} bytes (was at {}), rereading from the start",
                path.display(),
                len,
                self.offset,
            );
            self.offset = 0;
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        let mut file = std::fs::File::open(path)?;
        file.seek(SeekFrom::Start(self.offset))?;
        let mut chunk = Vec::new();
        file.take(len - self.offset).read_to_end(&mut chunk)?;

        let Some(last_newline) = chunk.iter().rposition(|b| *b == b'\n') else {
            return Ok(Vec::new());
        };
        self.offset += (last_newline + 1) as u64;

        Ok(decode_lines(&chunk[..last_newline])
            .filter(|l| !l.trim().is_empty())
            .map(Cow::into_owned)
            .collect())
    }
}
