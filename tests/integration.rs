//! # Log Sentinel - Integration Tests
//!
//! End-to-end tests that verify the complete pipeline:
//! log file -> parser -> detectors -> alert engine -> notifier
//!
//! These tests write fake log files with known attack patterns into the
//! system temp directory, feed them through the public API exactly as the
//! CLI does, and check the alerts that come out the other end.
//!
//! Copyright (c) 2026 CIPS Corps. All rights reserved.

use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log_sentinel::alerts::{Alert, AlertEngine, AlertType, BatchThresholds, Evidence, Severity, StreamOptions};
use log_sentinel::detection;
use log_sentinel::log_sources::{self, LogFormat, TailOptions};
use log_sentinel::notify;
use log_sentinel::{NotifyConfig, SentinelConfig, SentinelError, SentinelResult};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a fresh temporary directory for test files.
/// The caller is responsible for cleanup.
fn create_test_dir(test_name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("log-sentinel-test").join(test_name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create test dir");
    dir
}

fn cleanup_test_dir(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

/// Syslog timestamp `offset_secs` after Nov 27 12:00:00.
fn syslog_ts(offset_secs: u32) -> String {
    let h = 12 + offset_secs / 3600;
    let m = (offset_secs % 3600) / 60;
    let s = offset_secs % 60;
    format!("Nov 27 {:02}:{:02}:{:02}", h, m, s)
}

fn auth_failed(offset: u32, ip: &str, user: &str) -> String {
    format!(
        "{} webserver sshd[4242]: Failed password for {} from {} port 52344 ssh2",
        syslog_ts(offset),
        user,
        ip
    )
}

fn auth_failed_invalid_user(offset: u32, ip: &str, user: &str) -> String {
    format!(
        "{} webserver sshd[4242]: Failed password for invalid user {} from {} port 52344 ssh2",
        syslog_ts(offset),
        user,
        ip
    )
}

fn auth_accepted(offset: u32, ip: &str, user: &str) -> String {
    format!(
        "{} webserver sshd[4243]: Accepted publickey for {} from {} port 40022 ssh2",
        syslog_ts(offset),
        user,
        ip
    )
}

fn web_line(second: u32, ip: &str, path: &str, status: u16) -> String {
    format!(
        r#"{} - - [27/Nov/2024:12:00:{:02} +0000] "GET {} HTTP/1.1" {} 512 "-" "Mozilla/5.0""#,
        ip, second, path, status
    )
}

fn write_lines(path: &Path, lines: &[String]) {
    let mut f = fs::File::create(path).expect("create log file");
    for line in lines {
        writeln!(f, "{}", line).expect("write line");
    }
}

fn append_lines(path: &Path, lines: &[String]) {
    let mut f = fs::OpenOptions::new().append(true).open(path).expect("open log file");
    for line in lines {
        writeln!(f, "{}", line).expect("append line");
    }
}

fn quiet_notify(alert_log: &Path) -> NotifyConfig {
    NotifyConfig {
        console: false,
        alert_log_path: Some(alert_log.to_path_buf()),
        ..NotifyConfig::default()
    }
}

fn read_alert_log(path: &Path) -> Vec<serde_json::Value> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|l| serde_json::from_str(l).expect("valid JSON line"))
        .collect()
}

fn find<'a>(alerts: &'a [Alert], alert_type: AlertType, subject: &str) -> Option<&'a Alert> {
    alerts
        .iter()
        .find(|a| a.alert_type == alert_type && a.subject.value() == subject)
}

// ---------------------------------------------------------------------------
// Batch analysis
// ---------------------------------------------------------------------------

/// An SSH brute force from one IP against root, with background noise from
/// a second IP and a legitimate login. Every detector should fire for the
/// attacker and nothing should fire for the noise.
#[test]
fn test_ssh_bruteforce_batch_analysis() {
    let dir = create_test_dir("ssh_batch");
    let log = dir.join("auth.log");

    let attacker = "203.0.113.50";
    let mut lines = Vec::new();
    for i in 0..5 {
        lines.push(auth_failed(i * 10, attacker, "root"));
    }
    lines.push(auth_failed_invalid_user(15, "198.51.100.7", "oracle"));
    lines.push(auth_failed(600, "198.51.100.7", "backup"));
    lines.push(auth_accepted(700, "10.0.0.2", "deploy"));
    lines.push("Nov 27 12:20:00 webserver systemd[1]: Started Session 4 of user deploy.".into());
    write_lines(&log, &lines);

    let events = log_sources::read_events(&log).unwrap();
    assert_eq!(events.len(), lines.len());
    assert_eq!(events.iter().filter(|e| e.is_failed_login()).count(), 7);

    let mut engine = AlertEngine::new(events);
    let alerts = engine.generate_all(&BatchThresholds::default()).to_vec();

    let brute = find(&alerts, AlertType::BruteForceAttack, attacker).expect("brute force alert");
    assert_eq!(brute.evidence, Evidence::frequency(5));
    assert_eq!(brute.risk_score, 60);
    assert_eq!(brute.severity, Severity::Medium);

    let user = find(&alerts, AlertType::SuspiciousUserActivity, "root").expect("root alert");
    assert_eq!(user.evidence.count, 5);

    let window = find(&alerts, AlertType::BruteForceTimeWindow, attacker).expect("window alert");
    assert_eq!(window.evidence, Evidence { count: 5, duration_seconds: Some(40) });
    assert_eq!(window.risk_score, 100);
    assert_eq!(window.severity, Severity::High);

    assert!(find(&alerts, AlertType::SuspiciousUserTimeWindow, "root").is_some());
    assert!(alerts.iter().all(|a| a.subject.value() != "198.51.100.7"));
    assert!(alerts.iter().all(|a| a.subject.value() != "deploy"));
    assert_eq!(alerts.len(), 4);

    cleanup_test_dir(&dir);
}

/// Attempts spread further apart than the window trip the cumulative
/// counter but never the sliding window.
#[test]
fn test_slow_attack_only_trips_frequency() {
    let dir = create_test_dir("slow_attack");
    let log = dir.join("auth.log");
    write_lines(
        &log,
        &[
            auth_failed(0, "192.0.2.10", "admin"),
            auth_failed(100, "192.0.2.10", "admin"),
            auth_failed(200, "192.0.2.10", "admin"),
        ],
    );

    let events = log_sources::read_events(&log).unwrap();
    let mut engine = AlertEngine::new(events);
    let types: Vec<AlertType> = engine
        .generate_all(&BatchThresholds::default())
        .iter()
        .map(|a| a.alert_type)
        .collect();
    assert_eq!(
        types,
        vec![AlertType::BruteForceAttack, AlertType::SuspiciousUserActivity]
    );

    // Widening the window catches it.
    let wide = engine.generate_bruteforce_time_window_alerts(3, 300);
    assert_eq!(wide.len(), 1);
    assert_eq!(wide[0].evidence.duration_seconds, Some(200));

    cleanup_test_dir(&dir);
}

/// Web access logs carry no login outcomes: nothing trips the failed-login
/// detectors, but the traffic still shows up in frequency and top-N.
#[test]
fn test_web_log_analytics() {
    let dir = create_test_dir("web_log");
    let log = dir.join("access.log");

    let mut lines = Vec::new();
    for s in 0..6 {
        lines.push(web_line(s, "45.33.22.11", "/wp-login.php", 401));
    }
    lines.push(web_line(10, "10.0.0.5", "/index.html", 200));
    lines.push(web_line(11, "10.0.0.5", "/wp-login.php", 200));
    write_lines(&log, &lines);

    let events = log_sources::read_events(&log).unwrap();
    assert_eq!(events.len(), 8);

    let mut engine = AlertEngine::new(events.clone());
    assert!(engine.generate_all(&BatchThresholds::default()).is_empty());

    let noisy = detection::detect_high_frequency_ips(&events, 5);
    assert_eq!(noisy.get("45.33.22.11"), Some(&6));
    assert!(!noisy.contains_key("10.0.0.5"));

    assert_eq!(
        detection::top_urls(&events, 5),
        vec![("/wp-login.php".to_string(), 7), ("/index.html".to_string(), 1)]
    );
    assert_eq!(detection::top_ips(&events, 1), vec![("45.33.22.11".to_string(), 6)]);

    cleanup_test_dir(&dir);
}

#[test]
fn test_unrecognized_log_is_rejected() {
    let dir = create_test_dir("unrecognized");
    let log = dir.join("notes.txt");
    write_lines(&log, &["shopping list".into(), "- milk".into()]);

    assert!(matches!(
        log_sources::read_events(&log),
        Err(SentinelError::LogParse(_))
    ));

    cleanup_test_dir(&dir);
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

/// Live mode over a configured delivery stack: one JSONL record per
/// (alert type, subject), no matter how long the attack continues.
#[test]
fn test_streaming_writes_each_alert_once() {
    let dir = create_test_dir("stream_jsonl");
    let alert_log = dir.join("alerts.jsonl");

    let notifier = notify::build_notifier(&quiet_notify(&alert_log)).unwrap();
    let mut engine = AlertEngine::with_boxed_notifier(Vec::new(), notifier);
    let options = StreamOptions::default();

    let source = LogFormat::AuthLog;
    let mut emitted = 0;
    for i in 0..10 {
        let line = auth_failed(i * 10, "203.0.113.9", "admin");
        let event = log_sources::LogSource::parse_line(&source, &line).unwrap();
        let report = engine.process_event(event, &options);
        assert!(report.is_clean());
        emitted += report.emitted.len();
    }
    assert_eq!(emitted, 2);

    let records = read_alert_log(&alert_log);
    assert_eq!(records.len(), 2);

    assert_eq!(records[0]["alert_type"], "BruteForceTimeWindow");
    assert_eq!(records[0]["source_ip"], "203.0.113.9");
    assert_eq!(records[0]["evidence"]["count"], 3);
    assert_eq!(records[0]["evidence"]["duration_seconds"], 20);
    assert_eq!(records[0]["risk_score"], 100);
    assert_eq!(records[0]["severity"], "HIGH");

    assert_eq!(records[1]["alert_type"], "SuspiciousUserTimeWindow");
    assert_eq!(records[1]["user"], "admin");

    cleanup_test_dir(&dir);
}

/// A failing transport is reported once and never causes a re-alert.
#[test]
fn test_streaming_delivery_failure_not_retried_by_engine() {
    let calls = Rc::new(RefCell::new(0u32));
    let counter = calls.clone();
    let mut engine = AlertEngine::with_notifier(Vec::new(), move |_: &Alert| -> SentinelResult<()> {
        *counter.borrow_mut() += 1;
        Err(SentinelError::Notify("relay unreachable".into()))
    });
    let options = StreamOptions {
        time_window_threshold: 2,
        ..StreamOptions::default()
    };

    let source = LogFormat::AuthLog;
    let mut failures = 0;
    for i in 0..6 {
        // A different account each time, so only the per-IP detector fires.
        let line = auth_failed(i, "198.51.100.1", &format!("user{}", i));
        let event = log_sources::LogSource::parse_line(&source, &line).unwrap();
        failures += engine.process_event(event, &options).delivery_failures.len();
    }

    assert_eq!(failures, 1);
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(engine.alerts().len(), 1);
}

/// Queued delivery drains everything before `finish` returns.
#[test]
fn test_queued_delivery_flushes_on_finish() {
    let dir = create_test_dir("stream_queued");
    let alert_log = dir.join("alerts.jsonl");

    let mut notify_config = quiet_notify(&alert_log);
    notify_config.queued = true;
    let notifier = notify::build_notifier(&notify_config).unwrap();
    let mut engine = AlertEngine::with_boxed_notifier(Vec::new(), notifier);
    let options = StreamOptions {
        time_window_threshold: 1,
        ..StreamOptions::default()
    };

    let source = LogFormat::AuthLog;
    for (i, ip) in ["10.1.1.1", "10.1.1.2", "10.1.1.3"].iter().enumerate() {
        let line = auth_failed(i as u32, ip, "svc");
        let event = log_sources::LogSource::parse_line(&source, &line).unwrap();
        engine.process_event(event, &options);
    }

    let alerts = engine.finish();
    assert_eq!(alerts.len(), 4);

    let records = read_alert_log(&alert_log);
    let subjects: Vec<String> = records
        .iter()
        .map(|r| {
            r.get("source_ip")
                .or_else(|| r.get("user"))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        })
        .collect();
    assert_eq!(subjects, vec!["10.1.1.1", "svc", "10.1.1.2", "10.1.1.3"]);

    cleanup_test_dir(&dir);
}

/// The live pipeline as `monitor` wires it: tail producer, bounded channel,
/// single consumer feeding the engine.
#[tokio::test]
async fn test_tail_to_engine_pipeline() {
    let dir = create_test_dir("tail_pipeline");
    let log = dir.join("auth.log");
    write_lines(&log, &[auth_accepted(0, "10.0.0.2", "deploy")]);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let mut engine = AlertEngine::with_notifier(Vec::new(), move |a: &Alert| -> SentinelResult<()> {
        sink.borrow_mut().push(a.dedup_key().to_string());
        Ok(())
    });
    let options = StreamOptions::default();

    let (tx, mut rx) = tokio::sync::mpsc::channel(2);
    let shutdown = Arc::new(AtomicBool::new(false));
    let producer = log_sources::spawn_tail(
        log.clone(),
        None,
        TailOptions {
            poll_interval: Duration::from_millis(10),
            from_start: true,
        },
        tx,
        shutdown.clone(),
    );

    append_lines(
        &log,
        &[
            auth_failed(5, "203.0.113.77", "root"),
            auth_failed(6, "203.0.113.77", "root"),
            auth_failed(7, "203.0.113.77", "root"),
            auth_failed(8, "203.0.113.77", "root"),
        ],
    );

    let mut processed = 0;
    while processed < 5 {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("tail stalled")
            .expect("channel open");
        engine.process_event(event, &options);
        processed += 1;
    }

    shutdown.store(true, Ordering::SeqCst);
    drop(rx);
    producer.await.unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![
            "BruteForceTimeWindow|203.0.113.77".to_string(),
            "SuspiciousUserTimeWindow|root".to_string(),
        ]
    );

    cleanup_test_dir(&dir);
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn test_config_default_roundtrip_and_validation() {
    let dir = create_test_dir("config");
    let path = dir.join("log-sentinel.toml");

    SentinelConfig::write_default(&path).unwrap();
    let loaded = SentinelConfig::from_file(&path).unwrap();
    assert_eq!(loaded.detection.window_seconds, 60);
    assert_eq!(loaded.notify.retry.max_attempts, 3);
    assert!(loaded.notify.email.dry_run);

    let partial = dir.join("partial.toml");
    fs::write(&partial, "[detection]\nwindow_seconds = 120\n").unwrap();
    let loaded = SentinelConfig::from_file(&partial).unwrap();
    assert_eq!(loaded.detection.window_seconds, 120);
    assert_eq!(loaded.detection.bruteforce_threshold, 3);
    assert!(loaded.notify.console);

    let zero = dir.join("zero.toml");
    fs::write(&zero, "[detection]\ntime_window_threshold = 0\n").unwrap();
    assert!(matches!(
        SentinelConfig::from_file(&zero),
        Err(SentinelError::Config(_))
    ));

    let missing = dir.join("missing.toml");
    let defaults = SentinelConfig::load_or_default(&missing).unwrap();
    assert_eq!(defaults.monitor.channel_capacity, 1024);

    cleanup_test_dir(&dir);
}
