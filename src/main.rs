//! # Log Sentinel - CLI Entry Point
//!
//! Command-line interface for the Log Sentinel brute-force detector.
//!
//! Commands:
//! - `analyze`     - Scan a whole log file once and report
//! - `monitor`     - Follow a log file and alert as attacks happen
//! - `init-config` - Generate a default configuration file

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log_sentinel::alerts::{AlertEngine, BatchThresholds, StreamOptions};
use log_sentinel::detection;
use log_sentinel::log_sources::{self, TailOptions};
use log_sentinel::notify::{self, ConsoleNotifier, Notifier};
use log_sentinel::{SentinelConfig, SentinelError, SentinelResult};

const TOP_N: usize = 5;

/// Log Sentinel - brute-force detection for SSH and HTTP logs.
///
/// Counts failed logins per source IP and per user, finds bursts inside a
/// sliding time window, and raises scored, deduplicated alerts.
#[derive(Parser, Debug)]
#[command(name = "log-sentinel")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "log-sentinel.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a complete log file.
    Analyze {
        /// Log file to analyze (auth.log or access log).
        #[arg(short, long)]
        file: PathBuf,

        /// Failed logins per IP / user before alerting.
        #[arg(short, long)]
        threshold: Option<usize>,
    },

    /// Follow a log file and alert in real time.
    Monitor {
        /// Log file to follow.
        #[arg(short, long)]
        file: PathBuf,

        /// Sliding window width in seconds.
        #[arg(short, long)]
        window: Option<u64>,

        /// Failed logins inside the window before alerting.
        #[arg(short, long)]
        threshold: Option<usize>,

        /// Also alert on IPs with unusually many events of any kind.
        #[arg(long)]
        show_frequency: bool,

        /// Process the existing file content before following it.
        #[arg(long)]
        from_start: bool,
    },

    /// Generate a default configuration file.
    InitConfig,
}

#[tokio::main]
async fn main() -> SentinelResult<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { file, threshold } => cmd_analyze(&cli.config, &file, threshold),
        Commands::Monitor {
            file,
            window,
            threshold,
            show_frequency,
            from_start,
        } => {
            let mut config = SentinelConfig::load_or_default(&cli.config)?;
            if let Some(w) = window {
                config.detection.window_seconds = w;
            }
            if let Some(t) = threshold {
                config.detection.time_window_threshold = t;
            }
            config.detection.show_frequency |= show_frequency;
            config.monitor.from_start |= from_start;
            config.validate()?;
            cmd_monitor(config, file).await
        }
        Commands::InitConfig => cmd_init_config(&cli.config),
    }
}

/// One-shot analysis:
/// 1. Read and normalize the whole file
/// 2. Print the top talkers
/// 3. Run every batch detector and print the alerts
fn cmd_analyze(config_path: &Path, file: &Path, threshold: Option<usize>) -> SentinelResult<()> {
    let mut config = SentinelConfig::load_or_default(config_path)?;
    if let Some(t) = threshold {
        config.detection.bruteforce_threshold = t;
        config.detection.suspicious_user_threshold = t;
    }
    config.validate()?;

    let events = log_sources::read_events(file)?;
    info!("Parsed {} events from {}", events.len(), file.display());

    print_top("IPs", &detection::top_ips(&events, TOP_N));
    print_top("users", &detection::top_users(&events, TOP_N));
    print_top("URLs", &detection::top_urls(&events, TOP_N));

    let mut engine = AlertEngine::new(events);
    let thresholds = BatchThresholds::from(&config.detection);
    let alerts = engine.generate_all(&thresholds);

    println!();
    if alerts.is_empty() {
        println!("No alerts detected.");
        return Ok(());
    }

    println!("{} alert(s):", alerts.len());
    let mut console = ConsoleNotifier;
    for alert in alerts {
        console.notify(alert)?;
    }
    Ok(())
}

fn print_top(label: &str, rows: &[(String, usize)]) {
    if rows.is_empty() {
        return;
    }
    println!("Top {} {}:", rows.len(), label);
    for (key, count) in rows {
        println!("  {:<40} {}", key, count);
    }
}

/// Live monitoring.
///
/// The tail producer feeds a bounded channel; this task is the single
/// consumer and the only caller of `process_event`. Ctrl-C raises the
/// shutdown flag: the producer stops polling and closes the channel, and
/// the consumer stops before the next event.
async fn cmd_monitor(config: SentinelConfig, file: PathBuf) -> SentinelResult<()> {
    if !file.exists() {
        return Err(SentinelError::Config(format!(
            "Log file not found: {}",
            file.display()
        )));
    }
    info!("Log Sentinel monitoring {}", file.display());

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!("Could not install signal handler: {}. Use kill to stop.", e);
    }

    let format = log_sources::sniff_file(&file).unwrap_or_else(|e| {
        warn!("Cannot sniff format of {}: {}", file.display(), e);
        None
    });

    let notifier = notify::build_notifier(&config.notify)?;
    let mut engine = AlertEngine::with_boxed_notifier(Vec::new(), notifier);
    let options = StreamOptions::from(&config.detection);

    let (tx, mut rx) = tokio::sync::mpsc::channel(config.monitor.channel_capacity);
    let producer = log_sources::spawn_tail(
        file.clone(),
        format,
        TailOptions::from(&config.monitor),
        tx,
        shutdown.clone(),
    );

    info!(
        "Watching for {}+ failed logins within {}s (frequency check: {})",
        options.time_window_threshold,
        options.window_seconds,
        if options.show_frequency { "on" } else { "off" },
    );

    let mut processed: u64 = 0;
    let mut failures: u64 = 0;
    while let Some(event) = rx.recv().await {
        if shutdown.load(Ordering::SeqCst) {
            info!("Shutdown signal received. Stopping gracefully...");
            break;
        }
        let report = engine.process_event(event, &options);
        processed += 1;
        for failure in &report.delivery_failures {
            error!("Delivery failed for {}: {}", failure.key, failure.error);
            failures += 1;
        }
    }
    drop(rx);

    match producer.await {
        Ok(sent) => info!("Tail producer delivered {} events", sent),
        Err(e) => error!("Tail producer failed: {}", e),
    }

    let alerts = engine.finish();
    info!(
        "Log Sentinel stopped. {} events, {} alerts, {} delivery failures.",
        processed,
        alerts.len(),
        failures,
    );
    Ok(())
}

/// Generate a default configuration file.
fn cmd_init_config(config_path: &Path) -> SentinelResult<()> {
    if config_path.exists() {
        return Err(SentinelError::Config(format!(
            "Configuration file already exists: {}. Remove it first or use a different path.",
            config_path.display()
        )));
    }

    SentinelConfig::write_default(config_path)?;
    println!("Default configuration written to: {}", config_path.display());
    println!();
    println!("Key settings to configure:");
    println!("  [detection] - Thresholds and window width (default 3 attempts / 60s)");
    println!("  [monitor]   - Poll interval and channel capacity for live mode");
    println!("  [notify]    - Console, JSONL alert log, webhook and email delivery");

    Ok(())
}
