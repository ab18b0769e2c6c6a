// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fleetwatch-rs

//! FleetWatch - Operational Alert Engine for fleet dispatch
//!
//! Runs the alert engine headless against either the built-in fleet
//! simulator or an MQTT safety stream, or evaluates a single snapshot file
//! and prints the resulting feed as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use fleetwatch::{
    rules::SharedSnapshot,
    simulator::FleetSimulator,
    streaming::{ChannelEventSource, MqttConfig, MqttEventSource},
    Config, Engine, RuleEvaluator, Snapshot, VERSION,
};

/// FleetWatch - Operational Alert Engine
#[derive(Parser, Debug)]
#[command(name = "fleetwatch")]
#[command(author = "FleetWatch Project")]
#[command(version = VERSION)]
#[command(about = "Live operational alerts for fleet dispatch")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Evaluate one snapshot JSON file, print the feed and exit
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Demo mode with a simulated fleet
    #[arg(long)]
    demo: bool,

    /// Number of simulated vehicles
    #[arg(long, default_value = "12")]
    vehicles: usize,

    /// Re-evaluation interval in seconds
    #[arg(long)]
    interval: Option<u64>,

    /// MQTT broker address for the fatigue stream
    #[arg(long)]
    mqtt_broker: Option<String>,

    /// Record raised/resolved alerts to the journal
    #[arg(long)]
    journal: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("FleetWatch v{} - operational alert engine", VERSION);

    // Override with command line args
    if args.demo {
        config.demo_mode = true;
    }
    if let Some(interval) = args.interval {
        config.engine.evaluation_interval_secs = interval;
    }
    if let Some(mqtt) = args.mqtt_broker.clone() {
        config.streaming.mqtt_enabled = true;
        config.streaming.mqtt_broker = mqtt;
    }
    if args.journal {
        config.journal.enabled = true;
    }
    config.validate()?;

    info!("Configuration loaded from {:?}", config_path);

    if let Some(path) = args.snapshot {
        return evaluate_file(&config, &path);
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_headless(config, args.vehicles))
}

/// Evaluate a snapshot file once and print the feed
fn evaluate_file(config: &Config, path: &PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {:?}", path))?;
    let snapshot: Snapshot = serde_json::from_str(&content)
        .with_context(|| format!("parsing snapshot {:?}", path))?;

    let evaluator = RuleEvaluator::new(config.rules.clone());
    let evaluation = evaluator.evaluate_with_report(&snapshot, chrono::Utc::now());
    for anomaly in &evaluation.anomalies {
        warn!("{} skipped for job {}: {}", anomaly.rule.title(), anomaly.job_id, anomaly.error);
    }

    let feed = fleetwatch::alerts::merge_partitions(&evaluation.alerts, &[], &[]);
    println!("{}", serde_json::to_string_pretty(&feed)?);
    Ok(())
}

/// Run the engine until Ctrl+C
async fn run_headless(config: Config, vehicles: usize) -> Result<()> {
    use tokio::sync::broadcast;

    info!("Initializing headless mode...");

    let shared = Arc::new(SharedSnapshot::default());
    let demo_source = ChannelEventSource::new();

    let mut engine = Engine::new(config.clone(), shared.clone())?;
    if config.streaming.mqtt_enabled {
        let source = MqttEventSource::new(MqttConfig::from(&config.streaming));
        engine = engine.with_event_source(Arc::new(source));
        info!("Fatigue stream: MQTT {}:{}", config.streaming.mqtt_broker, config.streaming.mqtt_port);
    } else if config.demo_mode {
        engine = engine.with_event_source(Arc::new(demo_source.clone()));
        info!("Fatigue stream: simulator");
    } else {
        warn!("No fatigue stream configured and demo mode is off; only rule alerts will be raised");
    }

    engine.start().await?;
    info!("Alert engine initialized");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    if config.demo_mode {
        let simulator = FleetSimulator::new(vehicles, chrono::Utc::now());
        tokio::spawn(simulator.run(
            shared.clone(),
            engine.notifier(),
            demo_source,
            Duration::from_secs(5),
            shutdown_tx.subscribe(),
        ));
    }

    // Log the feed as it changes
    let mut feed_rx = engine.watch();
    let mut shutdown_rx = shutdown_tx.subscribe();
    let reporter = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                changed = feed_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let feed = feed_rx.borrow_and_update().clone();
                    let critical = feed.alerts.iter().filter(|a| a.severity == fleetwatch::Severity::Critical).count();
                    info!("Feed v{}: {} alerts ({} critical)", feed.version, feed.alerts.len(), critical);
                    if let Some(top) = feed.alerts.first() {
                        info!("   top: [{}] {} - {}", top.severity, top.alert_type, top.message);
                    }
                }
            }
        }
    });

    info!("FleetWatch running in headless mode");
    info!("   Press Ctrl+C to shutdown");

    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received, cleaning up...");

    let _ = shutdown_tx.send(());
    engine.stop().await?;
    let _ = reporter.await;

    if let Some(journal) = engine.journal() {
        let stats = journal.stats()?;
        info!("Journal: {} entries ({} resolved)", stats.total, stats.resolved);
        journal.cleanup(config.journal.retention_days)?;
    }

    info!("FleetWatch shutdown complete");

    Ok(())
}
