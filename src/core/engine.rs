//! Alert engine - the composition root for evaluation, ingestion and the feed

use std::sync::Arc;
use std::time::Instant;
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::alerts::{Aggregator, Alert, Feed, FeedSubscription};
use crate::config::Config;
use crate::db::AlertJournal;
use crate::rules::{RuleEvaluator, SnapshotProvider, InputError};
use crate::streaming::{EventSource, FatigueIngestor};
use super::{EngineState, EventBus, Scheduler, StateChangeNotifier};

/// Owns every moving part of the alert engine. Dependencies are injected,
/// nothing is global.
pub struct Engine {
    pub config: Arc<Config>,
    state: Arc<RwLock<EngineState>>,
    event_bus: Arc<EventBus>,
    aggregator: Arc<Aggregator>,
    evaluator: Arc<RuleEvaluator>,
    scheduler: Arc<Scheduler>,
    ingestor: Arc<FatigueIngestor>,
    snapshots: Arc<dyn SnapshotProvider>,
    event_source: Option<Arc<dyn EventSource>>,
    journal: Option<Arc<AlertJournal>>,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
    start_time: Option<Instant>,
}

impl Engine {
    pub fn new(config: Config, snapshots: Arc<dyn SnapshotProvider>) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let event_bus = Arc::new(EventBus::new(config.engine.event_bus_capacity));
        let aggregator = Arc::new(Aggregator::new(event_bus.clone()));
        let ingestor = FatigueIngestor::new(config.engine.stream_window, aggregator.clone(), event_bus.clone());
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            evaluator: Arc::new(RuleEvaluator::new(config.rules.clone())),
            scheduler: Scheduler::new(config.engine.evaluation_interval()),
            state: Arc::new(RwLock::new(EngineState::default())),
            config,
            event_bus,
            aggregator,
            ingestor,
            snapshots,
            event_source: None,
            journal: None,
            shutdown_tx,
            tasks: Vec::new(),
            start_time: None,
        })
    }

    /// Attach the safety event stream
    pub fn with_event_source(mut self, source: Arc<dyn EventSource>) -> Self {
        self.event_source = Some(source);
        self
    }

    /// Attach an audit journal, overriding the configured one
    pub fn with_journal(mut self, journal: Arc<AlertJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub async fn start(&mut self) -> Result<()> {
        if self.state.read().await.running {
            bail!("engine already running");
        }
        if self.aggregator.is_closed() {
            bail!("engine was stopped and cannot be restarted");
        }
        info!("Starting alert engine...");
        self.start_time = Some(Instant::now());

        if self.journal.is_none() && self.config.journal.enabled {
            self.journal = Some(Arc::new(AlertJournal::open(&self.config.journal.path)?));
        }

        // Nothing is spawned until the subscription is in place
        if let Some(source) = &self.event_source {
            self.ingestor.start(source.as_ref())?;
        } else {
            info!("No safety event source configured");
        }

        if let Some(journal) = self.journal.clone() {
            self.tasks.push(spawn_journal(journal, &self.aggregator));
        }

        let job = {
            let snapshots = self.snapshots.clone();
            let evaluator = self.evaluator.clone();
            let aggregator = self.aggregator.clone();
            let event_bus = self.event_bus.clone();
            Arc::new(move || {
                run_evaluation(snapshots.as_ref(), &evaluator, &aggregator, &event_bus);
            })
        };
        self.tasks.push(self.scheduler.spawn(job, self.shutdown_tx.subscribe()));

        {
            let mut state = self.state.write().await;
            state.running = true;
            state.started_at = Some(Utc::now());
        }

        info!("Alert engine started");
        Ok(())
    }

    /// Stop timers and subscriptions. An evaluation already in flight
    /// finishes, but its result is discarded.
    pub async fn stop(&mut self) -> Result<()> {
        info!("Stopping alert engine...");

        let _ = self.shutdown_tx.send(());
        self.ingestor.shutdown();
        self.aggregator.close();

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                error!("Engine task ended abnormally: {}", e);
            }
        }

        {
            let mut state = self.state.write().await;
            state.running = false;
        }

        info!("Alert engine stopped");
        Ok(())
    }

    /// Evaluate immediately on the caller's thread. Waits for a scheduled
    /// pass in flight, so evaluations never overlap.
    pub fn evaluate_now(&self) -> Vec<Alert> {
        self.scheduler.exclusive(|| {
            run_evaluation(self.snapshots.as_ref(), &self.evaluator, &self.aggregator, &self.event_bus)
        })
    }

    /// Signal that operational state changed
    pub fn notify_state_changed(&self) {
        self.scheduler.trigger();
    }

    /// Handle for state owners to signal changes
    pub fn notifier(&self) -> StateChangeNotifier {
        self.scheduler.notifier()
    }

    /// Ad-hoc insert, visible in the feed once this returns
    pub fn insert(&self, alert: Alert) -> Vec<Alert> {
        self.aggregator.insert(alert)
    }

    /// Raise an SOS for a driver
    pub fn raise_sos(&self, driver_id: &str, driver_name: &str, note: Option<String>) -> Alert {
        let alert = Alert::sos(driver_id, driver_name, note, Utc::now());
        warn!("SOS raised by {} ({})", driver_name, driver_id);
        self.aggregator.insert(alert.clone());
        alert
    }

    pub fn subscribe<F>(&self, callback: F) -> FeedSubscription
    where
        F: Fn(&[Alert]) + Send + Sync + 'static,
    {
        self.aggregator.subscribe(callback)
    }

    pub fn watch(&self) -> watch::Receiver<Feed> {
        self.aggregator.watch()
    }

    /// Last published feed
    pub fn feed(&self) -> Vec<Alert> {
        self.aggregator.current().alerts.as_ref().clone()
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    pub fn ingestor(&self) -> &Arc<FatigueIngestor> {
        &self.ingestor
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn journal(&self) -> Option<&Arc<AlertJournal>> {
        self.journal.as_ref()
    }

    pub async fn state(&self) -> EngineState {
        let mut state = self.state.read().await.clone();
        let feed = self.aggregator.current();
        state.feed_version = feed.version;
        state.feed_size = feed.alerts.len();
        state.streamed_events = self.ingestor.window().len();
        state.stats = self.event_bus.stats();
        state
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }
}

/// One evaluator pass: snapshot, evaluate, replace the derived partition
fn run_evaluation(
    snapshots: &dyn SnapshotProvider,
    evaluator: &RuleEvaluator,
    aggregator: &Aggregator,
    event_bus: &EventBus,
) -> Vec<Alert> {
    let started = Instant::now();
    let snapshot = snapshots.snapshot();
    let evaluation = evaluator.evaluate_with_report(&snapshot, Utc::now());

    for anomaly in &evaluation.anomalies {
        match &anomaly.error {
            InputError::Missing(_) => debug!(
                "{} skipped for job {}: {}",
                anomaly.rule.title(),
                anomaly.job_id,
                anomaly.error
            ),
            InputError::Malformed { .. } | InputError::ThresholdOutOfRange(_) => warn!(
                "{} skipped for job {}: {}",
                anomaly.rule.title(),
                anomaly.job_id,
                anomaly.error
            ),
        }
        event_bus.publish_anomaly(anomaly.rule.title(), &anomaly.job_id, &anomaly.error.to_string());
    }

    let derived = evaluation.alerts.len();
    let anomalies = evaluation.anomalies.len();
    let feed = aggregator.replace_derived(evaluation.alerts);
    event_bus.publish_evaluation(derived, anomalies, started.elapsed().as_micros() as u64);
    debug!("Evaluation produced {} alerts ({} anomalies)", derived, anomalies);
    feed
}

/// Journal every published feed version in order. The task ends once the
/// aggregator is closed and the queue is drained.
fn spawn_journal(journal: Arc<AlertJournal>, aggregator: &Arc<Aggregator>) -> JoinHandle<()> {
    let (feed_tx, mut feed_rx) = mpsc::unbounded_channel::<(Vec<Alert>, DateTime<Utc>)>();
    let subscription = aggregator.subscribe(move |alerts| {
        let _ = feed_tx.send((alerts.to_vec(), Utc::now()));
    });

    tokio::spawn(async move {
        let _subscription = subscription;
        while let Some((alerts, at)) = feed_rx.recv().await {
            if let Err(e) = journal.record_feed(&alerts, at) {
                error!("Failed to journal feed of {} alerts: {:#}", alerts.len(), e);
            }
        }
        debug!("Journal task stopped");
    })
}
