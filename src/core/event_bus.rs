// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fleetwatch-rs

//! Observability event bus - evaluation, ingestion and feed activity

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Event types in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Evaluation,
    InputAnomaly,
    Stream,
    Feed,
    Error,
}

/// Generic event wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    EvaluationCompleted { alerts: usize, anomalies: usize, duration_us: u64 },
    InputAnomaly { rule: String, job_id: String, detail: String },
    StreamUpdated { events: usize, evicted: usize },
    SubscriptionFailed { reason: String },
    FeedPublished { version: u64, size: usize },
    AdhocInserted { alert_id: String },
}

/// Running counters, readable without subscribing
#[derive(Debug, Default)]
pub struct EngineStats {
    evaluations: AtomicU64,
    anomalies: AtomicU64,
    stream_updates: AtomicU64,
    subscription_failures: AtomicU64,
    publishes: AtomicU64,
}

/// Point-in-time copy of [`EngineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub evaluations: u64,
    pub anomalies: u64,
    pub stream_updates: u64,
    pub subscription_failures: u64,
    pub publishes: u64,
}

impl EngineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            evaluations: self.evaluations.load(Ordering::Relaxed),
            anomalies: self.anomalies.load(Ordering::Relaxed),
            stream_updates: self.stream_updates.load(Ordering::Relaxed),
            subscription_failures: self.subscription_failures.load(Ordering::Relaxed),
            publishes: self.publishes.load(Ordering::Relaxed),
        }
    }
}

/// Central event bus for pub/sub observability
pub struct EventBus {
    event_tx: broadcast::Sender<Event>,
    event_counter: AtomicU64,
    stats: EngineStats,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));

        Self {
            event_tx,
            event_counter: AtomicU64::new(0),
            stats: EngineStats::default(),
        }
    }

    pub fn publish_evaluation(&self, alerts: usize, anomalies: usize, duration_us: u64) {
        self.stats.evaluations.fetch_add(1, Ordering::Relaxed);
        self.publish_event(
            EventType::Evaluation,
            EventPayload::EvaluationCompleted { alerts, anomalies, duration_us },
        );
    }

    pub fn publish_anomaly(&self, rule: &str, job_id: &str, detail: &str) {
        self.stats.anomalies.fetch_add(1, Ordering::Relaxed);
        self.publish_event(
            EventType::InputAnomaly,
            EventPayload::InputAnomaly {
                rule: rule.to_string(),
                job_id: job_id.to_string(),
                detail: detail.to_string(),
            },
        );
    }

    pub fn publish_stream_update(&self, events: usize, evicted: usize) {
        self.stats.stream_updates.fetch_add(1, Ordering::Relaxed);
        self.publish_event(EventType::Stream, EventPayload::StreamUpdated { events, evicted });
    }

    pub fn publish_subscription_failure(&self, reason: &str) {
        self.stats.subscription_failures.fetch_add(1, Ordering::Relaxed);
        self.publish_event(
            EventType::Error,
            EventPayload::SubscriptionFailed { reason: reason.to_string() },
        );
    }

    pub fn publish_feed(&self, version: u64, size: usize) {
        self.stats.publishes.fetch_add(1, Ordering::Relaxed);
        self.publish_event(EventType::Feed, EventPayload::FeedPublished { version, size });
    }

    pub fn publish_adhoc(&self, alert_id: &str) {
        self.publish_event(
            EventType::Feed,
            EventPayload::AdhocInserted { alert_id: alert_id.to_string() },
        );
    }

    fn publish_event(&self, event_type: EventType, payload: EventPayload) {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let event = Event {
            id,
            event_type,
            timestamp: Utc::now(),
            payload,
        };
        // No receivers is fine
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
