// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fleetwatch-rs

//! Fatigue event ingestor - keeps the recent safety window and mirrors it
//! into the aggregator's streamed partition

use std::sync::Arc;
use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::{EventSource, FatigueEvent, SourceError, Subscription};
use crate::alerts::{Aggregator, Alert, AlertMetadata, AlertSource, FatigueLevel, SubjectRefs};
use crate::core::EventBus;
use crate::rules::relative_phrase;

struct WindowState {
    events: Vec<FatigueEvent>,
    active: bool,
}

/// Subscribes to a fatigue event source and owns the streamed partition
pub struct FatigueIngestor {
    capacity: usize,
    state: Mutex<WindowState>,
    subscription: Mutex<Option<Subscription>>,
    aggregator: Arc<Aggregator>,
    event_bus: Arc<EventBus>,
}

impl FatigueIngestor {
    pub fn new(capacity: usize, aggregator: Arc<Aggregator>, event_bus: Arc<EventBus>) -> Arc<Self> {
        Arc::new(Self {
            capacity: capacity.max(1),
            state: Mutex::new(WindowState {
                events: Vec::new(),
                active: false,
            }),
            subscription: Mutex::new(None),
            aggregator,
            event_bus,
        })
    }

    /// Subscribe to `source`. Updates arriving after [`shutdown`](Self::shutdown) are ignored.
    pub fn start(self: &Arc<Self>, source: &dyn EventSource) -> Result<()> {
        self.state.lock().active = true;

        let on_update = {
            let ingestor = Arc::downgrade(self);
            Box::new(move |events: Vec<FatigueEvent>| {
                if let Some(ingestor) = ingestor.upgrade() {
                    ingestor.handle_update(events, Utc::now());
                }
            })
        };
        let on_error = {
            let ingestor = Arc::downgrade(self);
            Box::new(move |err: SourceError| {
                if let Some(ingestor) = ingestor.upgrade() {
                    ingestor.handle_error(&err);
                }
            })
        };

        match source.subscribe(on_update, on_error) {
            Ok(subscription) => {
                *self.subscription.lock() = Some(subscription);
                info!("Fatigue ingestor subscribed (window {})", self.capacity);
                Ok(())
            }
            Err(e) => {
                self.state.lock().active = false;
                Err(e)
            }
        }
    }

    /// Replace the window with the newest `capacity` events of `events`
    /// (most recent first) and republish the streamed partition.
    pub fn handle_update(&self, mut events: Vec<FatigueEvent>, now: DateTime<Utc>) {
        let mut state = self.state.lock();
        if !state.active {
            debug!("Ingestor inactive, dropping update of {} events", events.len());
            return;
        }

        let evicted = events.len().saturating_sub(self.capacity);
        events.truncate(self.capacity);
        if evicted > 0 {
            debug!("Evicted {} oldest fatigue events", evicted);
        }

        let alerts = events.iter().map(|e| fatigue_alert(e, now)).collect();
        state.events = events;
        self.aggregator.replace_streamed(alerts);
        self.event_bus.publish_stream_update(state.events.len(), evicted);
    }

    /// Subscription failure: stale safety alerts must not linger, so the
    /// window is cleared. Reconnecting is left to the transport.
    pub fn handle_error(&self, err: &SourceError) {
        let mut state = self.state.lock();
        if !state.active {
            return;
        }

        error!("Fatigue event subscription failed: {}", err);
        let dropped = state.events.len();
        state.events.clear();
        self.aggregator.replace_streamed(Vec::new());
        self.event_bus.publish_subscription_failure(&err.to_string());
        if dropped > 0 {
            info!("Cleared {} streamed safety alerts after subscription failure", dropped);
        }
    }

    /// Unsubscribe and stop writing to the aggregator
    pub fn shutdown(&self) {
        self.state.lock().active = false;
        // Dropped outside the window lock: a source may be mid-delivery
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
            info!("Fatigue ingestor unsubscribed");
        }
    }

    /// Current window, most recent first
    pub fn window(&self) -> Vec<FatigueEvent> {
        self.state.lock().events.clone()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Map a fatigue event to its feed alert; the source id is the alert id
pub fn fatigue_alert(event: &FatigueEvent, now: DateTime<Utc>) -> Alert {
    let level = event.fatigue_level;
    let message = format!(
        "{} fatigue score {} detected {}",
        event.driver_name,
        format_score(event.score),
        relative_phrase(event.created_at, now)
    );

    let subject = SubjectRefs {
        driver_id: event.driver_id.clone(),
        ..SubjectRefs::default()
    };

    let mut alert = Alert::new(
        event.id.clone(),
        format!("Fatigue Alert: {}", level.as_str()),
        level.severity(),
        message,
        event.created_at.unwrap_or(now),
        AlertSource::Integration,
    )
    .with_subject(subject)
    .with_metadata(AlertMetadata::Fatigue {
        level,
        score: event.score,
    });

    if level != FatigueLevel::Low {
        alert = alert.with_hint("Contact the driver and arrange a rest break");
    }
    alert
}

fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{:.0}", score)
    } else {
        format!("{:.1}", score)
    }
}
