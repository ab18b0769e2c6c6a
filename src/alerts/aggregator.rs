// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fleetwatch-rs

//! Alert aggregator - owns the canonical alert state and the published feed
//!
//! Three partitions feed one ordered list:
//!
//! - `derived`: replaced wholesale by every rule evaluation
//! - `streamed`: replaced wholesale by every safety stream update
//! - `adhoc`: one-shot inserts (SOS), upserted by id
//!
//! Every write and the merge that follows happen under a single mutex, so a
//! feed is never a torn union of partitions. Consumer callbacks run after the
//! lock is released, one feed version at a time and in version order.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

use super::Alert;
use crate::core::EventBus;

/// Consumer callback, invoked with the full merged feed on every change.
///
/// Callbacks may call back into the aggregator. A feed published from inside
/// a callback is delivered once the current delivery round has finished.
pub type FeedCallback = Arc<dyn Fn(&[Alert]) + Send + Sync + 'static>;

/// A published version of the feed
#[derive(Debug, Clone, Default)]
pub struct Feed {
    pub version: u64,
    pub alerts: Arc<Vec<Alert>>,
}

/// Partition sizes, for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionSizes {
    pub derived: usize,
    pub streamed: usize,
    pub adhoc: usize,
}

struct Consumer {
    callback: FeedCallback,
    /// Feed version handed over on subscribe; older broadcasts are skipped
    since_version: u64,
}

struct Delivery {
    version: u64,
    alerts: Arc<Vec<Alert>>,
    /// `None` for every consumer, `Some(id)` for a new consumer's first feed
    target: Option<u64>,
}

struct AggregatorState {
    derived: Vec<Alert>,
    derived_seq: u64,
    streamed: Vec<Alert>,
    streamed_seq: u64,
    adhoc: Vec<(u64, Alert)>,
    write_seq: u64,
    consumers: Vec<(u64, Consumer)>,
    next_consumer_id: u64,
    version: u64,
    pending: VecDeque<Delivery>,
    delivering: bool,
    closed: bool,
}

impl AggregatorState {
    fn next_write(&mut self) -> u64 {
        self.write_seq += 1;
        self.write_seq
    }
}

/// Merges derived, streamed and ad-hoc alerts into one feed
pub struct Aggregator {
    state: Mutex<AggregatorState>,
    feed_tx: watch::Sender<Feed>,
    event_bus: Arc<EventBus>,
}

impl Aggregator {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        let (feed_tx, _) = watch::channel(Feed::default());

        Self {
            state: Mutex::new(AggregatorState {
                derived: Vec::new(),
                derived_seq: 0,
                streamed: Vec::new(),
                streamed_seq: 0,
                adhoc: Vec::new(),
                write_seq: 0,
                consumers: Vec::new(),
                next_consumer_id: 0,
                version: 0,
                pending: VecDeque::new(),
                delivering: false,
                closed: false,
            }),
            feed_tx,
            event_bus,
        }
    }

    /// Replace the derived partition. This is a full aggregation pass, so
    /// ad-hoc alerts that were not re-inserted are dropped as well.
    pub fn replace_derived(&self, alerts: Vec<Alert>) -> Vec<Alert> {
        let merged = {
            let mut state = self.state.lock();
            if state.closed {
                debug!("Aggregator closed, discarding {} derived alerts", alerts.len());
                return Vec::new();
            }
            state.derived = alerts;
            state.derived_seq = state.next_write();
            state.adhoc.clear();
            self.publish_locked(&mut state)
        };
        self.deliver();
        merged
    }

    /// Replace the streamed partition
    pub fn replace_streamed(&self, alerts: Vec<Alert>) -> Vec<Alert> {
        let merged = {
            let mut state = self.state.lock();
            if state.closed {
                debug!("Aggregator closed, discarding {} streamed alerts", alerts.len());
                return Vec::new();
            }
            state.streamed = alerts;
            state.streamed_seq = state.next_write();
            self.publish_locked(&mut state)
        };
        self.deliver();
        merged
    }

    /// Add or overwrite an ad-hoc alert by id, then publish
    pub fn insert(&self, alert: Alert) -> Vec<Alert> {
        let merged = {
            let mut state = self.state.lock();
            if state.closed {
                debug!("Aggregator closed, discarding ad-hoc alert {}", alert.alert_id);
                return Vec::new();
            }

            self.event_bus.publish_adhoc(&alert.alert_id);
            info!("Ad-hoc alert {} ({})", alert.alert_id, alert.alert_type);

            let seq = state.next_write();
            match state.adhoc.iter_mut().find(|(_, a)| a.alert_id == alert.alert_id) {
                Some(existing) => *existing = (seq, alert),
                None => state.adhoc.push((seq, alert)),
            }
            self.publish_locked(&mut state)
        };
        self.deliver();
        merged
    }

    /// Recompute the merged feed and deliver it to every consumer
    pub fn publish(&self) -> Vec<Alert> {
        let merged = {
            let mut state = self.state.lock();
            if state.closed {
                return self.current().alerts.as_ref().clone();
            }
            self.publish_locked(&mut state)
        };
        self.deliver();
        merged
    }

    fn publish_locked(&self, state: &mut AggregatorState) -> Vec<Alert> {
        let (derived_seq, streamed_seq) = (state.derived_seq, state.streamed_seq);
        let derived = state.derived.iter().map(|a| (derived_seq, a));
        let streamed = state.streamed.iter().map(|a| (streamed_seq, a));
        let adhoc = state.adhoc.iter().map(|(seq, a)| (*seq, a));
        let merged = merge_writes(derived.chain(streamed).chain(adhoc));

        state.version += 1;
        let alerts = Arc::new(merged.clone());
        self.feed_tx.send_replace(Feed {
            version: state.version,
            alerts: alerts.clone(),
        });
        state.pending.push_back(Delivery {
            version: state.version,
            alerts,
            target: None,
        });
        self.event_bus.publish_feed(state.version, merged.len());

        debug!("Published feed v{} with {} alerts", state.version, merged.len());
        merged
    }

    /// Hand queued feeds to consumers, outside the state lock. Only one
    /// thread delivers at a time; the others leave their feeds queued.
    fn deliver(&self) {
        {
            let mut state = self.state.lock();
            if state.delivering || state.pending.is_empty() {
                return;
            }
            state.delivering = true;
        }

        loop {
            let (delivery, callbacks) = {
                let mut state = self.state.lock();
                let Some(delivery) = state.pending.pop_front() else {
                    state.delivering = false;
                    return;
                };
                let callbacks: Vec<FeedCallback> = state
                    .consumers
                    .iter()
                    .filter(|(id, consumer)| match delivery.target {
                        Some(target) => *id == target,
                        None => delivery.version > consumer.since_version,
                    })
                    .map(|(_, consumer)| consumer.callback.clone())
                    .collect();
                (delivery, callbacks)
            };

            for callback in &callbacks {
                callback(&delivery.alerts);
            }
        }
    }

    /// Register a consumer. It receives the current feed first, then every
    /// later version. Dropping the returned handle unsubscribes.
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> FeedSubscription
    where
        F: Fn(&[Alert]) + Send + Sync + 'static,
    {
        let id = {
            let mut state = self.state.lock();
            let id = state.next_consumer_id;
            state.next_consumer_id += 1;

            let current = self.feed_tx.borrow().clone();
            if state.closed {
                drop(state);
                callback(&current.alerts);
                return FeedSubscription {
                    id,
                    aggregator: Weak::new(),
                };
            }

            state.consumers.push((
                id,
                Consumer {
                    callback: Arc::new(callback),
                    since_version: current.version,
                },
            ));
            state.pending.push_back(Delivery {
                version: current.version,
                alerts: current.alerts,
                target: Some(id),
            });
            id
        };
        self.deliver();

        FeedSubscription {
            id,
            aggregator: Arc::downgrade(self),
        }
    }

    fn remove_consumer(&self, id: u64) {
        self.state.lock().consumers.retain(|(cid, _)| *cid != id);
    }

    /// Watch channel for async consumers
    pub fn watch(&self) -> watch::Receiver<Feed> {
        self.feed_tx.subscribe()
    }

    /// Last published feed
    pub fn current(&self) -> Feed {
        self.feed_tx.borrow().clone()
    }

    pub fn partition_sizes(&self) -> PartitionSizes {
        let state = self.state.lock();
        PartitionSizes {
            derived: state.derived.len(),
            streamed: state.streamed.len(),
            adhoc: state.adhoc.len(),
        }
    }

    pub fn consumer_count(&self) -> usize {
        self.state.lock().consumers.len()
    }

    /// Stop accepting partition writes and drop every consumer. The last
    /// feed stays readable.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if !state.closed {
            state.closed = true;
            state.consumers.clear();
            state.pending.clear();
            info!("Aggregator closed at feed v{}", state.version);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

/// Handle for a registered feed consumer
pub struct FeedSubscription {
    id: u64,
    aggregator: Weak<Aggregator>,
}

impl FeedSubscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        if let Some(aggregator) = self.aggregator.upgrade() {
            aggregator.remove_consumer(self.id);
        }
    }
}

/// Concatenate, deduplicate by id and order the partitions, treating them as
/// written in the order derived, streamed, adhoc.
pub fn merge_partitions(derived: &[Alert], streamed: &[Alert], adhoc: &[Alert]) -> Vec<Alert> {
    let derived = derived.iter().map(|a| (0, a));
    let streamed = streamed.iter().map(|a| (1, a));
    let adhoc = adhoc.iter().map(|a| (2, a));
    merge_writes(derived.chain(streamed).chain(adhoc))
}

/// Merge alerts tagged with their write sequence.
///
/// On id collision the last write wins; within one write the later entry
/// wins. Ordering is severity rank ascending, then `triggered_at`
/// descending, then id.
fn merge_writes<'a>(writes: impl IntoIterator<Item = (u64, &'a Alert)>) -> Vec<Alert> {
    let mut merged: Vec<(u64, Alert)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (seq, alert) in writes {
        match index.get(&alert.alert_id) {
            Some(&pos) => {
                if seq >= merged[pos].0 {
                    merged[pos] = (seq, alert.clone());
                }
            }
            None => {
                index.insert(alert.alert_id.clone(), merged.len());
                merged.push((seq, alert.clone()));
            }
        }
    }

    let mut merged: Vec<Alert> = merged.into_iter().map(|(_, alert)| alert).collect();
    merged.sort_by(|a, b| {
        a.severity
            .rank()
            .cmp(&b.severity.rank())
            .then_with(|| b.triggered_at.cmp(&a.triggered_at))
            .then_with(|| a.alert_id.cmp(&b.alert_id))
    });
    merged
}
