//! In-process event source, used by the simulator and in tests

use std::sync::{Arc, Weak};
use parking_lot::Mutex;
use tracing::debug;

use super::{ErrorFn, EventSource, FatigueEvent, SourceError, Subscription, UpdateFn};

struct Subscriber {
    id: u64,
    on_update: UpdateFn,
    on_error: ErrorFn,
}

#[derive(Default)]
struct Inner {
    subscribers: Vec<Subscriber>,
    next_id: u64,
    latest: Option<Vec<FatigueEvent>>,
}

/// Fan-out source fed by the host. New subscribers receive the latest snapshot.
#[derive(Clone, Default)]
pub struct ChannelEventSource {
    inner: Arc<Mutex<Inner>>,
}

impl ChannelEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a full snapshot (most recent first) to every subscriber
    pub fn publish(&self, events: Vec<FatigueEvent>) {
        let mut inner = self.inner.lock();
        for subscriber in &inner.subscribers {
            (subscriber.on_update)(events.clone());
        }
        inner.latest = Some(events);
    }

    /// Report a transport failure to every subscriber
    pub fn fail(&self, err: SourceError) {
        let mut inner = self.inner.lock();
        for subscriber in &inner.subscribers {
            (subscriber.on_error)(err.clone());
        }
        inner.latest = None;
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

impl EventSource for ChannelEventSource {
    fn subscribe(&self, on_update: UpdateFn, on_error: ErrorFn) -> anyhow::Result<Subscription> {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        if let Some(latest) = &inner.latest {
            on_update(latest.clone());
        }
        inner.subscribers.push(Subscriber { id, on_update, on_error });
        debug!("Channel source subscriber {} added", id);

        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.lock().subscribers.retain(|s| s.id != id);
                debug!("Channel source subscriber {} removed", id);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::FatigueLevel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event(id: &str) -> FatigueEvent {
        FatigueEvent {
            id: id.into(),
            driver_id: None,
            driver_name: "Kim".into(),
            fatigue_level: FatigueLevel::High,
            score: 70.0,
            created_at: None,
        }
    }

    #[test]
    fn test_late_subscriber_gets_latest() {
        let source = ChannelEventSource::new();
        source.publish(vec![event("E1"), event("E2")]);

        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        let _sub = source
            .subscribe(
                Box::new(move |events| {
                    s.store(events.len(), Ordering::SeqCst);
                }),
                Box::new(|_| {}),
            )
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_errors_reach_subscribers_and_reset_latest() {
        let source = ChannelEventSource::new();
        let errors = Arc::new(AtomicUsize::new(0));
        let e = errors.clone();
        let sub = source
            .subscribe(
                Box::new(|_| {}),
                Box::new(move |_| {
                    e.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        source.publish(vec![event("E1")]);
        source.fail(SourceError::Disconnected("reset".into()));
        assert_eq!(errors.load(Ordering::SeqCst), 1);

        drop(sub);
        assert_eq!(source.subscriber_count(), 0);
        source.fail(SourceError::Disconnected("again".into()));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }
}
