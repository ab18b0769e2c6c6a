//! Core engine module - wires evaluation, ingestion and the alert feed together

mod engine;
mod scheduler;
mod event_bus;

pub use engine::Engine;
pub use scheduler::{CoalescingGate, EvaluateFn, Phase, Scheduler, StateChangeNotifier};
pub use event_bus::{EngineStats, Event, EventBus, EventPayload, EventType, StatsSnapshot};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Engine-wide state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineState {
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub feed_version: u64,
    pub feed_size: usize,
    pub streamed_events: usize,
    pub stats: StatsSnapshot,
}
