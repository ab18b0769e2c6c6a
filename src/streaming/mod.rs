//! Streaming module - safety event sources and the ingestor that maps them to alerts

mod channel;
mod ingestor;
mod mqtt;

pub use channel::*;
pub use ingestor::*;
pub use mqtt::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alerts::FatigueLevel;

/// Safety event as delivered by the fatigue monitoring integration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FatigueEvent {
    pub id: String,
    #[serde(default)]
    pub driver_id: Option<String>,
    pub driver_name: String,
    pub fatigue_level: FatigueLevel,
    pub score: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Failure reported by an event source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("connection lost: {0}")]
    Disconnected(String),

    #[error("undecodable payload: {0}")]
    Decode(String),

    #[error("subscription rejected: {0}")]
    Rejected(String),
}

pub type UpdateFn = Box<dyn Fn(Vec<FatigueEvent>) + Send + Sync + 'static>;
pub type ErrorFn = Box<dyn Fn(SourceError) + Send + Sync + 'static>;

/// Push-based source of full event-window snapshots, most recent first
pub trait EventSource: Send + Sync {
    /// Start delivering snapshots. Retrying after errors is the source's own
    /// business; subscribers only hear about them through `on_error`.
    fn subscribe(&self, on_update: UpdateFn, on_error: ErrorFn) -> anyhow::Result<Subscription>;
}

/// Live subscription handle. Dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl Subscription {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

/// Streaming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Subscribe to fatigue events over MQTT
    pub mqtt_enabled: bool,
    pub mqtt_broker: String,
    pub mqtt_port: u16,
    pub mqtt_client_id: String,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    /// Topic carrying JSON arrays of fatigue events
    pub mqtt_topic: String,
    pub mqtt_keep_alive_secs: u64,
    /// Delay before the transport reconnects after an error
    pub mqtt_reconnect_secs: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            mqtt_enabled: false,
            mqtt_broker: "localhost".to_string(),
            mqtt_port: 1883,
            mqtt_client_id: "fleetwatch".to_string(),
            mqtt_username: None,
            mqtt_password: None,
            mqtt_topic: "fleet/safety/fatigue".to_string(),
            mqtt_keep_alive_secs: 30,
            mqtt_reconnect_secs: 5,
        }
    }
}
