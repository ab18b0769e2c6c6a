// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fleetwatch-rs

//! MQTT event source - fatigue snapshots published as JSON arrays on a topic

use anyhow::{anyhow, Result};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use tracing::{info, warn, debug};

use super::{ErrorFn, EventSource, FatigueEvent, SourceError, StreamingConfig, Subscription, UpdateFn};

/// Connection settings for [`MqttEventSource`]
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub broker: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic: String,
    pub keep_alive_secs: u64,
    pub reconnect_interval_secs: u64,
}

impl From<&StreamingConfig> for MqttConfig {
    fn from(config: &StreamingConfig) -> Self {
        Self {
            broker: config.mqtt_broker.clone(),
            port: config.mqtt_port,
            client_id: config.mqtt_client_id.clone(),
            username: config.mqtt_username.clone(),
            password: config.mqtt_password.clone(),
            topic: config.mqtt_topic.clone(),
            keep_alive_secs: config.mqtt_keep_alive_secs,
            reconnect_interval_secs: config.mqtt_reconnect_secs,
        }
    }
}

/// Event source backed by an MQTT topic. Reconnection is driven by the
/// event loop; each outage is reported once through `on_error`.
pub struct MqttEventSource {
    config: MqttConfig,
}

impl MqttEventSource {
    pub fn new(config: MqttConfig) -> Self {
        Self { config }
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.config.client_id, &self.config.broker, self.config.port);
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs.max(5)));

        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            options.set_credentials(username, password);
        }
        options
    }
}

impl EventSource for MqttEventSource {
    fn subscribe(&self, on_update: UpdateFn, on_error: ErrorFn) -> Result<Subscription> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| anyhow!("MQTT event source requires a tokio runtime"))?;

        let (client, mut eventloop) = AsyncClient::new(self.options(), 100);
        let topic = self.config.topic.clone();
        let reconnect = Duration::from_secs(self.config.reconnect_interval_secs.max(1));
        let task_client = client.clone();

        let task = runtime.spawn(async move {
            let mut connected = false;
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        connected = true;
                        info!("MQTT connected, subscribing to {}", topic);
                        if let Err(e) = task_client.subscribe(topic.as_str(), QoS::AtLeastOnce).await {
                            on_error(SourceError::Rejected(e.to_string()));
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(msg))) => {
                        match decode_snapshot(&msg.payload) {
                            Ok(events) => {
                                debug!("MQTT fatigue snapshot with {} events", events.len());
                                on_update(events);
                            }
                            Err(e) => warn!("Skipping MQTT message on {}: {}", msg.topic, e),
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if connected {
                            connected = false;
                            on_error(SourceError::Disconnected(e.to_string()));
                        }
                        warn!("MQTT error: {:?}", e);
                        tokio::time::sleep(reconnect).await;
                    }
                }
            }
        });

        info!("MQTT event source started for {}:{}", self.config.broker, self.config.port);
        Ok(Subscription::new(move || {
            task.abort();
            // Best effort: the event loop is gone, so this only queues the request
            let _ = client.try_disconnect();
            info!("MQTT event source stopped");
        }))
    }
}

/// Decode a JSON array of fatigue events
pub fn decode_snapshot(payload: &[u8]) -> Result<Vec<FatigueEvent>, SourceError> {
    serde_json::from_slice(payload).map_err(|e| SourceError::Decode(e.to_string()))
}
