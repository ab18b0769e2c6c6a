// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fleetwatch-rs

//! Configuration module

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::streaming::StreamingConfig;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level
    pub log_level: String,

    /// Run against the built-in fleet simulator
    pub demo_mode: bool,

    /// Scheduling and feed configuration
    pub engine: EngineConfig,

    /// Rule thresholds
    pub rules: RuleConfig,

    /// Safety event stream configuration
    pub streaming: StreamingConfig,

    /// Alert audit journal
    pub journal: JournalConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            demo_mode: false,
            engine: EngineConfig::default(),
            rules: RuleConfig::default(),
            streaming: StreamingConfig::default(),
            journal: JournalConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {:?}", path))?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.engine.evaluation_interval_secs == 0 {
            bail!("engine.evaluation_interval_secs must be at least 1");
        }
        if self.engine.stream_window == 0 {
            bail!("engine.stream_window must be at least 1");
        }
        self.rules.validate()
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("fleetwatch"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Safety-net re-evaluation interval in seconds
    pub evaluation_interval_secs: u64,

    /// Number of safety events held in the streamed window
    pub stream_window: usize,

    /// Capacity of the observability event channel
    pub event_bus_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            evaluation_interval_secs: 15,
            stream_window: 50,
            event_bus_capacity: 256,
        }
    }
}

impl EngineConfig {
    pub fn evaluation_interval(&self) -> Duration {
        Duration::from_secs(self.evaluation_interval_secs)
    }
}

/// Longest accepted rule threshold, one week
pub const MAX_THRESHOLD_MINUTES: i64 = 7 * 24 * 60;

/// Rule thresholds in minutes. Every rule fires strictly after its threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub pending_allocation_minutes: i64,
    pub late_accept_minutes: i64,
    pub late_pickup_minutes: i64,
    /// Allowance past the drop-off ETA
    pub late_dropoff_grace_minutes: i64,
    pub waiting_time_minutes: i64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            pending_allocation_minutes: 5,
            late_accept_minutes: 2,
            late_pickup_minutes: 15,
            late_dropoff_grace_minutes: 0,
            waiting_time_minutes: 10,
        }
    }
}

impl RuleConfig {
    pub fn validate(&self) -> Result<()> {
        let thresholds = [
            ("pending_allocation_minutes", self.pending_allocation_minutes),
            ("late_accept_minutes", self.late_accept_minutes),
            ("late_pickup_minutes", self.late_pickup_minutes),
            ("late_dropoff_grace_minutes", self.late_dropoff_grace_minutes),
            ("waiting_time_minutes", self.waiting_time_minutes),
        ];
        for (name, value) in thresholds {
            if value < 0 {
                bail!("rules.{} must not be negative (got {})", name, value);
            }
            if value > MAX_THRESHOLD_MINUTES {
                bail!("rules.{} must be at most {} minutes (got {})", name, MAX_THRESHOLD_MINUTES, value);
            }
        }
        Ok(())
    }
}

/// Alert journal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Record raised/resolved transitions
    pub enabled: bool,

    /// Database path
    pub path: PathBuf,

    /// Retention period in days
    pub retention_days: u32,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("./data/fleetwatch.db"),
            retention_days: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.engine.evaluation_interval(), Duration::from_secs(15));
        assert_eq!(config.engine.stream_window, 50);
        assert_eq!(config.rules.pending_allocation_minutes, 5);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            demo_mode = true

            [rules]
            late_pickup_minutes = 20
            "#,
        )
        .unwrap();
        assert!(config.demo_mode);
        assert_eq!(config.rules.late_pickup_minutes, 20);
        assert_eq!(config.rules.late_accept_minutes, 2);
        assert_eq!(config.engine.stream_window, 50);
    }

    #[test]
    fn test_toml_roundtrip_through_file() {
        let dir = std::env::temp_dir().join(format!("fleetwatch-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.rules, created.rules);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = Config::default();
        config.engine.evaluation_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rules.waiting_time_minutes = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialized_config_has_only_live_sections() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(!text.contains("app_name"));
        assert!(!text.contains("data_dir"));
        assert!(text.contains("[journal]"));

        // Files written by older builds still load
        let config: Config = toml::from_str("app_name = \"FleetWatch\"\ndata_dir = \"./data\"\n").unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_thresholds_beyond_a_week() {
        let mut config = Config::default();
        config.rules.late_pickup_minutes = MAX_THRESHOLD_MINUTES;
        config.validate().unwrap();

        config.rules.late_pickup_minutes = MAX_THRESHOLD_MINUTES + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rules.pending_allocation_minutes = i64::MAX;
        assert!(config.validate().is_err());
    }
}
