// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fleetwatch-rs

//! Alert model - the unit of output shared by every producer and consumer

mod aggregator;

pub use aggregator::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operator-facing alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Stable identity, derived from rule + subject or assigned by the source
    pub alert_id: String,
    /// Rule or category name, e.g. "Late to Pickup"
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: Severity,
    pub status: AlertStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default)]
    pub subject: SubjectRefs,
    pub triggered_at: DateTime<Utc>,
    pub source: AlertSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AlertMetadata>,
}

impl Alert {
    /// Create an active alert with no hint, subject or metadata
    pub fn new(
        alert_id: impl Into<String>,
        alert_type: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        triggered_at: DateTime<Utc>,
        source: AlertSource,
    ) -> Self {
        Self {
            alert_id: alert_id.into(),
            alert_type: alert_type.into(),
            severity,
            status: AlertStatus::Active,
            message: message.into(),
            hint: None,
            subject: SubjectRefs::default(),
            triggered_at,
            source,
            metadata: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_subject(mut self, subject: SubjectRefs) -> Self {
        self.subject = subject;
        self
    }

    pub fn with_metadata(mut self, metadata: AlertMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// SOS raised from the driver app. Each press gets its own id.
    pub fn sos(driver_id: &str, driver_name: &str, note: Option<String>, at: DateTime<Utc>) -> Self {
        let id = format!("sos-{}-{}", driver_id, uuid::Uuid::new_v4());
        Self::new(
            id,
            "SOS",
            Severity::Critical,
            format!("{} pressed the SOS button", driver_name),
            at,
            AlertSource::Driver,
        )
        .with_hint("Call the driver immediately and contact emergency services if unreachable")
        .with_subject(SubjectRefs::driver(driver_id))
        .with_metadata(AlertMetadata::Sos { note })
    }
}

/// Alert severity. Declaration order is feed order: most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    /// Sort rank, 1 is the most severe
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle flag. Feed alerts are always `Active`; `Resolved` is only
/// written by the audit journal when an alert leaves the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Resolved => "resolved",
        }
    }
}

/// Provenance of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSource {
    /// Derived by the rule evaluator
    System,
    /// Raised by a driver (SOS)
    Driver,
    /// Streamed from an external integration
    Integration,
}

/// Loose references into external state, used for drill-through only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
}

impl SubjectRefs {
    pub fn job(job_id: &str) -> Self {
        Self {
            job_id: Some(job_id.to_string()),
            ..Self::default()
        }
    }

    pub fn driver(driver_id: &str) -> Self {
        Self {
            driver_id: Some(driver_id.to_string()),
            ..Self::default()
        }
    }
}

/// Fatigue level reported by the safety event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FatigueLevel {
    Low,
    High,
    Critical,
}

impl FatigueLevel {
    pub fn severity(&self) -> Severity {
        match self {
            FatigueLevel::Critical => Severity::Critical,
            FatigueLevel::High => Severity::Warning,
            FatigueLevel::Low => Severity::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FatigueLevel::Low => "low",
            FatigueLevel::High => "high",
            FatigueLevel::Critical => "critical",
        }
    }
}

/// Typed extra fields, one variant per alert family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AlertMetadata {
    Fatigue { level: FatigueLevel, score: f64 },
    Delay { minutes_over: i64 },
    Account { account_name: String },
    Flight { flight_number: String },
    Integration { partner: String },
    Sos { note: Option<String> },
}
