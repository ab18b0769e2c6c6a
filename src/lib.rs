// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fleetwatch-rs

//! FleetWatch - Operational Alert Engine for fleet dispatch
//!
//! Continuously derives operator-facing alerts ("late pickup", "driver
//! offline", "job pending allocation", ...) from live operational state,
//! merges them with a streamed feed of driver fatigue events and ad-hoc SOS
//! alerts, and publishes one ordered, deduplicated feed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Alert Engine                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────┐        ┌──────────────────┐   │
//! │  │ Scheduler │ → │   Rule    │ ─────→ │                  │   │
//! │  │ tick+cue  │   │ Evaluator │derived │                  │   │
//! │  └───────────┘   └───────────┘        │    Aggregator    │ → │ consumers
//! │  ┌───────────┐   ┌───────────┐        │  merge/dedup/    │   │
//! │  │  Event    │ → │  Fatigue  │ ─────→ │  sort/publish    │   │
//! │  │  Source   │   │ Ingestor  │streamed│                  │   │
//! │  └───────────┘   └───────────┘        │                  │   │
//! │                     SOS / ad-hoc ───→ │                  │   │
//! │                                       └──────────────────┘   │
//! │       ↓                 ↓                      ↓             │
//! │  ┌───────────────────────────────────────────────────────┐   │
//! │  │          Event Bus (observability)  /  Journal        │   │
//! │  └───────────────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod alerts;
pub mod config;
pub mod core;
pub mod db;
pub mod rules;
pub mod simulator;
pub mod streaming;

// Re-exports for convenience
pub use alerts::{Aggregator, Alert, AlertMetadata, AlertSource, AlertStatus, Severity, SubjectRefs};
pub use config::Config;
pub use core::{Engine, EventBus, Scheduler};
pub use db::AlertJournal;
pub use rules::{RuleEvaluator, Snapshot, SnapshotProvider};
pub use streaming::{EventSource, FatigueEvent, FatigueIngestor};

/// FleetWatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// FleetWatch name
pub const NAME: &str = "FleetWatch";
