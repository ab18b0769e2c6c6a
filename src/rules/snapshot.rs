// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fleetwatch-rs

//! Operational state snapshot - the read-only view the rules run against
//!
//! Timestamps arrive as raw strings from the document store and are parsed
//! per rule, so one malformed field only disables the rules that need it.

use serde::{Deserialize, Serialize};

/// Job lifecycle status as stored by the booking system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Empty,
    Idle,
    Received,
    Accepted,
    EnRouteToPickup,
    Arrived,
    PassengerOnBoard,
    EnRouteToDropoff,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// A job the operator still has to care about
    pub fn is_open(&self) -> bool {
        !matches!(
            self,
            JobStatus::Completed | JobStatus::Cancelled | JobStatus::Idle | JobStatus::Empty
        )
    }

    /// Statuses during which an offline driver is an emergency
    pub fn needs_online_driver(&self) -> bool {
        !matches!(self, JobStatus::Completed | JobStatus::Idle | JobStatus::Empty)
    }

    pub fn is_heading_to_pickup(&self) -> bool {
        matches!(self, JobStatus::Accepted | JobStatus::EnRouteToPickup)
    }

    pub fn is_heading_to_dropoff(&self) -> bool {
        matches!(self, JobStatus::PassengerOnBoard | JobStatus::EnRouteToDropoff)
    }
}

/// Vehicle connectivity as reported by the driver app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnlineStatus {
    Online,
    Offline,
    #[serde(other)]
    Unknown,
}

/// Job waiting in the unallocated queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnallocatedJob {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Job assigned to a vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub booking_time: Option<String>,
    #[serde(default)]
    pub pickup_time: Option<String>,
    #[serde(default)]
    pub eta: Option<String>,
    #[serde(default)]
    pub arrived_at: Option<String>,
    #[serde(default)]
    pub flight_number: Option<String>,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub requires_callout: bool,
    #[serde(default)]
    pub contact_is_landline: bool,
    #[serde(default)]
    pub origin_integration: Option<String>,
    /// Booking was edited and the driver has not re-confirmed yet
    #[serde(default)]
    pub pending_changes: bool,
}

impl Job {
    pub fn new(id: &str, status: JobStatus) -> Self {
        Self {
            id: id.to_string(),
            status,
            booking_time: None,
            pickup_time: None,
            eta: None,
            arrived_at: None,
            flight_number: None,
            account_name: None,
            requires_callout: false,
            contact_is_landline: false,
            origin_integration: None,
            pending_changes: false,
        }
    }
}

/// Vehicle, its driver and the job it is working
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleJob {
    pub vehicle_id: String,
    pub driver_id: String,
    pub driver_name: String,
    pub vehicle_online_status: OnlineStatus,
    #[serde(default)]
    pub job: Option<Job>,
}

/// One consistent view of operational state for a single evaluator pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub unallocated: Vec<UnallocatedJob>,
    #[serde(default)]
    pub vehicles: Vec<VehicleJob>,
}

impl Snapshot {
    pub fn unallocated_jobs(&self) -> &[UnallocatedJob] {
        &self.unallocated
    }

    pub fn vehicle_jobs(&self) -> &[VehicleJob] {
        &self.vehicles
    }

    pub fn is_empty(&self) -> bool {
        self.unallocated.is_empty() && self.vehicles.is_empty()
    }
}

/// Source of operational state, owned by the booking/fleet stores.
/// Must be cheap, synchronous and non-blocking.
pub trait SnapshotProvider: Send + Sync {
    fn snapshot(&self) -> Snapshot;
}

/// Provider backed by a value the host swaps in as state changes
#[derive(Default)]
pub struct SharedSnapshot {
    inner: parking_lot::RwLock<Snapshot>,
}

impl SharedSnapshot {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            inner: parking_lot::RwLock::new(snapshot),
        }
    }

    pub fn replace(&self, snapshot: Snapshot) {
        *self.inner.write() = snapshot;
    }

    pub fn update<F: FnOnce(&mut Snapshot)>(&self, f: F) {
        f(&mut self.inner.write());
    }
}

impl SnapshotProvider for SharedSnapshot {
    fn snapshot(&self) -> Snapshot {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_from_store_json() {
        let json = r#"{
            "unallocated": [{"id": "J9", "createdAt": "2026-01-01T10:00:00Z"}],
            "vehicles": [{
                "vehicleId": "V1", "driverId": "D1", "driverName": "Sam",
                "vehicleOnlineStatus": "offline",
                "job": {"id": "J1", "status": "EnRouteToPickup", "pickupTime": "2026-01-01T10:00:00Z",
                        "flightNumber": "BA123", "requiresCallout": true}
            }]
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.unallocated_jobs().len(), 1);
        let pair = &snapshot.vehicle_jobs()[0];
        assert_eq!(pair.vehicle_online_status, OnlineStatus::Offline);
        let job = pair.job.as_ref().unwrap();
        assert_eq!(job.status, JobStatus::EnRouteToPickup);
        assert!(job.requires_callout);
        assert!(!job.contact_is_landline);
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let job: Job = serde_json::from_str(r#"{"id": "J1", "status": "Teleporting"}"#).unwrap();
        assert_eq!(job.status, JobStatus::Unknown);
    }

    #[test]
    fn test_status_classes() {
        assert!(JobStatus::Cancelled.needs_online_driver());
        assert!(!JobStatus::Cancelled.is_open());
        assert!(!JobStatus::Idle.needs_online_driver());
        assert!(JobStatus::Arrived.is_open());
    }

    #[test]
    fn test_shared_snapshot_replace() {
        let shared = SharedSnapshot::default();
        assert!(shared.snapshot().is_empty());
        shared.update(|s| s.unallocated.push(UnallocatedJob { id: "J1".into(), created_at: None }));
        assert_eq!(shared.snapshot().unallocated.len(), 1);
    }
}
