// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fleetwatch-rs

//! Fleet simulator for demo/testing
//!
//! Generates a small fleet whose jobs move through their lifecycle, a queue
//! of unallocated bookings and an occasional fatigue event, so the engine
//! can be exercised without the dispatch back end.

use chrono::{DateTime, Duration, Utc};
use rand::prelude::*;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::alerts::FatigueLevel;
use crate::core::StateChangeNotifier;
use crate::rules::{Job, JobStatus, OnlineStatus, SharedSnapshot, Snapshot, UnallocatedJob, VehicleJob};
use crate::streaming::{ChannelEventSource, FatigueEvent};

const DRIVERS: [&str; 8] = ["Ali", "Sam", "Kim", "Priya", "Tomasz", "Ngozi", "Lee", "Marta"];
const PARTNERS: [&str; 3] = ["RideHub", "AirportConnect", "CorporateGo"];

/// Simulates a dispatch floor
pub struct FleetSimulator {
    rng: StdRng,
    vehicles: Vec<VehicleJob>,
    unallocated: Vec<UnallocatedJob>,
    fatigue: Vec<FatigueEvent>,
    sequence: u64,

    // Simulation knobs
    new_booking_probability: f64,
    offline_probability: f64,
    fatigue_probability: f64,
    fatigue_window: usize,
}

impl FleetSimulator {
    pub fn new(vehicle_count: usize, now: DateTime<Utc>) -> Self {
        Self::with_rng(vehicle_count, now, StdRng::from_entropy())
    }

    /// Reproducible simulator
    pub fn seeded(vehicle_count: usize, now: DateTime<Utc>, seed: u64) -> Self {
        Self::with_rng(vehicle_count, now, StdRng::seed_from_u64(seed))
    }

    fn with_rng(vehicle_count: usize, now: DateTime<Utc>, rng: StdRng) -> Self {
        let mut sim = Self {
            rng,
            vehicles: Vec::with_capacity(vehicle_count),
            unallocated: Vec::new(),
            fatigue: Vec::new(),
            sequence: 0,
            new_booking_probability: 0.3,
            offline_probability: 0.05,
            fatigue_probability: 0.15,
            fatigue_window: 50,
        };

        for i in 0..vehicle_count {
            let driver = DRIVERS[i % DRIVERS.len()];
            let job = sim.new_job(now);
            sim.vehicles.push(VehicleJob {
                vehicle_id: format!("V{:03}", i + 1),
                driver_id: format!("D{:03}", i + 1),
                driver_name: driver.to_string(),
                vehicle_online_status: OnlineStatus::Online,
                job: Some(job),
            });
        }
        sim
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.sequence += 1;
        format!("{}{}", prefix, self.sequence)
    }

    fn new_job(&mut self, now: DateTime<Utc>) -> Job {
        let id = self.next_id("J");
        let mut job = Job::new(&id, JobStatus::Received);
        job.booking_time = Some(now.to_rfc3339());
        job.pickup_time = Some((now + Duration::minutes(self.rng.gen_range(-5..20))).to_rfc3339());

        if self.rng.gen::<f64>() < 0.2 {
            job.flight_number = Some(format!("BA{}", self.rng.gen_range(100..999)));
        }
        if self.rng.gen::<f64>() < 0.1 {
            job.requires_callout = true;
        }
        if self.rng.gen::<f64>() < 0.1 {
            job.contact_is_landline = true;
        }
        if self.rng.gen::<f64>() < 0.15 {
            job.origin_integration = PARTNERS.choose(&mut self.rng).map(|p| p.to_string());
        }
        if self.rng.gen::<f64>() < 0.3 {
            job.account_name = Some("Acme Logistics".to_string());
        }
        job
    }

    /// Advance one step; returns a fatigue snapshot when the stream changed
    pub fn step(&mut self, now: DateTime<Utc>) -> Option<Vec<FatigueEvent>> {
        for i in 0..self.vehicles.len() {
            self.advance_vehicle(i, now);
        }

        if self.rng.gen::<f64>() < self.new_booking_probability {
            let id = self.next_id("J");
            self.unallocated.push(UnallocatedJob {
                id,
                created_at: Some(now.to_rfc3339()),
            });
        }
        // Dispatchers occasionally clear the oldest booking
        if self.unallocated.len() > 3 && self.rng.gen::<f64>() < 0.5 {
            self.unallocated.remove(0);
        }

        if self.rng.gen::<f64>() < self.fatigue_probability && !self.vehicles.is_empty() {
            let index = self.rng.gen_range(0..self.vehicles.len());
            let pair = &self.vehicles[index];
            let (driver_id, driver_name) = (pair.driver_id.clone(), pair.driver_name.clone());
            let score: f64 = self.rng.gen_range(30.0..100.0);
            let level = match score {
                s if s >= 85.0 => FatigueLevel::Critical,
                s if s >= 60.0 => FatigueLevel::High,
                _ => FatigueLevel::Low,
            };
            let id = self.next_id("F");
            self.fatigue.insert(
                0,
                FatigueEvent {
                    id,
                    driver_id: Some(driver_id),
                    driver_name,
                    fatigue_level: level,
                    score: (score * 10.0).round() / 10.0,
                    created_at: Some(now),
                },
            );
            self.fatigue.truncate(self.fatigue_window);
            debug!("Simulated fatigue event ({} in window)", self.fatigue.len());
            return Some(self.fatigue.clone());
        }
        None
    }

    fn advance_vehicle(&mut self, index: usize, now: DateTime<Utc>) {
        if self.rng.gen::<f64>() < self.offline_probability {
            let pair = &mut self.vehicles[index];
            pair.vehicle_online_status = match pair.vehicle_online_status {
                OnlineStatus::Online => OnlineStatus::Offline,
                _ => OnlineStatus::Online,
            };
        }

        let roll: f64 = self.rng.gen();
        let status = self.vehicles[index].job.as_ref().map(|j| j.status);
        let next = match status {
            Some(JobStatus::Received) if roll < 0.5 => Some(JobStatus::Accepted),
            Some(JobStatus::Accepted) if roll < 0.5 => Some(JobStatus::EnRouteToPickup),
            Some(JobStatus::EnRouteToPickup) if roll < 0.3 => Some(JobStatus::Arrived),
            Some(JobStatus::Arrived) if roll < 0.4 => Some(JobStatus::PassengerOnBoard),
            Some(JobStatus::PassengerOnBoard) if roll < 0.3 => Some(JobStatus::Completed),
            Some(JobStatus::Completed) | None => None,
            _ => return,
        };

        match next {
            Some(status) => {
                let eta = (now + Duration::minutes(self.rng.gen_range(-3..25))).to_rfc3339();
                if let Some(job) = self.vehicles[index].job.as_mut() {
                    job.status = status;
                    match status {
                        JobStatus::Arrived => job.arrived_at = Some(now.to_rfc3339()),
                        JobStatus::PassengerOnBoard => job.eta = Some(eta),
                        _ => {}
                    }
                }
            }
            None => {
                let job = self.new_job(now);
                self.vehicles[index].job = Some(job);
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            unallocated: self.unallocated.clone(),
            vehicles: self.vehicles.clone(),
        }
    }

    /// Drive `shared` and `source` every `period` until shutdown
    pub async fn run(
        mut self,
        shared: Arc<SharedSnapshot>,
        notifier: StateChangeNotifier,
        source: ChannelEventSource,
        period: std::time::Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        info!("Fleet simulator running with {} vehicles", self.vehicles.len());
        shared.replace(self.snapshot());
        notifier.notify();

        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {
                    let fatigue = self.step(Utc::now());
                    shared.replace(self.snapshot());
                    notifier.notify();
                    if let Some(events) = fatigue {
                        source.publish(events);
                    }
                }
            }
        }
        info!("Fleet simulator stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleEvaluator;

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let now = Utc::now();
        let mut a = FleetSimulator::seeded(5, now, 7);
        let mut b = FleetSimulator::seeded(5, now, 7);
        for _ in 0..20 {
            assert_eq!(a.step(now), b.step(now));
        }
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn test_fatigue_window_is_bounded() {
        let now = Utc::now();
        let mut sim = FleetSimulator::seeded(3, now, 1);
        sim.fatigue_probability = 1.0;
        let mut last = Vec::new();
        for _ in 0..80 {
            if let Some(events) = sim.step(now) {
                last = events;
            }
        }
        assert_eq!(last.len(), 50);
    }

    #[test]
    fn test_simulated_state_evaluates_cleanly() {
        let start = Utc::now();
        let mut sim = FleetSimulator::seeded(6, start, 42);
        let evaluator = RuleEvaluator::default();
        for minute in 0..30 {
            let now = start + Duration::minutes(minute);
            sim.step(now);
            let eval = evaluator.evaluate_with_report(&sim.snapshot(), now);
            assert!(eval
                .anomalies
                .iter()
                .all(|a| !matches!(a.error, crate::rules::InputError::Malformed { .. })));
        }
    }
}
