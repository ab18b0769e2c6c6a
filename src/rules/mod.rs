// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fleetwatch-rs

//! Rule evaluation - derives alerts from an operational state snapshot
//!
//! Evaluation is pure: the same snapshot and the same `now` always yield the
//! same alerts. Every rule is applied independently to every relevant job,
//! so one job can raise several alerts. Alert ids are `{prefix}-{jobId}`,
//! which keeps them stable across ticks while the condition holds.

mod snapshot;
mod time;

pub use snapshot::*;
pub use time::*;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::alerts::{Alert, AlertMetadata, AlertSource, Severity, SubjectRefs};
use crate::config::RuleConfig;

/// The fixed rule catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    PendingAllocation,
    LateAccept,
    JobChanges,
    LateToPickup,
    LateToDropOff,
    WaitingTime,
    DriverOffline,
    FlightNumber,
    CalloutRequired,
    LandlineContact,
    IntegrationOrigin,
}

impl RuleKind {
    pub const ALL: [RuleKind; 11] = [
        RuleKind::PendingAllocation,
        RuleKind::LateAccept,
        RuleKind::JobChanges,
        RuleKind::LateToPickup,
        RuleKind::LateToDropOff,
        RuleKind::WaitingTime,
        RuleKind::DriverOffline,
        RuleKind::FlightNumber,
        RuleKind::CalloutRequired,
        RuleKind::LandlineContact,
        RuleKind::IntegrationOrigin,
    ];

    /// Alert type shown to operators
    pub fn title(&self) -> &'static str {
        match self {
            RuleKind::PendingAllocation => "Job Pending Allocation",
            RuleKind::LateAccept => "Late Accept",
            RuleKind::JobChanges => "Job Changes",
            RuleKind::LateToPickup => "Late to Pickup",
            RuleKind::LateToDropOff => "Late to Drop Off",
            RuleKind::WaitingTime => "Waiting Time",
            RuleKind::DriverOffline => "Driver is Offline",
            RuleKind::FlightNumber => "Flight Number",
            RuleKind::CalloutRequired => "Callout Required",
            RuleKind::LandlineContact => "Landline Contact",
            RuleKind::IntegrationOrigin => "Integration Job",
        }
    }

    pub fn key_prefix(&self) -> &'static str {
        match self {
            RuleKind::PendingAllocation => "pending",
            RuleKind::LateAccept => "late-accept",
            RuleKind::JobChanges => "job-changes",
            RuleKind::LateToPickup => "late-pickup",
            RuleKind::LateToDropOff => "late-dropoff",
            RuleKind::WaitingTime => "waiting-time",
            RuleKind::DriverOffline => "offline",
            RuleKind::FlightNumber => "flight",
            RuleKind::CalloutRequired => "callout",
            RuleKind::LandlineContact => "landline",
            RuleKind::IntegrationOrigin => "integration",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            RuleKind::DriverOffline => Severity::Critical,
            RuleKind::PendingAllocation
            | RuleKind::LateAccept
            | RuleKind::LateToPickup
            | RuleKind::LateToDropOff => Severity::Warning,
            RuleKind::JobChanges
            | RuleKind::WaitingTime
            | RuleKind::FlightNumber
            | RuleKind::CalloutRequired
            | RuleKind::LandlineContact
            | RuleKind::IntegrationOrigin => Severity::Info,
        }
    }

    fn hint(&self) -> Option<&'static str> {
        match self {
            RuleKind::PendingAllocation => Some("Allocate the job to an available driver"),
            RuleKind::LateAccept => Some("Call the driver or reallocate the job"),
            RuleKind::JobChanges => Some("Ask the driver to confirm the updated booking"),
            RuleKind::LateToPickup => Some("Update the customer with a new pickup time"),
            RuleKind::DriverOffline => Some("Contact the driver; reallocate if unreachable"),
            RuleKind::FlightNumber => Some("Check the flight status before dispatch"),
            RuleKind::CalloutRequired => Some("Call the passenger when the driver arrives"),
            RuleKind::LandlineContact => Some("Phone the passenger instead of relying on SMS"),
            _ => None,
        }
    }

    /// Deterministic alert id for this rule and subject
    pub fn alert_id(&self, subject_id: &str) -> String {
        format!("{}-{}", self.key_prefix(), subject_id)
    }
}

/// A rule instance skipped because its input was unusable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleAnomaly {
    pub rule: RuleKind,
    pub job_id: String,
    pub error: InputError,
}

/// Output of one evaluator pass
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub evaluated_at: DateTime<Utc>,
    pub alerts: Vec<Alert>,
    pub anomalies: Vec<RuleAnomaly>,
}

/// Applies the rule catalog to a snapshot
#[derive(Debug, Clone)]
pub struct RuleEvaluator {
    config: RuleConfig,
}

impl RuleEvaluator {
    pub fn new(config: RuleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    /// Alerts for `snapshot` as of `now`
    pub fn evaluate(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<Alert> {
        self.evaluate_with_report(snapshot, now).alerts
    }

    /// Alerts plus the anomalies that caused rule instances to be skipped
    pub fn evaluate_with_report(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> Evaluation {
        let mut pass = Pass {
            config: &self.config,
            now,
            alerts: Vec::new(),
            anomalies: Vec::new(),
        };

        for job in snapshot.unallocated_jobs() {
            pass.pending_allocation(job);
        }

        for pair in snapshot.vehicle_jobs() {
            let Some(job) = pair.job.as_ref() else {
                continue;
            };
            pass.late_accept(pair, job);
            pass.job_changes(pair, job);
            pass.late_to_pickup(pair, job);
            pass.late_to_dropoff(pair, job);
            pass.waiting_time(pair, job);
            pass.driver_offline(pair, job);
            pass.flight_number(pair, job);
            pass.callout_required(pair, job);
            pass.landline_contact(pair, job);
            pass.integration_origin(pair, job);
        }

        Evaluation {
            evaluated_at: now,
            alerts: pass.alerts,
            anomalies: pass.anomalies,
        }
    }
}

impl Default for RuleEvaluator {
    fn default() -> Self {
        Self::new(RuleConfig::default())
    }
}

/// State of a single evaluator pass; `now` is fixed for its lifetime
struct Pass<'a> {
    config: &'a RuleConfig,
    now: DateTime<Utc>,
    alerts: Vec<Alert>,
    anomalies: Vec<RuleAnomaly>,
}

impl Pass<'_> {
    fn timestamp(&mut self, rule: RuleKind, job_id: &str, field: &'static str, raw: Option<&str>) -> Option<DateTime<Utc>> {
        match parse_timestamp(field, raw) {
            Ok(ts) => Some(ts),
            Err(error) => {
                self.anomalies.push(RuleAnomaly {
                    rule,
                    job_id: job_id.to_string(),
                    error,
                });
                None
            }
        }
    }

    /// Elapsed time since `since` when it strictly exceeds `threshold_mins`
    fn overdue(&mut self, rule: RuleKind, job_id: &str, since: DateTime<Utc>, threshold_mins: i64) -> Option<Duration> {
        let Some(threshold) = Duration::try_minutes(threshold_mins) else {
            self.anomalies.push(RuleAnomaly {
                rule,
                job_id: job_id.to_string(),
                error: InputError::ThresholdOutOfRange(threshold_mins),
            });
            return None;
        };
        let elapsed = self.now.signed_duration_since(since);
        (elapsed > threshold).then_some(elapsed)
    }

    fn raise(&mut self, rule: RuleKind, pair: Option<&VehicleJob>, job_id: &str, message: String, metadata: Option<AlertMetadata>) {
        let subject = match pair {
            Some(pair) => SubjectRefs {
                job_id: Some(job_id.to_string()),
                driver_id: Some(pair.driver_id.clone()),
                vehicle_id: Some(pair.vehicle_id.clone()),
            },
            None => SubjectRefs::job(job_id),
        };

        let mut alert = Alert::new(
            rule.alert_id(job_id),
            rule.title(),
            rule.severity(),
            message,
            self.now,
            AlertSource::System,
        )
        .with_subject(subject);
        alert.metadata = metadata;
        if let Some(hint) = rule.hint() {
            alert = alert.with_hint(hint);
        }
        self.alerts.push(alert);
    }

    fn pending_allocation(&mut self, job: &UnallocatedJob) {
        let rule = RuleKind::PendingAllocation;
        let Some(created) = self.timestamp(rule, &job.id, "createdAt", job.created_at.as_deref()) else {
            return;
        };
        if let Some(elapsed) = self.overdue(rule, &job.id, created, self.config.pending_allocation_minutes) {
            let minutes = whole_minutes(elapsed);
            self.raise(
                rule,
                None,
                &job.id,
                format!("Job {} has been waiting for allocation for {} minutes", job.id, minutes),
                Some(AlertMetadata::Delay { minutes_over: minutes - self.config.pending_allocation_minutes }),
            );
        }
    }

    fn late_accept(&mut self, pair: &VehicleJob, job: &Job) {
        if job.status != JobStatus::Received {
            return;
        }
        let rule = RuleKind::LateAccept;
        let Some(booked) = self.timestamp(rule, &job.id, "bookingTime", job.booking_time.as_deref()) else {
            return;
        };
        if let Some(elapsed) = self.overdue(rule, &job.id, booked, self.config.late_accept_minutes) {
            let minutes = whole_minutes(elapsed);
            self.raise(
                rule,
                Some(pair),
                &job.id,
                format!(
                    "{} has not accepted job {}{} after {} minutes",
                    pair.driver_name,
                    job.id,
                    account_suffix(job),
                    minutes
                ),
                account_metadata(job),
            );
        }
    }

    fn job_changes(&mut self, pair: &VehicleJob, job: &Job) {
        if !job.pending_changes || !job.status.is_open() {
            return;
        }
        self.raise(
            RuleKind::JobChanges,
            Some(pair),
            &job.id,
            format!(
                "Job {}{} was changed and {} has not confirmed the update",
                job.id,
                account_suffix(job),
                pair.driver_name
            ),
            account_metadata(job),
        );
    }

    fn late_to_pickup(&mut self, pair: &VehicleJob, job: &Job) {
        if !job.status.is_heading_to_pickup() {
            return;
        }
        let rule = RuleKind::LateToPickup;
        let Some(pickup) = self.timestamp(rule, &job.id, "pickupTime", job.pickup_time.as_deref()) else {
            return;
        };
        if let Some(elapsed) = self.overdue(rule, &job.id, pickup, self.config.late_pickup_minutes) {
            let minutes = whole_minutes(elapsed);
            self.raise(
                rule,
                Some(pair),
                &job.id,
                format!(
                    "{} is {} minutes late to pick up job {}{}",
                    pair.driver_name,
                    minutes,
                    job.id,
                    account_suffix(job)
                ),
                Some(AlertMetadata::Delay { minutes_over: minutes }),
            );
        }
    }

    fn late_to_dropoff(&mut self, pair: &VehicleJob, job: &Job) {
        if !job.status.is_heading_to_dropoff() {
            return;
        }
        let rule = RuleKind::LateToDropOff;
        let Some(eta) = self.timestamp(rule, &job.id, "eta", job.eta.as_deref()) else {
            return;
        };
        if let Some(elapsed) = self.overdue(rule, &job.id, eta, self.config.late_dropoff_grace_minutes) {
            let minutes = whole_minutes(elapsed);
            self.raise(
                rule,
                Some(pair),
                &job.id,
                format!(
                    "{} is {} minutes past the drop-off ETA for job {}",
                    pair.driver_name, minutes, job.id
                ),
                Some(AlertMetadata::Delay { minutes_over: minutes }),
            );
        }
    }

    fn waiting_time(&mut self, pair: &VehicleJob, job: &Job) {
        if job.status != JobStatus::Arrived {
            return;
        }
        let rule = RuleKind::WaitingTime;
        let Some(arrived) = self.timestamp(rule, &job.id, "arrivedAt", job.arrived_at.as_deref()) else {
            return;
        };
        if let Some(elapsed) = self.overdue(rule, &job.id, arrived, self.config.waiting_time_minutes) {
            let minutes = whole_minutes(elapsed);
            self.raise(
                rule,
                Some(pair),
                &job.id,
                format!(
                    "{} has been waiting at pickup for {} minutes on job {}",
                    pair.driver_name, minutes, job.id
                ),
                Some(AlertMetadata::Delay { minutes_over: minutes - self.config.waiting_time_minutes }),
            );
        }
    }

    fn driver_offline(&mut self, pair: &VehicleJob, job: &Job) {
        if pair.vehicle_online_status != OnlineStatus::Offline || !job.status.needs_online_driver() {
            return;
        }
        self.raise(
            RuleKind::DriverOffline,
            Some(pair),
            &job.id,
            format!(
                "{} ({}) is offline while job {} is {:?}",
                pair.driver_name, pair.vehicle_id, job.id, job.status
            ),
            account_metadata(job),
        );
    }

    fn flight_number(&mut self, pair: &VehicleJob, job: &Job) {
        let Some(flight) = non_empty(job.flight_number.as_deref()) else {
            return;
        };
        if !job.status.is_open() {
            return;
        }
        self.raise(
            RuleKind::FlightNumber,
            Some(pair),
            &job.id,
            format!("Job {} is linked to flight {}", job.id, flight),
            Some(AlertMetadata::Flight { flight_number: flight.to_string() }),
        );
    }

    fn callout_required(&mut self, pair: &VehicleJob, job: &Job) {
        if !job.requires_callout || !job.status.is_open() {
            return;
        }
        self.raise(
            RuleKind::CalloutRequired,
            Some(pair),
            &job.id,
            format!("Job {}{} requires a callout at pickup", job.id, account_suffix(job)),
            account_metadata(job),
        );
    }

    fn landline_contact(&mut self, pair: &VehicleJob, job: &Job) {
        if !job.contact_is_landline || !job.status.is_open() {
            return;
        }
        self.raise(
            RuleKind::LandlineContact,
            Some(pair),
            &job.id,
            format!("Contact number for job {} is a landline; SMS updates will not arrive", job.id),
            account_metadata(job),
        );
    }

    fn integration_origin(&mut self, pair: &VehicleJob, job: &Job) {
        let Some(partner) = non_empty(job.origin_integration.as_deref()) else {
            return;
        };
        if !job.status.is_open() {
            return;
        }
        self.raise(
            RuleKind::IntegrationOrigin,
            Some(pair),
            &job.id,
            format!("Job {} was booked through {}", job.id, partner),
            Some(AlertMetadata::Integration { partner: partner.to_string() }),
        );
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn account_suffix(job: &Job) -> String {
    non_empty(job.account_name.as_deref())
        .map(|name| format!(" ({})", name))
        .unwrap_or_default()
}

fn account_metadata(job: &Job) -> Option<AlertMetadata> {
    non_empty(job.account_name.as_deref()).map(|name| AlertMetadata::Account {
        account_name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap()
    }

    fn ts(d: Duration) -> Option<String> {
        Some((now() - d).to_rfc3339())
    }

    fn pair(job: Job) -> VehicleJob {
        VehicleJob {
            vehicle_id: "V1".into(),
            driver_id: "D1".into(),
            driver_name: "Sam".into(),
            vehicle_online_status: OnlineStatus::Online,
            job: Some(job),
        }
    }

    fn ids(alerts: &[Alert]) -> Vec<&str> {
        alerts.iter().map(|a| a.alert_id.as_str()).collect()
    }

    fn evaluate(snapshot: &Snapshot) -> Evaluation {
        RuleEvaluator::default().evaluate_with_report(snapshot, now())
    }

    #[test]
    fn test_empty_snapshot() {
        let eval = evaluate(&Snapshot::default());
        assert!(eval.alerts.is_empty());
        assert!(eval.anomalies.is_empty());
    }

    #[test]
    fn test_pending_allocation_boundary() {
        let exact = Snapshot {
            unallocated: vec![UnallocatedJob { id: "J1".into(), created_at: ts(Duration::minutes(5)) }],
            ..Snapshot::default()
        };
        assert!(evaluate(&exact).alerts.is_empty());

        let over = Snapshot {
            unallocated: vec![UnallocatedJob {
                id: "J1".into(),
                created_at: ts(Duration::minutes(5) + Duration::seconds(1)),
            }],
            ..Snapshot::default()
        };
        let alerts = evaluate(&over).alerts;
        assert_eq!(ids(&alerts), vec!["pending-J1"]);
        assert_eq!(alerts[0].severity, Severity::Warning);
        assert_eq!(alerts[0].alert_type, "Job Pending Allocation");
        assert_eq!(alerts[0].subject.job_id.as_deref(), Some("J1"));
    }

    #[test]
    fn test_out_of_range_threshold_is_an_anomaly() {
        let config = RuleConfig {
            pending_allocation_minutes: i64::MAX,
            ..RuleConfig::default()
        };
        let mut job = Job::new("J2", JobStatus::Received);
        job.booking_time = ts(Duration::minutes(3));
        let snapshot = Snapshot {
            unallocated: vec![UnallocatedJob { id: "J1".into(), created_at: ts(Duration::minutes(30)) }],
            vehicles: vec![pair(job)],
        };

        let eval = RuleEvaluator::new(config).evaluate_with_report(&snapshot, now());
        assert_eq!(ids(&eval.alerts), vec!["late-accept-J2"]);
        assert_eq!(eval.anomalies.len(), 1);
        assert_eq!(eval.anomalies[0].rule, RuleKind::PendingAllocation);
        assert_eq!(eval.anomalies[0].error, InputError::ThresholdOutOfRange(i64::MAX));
    }

    #[test]
    fn test_late_accept() {
        let mut job = Job::new("J1", JobStatus::Received);
        job.booking_time = ts(Duration::minutes(3));
        let alerts = evaluate(&Snapshot { vehicles: vec![pair(job.clone())], ..Snapshot::default() }).alerts;
        assert_eq!(ids(&alerts), vec!["late-accept-J1"]);
        assert_eq!(alerts[0].severity, Severity::Warning);
        assert_eq!(alerts[0].subject.driver_id.as_deref(), Some("D1"));

        job.status = JobStatus::Accepted;
        let alerts = evaluate(&Snapshot { vehicles: vec![pair(job)], ..Snapshot::default() }).alerts;
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_late_pickup_and_flight_are_distinct() {
        let mut job = Job::new("J1", JobStatus::EnRouteToPickup);
        job.pickup_time = ts(Duration::minutes(20));
        job.flight_number = Some("BA123".into());
        let alerts = evaluate(&Snapshot { vehicles: vec![pair(job)], ..Snapshot::default() }).alerts;

        assert_eq!(ids(&alerts), vec!["late-pickup-J1", "flight-J1"]);
        assert_eq!(alerts[0].metadata, Some(AlertMetadata::Delay { minutes_over: 20 }));
        assert!(alerts[0].message.contains("20 minutes late"));
    }

    #[test]
    fn test_late_pickup_threshold_is_strict() {
        let mut job = Job::new("J1", JobStatus::Accepted);
        job.pickup_time = ts(Duration::minutes(15));
        assert!(evaluate(&Snapshot { vehicles: vec![pair(job)], ..Snapshot::default() }).alerts.is_empty());
    }

    #[test]
    fn test_late_dropoff_and_waiting_time() {
        let mut riding = Job::new("J1", JobStatus::PassengerOnBoard);
        riding.eta = ts(Duration::minutes(1));
        let mut waiting = Job::new("J2", JobStatus::Arrived);
        waiting.arrived_at = ts(Duration::minutes(11));
        let mut on_time = Job::new("J3", JobStatus::EnRouteToDropoff);
        on_time.eta = Some((now() + Duration::minutes(5)).to_rfc3339());

        let snapshot = Snapshot {
            vehicles: vec![pair(riding), pair(waiting), pair(on_time)],
            ..Snapshot::default()
        };
        let alerts = evaluate(&snapshot).alerts;
        assert_eq!(ids(&alerts), vec!["late-dropoff-J1", "waiting-time-J2"]);
        assert_eq!(alerts[1].severity, Severity::Info);
    }

    #[test]
    fn test_driver_offline() {
        let mut offline = pair(Job::new("J1", JobStatus::Accepted));
        offline.vehicle_online_status = OnlineStatus::Offline;
        let mut finished = pair(Job::new("J2", JobStatus::Completed));
        finished.vehicle_online_status = OnlineStatus::Offline;

        let alerts = evaluate(&Snapshot { vehicles: vec![offline, finished], ..Snapshot::default() }).alerts;
        assert_eq!(ids(&alerts), vec!["offline-J1"]);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[0].subject.vehicle_id.as_deref(), Some("V1"));
    }

    #[test]
    fn test_flag_rules_only_for_open_jobs() {
        let mut job = Job::new("J1", JobStatus::Accepted);
        job.requires_callout = true;
        job.contact_is_landline = true;
        job.origin_integration = Some("PartnerCo".into());
        job.pending_changes = true;
        job.account_name = Some("Acme".into());
        let alerts = evaluate(&Snapshot { vehicles: vec![pair(job.clone())], ..Snapshot::default() }).alerts;
        assert_eq!(
            ids(&alerts),
            vec!["job-changes-J1", "callout-J1", "landline-J1", "integration-J1"]
        );
        assert!(alerts.iter().all(|a| a.severity == Severity::Info));
        assert_eq!(alerts[1].metadata, Some(AlertMetadata::Account { account_name: "Acme".into() }));

        job.status = JobStatus::Completed;
        assert!(evaluate(&Snapshot { vehicles: vec![pair(job)], ..Snapshot::default() }).alerts.is_empty());
    }

    #[test]
    fn test_malformed_timestamp_is_isolated() {
        let mut broken = Job::new("J1", JobStatus::Accepted);
        broken.pickup_time = Some("not-a-date".into());
        broken.flight_number = Some("EZY42".into());
        let mut late = Job::new("J2", JobStatus::Accepted);
        late.pickup_time = ts(Duration::minutes(30));

        let eval = evaluate(&Snapshot { vehicles: vec![pair(broken), pair(late)], ..Snapshot::default() });
        assert_eq!(ids(&eval.alerts), vec!["flight-J1", "late-pickup-J2"]);
        assert_eq!(eval.anomalies.len(), 1);
        assert_eq!(eval.anomalies[0].rule, RuleKind::LateToPickup);
        assert_eq!(eval.anomalies[0].job_id, "J1");
    }

    #[test]
    fn test_deterministic_and_stable_ids() {
        let mut job = Job::new("J1", JobStatus::Received);
        job.booking_time = ts(Duration::minutes(10));
        job.flight_number = Some("BA1".into());
        let snapshot = Snapshot {
            unallocated: vec![UnallocatedJob { id: "J7".into(), created_at: ts(Duration::minutes(9)) }],
            vehicles: vec![pair(job)],
        };

        let first = evaluate(&snapshot).alerts;
        let second = evaluate(&snapshot).alerts;
        assert_eq!(first, second);
        assert_eq!(ids(&first), vec!["pending-J7", "late-accept-J1", "flight-J1"]);
    }

    #[test]
    fn test_disappears_when_condition_stops() {
        let mut job = Job::new("J1", JobStatus::Received);
        job.booking_time = ts(Duration::minutes(4));
        assert_eq!(ids(&evaluate(&Snapshot { vehicles: vec![pair(job.clone())], ..Snapshot::default() }).alerts), vec!["late-accept-J1"]);

        job.status = JobStatus::Accepted;
        assert!(evaluate(&Snapshot { vehicles: vec![pair(job)], ..Snapshot::default() }).alerts.is_empty());
    }

    #[test]
    fn test_custom_thresholds() {
        let config = RuleConfig {
            pending_allocation_minutes: 1,
            ..RuleConfig::default()
        };
        let snapshot = Snapshot {
            unallocated: vec![UnallocatedJob { id: "J1".into(), created_at: ts(Duration::minutes(2)) }],
            ..Snapshot::default()
        };
        assert_eq!(RuleEvaluator::new(config).evaluate(&snapshot, now()).len(), 1);
    }

    #[test]
    fn test_catalog_prefixes_are_unique() {
        let mut prefixes: Vec<_> = RuleKind::ALL.iter().map(|r| r.key_prefix()).collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes.len(), RuleKind::ALL.len());
    }
}
