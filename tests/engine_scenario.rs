//! End-to-end feed behaviour through the public engine API

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;

use fleetwatch::alerts::FatigueLevel;
use fleetwatch::rules::{Job, JobStatus, OnlineStatus, SharedSnapshot, UnallocatedJob, VehicleJob};
use fleetwatch::streaming::ChannelEventSource;
use fleetwatch::{Config, Engine, FatigueEvent, Severity, Snapshot};

fn received(job_id: &str, booked_mins_ago: i64) -> VehicleJob {
    let mut job = Job::new(job_id, JobStatus::Received);
    job.booking_time = Some((Utc::now() - chrono::Duration::minutes(booked_mins_ago)).to_rfc3339());
    VehicleJob {
        vehicle_id: "V1".into(),
        driver_id: "D1".into(),
        driver_name: "Sam".into(),
        vehicle_online_status: OnlineStatus::Online,
        job: Some(job),
    }
}

fn fatigue(id: &str, level: FatigueLevel, score: f64) -> FatigueEvent {
    FatigueEvent {
        id: id.into(),
        driver_id: Some("D7".into()),
        driver_name: "Ali".into(),
        fatigue_level: level,
        score,
        created_at: Some(Utc::now()),
    }
}

async fn started(snapshot: Snapshot) -> (Engine, Arc<SharedSnapshot>, ChannelEventSource) {
    let shared = Arc::new(SharedSnapshot::new(snapshot));
    let source = ChannelEventSource::new();
    let mut engine = Engine::new(Config::default(), shared.clone())
        .unwrap()
        .with_event_source(Arc::new(source.clone()));
    engine.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    (engine, shared, source)
}

#[tokio::test(flavor = "multi_thread")]
async fn critical_fatigue_leads_the_feed() {
    let (mut engine, _, source) = started(Snapshot {
        vehicles: vec![received("J1", 3)],
        ..Snapshot::default()
    })
    .await;

    let published = Arc::new(Mutex::new(Vec::new()));
    let sink = published.clone();
    let _subscription = engine.subscribe(move |feed| {
        sink.lock().push(feed.iter().map(|a| a.alert_id.clone()).collect::<Vec<_>>());
    });

    source.publish(vec![fatigue("E1", FatigueLevel::Critical, 91.0)]);

    let last = published.lock().last().cloned().unwrap();
    assert_eq!(last, vec!["E1".to_string(), "late-accept-J1".to_string()]);

    let feed = engine.feed();
    assert_eq!(feed[0].severity, Severity::Critical);
    assert_eq!(feed[0].alert_type, "Fatigue Alert: critical");
    assert!(feed[0].message.starts_with("Ali fatigue score 91"));
    assert_eq!(feed[1].severity, Severity::Warning);

    engine.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn stream_window_keeps_newest_fifty() {
    let (mut engine, _, source) = started(Snapshot::default()).await;

    let events: Vec<_> = (0..60)
        .map(|i| fatigue(&format!("E{}", i), FatigueLevel::Low, 40.0))
        .collect();
    source.publish(events);

    let window = engine.ingestor().window();
    assert_eq!(window.len(), 50);
    assert_eq!(window[0].id, "E0");
    assert_eq!(window[49].id, "E49");
    assert_eq!(engine.feed().len(), 50);

    engine.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn state_change_cue_refreshes_feed() {
    let (mut engine, shared, _) = started(Snapshot::default()).await;
    assert!(engine.feed().is_empty());

    shared.update(|s| {
        s.unallocated.push(UnallocatedJob {
            id: "J9".into(),
            created_at: Some((Utc::now() - chrono::Duration::minutes(10)).to_rfc3339()),
        });
    });
    engine.notify_state_changed();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let feed = engine.feed();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].alert_id, "pending-J9");

    engine.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn sos_survives_stream_updates_but_not_reevaluation() {
    let (mut engine, _, source) = started(Snapshot {
        vehicles: vec![received("J1", 3)],
        ..Snapshot::default()
    })
    .await;

    let sos = engine.raise_sos("D1", "Sam", None);
    source.publish(vec![fatigue("E1", FatigueLevel::High, 70.0)]);
    assert!(engine.feed().iter().any(|a| a.alert_id == sos.alert_id));

    engine.evaluate_now();
    let mut ids: Vec<_> = engine.feed().into_iter().map(|a| a.alert_id).collect();
    ids.sort();
    assert_eq!(ids, vec!["E1".to_string(), "late-accept-J1".to_string()]);

    engine.stop().await.unwrap();
}
