// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fleetwatch-rs

//! Coalescing evaluation scheduler
//!
//! Two cues request an evaluation: a fixed interval and change notifications
//! from the owners of operational state. Both go through a [`CoalescingGate`]
//! so evaluations never overlap and a burst of notifications collapses into
//! at most one extra run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Scheduler phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Evaluating,
}

/// `Idle -> Evaluating -> Idle` with a dirty flag that can only be set
/// while evaluating
#[derive(Debug)]
pub struct CoalescingGate {
    phase: Phase,
    dirty_pending: bool,
}

impl CoalescingGate {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            dirty_pending: false,
        }
    }

    /// A cue arrived. Returns `true` when the caller must start evaluating.
    pub fn request(&mut self) -> bool {
        match self.phase {
            Phase::Idle => {
                self.phase = Phase::Evaluating;
                true
            }
            Phase::Evaluating => {
                self.dirty_pending = true;
                false
            }
        }
    }

    /// An evaluation finished. Returns `true` when one more must run now.
    pub fn finish(&mut self) -> bool {
        if self.phase == Phase::Evaluating && self.dirty_pending {
            self.dirty_pending = false;
            true
        } else {
            self.phase = Phase::Idle;
            false
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_pending
    }
}

impl Default for CoalescingGate {
    fn default() -> Self {
        Self::new()
    }
}

pub type EvaluateFn = Arc<dyn Fn() + Send + Sync + 'static>;

/// Drives evaluations on a timer and on demand
pub struct Scheduler {
    interval: Duration,
    gate: Mutex<CoalescingGate>,
    /// Held for the whole of every evaluation, scheduled or not
    evaluation: Mutex<()>,
    wake: Notify,
    runs: AtomicU64,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            interval,
            gate: Mutex::new(CoalescingGate::new()),
            evaluation: Mutex::new(()),
            wake: Notify::new(),
            runs: AtomicU64::new(0),
        })
    }

    /// Request an evaluation as soon as possible
    pub fn trigger(&self) {
        if self.gate.lock().request() {
            self.wake.notify_one();
        } else {
            debug!("Evaluation in flight, marked dirty");
        }
    }

    /// Cloneable handle for state owners to signal changes
    pub fn notifier(self: &Arc<Self>) -> StateChangeNotifier {
        StateChangeNotifier {
            scheduler: Arc::downgrade(self),
        }
    }

    /// Spawn the scheduling loop. The first tick fires immediately.
    pub fn spawn(self: &Arc<Self>, job: EvaluateFn, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.run(job, shutdown).await })
    }

    async fn run(self: Arc<Self>, job: EvaluateFn, mut shutdown: broadcast::Receiver<()>) {
        info!("Scheduler started, interval {:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = self.wake.notified() => {}
                _ = ticker.tick() => {
                    if !self.gate.lock().request() {
                        continue;
                    }
                }
            }
            self.drain(&job);
        }

        info!("Scheduler stopped after {} evaluations", self.run_count());
    }

    /// Evaluate until the gate returns to idle
    fn drain(&self, job: &EvaluateFn) {
        loop {
            self.exclusive(|| job());
            self.runs.fetch_add(1, Ordering::Relaxed);
            if !self.gate.lock().finish() {
                break;
            }
            debug!("Dirty flag set during evaluation, running again");
        }
    }

    /// Run `f` with no scheduled evaluation in flight. Blocks until the
    /// current one, if any, has finished.
    pub fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _pass = self.evaluation.lock();
        f()
    }

    pub fn run_count(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    pub fn phase(&self) -> Phase {
        self.gate.lock().phase()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Change-notification cue handed to the owners of operational state
#[derive(Clone)]
pub struct StateChangeNotifier {
    scheduler: Weak<Scheduler>,
}

impl StateChangeNotifier {
    pub fn notify(&self) {
        if let Some(scheduler) = self.scheduler.upgrade() {
            scheduler.trigger();
        }
    }
}
