//! Round controller for the craps simulator.
//!
//! A [`Simulator`] owns the dice and the running tally. Rounds are played either one at a
//! time on the caller's thread ([`Simulator::run_once`]) or back-to-back on a tokio task
//! ([`Simulator::run_fast`]). Every completed round is published as a
//! [`Snapshot`](crapsim_types::Snapshot) on a `watch` channel; faults go out once on a
//! `broadcast` channel.

use crapsim_execution::{DiceSource, Round};
use crapsim_types::{Snapshot, Tally};
use serde::Serialize;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};

mod config;
pub use config::{ConfigError, SimulatorConfig, ValidatedConfig};

/// Faults buffered per subscriber before the oldest are dropped.
pub const DEFAULT_FAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(16) {
    Some(capacity) => capacity,
    None => panic!("fault capacity must be non-zero"),
};

/// Whether rounds are being produced in the background.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Idle,
    Running,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Idle => "idle",
            RunMode::Running => "running",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A round that could not be completed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Fault {
    /// Round number (1-based, since the last reset) that was abandoned.
    pub round: u64,
    pub message: String,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round {} failed: {}", self.round, self.message)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SimulatorError {
    #[error("simulation already running")]
    AlreadyRunning,
    #[error("continuous mode requires a tokio runtime")]
    NoRuntime,
    #[error("{0}")]
    Fault(Fault),
}

struct Table<S> {
    round: Round<S>,
    tally: Tally,
}

impl<S: DiceSource> Table<S> {
    fn play(&mut self) -> Result<Snapshot, crapsim_execution::Error> {
        self.round.play()?;
        let snapshot = self.round.snapshot(self.tally)?;
        self.tally = snapshot.tally();
        Ok(snapshot)
    }
}

struct Shared<S> {
    table: Mutex<Table<S>>,
    snapshot: watch::Sender<Snapshot>,
    mode: watch::Sender<RunMode>,
    faults: broadcast::Sender<Fault>,
    cancel: AtomicBool,
    published: AtomicU64,
}

impl<S> Shared<S> {
    fn lock_table(&self) -> MutexGuard<'_, Table<S>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: DiceSource> Shared<S> {
    /// Play one round and publish the result. Callers hold the table lock, so
    /// published snapshots are totally ordered.
    fn play_round(&self, table: &mut Table<S>) -> Result<Snapshot, Fault> {
        let round = table.tally.rounds().saturating_add(1);
        match table.play() {
            Ok(snapshot) => {
                self.published.fetch_add(1, Ordering::Relaxed);
                self.snapshot.send_replace(snapshot.clone());
                tracing::debug!(
                    round,
                    wins = snapshot.wins(),
                    losses = snapshot.losses(),
                    rolls = snapshot.rolls().len(),
                    state = %snapshot.state(),
                    "round complete"
                );
                Ok(snapshot)
            }
            Err(err) => {
                let fault = Fault {
                    round,
                    message: err.to_string(),
                };
                tracing::error!(round, %err, "round failed");
                // No subscribers is fine: the fault is still returned or ends the loop.
                let _ = self.faults.send(fault.clone());
                Err(fault)
            }
        }
    }
}

/// Background loop for continuous mode.
///
/// Dropping the worker returns the run mode to idle, including when the task
/// panics or is dropped by its runtime before finishing.
struct Worker<S> {
    shared: Arc<Shared<S>>,
    rounds: u64,
    in_round: bool,
}

impl<S: DiceSource> Worker<S> {
    fn new(shared: Arc<Shared<S>>) -> Self {
        Self {
            shared,
            rounds: 0,
            in_round: false,
        }
    }

    async fn run(mut self) {
        while !self.shared.cancel.load(Ordering::SeqCst) {
            self.in_round = true;
            let result = {
                let mut table = self.shared.lock_table();
                self.shared.play_round(&mut table)
            };
            self.in_round = false;
            if result.is_err() {
                break;
            }
            self.rounds += 1;
            tokio::task::yield_now().await;
        }
    }
}

impl<S> Drop for Worker<S> {
    fn drop(&mut self) {
        if self.in_round {
            // The source panicked mid-round; the tally was never updated.
            let round = self.shared.lock_table().tally.rounds().saturating_add(1);
            let fault = Fault {
                round,
                message: "round panicked".to_string(),
            };
            tracing::error!(round, "round panicked");
            let _ = self.shared.faults.send(fault);
        }
        self.shared.mode.send_replace(RunMode::Idle);
        tracing::info!(rounds = self.rounds, "continuous mode stopped");
    }
}

/// Drives rounds of craps and publishes the running tally.
///
/// Control calls never block on the background worker for longer than one round.
/// Calls that are invalid in the current [`RunMode`] are rejected with
/// [`SimulatorError::AlreadyRunning`] and change nothing.
pub struct Simulator<S> {
    shared: Arc<Shared<S>>,
}

impl<S: DiceSource + Send + 'static> Simulator<S> {
    pub fn new(source: S) -> Self {
        Self::with_fault_capacity(source, DEFAULT_FAULT_CAPACITY)
    }

    pub fn with_fault_capacity(source: S, fault_capacity: NonZeroUsize) -> Self {
        let (snapshot, _) = watch::channel(Snapshot::initial());
        let (mode, _) = watch::channel(RunMode::Idle);
        let (faults, _) = broadcast::channel(fault_capacity.get());
        Self {
            shared: Arc::new(Shared {
                table: Mutex::new(Table {
                    round: Round::new(source),
                    tally: Tally::default(),
                }),
                snapshot,
                mode,
                faults,
                cancel: AtomicBool::new(false),
                published: AtomicU64::new(0),
            }),
        }
    }

    /// Play exactly one round on the caller's thread and publish it.
    ///
    /// A randomness fault leaves the tally untouched, is broadcast to fault
    /// subscribers, and is returned as [`SimulatorError::Fault`].
    pub fn run_once(&self) -> Result<Snapshot, SimulatorError> {
        let mut table = self.shared.lock_table();
        if self.mode() == RunMode::Running {
            tracing::warn!("rejected run_once: simulation already running");
            return Err(SimulatorError::AlreadyRunning);
        }
        self.shared.play_round(&mut table).map_err(SimulatorError::Fault)
    }

    /// Start playing rounds back-to-back on a tokio task until [`Simulator::stop`]
    /// is called or a round faults.
    pub fn run_fast(&self) -> Result<(), SimulatorError> {
        let handle = Handle::try_current().map_err(|_| SimulatorError::NoRuntime)?;
        let shared = &self.shared;
        let started = shared.mode.send_if_modified(|mode| {
            if *mode == RunMode::Running {
                return false;
            }
            // Cleared under the mode lock so a concurrent stop cannot be lost.
            shared.cancel.store(false, Ordering::SeqCst);
            *mode = RunMode::Running;
            true
        });
        if !started {
            tracing::warn!("rejected run_fast: simulation already running");
            return Err(SimulatorError::AlreadyRunning);
        }
        tracing::info!("continuous mode started");
        handle.spawn(Worker::new(Arc::clone(shared)).run());
        Ok(())
    }

    /// Ask the background worker to stop after its current round. No-op when idle.
    pub fn stop(&self) {
        let mode = self.shared.mode.borrow();
        if *mode == RunMode::Running && !self.shared.cancel.swap(true, Ordering::SeqCst) {
            tracing::info!("stop requested");
        }
    }

    /// Wait until the run mode is [`RunMode::Idle`].
    pub async fn stopped(&self) {
        let mut mode = self.shared.mode.subscribe();
        let _ = mode.wait_for(|mode| *mode == RunMode::Idle).await;
    }

    /// Zero the tally and publish the initial snapshot.
    pub fn reset(&self) -> Result<(), SimulatorError> {
        let mut table = self.shared.lock_table();
        if self.mode() == RunMode::Running {
            tracing::warn!("rejected reset: simulation already running");
            return Err(SimulatorError::AlreadyRunning);
        }
        table.tally = Tally::default();
        self.shared.published.store(0, Ordering::Relaxed);
        self.shared.snapshot.send_replace(Snapshot::initial());
        tracing::info!("simulation reset");
        Ok(())
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.shared.snapshot.borrow().clone()
    }

    /// Current-value stream of snapshots. New receivers see the latest value only.
    pub fn snapshots(&self) -> watch::Receiver<Snapshot> {
        self.shared.snapshot.subscribe()
    }

    pub fn mode(&self) -> RunMode {
        *self.shared.mode.borrow()
    }

    /// Current-value stream of the run mode.
    pub fn running(&self) -> watch::Receiver<RunMode> {
        self.shared.mode.subscribe()
    }

    /// Faults raised after this call; earlier faults are not replayed.
    pub fn faults(&self) -> broadcast::Receiver<Fault> {
        self.shared.faults.subscribe()
    }

    /// Post-round snapshots published since construction or the last reset.
    pub fn published(&self) -> u64 {
        self.shared.published.load(Ordering::Relaxed)
    }
}

impl<S> Drop for Simulator<S> {
    fn drop(&mut self) {
        self.shared.cancel.store(true, Ordering::SeqCst);
    }
}
