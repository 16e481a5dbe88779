//! Periodic lifecycle passes for active watch configurations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::WatchConfiguration;
use crate::lifecycle::{FileLifecycleManager, PassReport};

/// Scheduling state of one watch configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    /// Never started.
    Idle,

    /// Passes are firing on the interval.
    Scheduled,

    /// Stopped; no further passes will start.
    Stopped,
}

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new periodic task was spawned.
    Started,

    /// The configuration was already scheduled; nothing changed.
    AlreadyScheduled,

    /// The scheduler has been shut down; nothing changed.
    Rejected,
}

struct Slot {
    state: ScheduleState,
    cancel: Option<CancellationToken>,
    /// Tasks spawned for this configuration, including stopped ones whose
    /// last pass may still be running.
    handles: Vec<JoinHandle<()>>,
}

/// Runs one lifecycle pass per scheduled configuration on a fixed interval.
///
/// Each configuration has its own cancellable task, but a shared gate lets
/// only one pass run at a time across the whole scheduler. A pass that has
/// started always runs to completion. Once [`Scheduler::shutdown`] has been
/// called the scheduler cannot be started again.
pub struct Scheduler {
    manager: Arc<FileLifecycleManager>,
    interval: Duration,
    pass_gate: Arc<Mutex<()>>,
    shutdown: CancellationToken,
    slots: Mutex<HashMap<Uuid, Slot>>,
    report_tx: mpsc::Sender<PassReport>,
}

impl Scheduler {
    /// Create a scheduler along with a receiver for completed pass reports.
    pub fn new(
        manager: Arc<FileLifecycleManager>,
        interval: Duration,
    ) -> (Self, mpsc::Receiver<PassReport>) {
        let (report_tx, report_rx) = mpsc::channel(1000);

        let scheduler = Self {
            manager,
            interval,
            pass_gate: Arc::new(Mutex::new(())),
            shutdown: CancellationToken::new(),
            slots: Mutex::new(HashMap::new()),
            report_tx,
        };

        (scheduler, report_rx)
    }

    /// Begin periodic passes over `config`, the first one immediately.
    pub async fn start(&self, config: WatchConfiguration) -> StartOutcome {
        if self.shutdown.is_cancelled() {
            warn!(
                "Scheduler is shut down, not starting {}",
                config.path.display()
            );
            return StartOutcome::Rejected;
        }

        let mut slots = self.slots.lock().await;
        if slots
            .get(&config.id)
            .is_some_and(|s| s.state == ScheduleState::Scheduled)
        {
            debug!("Already scheduled: {}", config.path.display());
            return StartOutcome::AlreadyScheduled;
        }

        info!(
            "Scheduling {} every {:?} for printer {}",
            config.path.display(),
            self.interval,
            config.printer_id
        );

        let id = config.id;
        let cancel = self.shutdown.child_token();
        let handle = tokio::spawn(run_periodic(
            config,
            self.manager.clone(),
            self.interval,
            self.pass_gate.clone(),
            cancel.clone(),
            self.report_tx.clone(),
        ));

        let slot = slots.entry(id).or_insert_with(|| Slot {
            state: ScheduleState::Idle,
            cancel: None,
            handles: Vec::new(),
        });
        slot.handles.retain(|h| !h.is_finished());
        slot.handles.push(handle);
        slot.state = ScheduleState::Scheduled;
        slot.cancel = Some(cancel);

        StartOutcome::Started
    }

    /// Cancel future passes for a configuration.
    ///
    /// Returns `false` if it was not scheduled.
    pub async fn stop(&self, id: Uuid) -> bool {
        let mut slots = self.slots.lock().await;
        let Some(slot) = slots.get_mut(&id) else {
            return false;
        };
        if slot.state != ScheduleState::Scheduled {
            return false;
        }

        if let Some(cancel) = slot.cancel.take() {
            cancel.cancel();
        }
        slot.state = ScheduleState::Stopped;
        info!("Stopped scheduling {id}");
        true
    }

    /// Stop every configuration and wait for in-flight passes to finish,
    /// including passes of configurations that were stopped earlier.
    ///
    /// Later calls to [`Scheduler::start`] are rejected.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let handles: Vec<JoinHandle<()>> = {
            let mut slots = self.slots.lock().await;
            slots
                .values_mut()
                .flat_map(|slot| {
                    slot.state = ScheduleState::Stopped;
                    slot.cancel = None;
                    std::mem::take(&mut slot.handles)
                })
                .collect()
        };

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Scheduled task ended abnormally: {e}");
            }
        }

        info!("Scheduler shut down");
    }

    /// Current state of a configuration.
    pub async fn state(&self, id: Uuid) -> ScheduleState {
        self.slots
            .lock()
            .await
            .get(&id)
            .map_or(ScheduleState::Idle, |s| s.state)
    }

    /// Number of configurations currently scheduled.
    pub async fn scheduled_count(&self) -> usize {
        self.slots
            .lock()
            .await
            .values()
            .filter(|s| s.state == ScheduleState::Scheduled)
            .count()
    }

    /// Whether [`Scheduler::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

async fn run_periodic(
    config: WatchConfiguration,
    manager: Arc<FileLifecycleManager>,
    interval: Duration,
    pass_gate: Arc<Mutex<()>>,
    cancel: CancellationToken,
    report_tx: mpsc::Sender<PassReport>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let _pass = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            guard = pass_gate.lock() => guard,
        };

        match manager.run_pass(&config).await {
            Ok(report) => {
                if let Err(e) = report_tx.try_send(report) {
                    debug!("Dropping pass report: {e}");
                }
            }
            Err(e) => error!("Scan of {} failed: {e}", config.path.display()),
        }
    }

    debug!("Periodic task for {} finished", config.path.display());
}
