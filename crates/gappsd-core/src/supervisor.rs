//! Daemon supervisor (C7): owns the queue manager's lifetime, trips a
//! degraded mode on fatal conditions, and gates restarts on a wall-clock
//! deadline.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{error, info};

use crate::deps::HandlerDeps;
use crate::queue::{QueueManager, QueueOutcome};
use crate::registry::JobRegistry;
use crate::store::JobStore;

const TRANSIENT_ERROR_RESTART_DELAY: Duration = Duration::from_secs(600);
const BACKUP_EMAIL_INTERVAL: Duration = Duration::from_secs(3600);
const SUPERVISOR_TRANSIENT_WINDOW: Duration = Duration::from_secs(3600);
const SUPERVISOR_TRANSIENT_THRESHOLD: usize = 4;

/// What the supervisor's `run` loop ultimately decided, surfaced to the
/// binary's `main` so an external process manager can act on it.
pub enum SupervisorExit {
    CleanShutdown,
    RestartRequested,
    BackupMode,
}

pub struct Supervisor {
    store: Arc<dyn JobStore>,
    registry: Arc<JobRegistry>,
    deps: HandlerDeps,
    deadline: Option<Instant>,
    own_transient_window: VecDeque<Instant>,
}

impl Supervisor {
    pub fn new(store: Arc<dyn JobStore>, registry: Arc<JobRegistry>, deps: HandlerDeps, max_run_time: Duration) -> Self {
        let deadline = if max_run_time.is_zero() {
            None
        } else {
            Some(Instant::now() + max_run_time)
        };
        Self {
            store,
            registry,
            deps,
            deadline,
            own_transient_window: VecDeque::new(),
        }
    }

    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> SupervisorExit {
        loop {
            if *shutdown.borrow() {
                info!("supervisor exiting cleanly on shutdown signal");
                return SupervisorExit::CleanShutdown;
            }

            let mut queue = QueueManager::new(self.store.clone(), self.registry.clone(), self.deps.clone(), self.deps.config.clone());
            let outcome = queue.run(shutdown.clone()).await;

            match outcome {
                QueueOutcome::Interrupted => {
                    info!("queue manager interrupted, shutting down");
                    return SupervisorExit::CleanShutdown;
                }
                QueueOutcome::Credential => {
                    error!(critical = true, "credential escalation, entering backup mode");
                    self.backup_mode(&mut shutdown).await;
                    return SupervisorExit::BackupMode;
                }
                QueueOutcome::Transient => {
                    self.own_transient_window.push_back(Instant::now());
                    self.trim_window();
                    if self.own_transient_window.len() >= SUPERVISOR_TRANSIENT_THRESHOLD {
                        error!(critical = true, "repeated transient escalations, entering backup mode");
                        self.backup_mode(&mut shutdown).await;
                        return SupervisorExit::BackupMode;
                    }
                    info!("transient escalation, restarting queue manager");
                }
                QueueOutcome::Fatal(e) => {
                    error!(critical = true, error = %e, "unexpected error, entering backup mode");
                    self.backup_mode(&mut shutdown).await;
                    return SupervisorExit::BackupMode;
                }
            }

            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    info!("max run time reached, requesting rolling restart");
                    return SupervisorExit::RestartRequested;
                }
            }

            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return SupervisorExit::CleanShutdown;
                    }
                }
                _ = tokio::time::sleep(TRANSIENT_ERROR_RESTART_DELAY) => {}
            }
        }
    }

    fn trim_window(&mut self) {
        let cutoff = Instant::now().checked_sub(SUPERVISOR_TRANSIENT_WINDOW).unwrap_or_else(Instant::now);
        while matches!(self.own_transient_window.front(), Some(t) if *t < cutoff) {
            self.own_transient_window.pop_front();
        }
    }

    /// A quiescent state: periodically emit a critical heartbeat, do no
    /// work, and wait for an external signal.
    async fn backup_mode(&self, shutdown: &mut watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                return;
            }
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
                _ = tokio::time::sleep(BACKUP_EMAIL_INTERVAL) => {
                    error!(critical = true, "waiting for admin intervention");
                }
            }
        }
    }
}
