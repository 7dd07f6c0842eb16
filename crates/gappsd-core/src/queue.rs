//! Queue manager (C6): poll, classify by priority, rate-shape, dispatch to
//! a handler, apply the outcome, accumulate error statistics.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::deps::HandlerDeps;
use crate::error::{ApiError, ErrorKind};
use crate::handler::JobHandler;
use crate::job::{JobPriority, JobStatus};
use crate::registry::{fail_row, JobRegistry};
use crate::store::{JobCounts, JobStore};

const ACTIVE_LEASE: Duration = Duration::from_secs(90);
const OVERFLOW_WARNING_DELAY: Duration = Duration::from_secs(3600);
const MAX_QUEUE_DELAY: Duration = Duration::from_secs(24 * 3600);
const STATISTICS_DELAY: Duration = Duration::from_secs(1800);
const TRANSIENT_ERRORS_VALIDITY: Duration = Duration::from_secs(3600);
const CREDENTIAL_ERRORS_THRESHOLD: usize = 2;
const TRANSIENT_ERRORS_THRESHOLD: usize = 4;
const QUEUE_HARD_MIN_DELAY: Duration = Duration::from_secs(1);

/// What made a cycle of `QueueManager::run` stop, handed to the supervisor
/// for classification (§4.7).
pub enum QueueOutcome {
    Interrupted,
    Credential,
    Transient,
    Fatal(ApiError),
}

struct ErrorRecord {
    at: Instant,
    description: String,
    credential: bool,
}

pub struct QueueManager {
    store: Arc<dyn JobStore>,
    registry: Arc<JobRegistry>,
    deps: HandlerDeps,
    config: Arc<Config>,
    last_dispatch: HashMap<JobPriority, Instant>,
    last_overflow_warning: HashMap<JobPriority, Instant>,
    transient_errors: VecDeque<ErrorRecord>,
    dispatch_counts: HashMap<JobPriority, u64>,
    last_stats_flush: Instant,
}

impl QueueManager {
    pub fn new(store: Arc<dyn JobStore>, registry: Arc<JobRegistry>, deps: HandlerDeps, config: Arc<Config>) -> Self {
        Self {
            store,
            registry,
            deps,
            config,
            last_dispatch: HashMap::new(),
            last_overflow_warning: HashMap::new(),
            transient_errors: VecDeque::new(),
            dispatch_counts: HashMap::new(),
            last_stats_flush: Instant::now(),
        }
    }

    /// Runs poll cycles until a shutdown signal arrives or an escalation
    /// condition (§4.6.6) is reached. The supervisor interprets the
    /// returned `QueueOutcome`.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> QueueOutcome {
        loop {
            if *shutdown.borrow() {
                return QueueOutcome::Interrupted;
            }

            match self.poll_cycle().await {
                Ok(Some(outcome)) => return outcome,
                Ok(None) => {}
                Err(e) => return QueueOutcome::Fatal(e),
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return QueueOutcome::Interrupted;
                    }
                }
                _ = tokio::time::sleep(self.config.queue_min_delay) => {}
            }
        }
    }

    /// Runs exactly one poll cycle and returns any escalation it raised.
    /// Exposed for tests that want to assert on dispatch/outcome state
    /// without driving the full `run` loop.
    pub async fn run_once(&mut self) -> Result<Option<QueueOutcome>, ApiError> {
        self.poll_cycle().await
    }

    async fn poll_cycle(&mut self) -> Result<Option<QueueOutcome>, ApiError> {
        let counts = self.store.job_counts().await?;
        let delays = self.compute_delays(&counts);

        for &priority in JobPriority::ORDER.iter() {
            let delay = *delays.get(&priority).unwrap_or(&self.config.queue_min_delay);
            loop {
                let elapsed = self
                    .last_dispatch
                    .get(&priority)
                    .map(|t| t.elapsed())
                    .unwrap_or(delay);
                if elapsed < delay {
                    break;
                }

                let row = match self.store.next_eligible(priority).await? {
                    Some(row) => row,
                    None => break,
                };

                self.dispatch(row).await?;
                self.last_dispatch.insert(priority, Instant::now());
                *self.dispatch_counts.entry(priority).or_insert(0) += 1;
            }
        }

        if self.last_stats_flush.elapsed() >= STATISTICS_DELAY {
            self.flush_statistics();
        }

        Ok(self.accumulate_errors())
    }

    async fn dispatch(&mut self, row: crate::store::QueueRow) -> Result<(), ApiError> {
        let handler = self
            .registry
            .instantiate(
                &row,
                self.store.clone(),
                self.deps.clone(),
                self.config.job_softfail_delay,
                self.config.job_softfail_threshold,
            )
            .await;

        let mut handler = match handler {
            Ok(h) => h,
            Err((q_id, e)) => {
                fail_row(self.store.as_ref(), q_id, e).await?;
                return Ok(());
            }
        };

        handler.job_mut().mark_active().await.map_err(ApiError::from)?;

        if self.config.read_only && handler.has_side_effects() {
            handler
                .job_mut()
                .update(JobStatus::HardFail, "read-only mode")
                .await
                .map_err(ApiError::from)?;
            return Ok(());
        }

        let before = handler.job().status();
        let outcome = handler.run().await;
        if let Err(e) = &outcome {
            self.record_error(e, &handler.describe_short());
        }
        apply_handler_outcome(handler.as_mut(), before, outcome).await
    }

    fn record_error(&mut self, error: &ApiError, description: &str) {
        if matches!(error.kind(), ErrorKind::Transient | ErrorKind::Credential) {
            self.transient_errors.push_back(ErrorRecord {
                at: Instant::now(),
                description: description.to_string(),
                credential: matches!(error.kind(), ErrorKind::Credential),
            });
        }
    }

    fn accumulate_errors(&mut self) -> Option<QueueOutcome> {
        let cutoff = Instant::now().checked_sub(TRANSIENT_ERRORS_VALIDITY).unwrap_or(Instant::now());
        while matches!(self.transient_errors.front(), Some(r) if r.at < cutoff) {
            self.transient_errors.pop_front();
        }

        let credential_count = self.transient_errors.iter().filter(|r| r.credential).count();
        let transient_count = self.transient_errors.len() - credential_count;

        if credential_count >= CREDENTIAL_ERRORS_THRESHOLD {
            error!(credential_count, critical = true, "credential error threshold reached");
            return Some(QueueOutcome::Credential);
        }
        if transient_count >= TRANSIENT_ERRORS_THRESHOLD {
            warn!(transient_count, "transient error threshold reached");
            return Some(QueueOutcome::Transient);
        }
        None
    }

    /// §4.6.3: shrink each class's nominal delay if its projected drain
    /// time would exceed the 24-hour horizon; warn (throttled to once per
    /// hour per class) if even the shrunken delay can't keep up.
    fn compute_delays(&mut self, counts: &JobCounts) -> HashMap<JobPriority, Duration> {
        let nominal = |p: JobPriority| match p {
            JobPriority::Immediate => self.config.queue_min_delay,
            JobPriority::Normal => self.config.queue_delay_normal,
            JobPriority::Offline => self.config.queue_delay_offline,
        };

        let mut delays = HashMap::new();
        for &priority in JobPriority::ORDER.iter() {
            let job_count = *counts.get(&priority).unwrap_or(&0);
            let delay = nominal(priority);
            if job_count <= 0 {
                delays.insert(priority, delay);
                continue;
            }

            let projected = delay.saturating_mul(job_count as u32);
            if projected <= MAX_QUEUE_DELAY {
                delays.insert(priority, delay);
                continue;
            }

            let hard_minimum = self.config.queue_min_delay.max(QUEUE_HARD_MIN_DELAY);
            let shrunk_secs = (MAX_QUEUE_DELAY.as_secs() / job_count as u64).max(hard_minimum.as_secs());
            let shrunk = Duration::from_secs(shrunk_secs);
            delays.insert(priority, shrunk);

            let still_overflowing = shrunk.saturating_mul(job_count as u32) > MAX_QUEUE_DELAY;
            if still_overflowing && self.config.queue_warn_overflow {
                let should_warn = self
                    .last_overflow_warning
                    .get(&priority)
                    .map(|t| t.elapsed() >= OVERFLOW_WARNING_DELAY)
                    .unwrap_or(true);
                if should_warn {
                    warn!(
                        priority = priority.as_str(),
                        job_count, "queue overflow: projected drain time exceeds 24 hours even at minimum delay"
                    );
                    self.last_overflow_warning.insert(priority, Instant::now());
                }
            }
        }
        delays
    }

    fn flush_statistics(&mut self) {
        let depth = self.transient_errors.len();
        info!(dispatched = ?self.dispatch_counts, transient_error_depth = depth, "periodic queue statistics");
        self.dispatch_counts.clear();
        self.last_stats_flush = Instant::now();
    }
}

pub const fn active_lease() -> Duration {
    ACTIVE_LEASE
}

/// Shared outcome-application logic (§4.6.5), reused verbatim by the admin
/// console (C8), which drives the same dispatch path without the queue
/// manager's rate shaping or error accounting.
pub async fn apply_handler_outcome(
    handler: &mut dyn JobHandler,
    before: (JobStatus, u32),
    outcome: Result<(), ApiError>,
) -> Result<(), ApiError> {
    match outcome {
        Ok(()) => {
            if handler.job().status() == before {
                handler.job_mut().update(JobStatus::Success, "").await.map_err(ApiError::from)?;
            }
            Ok(())
        }
        Err(e) => {
            let status = match e.kind() {
                ErrorKind::Permanent => JobStatus::HardFail,
                ErrorKind::Transient | ErrorKind::Credential => JobStatus::SoftFail,
            };
            handler.job_mut().update(status, e.message()).await.map_err(ApiError::from)?;
            Ok(())
        }
    }
}
