//! Job record (C2): a typed view over one queue row, owning the state
//! transitions and result write-back described in spec §4.2.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info};

use crate::error::{JobError, StoreError};
use crate::store::{JobStore, JobTransition, QueueRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Idle,
    Active,
    Success,
    SoftFail,
    HardFail,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::HardFail)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Active => "active",
            JobStatus::Success => "success",
            JobStatus::SoftFail => "softfail",
            JobStatus::HardFail => "hardfail",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobPriority {
    Immediate,
    Normal,
    Offline,
}

impl JobPriority {
    /// Strict dispatch order: immediate > normal > offline (§4.6.2).
    pub const ORDER: [JobPriority; 3] =
        [JobPriority::Immediate, JobPriority::Normal, JobPriority::Offline];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobPriority::Immediate => "immediate",
            JobPriority::Normal => "normal",
            JobPriority::Offline => "offline",
        }
    }
}

/// A typed handle over one queue row, backed by the `JobStore`. Handlers
/// hold a `JobRecord` and delegate their status-visible operations to it;
/// the queue manager drives it directly for `mark_active`/outcome
/// application.
pub struct JobRecord {
    q_id: i64,
    job_type: String,
    parameters: Value,
    status: JobStatus,
    softfail_count: u32,
    softfail_delay: Duration,
    softfail_threshold: u32,
    store: Arc<dyn JobStore>,
}

impl JobRecord {
    pub fn from_row(row: &QueueRow, store: Arc<dyn JobStore>, softfail_delay: Duration, softfail_threshold: u32) -> Self {
        Self {
            q_id: row.q_id,
            job_type: row.j_type.clone(),
            parameters: row.j_parameters.clone(),
            status: row.p_status,
            softfail_count: row.r_softfail_count,
            softfail_delay,
            softfail_threshold,
            store,
        }
    }

    pub fn q_id(&self) -> i64 {
        self.q_id
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    /// Current (status, softfail_count) snapshot.
    pub fn status(&self) -> (JobStatus, u32) {
        (self.status, self.softfail_count)
    }

    /// Static: force a row into `hardfail` immediately. Used when even
    /// job construction/instantiation fails — the row is permanently
    /// lost to dispatch, not retried.
    pub async fn mark_failed(store: &dyn JobStore, q_id: i64, message: impl Into<String>) -> Result<(), StoreError> {
        let message = message.into();
        info!(q_id, %message, "marking job as hardfail: instantiation error");
        store
            .apply_transition(
                q_id,
                JobTransition {
                    p_status: Some(JobStatus::HardFail),
                    p_end_date: Some(Utc::now()),
                    r_result: Some(message),
                    ..Default::default()
                },
            )
            .await
    }

    /// Sets `p_status = idle`, `p_admin_request = true`, `p_start_date =
    /// null`. Emits a critical log event. Idempotent: calling it twice is
    /// a no-op the second time from the store's point of view (it always
    /// writes the same target state).
    pub async fn mark_admin(&mut self) -> Result<(), StoreError> {
        error!(
            q_id = self.q_id,
            job_type = %self.job_type,
            critical = true,
            "job parked for admin"
        );
        self.store
            .apply_transition(
                self.q_id,
                JobTransition {
                    p_status: Some(JobStatus::Idle),
                    p_admin_request: Some(true),
                    p_start_date: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        self.status = JobStatus::Idle;
        Ok(())
    }

    /// Called by the scheduler immediately before invoking the handler.
    pub async fn mark_active(&mut self) -> Result<(), StoreError> {
        self.store
            .apply_transition(
                self.q_id,
                JobTransition {
                    p_status: Some(JobStatus::Active),
                    p_start_date: Some(Some(Utc::now())),
                    ..Default::default()
                },
            )
            .await?;
        self.status = JobStatus::Active;
        Ok(())
    }

    /// Applies a non-initial terminal/retry transition.
    ///
    /// `Idle`/`Active` are scheduler-owned and rejected. `SoftFail`
    /// increments the retry count and either reschedules or promotes to
    /// `HardFail` once the threshold is reached. `Success`/`HardFail`
    /// persist the terminal result.
    pub async fn update(&mut self, status: JobStatus, message: impl Into<String>) -> Result<(), JobError> {
        let message = message.into();
        match status {
            JobStatus::Idle | JobStatus::Active => Err(JobError::Action(
                "a job status cannot be set to 'idle' or 'active' directly".into(),
            )),
            JobStatus::SoftFail => {
                self.softfail_count += 1;
                let now = Utc::now();
                let (final_status, final_message) = if self.softfail_count >= self.softfail_threshold {
                    (JobStatus::HardFail, format!("{message} [softfail threshold reached]"))
                } else {
                    (JobStatus::SoftFail, message)
                };

                let mut transition = JobTransition {
                    p_status: Some(final_status),
                    r_softfail_count: Some(self.softfail_count),
                    r_softfail_date: Some(now),
                    r_result: Some(final_message),
                    ..Default::default()
                };
                if final_status == JobStatus::HardFail {
                    transition.p_end_date = Some(now);
                } else {
                    transition.p_notbefore_date = Some(now + self.softfail_delay);
                }

                self.store
                    .apply_transition(self.q_id, transition)
                    .await
                    .map_err(|e| JobError::Action(e.to_string()))?;
                self.status = final_status;
                Ok(())
            }
            JobStatus::Success | JobStatus::HardFail => {
                self.store
                    .apply_transition(
                        self.q_id,
                        JobTransition {
                            p_status: Some(status),
                            p_end_date: Some(Utc::now()),
                            r_result: Some(message),
                            ..Default::default()
                        },
                    )
                    .await
                    .map_err(|e| JobError::Action(e.to_string()))?;
                self.status = status;
                Ok(())
            }
        }
    }
}
