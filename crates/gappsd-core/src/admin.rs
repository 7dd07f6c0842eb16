//! Admin console (C8): the DB-facing half of the human-driven drain loop
//! over the admin partition (`p_admin_request = true`). The interactive
//! prompt/confirmation lives in the `gappsd` binary crate; this module
//! only knows how to fetch the next admin-eligible row, build its
//! handler in privileged mode, and apply the outcome once confirmed.

use std::sync::Arc;

use crate::deps::HandlerDeps;
use crate::error::ApiError;
use crate::handler::JobHandler;
use crate::queue::apply_handler_outcome;
use crate::registry::{fail_row, JobRegistry};
use crate::store::JobStore;

/// The next admin-partition row, already instantiated into a runnable
/// handler with privileged mode forced on.
pub struct PendingAdminJob {
    handler: Box<dyn JobHandler>,
}

impl PendingAdminJob {
    pub fn describe_long(&self) -> String {
        self.handler.describe_long()
    }

    pub fn describe_short(&self) -> String {
        self.handler.describe_short()
    }

    /// Runs the handler to completion and persists its outcome. Called
    /// only after the operator has confirmed.
    pub async fn execute(mut self) -> Result<(), ApiError> {
        self.handler.job_mut().mark_active().await.map_err(ApiError::from)?;
        let before = self.handler.job().status();
        let outcome = self.handler.run().await;
        apply_handler_outcome(self.handler.as_mut(), before, outcome).await
    }
}

/// Outcome of a single poll of the admin partition.
pub enum AdminPoll {
    /// No admin-eligible row remains; the console should exit.
    Empty,
    /// A row could not be instantiated (unknown type / bad parameters) and
    /// was hardfailed outright; the caller should poll again.
    Skipped,
    Ready(PendingAdminJob),
}

/// Fetches and instantiates the next admin-eligible row, forcing
/// privileged mode so handlers that would otherwise park via `mark-admin`
/// (`u_delete`, gated `u_update`) execute instead.
pub async fn poll_admin_partition(
    registry: &JobRegistry,
    store: Arc<dyn JobStore>,
    deps: HandlerDeps,
) -> Result<AdminPoll, ApiError> {
    let row = match store.next_admin_eligible().await? {
        Some(row) => row,
        None => return Ok(AdminPoll::Empty),
    };

    let mut privileged_config = (*deps.config).clone();
    privileged_config.admin_only_jobs = true;
    let softfail_delay = privileged_config.job_softfail_delay;
    let softfail_threshold = privileged_config.job_softfail_threshold;
    let privileged_deps = HandlerDeps {
        config: Arc::new(privileged_config),
        ..deps
    };

    match registry
        .instantiate(&row, store.clone(), privileged_deps, softfail_delay, softfail_threshold)
        .await
    {
        Ok(handler) => Ok(AdminPoll::Ready(PendingAdminJob { handler })),
        Err((q_id, e)) => {
            fail_row(store.as_ref(), q_id, e).await?;
            Ok(AdminPoll::Skipped)
        }
    }
}
