//! `r_accounts`: folds the remote account listing into the local mirror.
//! Silent fields (creation date, suspension reason) apply directly; noisy
//! fields (given/family name) enqueue a `u_sync` job instead, since the
//! reporting snapshot lags the live directory state.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::deps::HandlerDeps;
use crate::error::{ApiError, JobError};
use crate::handler::JobHandler;
use crate::job::{JobPriority, JobRecord, JobStatus};
use crate::store::{Account, AccountStatus};

pub struct AccountReportJob {
    job: JobRecord,
    deps: HandlerDeps,
}

impl AccountReportJob {
    pub fn new(job: JobRecord, deps: HandlerDeps) -> Result<Self, JobError> {
        Ok(Self { job, deps })
    }

    async fn enqueue_sync(&self, username: &str) -> Result<(), ApiError> {
        self.deps
            .jobs
            .enqueue("u_sync", serde_json::json!({ "username": username }), JobPriority::Offline)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl JobHandler for AccountReportJob {
    async fn run(&mut self) -> Result<(), ApiError> {
        let mut local: HashMap<String, Account> = self
            .deps
            .accounts
            .all()
            .await?
            .into_iter()
            .map(|a| (a.account_name.clone(), a))
            .collect();

        let remote_users = self.deps.directory.list_all_users().await?;

        for remote in remote_users {
            let username = remote.username().to_string();
            match local.remove(&username) {
                Some(mut account) => {
                    let mut needs_sync = false;

                    account.creation = remote.creation_time;
                    account.suspension = remote.suspension_reason.as_ref().map(|s| truncate(s, 256));

                    if account.last_name.as_deref() != Some(remote.family_name.as_str()) {
                        needs_sync = true;
                    }
                    if account.first_name.as_deref() != Some(remote.given_name.as_str()) {
                        needs_sync = true;
                    }

                    self.deps.accounts.update(&account).await?;
                    if needs_sync {
                        self.enqueue_sync(&username).await?;
                    }
                }
                None => {
                    self.enqueue_sync(&username).await?;
                }
            }
        }

        for (username, account) in local {
            if !matches!(account.status, AccountStatus::Unprovisioned) {
                self.enqueue_sync(&username).await?;
            }
        }

        self.job.update(JobStatus::Success, "").await?;
        Ok(())
    }

    fn has_side_effects(&self) -> bool {
        false
    }

    fn describe_short(&self) -> String {
        "r_accounts".to_string()
    }

    fn describe_long(&self) -> String {
        "Fold the remote account listing into the local mirror".to_string()
    }

    fn job_mut(&mut self) -> &mut JobRecord {
        &mut self.job
    }

    fn job(&self) -> &JobRecord {
        &self.job
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
