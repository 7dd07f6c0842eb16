//! `u_sync`: reconciles the local account mirror with the remote directory
//! snapshot. No side effects on the remote side.

use async_trait::async_trait;

use crate::deps::HandlerDeps;
use crate::error::{ApiError, JobError};
use crate::handler::JobHandler;
use crate::job::{JobRecord, JobStatus};

use super::params::Params;
use super::sync::synchronize_account;

pub struct UserSyncJob {
    job: JobRecord,
    deps: HandlerDeps,
    username: String,
}

impl UserSyncJob {
    pub fn new(job: JobRecord, deps: HandlerDeps) -> Result<Self, JobError> {
        let params = Params::new(job.parameters());
        params.check_username()?;
        let username = params.require_str("username")?.to_string();
        Ok(Self { job, deps, username })
    }
}

#[async_trait]
impl JobHandler for UserSyncJob {
    async fn run(&mut self) -> Result<(), ApiError> {
        let remote = self.deps.directory.retrieve_user(&self.username).await?;
        synchronize_account(self.deps.accounts.as_ref(), &self.username, remote.as_ref()).await?;
        self.job.update(JobStatus::Success, "").await?;
        Ok(())
    }

    fn has_side_effects(&self) -> bool {
        false
    }

    fn describe_short(&self) -> String {
        format!("u_sync({})", self.username)
    }

    fn describe_long(&self) -> String {
        format!("Synchronize local mirror of user '{}' with the directory", self.username)
    }

    fn job_mut(&mut self) -> &mut JobRecord {
        &mut self.job
    }

    fn job(&self) -> &JobRecord {
        &self.job
    }
}
