//! `u_delete`: removes a directory user, gated behind privileged mode.

use async_trait::async_trait;

use crate::deps::HandlerDeps;
use crate::error::{ApiError, JobError};
use crate::handler::JobHandler;
use crate::job::{JobRecord, JobStatus};
use crate::store::AccountStore;

use super::params::Params;

pub struct UserDeleteJob {
    job: JobRecord,
    deps: HandlerDeps,
    username: String,
}

impl UserDeleteJob {
    pub fn new(job: JobRecord, deps: HandlerDeps) -> Result<Self, JobError> {
        let params = Params::new(job.parameters());
        params.check_username()?;
        let username = params.require_str("username")?.to_string();
        Ok(Self { job, deps, username })
    }
}

#[async_trait]
impl JobHandler for UserDeleteJob {
    async fn run(&mut self) -> Result<(), ApiError> {
        if !self.deps.config.admin_only_jobs {
            self.job.mark_admin().await?;
            return Ok(());
        }

        let user = self.deps.directory.retrieve_user(&self.username).await?;
        let user = user.ok_or_else(|| {
            ApiError::permanent(format!("User '{}' did not exist. Deletion failed.", self.username))
        })?;
        if user.is_admin {
            return Err(ApiError::permanent(
                "Administrators cannot be deleted directly, you must remove their admin status first.",
            ));
        }

        self.deps.directory.delete_user(&self.username).await?;
        if self.deps.accounts.load(&self.username).await?.is_some() {
            self.deps.accounts.delete(&self.username).await?;
        }

        self.job.update(JobStatus::Success, "").await?;
        Ok(())
    }

    fn has_side_effects(&self) -> bool {
        true
    }

    fn describe_short(&self) -> String {
        format!("u_delete({})", self.username)
    }

    fn describe_long(&self) -> String {
        format!("Delete user '{}'", self.username)
    }

    fn job_mut(&mut self) -> &mut JobRecord {
        &mut self.job
    }

    fn job(&self) -> &JobRecord {
        &self.job
    }
}
