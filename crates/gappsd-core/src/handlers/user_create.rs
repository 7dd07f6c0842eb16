//! `u_create`: provisions a new directory user and mirrors it locally.

use async_trait::async_trait;

use crate::deps::HandlerDeps;
use crate::directory::RemoteUser;
use crate::error::{ApiError, JobError};
use crate::handler::JobHandler;
use crate::job::{JobRecord, JobStatus};

use super::params::Params;
use super::sync::synchronize_account;

pub struct UserCreateJob {
    job: JobRecord,
    deps: HandlerDeps,
    username: String,
    first_name: String,
    last_name: String,
    password: String,
    suspended: bool,
}

impl UserCreateJob {
    pub fn new(job: JobRecord, deps: HandlerDeps) -> Result<Self, JobError> {
        let params = Params::new(job.parameters());
        params.check_user_fields()?;
        let username = params.require_str("username")?.to_string();
        let first_name = params.require_str("first_name")?.to_string();
        let last_name = params.require_str("last_name")?.to_string();
        let password = params.require_str("password")?.to_string();
        let suspended = params.suspended_bool().unwrap_or(false);
        Ok(Self {
            job,
            deps,
            username,
            first_name,
            last_name,
            password,
            suspended,
        })
    }
}

#[async_trait]
impl JobHandler for UserCreateJob {
    async fn run(&mut self) -> Result<(), ApiError> {
        if self.deps.directory.retrieve_user(&self.username).await?.is_some() {
            return Err(ApiError::permanent(format!(
                "An account for user '{}' already exists.",
                self.username
            )));
        }

        let created = self
            .deps
            .directory
            .create_user(&RemoteUser {
                primary_email: format!("{}@{}", self.username, self.deps.config.gapps_domain),
                given_name: self.first_name.clone(),
                family_name: self.last_name.clone(),
                is_admin: false,
                suspended: self.suspended,
                suspension_reason: None,
                creation_time: None,
                password_sha1: Some(self.password.clone()),
            })
            .await?;

        synchronize_account(self.deps.accounts.as_ref(), &self.username, Some(&created)).await?;
        self.job.update(JobStatus::Success, "").await?;
        Ok(())
    }

    fn has_side_effects(&self) -> bool {
        true
    }

    fn describe_short(&self) -> String {
        format!("u_create({})", self.username)
    }

    fn describe_long(&self) -> String {
        format!("Create user '{}' ({} {})", self.username, self.first_name, self.last_name)
    }

    fn job_mut(&mut self) -> &mut JobRecord {
        &mut self.job
    }

    fn job(&self) -> &JobRecord {
        &self.job
    }
}
