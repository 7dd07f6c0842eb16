//! `u_update`: applies a partial diff to a directory user, parking the job
//! for admin confirmation when the change would touch privileged fields.

use async_trait::async_trait;
use serde_json::Value;

use crate::deps::HandlerDeps;
use crate::directory::RemoteUserPatch;
use crate::error::{ApiError, JobError};
use crate::handler::JobHandler;
use crate::job::{JobRecord, JobStatus};

use super::params::Params;
use super::sync::synchronize_account;

pub struct UserUpdateJob {
    job: JobRecord,
    deps: HandlerDeps,
    username: String,
    parameters: Value,
}

impl UserUpdateJob {
    pub fn new(job: JobRecord, deps: HandlerDeps) -> Result<Self, JobError> {
        let params = Params::new(job.parameters());
        params.check_user_fields()?;
        let username = params.require_str("username")?.to_string();
        let parameters = job.parameters().clone();
        Ok(Self {
            job,
            deps,
            username,
            parameters,
        })
    }

    fn field(&self, name: &str) -> Option<&str> {
        Params::new(&self.parameters).str_field(name)
    }

    fn has(&self, name: &str) -> bool {
        self.parameters.get(name).is_some()
    }
}

#[async_trait]
impl JobHandler for UserUpdateJob {
    async fn run(&mut self) -> Result<(), ApiError> {
        let user = self.deps.directory.retrieve_user(&self.username).await?;
        let user = user.ok_or_else(|| {
            ApiError::permanent(format!(
                "User '{}' does not exist, cannot update its account.",
                self.username
            ))
        })?;

        // In non-privileged mode, refuse to change admin status, or the
        // password/suspension of an existing administrator (Open Question
        // #1: preserved as-is — name fields remain unrestricted).
        if !self.deps.config.admin_only_jobs
            && (self.has("admin") || (user.is_admin && (self.has("suspended") || self.has("password"))))
        {
            self.job.mark_admin().await?;
            return Ok(());
        }

        let mut patch = RemoteUserPatch::empty();
        if let Some(admin) = self.parameters.get("admin").and_then(Value::as_bool) {
            patch.is_admin = Some(admin);
        }
        if let Some(first) = self.field("first_name") {
            patch.given_name = Some(first.to_string());
        }
        if let Some(last) = self.field("last_name") {
            patch.family_name = Some(last.to_string());
        }
        if let Some(password) = self.field("password") {
            patch.password_sha1 = Some(password.to_string());
        }
        if let Some(suspended) = Params::new(&self.parameters).suspended_bool() {
            patch.suspended = Some(suspended);
        }

        let updated = self.deps.directory.update_user(&self.username, &patch).await?;
        synchronize_account(self.deps.accounts.as_ref(), &self.username, Some(&updated)).await?;
        self.job.update(JobStatus::Success, "").await?;
        Ok(())
    }

    fn has_side_effects(&self) -> bool {
        true
    }

    fn describe_short(&self) -> String {
        format!("u_update({})", self.username)
    }

    fn describe_long(&self) -> String {
        format!("Update user '{}' with parameters {}", self.username, self.parameters)
    }

    fn job_mut(&mut self) -> &mut JobRecord {
        &mut self.job
    }

    fn job(&self) -> &JobRecord {
        &self.job
    }
}
