//! `a_delete`: removes a remote and local alias record, idempotent on
//! absence.
//!
//! The remote lookup is keyed on the owner username, not the alias
//! (Open Question #2 in DESIGN.md: an earlier revision of this lookup
//! passed the nickname as both arguments, which is a defect fixed here).

use async_trait::async_trait;

use crate::deps::HandlerDeps;
use crate::error::{ApiError, JobError};
use crate::handler::JobHandler;
use crate::job::{JobRecord, JobStatus};

use super::params::Params;

pub struct AliasDeleteJob {
    job: JobRecord,
    deps: HandlerDeps,
    username: String,
    nickname: String,
}

impl AliasDeleteJob {
    pub fn new(job: JobRecord, deps: HandlerDeps) -> Result<Self, JobError> {
        let params = Params::new(job.parameters());
        params.check_username()?;
        params.check_nickname()?;
        let username = params.require_str("username")?.to_string();
        let nickname = params.require_str("nickname")?.to_string();
        Ok(Self {
            job,
            deps,
            username,
            nickname,
        })
    }
}

#[async_trait]
impl JobHandler for AliasDeleteJob {
    async fn run(&mut self) -> Result<(), ApiError> {
        let existing = self.deps.directory.retrieve_aliases(&self.username).await?;
        if existing.iter().any(|a| a.alias == self.nickname) {
            self.deps.directory.delete_alias(&self.username, &self.nickname).await?;
        }

        if self.deps.nicknames.find(&self.nickname).await?.is_some() {
            self.deps.nicknames.delete(&self.nickname).await?;
        }

        self.job.update(JobStatus::Success, "").await?;
        Ok(())
    }

    fn has_side_effects(&self) -> bool {
        true
    }

    fn describe_short(&self) -> String {
        format!("a_delete({})", self.nickname)
    }

    fn describe_long(&self) -> String {
        format!("Delete alias '{}' owned by user '{}'", self.nickname, self.username)
    }

    fn job_mut(&mut self) -> &mut JobRecord {
        &mut self.job
    }

    fn job(&self) -> &JobRecord {
        &self.job
    }
}
