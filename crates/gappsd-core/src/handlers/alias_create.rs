//! `a_create`: maintains a remote and local alias record, idempotent on
//! pre-existence.

use async_trait::async_trait;

use crate::deps::HandlerDeps;
use crate::error::{ApiError, JobError};
use crate::handler::JobHandler;
use crate::job::{JobRecord, JobStatus};
use crate::store::Nickname;

use super::params::Params;

pub struct AliasCreateJob {
    job: JobRecord,
    deps: HandlerDeps,
    username: String,
    nickname: String,
}

impl AliasCreateJob {
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
impl JobHandler for AliasCreateJob {
    async fn run(&mut self) -> Result<(), ApiError> {
        let existing = self.deps.directory.retrieve_aliases(&self.username).await?;
        if !existing.iter().any(|a| a.alias == self.nickname) {
            self.deps.directory.create_alias(&self.username, &self.nickname).await?;
        }

        if self.deps.nicknames.find(&self.nickname).await?.is_none() {
            self.deps
                .nicknames
                .create(&Nickname {
                    account_name: self.username.clone(),
                    nickname: self.nickname.clone(),
                })
                .await?;
        }

        self.job.update(JobStatus::Success, "").await?;
        Ok(())
    }

    fn has_side_effects(&self) -> bool {
        true
    }

    fn describe_short(&self) -> String {
        format!("a_create({} -> {})", self.nickname, self.username)
    }

    fn describe_long(&self) -> String {
        format!("Create alias '{}' for user '{}'", self.nickname, self.username)
    }

    fn job_mut(&mut self) -> &mut JobRecord {
        &mut self.job
    }

    fn job(&self) -> &JobRecord {
        &self.job
    }
}
