//! `a_resync`: enumerates remote aliases by paging, diffs against the
//! local mirror, adds missing, drops stale, and corrects mismatched
//! owners. No side effects on the remote side. Idempotent and convergent.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::deps::HandlerDeps;
use crate::error::{ApiError, JobError};
use crate::handler::JobHandler;
use crate::job::{JobRecord, JobStatus};
use crate::store::Nickname;

pub struct AliasResyncJob {
    job: JobRecord,
    deps: HandlerDeps,
}

impl AliasResyncJob {
    pub fn new(job: JobRecord, deps: HandlerDeps) -> Result<Self, JobError> {
        Ok(Self { job, deps })
    }
}

#[async_trait]
impl JobHandler for AliasResyncJob {
    async fn run(&mut self) -> Result<(), ApiError> {
        let remote_pairs = self.deps.directory.list_all_aliases().await?;
        let mut remote: HashMap<String, String> = HashMap::new();
        for (username, aliases) in remote_pairs {
            for alias in aliases {
                remote.insert(alias.alias, username.clone());
            }
        }

        let mut local: HashMap<String, String> = self
            .deps
            .nicknames
            .all()
            .await?
            .into_iter()
            .map(|n| (n.nickname, n.account_name))
            .collect();

        for (nickname, owner) in &remote {
            match local.remove(nickname) {
                None => {
                    self.deps
                        .nicknames
                        .create(&Nickname {
                            account_name: owner.clone(),
                            nickname: nickname.clone(),
                        })
                        .await?;
                }
                Some(local_owner) if &local_owner != owner => {
                    self.deps.nicknames.delete(nickname).await?;
                    self.deps
                        .nicknames
                        .create(&Nickname {
                            account_name: owner.clone(),
                            nickname: nickname.clone(),
                        })
                        .await?;
                }
                Some(_) => {}
            }
        }

        for stale in local.keys() {
            self.deps.nicknames.delete(stale).await?;
        }

        self.job.update(JobStatus::Success, "").await?;
        Ok(())
    }

    fn has_side_effects(&self) -> bool {
        false
    }

    fn describe_short(&self) -> String {
        "a_resync".to_string()
    }

    fn describe_long(&self) -> String {
        "Resynchronize the local alias mirror against the directory".to_string()
    }

    fn job_mut(&mut self) -> &mut JobRecord {
        &mut self.job
    }

    fn job(&self) -> &JobRecord {
        &self.job
    }
}
