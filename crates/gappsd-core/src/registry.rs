//! Job registry (C3): maps a job-type tag to a constructor producing an
//! executable handler from a queue row. Registration happens once, at
//! process startup — no proc-macro magic, just an explicit list of
//! tag-to-constructor entries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::deps::HandlerDeps;
use crate::error::{JobError, StoreError};
use crate::handler::JobHandler;
use crate::handlers::{
    AccountReportJob, AliasCreateJob, AliasDeleteJob, AliasResyncJob, UsageReportJob, UserCreateJob,
    UserDeleteJob, UserSyncJob, UserUpdateJob,
};
use crate::job::JobRecord;
use crate::store::{JobStore, QueueRow};

type Constructor = Box<dyn Fn(JobRecord, HandlerDeps) -> Result<Box<dyn JobHandler>, JobError> + Send + Sync>;

pub struct JobRegistry {
    constructors: HashMap<&'static str, Constructor>,
}

impl JobRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            constructors: HashMap::new(),
        };
        registry.register();
        registry
    }

    fn insert<F>(&mut self, tag: &'static str, ctor: F)
    where
        F: Fn(JobRecord, HandlerDeps) -> Result<Box<dyn JobHandler>, JobError> + Send + Sync + 'static,
    {
        self.constructors.insert(tag, Box::new(ctor));
    }

    fn register(&mut self) {
        self.insert("u_create", |job, deps| Ok(Box::new(UserCreateJob::new(job, deps)?)));
        self.insert("u_delete", |job, deps| Ok(Box::new(UserDeleteJob::new(job, deps)?)));
        self.insert("u_update", |job, deps| Ok(Box::new(UserUpdateJob::new(job, deps)?)));
        self.insert("u_sync", |job, deps| Ok(Box::new(UserSyncJob::new(job, deps)?)));
        self.insert("a_create", |job, deps| Ok(Box::new(AliasCreateJob::new(job, deps)?)));
        self.insert("a_delete", |job, deps| Ok(Box::new(AliasDeleteJob::new(job, deps)?)));
        self.insert("a_resync", |job, deps| Ok(Box::new(AliasResyncJob::new(job, deps)?)));
        self.insert("r_activity", |job, deps| Ok(Box::new(UsageReportJob::new(job, deps)?)));
        self.insert("r_accounts", |job, deps| Ok(Box::new(AccountReportJob::new(job, deps)?)));
    }

    /// Builds a `JobRecord` from the row and hands it to the registered
    /// constructor for its `j_type`. An unknown tag, or a parameter
    /// validation failure inside the constructor, is converted directly to
    /// `mark_failed` by the caller — the row never reaches a handler.
    pub async fn instantiate(
        &self,
        row: &QueueRow,
        store: Arc<dyn JobStore>,
        deps: HandlerDeps,
        softfail_delay: Duration,
        softfail_threshold: u32,
    ) -> Result<Box<dyn JobHandler>, (i64, JobError)> {
        let ctor = self
            .constructors
            .get(row.j_type.as_str())
            .ok_or_else(|| (row.q_id, JobError::UnknownType(row.j_type.clone())))?;

        let record = JobRecord::from_row(row, store, softfail_delay, softfail_threshold);
        ctor(record, deps).map_err(|e| (row.q_id, e))
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a registry/instantiation failure into the row's terminal
/// `hardfail` state (§4.3: "the row is permanently lost to dispatch").
pub async fn fail_row(store: &dyn JobStore, q_id: i64, error: JobError) -> Result<(), StoreError> {
    JobRecord::mark_failed(store, q_id, error.to_string()).await
}
