//! Store boundary traits. `gappsd-sql` provides the MySQL-backed
//! implementation; `gappsd-testing` provides in-memory fakes. This module
//! only defines the contract the queue manager and handlers rely on — it
//! is the "SQL driver wrapper" / "mirrored-entity CRUD" out-of-scope
//! collaborator, referenced here at its contract only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::StoreError;
use crate::job::{JobPriority, JobStatus};

/// One row of `gapps_queue`, as read back by the queue manager or admin
/// console (§3, "Queue row").
#[derive(Debug, Clone)]
pub struct QueueRow {
    pub q_id: i64,
    pub j_type: String,
    pub p_priority: JobPriority,
    pub p_admin_request: bool,
    pub p_status: JobStatus,
    pub p_entry_date: DateTime<Utc>,
    pub p_start_date: Option<DateTime<Utc>>,
    pub p_end_date: Option<DateTime<Utc>>,
    pub p_notbefore_date: DateTime<Utc>,
    pub r_softfail_count: u32,
    pub r_softfail_date: Option<DateTime<Utc>>,
    pub r_result: Option<String>,
    pub j_parameters: Value,
}

/// Fields a terminal/retry transition writes back. Constructed by
/// `JobRecord::update`/`mark_active`/`mark_admin`/`mark_failed` and handed
/// to `JobStore::apply_transition` as a single point-update.
#[derive(Debug, Clone, Default)]
pub struct JobTransition {
    pub p_status: Option<JobStatus>,
    pub p_admin_request: Option<bool>,
    pub p_start_date: Option<Option<DateTime<Utc>>>,
    pub p_end_date: Option<DateTime<Utc>>,
    pub p_notbefore_date: Option<DateTime<Utc>>,
    pub r_softfail_count: Option<u32>,
    pub r_softfail_date: Option<DateTime<Utc>>,
    pub r_result: Option<String>,
}

/// Aggregate counts per priority class, for §4.6.1/§4.6.3.
pub type JobCounts = HashMap<JobPriority, i64>;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// §4.6.4 step 1: one SQL round trip, grouped by priority, over the
    /// non-admin eligibility predicate.
    async fn job_counts(&self) -> Result<JobCounts, StoreError>;

    /// Fetches the oldest eligible row (by `q_id` ascending) in the given
    /// priority class, non-admin partition.
    async fn next_eligible(&self, priority: JobPriority) -> Result<Option<QueueRow>, StoreError>;

    /// Fetches the oldest eligible row in the admin partition
    /// (`p_admin_request = true`), for C8.
    async fn next_admin_eligible(&self) -> Result<Option<QueueRow>, StoreError>;

    /// Applies a point-update transition to the row keyed by `q_id`.
    async fn apply_transition(&self, q_id: i64, t: JobTransition) -> Result<(), StoreError>;

    /// Inserts a new row in `idle` status (producer-side helper, also used
    /// by handlers that enqueue secondary jobs, e.g. account-report's
    /// noisy-field sync).
    async fn enqueue(
        &self,
        j_type: &str,
        parameters: Value,
        priority: JobPriority,
    ) -> Result<i64, StoreError>;
}

/// Mirrored account row (`gapps_accounts`).
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub account_id: Option<i64>,
    pub account_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub status: AccountStatus,
    pub is_admin: Option<bool>,
    pub suspension: Option<String>,
    pub disk_usage: Option<i64>,
    pub creation: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub last_webmail: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(account_name: impl Into<String>) -> Self {
        Self {
            account_id: None,
            account_name: account_name.into(),
            first_name: None,
            last_name: None,
            status: AccountStatus::Unprovisioned,
            is_admin: None,
            suspension: None,
            disk_usage: None,
            creation: None,
            last_login: None,
            last_webmail: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Unprovisioned,
    Disabled,
    Active,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Unprovisioned => "unprovisioned",
            AccountStatus::Disabled => "disabled",
            AccountStatus::Active => "active",
        }
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn load(&self, account_name: &str) -> Result<Option<Account>, StoreError>;
    /// Fails with `StoreError::AlreadyExists` if the account already exists.
    async fn create(&self, account: &Account) -> Result<(), StoreError>;
    async fn update(&self, account: &Account) -> Result<(), StoreError>;
    async fn delete(&self, account_name: &str) -> Result<(), StoreError>;
    async fn all(&self) -> Result<Vec<Account>, StoreError>;
}

/// Mirrored alias row (`gapps_nicknames`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nickname {
    pub account_name: String,
    pub nickname: String,
}

#[async_trait]
pub trait NicknameStore: Send + Sync {
    async fn create(&self, n: &Nickname) -> Result<(), StoreError>;
    async fn delete(&self, nickname: &str) -> Result<(), StoreError>;
    async fn find(&self, nickname: &str) -> Result<Option<Nickname>, StoreError>;
    async fn all(&self) -> Result<Vec<Nickname>, StoreError>;
}

/// Mirrored usage snapshot row (`gapps_reporting`).
#[derive(Debug, Clone)]
pub struct UsageSnapshot {
    pub date: chrono::NaiveDate,
    pub count_1_day_actives: i64,
    pub count_7_day_actives: i64,
    pub count_30_day_actives: i64,
    pub usage_in_bytes: i64,
}

#[async_trait]
pub trait ReportingStore: Send + Sync {
    async fn last_report_date(&self) -> Result<Option<chrono::NaiveDate>, StoreError>;
    async fn insert_snapshot(&self, snapshot: &UsageSnapshot) -> Result<(), StoreError>;
}
