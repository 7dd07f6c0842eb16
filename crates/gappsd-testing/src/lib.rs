//! In-memory fakes for the store and client trait boundaries, used by
//! `gappsd-core`'s own handler/queue tests and available to downstream
//! crates as a dev-dependency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use gappsd_core::directory::{DirectoryClient, RemoteAlias, RemoteUser, RemoteUserPatch};
use gappsd_core::error::{ApiError, StoreError};
use gappsd_core::job::{JobPriority, JobStatus};
use gappsd_core::queue::active_lease;
use gappsd_core::reports::{DailyUsage, ReportsClient};
use gappsd_core::store::{
    Account, AccountStore, JobCounts, JobStore, JobTransition, Nickname, NicknameStore, QueueRow, ReportingStore,
    UsageSnapshot,
};

fn is_eligible(row: &QueueRow) -> bool {
    match row.p_status {
        JobStatus::Idle | JobStatus::SoftFail => row.p_notbefore_date <= Utc::now(),
        JobStatus::Active => row
            .p_start_date
            .map(|started| Utc::now() - started >= chrono::Duration::from_std(active_lease()).unwrap())
            .unwrap_or(false),
        JobStatus::Success | JobStatus::HardFail => false,
    }
}

/// An in-memory `gapps_queue`. Tests seed rows with [`InMemoryJobStore::seed`]
/// and assert on state with [`InMemoryJobStore::snapshot`].
#[derive(Default)]
pub struct InMemoryJobStore {
    rows: Mutex<HashMap<i64, QueueRow>>,
    next_id: AtomicI64,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully-formed row, bypassing `enqueue`'s defaults. Returns
    /// the row's `q_id`.
    pub fn seed(&self, mut row: QueueRow) -> i64 {
        let q_id = if row.q_id != 0 {
            row.q_id
        } else {
            self.next_id.fetch_add(1, Ordering::SeqCst) + 1
        };
        row.q_id = q_id;
        self.rows.lock().unwrap().insert(q_id, row);
        q_id
    }

    pub fn snapshot(&self, q_id: i64) -> Option<QueueRow> {
        self.rows.lock().unwrap().get(&q_id).cloned()
    }

    pub fn all(&self) -> Vec<QueueRow> {
        self.rows.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn job_counts(&self) -> Result<JobCounts, StoreError> {
        let rows = self.rows.lock().unwrap();
        let mut counts = JobCounts::new();
        for row in rows.values() {
            if !row.p_admin_request && is_eligible(row) {
                *counts.entry(row.p_priority).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn next_eligible(&self, priority: JobPriority) -> Result<Option<QueueRow>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|r| !r.p_admin_request && r.p_priority == priority && is_eligible(r))
            .min_by_key(|r| r.q_id)
            .cloned())
    }

    async fn next_admin_eligible(&self) -> Result<Option<QueueRow>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|r| r.p_admin_request && is_eligible(r))
            .min_by_key(|r| r.q_id)
            .cloned())
    }

    async fn apply_transition(&self, q_id: i64, t: JobTransition) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&q_id)
            .ok_or_else(|| StoreError::NotFound(format!("queue row {q_id}")))?;

        if let Some(status) = t.p_status {
            row.p_status = status;
        }
        if let Some(admin_request) = t.p_admin_request {
            row.p_admin_request = admin_request;
        }
        if let Some(start_date) = t.p_start_date {
            row.p_start_date = start_date;
        }
        if let Some(end_date) = t.p_end_date {
            row.p_end_date = Some(end_date);
        }
        if let Some(notbefore) = t.p_notbefore_date {
            row.p_notbefore_date = notbefore;
        }
        if let Some(count) = t.r_softfail_count {
            row.r_softfail_count = count;
        }
        if let Some(date) = t.r_softfail_date {
            row.r_softfail_date = Some(date);
        }
        if let Some(result) = t.r_result {
            row.r_result = Some(result);
        }
        Ok(())
    }

    async fn enqueue(&self, j_type: &str, parameters: Value, priority: JobPriority) -> Result<i64, StoreError> {
        let q_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        self.rows.lock().unwrap().insert(
            q_id,
            QueueRow {
                q_id,
                j_type: j_type.to_string(),
                p_priority: priority,
                p_admin_request: false,
                p_status: JobStatus::Idle,
                p_entry_date: now,
                p_start_date: None,
                p_end_date: None,
                p_notbefore_date: now,
                r_softfail_count: 0,
                r_softfail_date: None,
                r_result: None,
                j_parameters: parameters,
            },
        );
        Ok(q_id)
    }
}

/// An in-memory `gapps_accounts` mirror, keyed by account name.
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: Mutex<HashMap<String, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, account: Account) {
        self.accounts.lock().unwrap().insert(account.account_name.clone(), account);
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn load(&self, account_name: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.lock().unwrap().get(account_name).cloned())
    }

    async fn create(&self, account: &Account) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(&account.account_name) {
            return Err(StoreError::AlreadyExists(account.account_name.clone()));
        }
        accounts.insert(account.account_name.clone(), account.clone());
        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().unwrap();
        if !accounts.contains_key(&account.account_name) {
            return Err(StoreError::NotFound(account.account_name.clone()));
        }
        accounts.insert(account.account_name.clone(), account.clone());
        Ok(())
    }

    async fn delete(&self, account_name: &str) -> Result<(), StoreError> {
        self.accounts.lock().unwrap().remove(account_name);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.accounts.lock().unwrap().values().cloned().collect())
    }
}

/// An in-memory `gapps_nicknames` mirror, keyed by nickname.
#[derive(Default)]
pub struct InMemoryNicknameStore {
    nicknames: Mutex<HashMap<String, Nickname>>,
}

impl InMemoryNicknameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, nickname: Nickname) {
        self.nicknames.lock().unwrap().insert(nickname.nickname.clone(), nickname);
    }
}

#[async_trait]
impl NicknameStore for InMemoryNicknameStore {
    async fn create(&self, n: &Nickname) -> Result<(), StoreError> {
        let mut nicknames = self.nicknames.lock().unwrap();
        if nicknames.contains_key(&n.nickname) {
            return Err(StoreError::AlreadyExists(n.nickname.clone()));
        }
        nicknames.insert(n.nickname.clone(), n.clone());
        Ok(())
    }

    async fn delete(&self, nickname: &str) -> Result<(), StoreError> {
        self.nicknames.lock().unwrap().remove(nickname);
        Ok(())
    }

    async fn find(&self, nickname: &str) -> Result<Option<Nickname>, StoreError> {
        Ok(self.nicknames.lock().unwrap().get(nickname).cloned())
    }

    async fn all(&self) -> Result<Vec<Nickname>, StoreError> {
        Ok(self.nicknames.lock().unwrap().values().cloned().collect())
    }
}

/// An in-memory `gapps_reporting` mirror.
#[derive(Default)]
pub struct InMemoryReportingStore {
    snapshots: Mutex<Vec<UsageSnapshot>>,
}

impl InMemoryReportingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<UsageSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportingStore for InMemoryReportingStore {
    async fn last_report_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        Ok(self.snapshots.lock().unwrap().iter().map(|s| s.date).max())
    }

    async fn insert_snapshot(&self, snapshot: &UsageSnapshot) -> Result<(), StoreError> {
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}

/// A scripted failure a fake client returns once, then clears.
pub enum Scripted<T> {
    Value(T),
    Fail(ApiError),
}

/// A fake `DirectoryClient` backed by in-memory maps, with an optional
/// one-shot error override per call kind for exercising error paths.
#[derive(Default)]
pub struct FakeDirectoryClient {
    users: Mutex<HashMap<String, RemoteUser>>,
    aliases: Mutex<HashMap<String, Vec<RemoteAlias>>>,
    scripted_retrieve_user_errors: Mutex<std::collections::VecDeque<ApiError>>,
}

impl FakeDirectoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_user(&self, user: RemoteUser) {
        self.users.lock().unwrap().insert(user.username().to_string(), user);
    }

    pub fn seed_aliases(&self, owner: &str, aliases: Vec<RemoteAlias>) {
        self.aliases.lock().unwrap().insert(owner.to_string(), aliases);
    }

    /// Queues one scripted failure for the next call to `retrieve_user`.
    /// Calling this multiple times queues multiple failures in order;
    /// once exhausted, calls fall through to the real lookup.
    pub fn fail_next_retrieve_user(&self, error: ApiError) {
        self.scripted_retrieve_user_errors.lock().unwrap().push_back(error);
    }

    pub fn user(&self, username: &str) -> Option<RemoteUser> {
        self.users.lock().unwrap().get(username).cloned()
    }
}

#[async_trait]
impl DirectoryClient for FakeDirectoryClient {
    async fn retrieve_user(&self, username: &str) -> Result<Option<RemoteUser>, ApiError> {
        if let Some(error) = self.scripted_retrieve_user_errors.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(self.users.lock().unwrap().get(username).cloned())
    }

    async fn create_user(&self, user: &RemoteUser) -> Result<RemoteUser, ApiError> {
        let created = user.clone();
        self.users
            .lock()
            .unwrap()
            .insert(created.username().to_string(), created.clone());
        Ok(created)
    }

    async fn update_user(&self, username: &str, patch: &RemoteUserPatch) -> Result<RemoteUser, ApiError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(username)
            .ok_or_else(|| ApiError::permanent(format!("user '{username}' not found")))?;
        if let Some(is_admin) = patch.is_admin {
            user.is_admin = is_admin;
        }
        if let Some(given_name) = &patch.given_name {
            user.given_name = given_name.clone();
        }
        if let Some(family_name) = &patch.family_name {
            user.family_name = family_name.clone();
        }
        if let Some(password_sha1) = &patch.password_sha1 {
            user.password_sha1 = Some(password_sha1.clone());
        }
        if let Some(suspended) = patch.suspended {
            user.suspended = suspended;
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, username: &str) -> Result<(), ApiError> {
        self.users.lock().unwrap().remove(username);
        Ok(())
    }

    async fn retrieve_aliases(&self, username: &str) -> Result<Vec<RemoteAlias>, ApiError> {
        Ok(self.aliases.lock().unwrap().get(username).cloned().unwrap_or_default())
    }

    async fn create_alias(&self, username: &str, alias: &str) -> Result<(), ApiError> {
        self.aliases
            .lock()
            .unwrap()
            .entry(username.to_string())
            .or_default()
            .push(RemoteAlias { alias: alias.to_string() });
        Ok(())
    }

    async fn delete_alias(&self, username: &str, alias: &str) -> Result<(), ApiError> {
        if let Some(aliases) = self.aliases.lock().unwrap().get_mut(username) {
            aliases.retain(|a| a.alias != alias);
        }
        Ok(())
    }

    async fn list_all_users(&self) -> Result<Vec<RemoteUser>, ApiError> {
        Ok(self.users.lock().unwrap().values().cloned().collect())
    }

    async fn list_all_aliases(&self) -> Result<Vec<(String, Vec<RemoteAlias>)>, ApiError> {
        Ok(self
            .aliases
            .lock()
            .unwrap()
            .iter()
            .map(|(owner, aliases)| (owner.clone(), aliases.clone()))
            .collect())
    }
}

/// A fake `ReportsClient` returning one canned `DailyUsage` per date.
#[derive(Default)]
pub struct FakeReportsClient {
    reports: Mutex<HashMap<NaiveDate, DailyUsage>>,
}

impl FakeReportsClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, usage: DailyUsage) {
        self.reports.lock().unwrap().insert(usage.date, usage);
    }
}

#[async_trait]
impl ReportsClient for FakeReportsClient {
    async fn daily_usage(&self, date: NaiveDate) -> Result<DailyUsage, ApiError> {
        self.reports
            .lock()
            .unwrap()
            .get(&date)
            .copied()
            .ok_or_else(|| ApiError::transient(format!("no usage report seeded for {date}")))
    }
}
