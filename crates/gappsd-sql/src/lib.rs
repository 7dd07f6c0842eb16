//! MySQL implementations of the store traits `gappsd-core` defines
//! (`JobStore`, `AccountStore`, `NicknameStore`, `ReportingStore`), via
//! `sqlx`. Selection and dispatch are point queries rather than
//! transactional `SELECT ... FOR UPDATE` pairs: this system has at most
//! one daemon process per domain (§5), so there is no concurrent poller
//! to race against.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

use gappsd_core::error::StoreError;
use gappsd_core::job::{JobPriority, JobStatus};
use gappsd_core::store::{
    Account, AccountStatus, AccountStore, JobCounts, JobStore, JobTransition, Nickname, NicknameStore, QueueRow,
    ReportingStore, UsageSnapshot,
};

const ACTIVE_LEASE_SECONDS: i64 = 90;

fn priority_str(p: JobPriority) -> &'static str {
    p.as_str()
}

fn priority_from_str(s: &str) -> Result<JobPriority, StoreError> {
    match s {
        "immediate" => Ok(JobPriority::Immediate),
        "normal" => Ok(JobPriority::Normal),
        "offline" => Ok(JobPriority::Offline),
        other => Err(StoreError::Permanent(format!("unknown priority '{other}' in gapps_queue"))),
    }
}

fn status_str(s: JobStatus) -> &'static str {
    s.as_str()
}

fn status_from_str(s: &str) -> Result<JobStatus, StoreError> {
    match s {
        "idle" => Ok(JobStatus::Idle),
        "active" => Ok(JobStatus::Active),
        "success" => Ok(JobStatus::Success),
        "softfail" => Ok(JobStatus::SoftFail),
        "hardfail" => Ok(JobStatus::HardFail),
        other => Err(StoreError::Permanent(format!("unknown status '{other}' in gapps_queue"))),
    }
}

fn account_status_str(s: AccountStatus) -> &'static str {
    s.as_str()
}

fn account_status_from_str(s: &str) -> Result<AccountStatus, StoreError> {
    match s {
        "unprovisioned" => Ok(AccountStatus::Unprovisioned),
        "disabled" => Ok(AccountStatus::Disabled),
        "active" => Ok(AccountStatus::Active),
        other => Err(StoreError::Permanent(format!("unknown account status '{other}' in gapps_accounts"))),
    }
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::RowNotFound => StoreError::NotFound(e.to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AlreadyExists(e.to_string()),
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed => StoreError::Transient(e.to_string()),
        _ => StoreError::Permanent(e.to_string()),
    }
}

fn row_to_queue_row(row: MySqlRow) -> Result<QueueRow, StoreError> {
    let p_status: String = row.try_get("p_status").map_err(map_sqlx)?;
    let p_priority: String = row.try_get("p_priority").map_err(map_sqlx)?;
    let j_parameters_raw: String = row.try_get("j_parameters").map_err(map_sqlx)?;
    Ok(QueueRow {
        q_id: row.try_get("q_id").map_err(map_sqlx)?,
        j_type: row.try_get("j_type").map_err(map_sqlx)?,
        p_priority: priority_from_str(&p_priority)?,
        p_admin_request: row.try_get("p_admin_request").map_err(map_sqlx)?,
        p_status: status_from_str(&p_status)?,
        p_entry_date: row.try_get("p_entry_date").map_err(map_sqlx)?,
        p_start_date: row.try_get("p_start_date").map_err(map_sqlx)?,
        p_end_date: row.try_get("p_end_date").map_err(map_sqlx)?,
        p_notbefore_date: row.try_get("p_notbefore_date").map_err(map_sqlx)?,
        r_softfail_count: row.try_get::<i64, _>("r_softfail_count").map_err(map_sqlx)? as u32,
        r_softfail_date: row.try_get("r_softfail_date").map_err(map_sqlx)?,
        r_result: row.try_get("r_result").map_err(map_sqlx)?,
        j_parameters: serde_json::from_str(&j_parameters_raw)
            .map_err(|e| StoreError::Permanent(format!("malformed j_parameters: {e}")))?,
    })
}

fn row_to_account(row: MySqlRow) -> Result<Account, StoreError> {
    let status: String = row.try_get("g_status").map_err(map_sqlx)?;
    Ok(Account {
        account_id: row.try_get("g_account_id").map_err(map_sqlx)?,
        account_name: row.try_get("g_account_name").map_err(map_sqlx)?,
        first_name: row.try_get("g_first_name").map_err(map_sqlx)?,
        last_name: row.try_get("g_last_name").map_err(map_sqlx)?,
        status: account_status_from_str(&status)?,
        is_admin: row.try_get("g_admin").map_err(map_sqlx)?,
        suspension: row.try_get("g_suspension").map_err(map_sqlx)?,
        disk_usage: row.try_get("r_disk_usage").map_err(map_sqlx)?,
        creation: row.try_get("r_creation").map_err(map_sqlx)?,
        last_login: row.try_get("r_last_login").map_err(map_sqlx)?,
        last_webmail: row.try_get("r_last_webmail").map_err(map_sqlx)?,
    })
}

/// Implements `JobStore`/`AccountStore`/`NicknameStore`/`ReportingStore`
/// over a single shared connection pool.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for MySqlStore {
    async fn job_counts(&self) -> Result<JobCounts, StoreError> {
        let rows = sqlx::query(
            "SELECT p_priority, COUNT(*) AS n FROM gapps_queue \
             WHERE p_admin_request = 0 \
               AND ((p_status IN ('idle', 'softfail') AND p_notbefore_date <= NOW()) \
                 OR (p_status = 'active' AND p_start_date <= DATE_SUB(NOW(), INTERVAL ? SECOND))) \
             GROUP BY p_priority",
        )
        .bind(ACTIVE_LEASE_SECONDS)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let mut counts = JobCounts::new();
        for row in rows {
            let priority: String = row.try_get("p_priority").map_err(map_sqlx)?;
            let n: i64 = row.try_get("n").map_err(map_sqlx)?;
            counts.insert(priority_from_str(&priority)?, n);
        }
        Ok(counts)
    }

    async fn next_eligible(&self, priority: JobPriority) -> Result<Option<QueueRow>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM gapps_queue \
             WHERE p_admin_request = 0 AND p_priority = ? \
               AND ((p_status IN ('idle', 'softfail') AND p_notbefore_date <= NOW()) \
                 OR (p_status = 'active' AND p_start_date <= DATE_SUB(NOW(), INTERVAL ? SECOND))) \
             ORDER BY q_id ASC LIMIT 1",
        )
        .bind(priority_str(priority))
        .bind(ACTIVE_LEASE_SECONDS)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(row_to_queue_row).transpose()
    }

    async fn next_admin_eligible(&self) -> Result<Option<QueueRow>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM gapps_queue \
             WHERE p_admin_request = 1 \
               AND ((p_status IN ('idle', 'softfail') AND p_notbefore_date <= NOW()) \
                 OR (p_status = 'active' AND p_start_date <= DATE_SUB(NOW(), INTERVAL ? SECOND))) \
             ORDER BY q_id ASC LIMIT 1",
        )
        .bind(ACTIVE_LEASE_SECONDS)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(row_to_queue_row).transpose()
    }

    async fn apply_transition(&self, q_id: i64, t: JobTransition) -> Result<(), StoreError> {
        let mut sets: Vec<&str> = Vec::new();
        if t.p_status.is_some() {
            sets.push("p_status = ?");
        }
        if t.p_admin_request.is_some() {
            sets.push("p_admin_request = ?");
        }
        if t.p_start_date.is_some() {
            sets.push("p_start_date = ?");
        }
        if t.p_end_date.is_some() {
            sets.push("p_end_date = ?");
        }
        if t.p_notbefore_date.is_some() {
            sets.push("p_notbefore_date = ?");
        }
        if t.r_softfail_count.is_some() {
            sets.push("r_softfail_count = ?");
        }
        if t.r_softfail_date.is_some() {
            sets.push("r_softfail_date = ?");
        }
        if t.r_result.is_some() {
            sets.push("r_result = ?");
        }

        if sets.is_empty() {
            return Ok(());
        }

        let sql = format!("UPDATE gapps_queue SET {} WHERE q_id = ?", sets.join(", "));
        let mut query = sqlx::query(&sql);

        if let Some(status) = t.p_status {
            query = query.bind(status_str(status));
        }
        if let Some(admin_request) = t.p_admin_request {
            query = query.bind(admin_request);
        }
        if let Some(start_date) = t.p_start_date {
            query = query.bind(start_date);
        }
        if let Some(end_date) = t.p_end_date {
            query = query.bind(end_date);
        }
        if let Some(notbefore) = t.p_notbefore_date {
            query = query.bind(notbefore);
        }
        if let Some(count) = t.r_softfail_count {
            query = query.bind(count);
        }
        if let Some(date) = t.r_softfail_date {
            query = query.bind(date);
        }
        if let Some(result) = t.r_result {
            query = query.bind(result);
        }

        query.bind(q_id).execute(&self.pool).await.map_err(map_sqlx)?;
        Ok(())
    }

    async fn enqueue(&self, j_type: &str, parameters: Value, priority: JobPriority) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO gapps_queue (j_type, p_priority, p_admin_request, p_status, p_entry_date, \
             p_notbefore_date, r_softfail_count, j_parameters) \
             VALUES (?, ?, 0, 'idle', NOW(), NOW(), 0, ?)",
        )
        .bind(j_type)
        .bind(priority_str(priority))
        .bind(parameters.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(result.last_insert_id() as i64)
    }
}

#[async_trait]
impl AccountStore for MySqlStore {
    async fn load(&self, account_name: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query("SELECT * FROM gapps_accounts WHERE g_account_name = ?")
            .bind(account_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.map(row_to_account).transpose()
    }

    async fn create(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO gapps_accounts \
             (g_account_name, g_first_name, g_last_name, g_status, g_admin, g_suspension, \
              r_disk_usage, r_creation, r_last_login, r_last_webmail) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&account.account_name)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account_status_str(account.status))
        .bind(account.is_admin)
        .bind(&account.suspension)
        .bind(account.disk_usage)
        .bind(account.creation)
        .bind(account.last_login)
        .bind(account.last_webmail)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE gapps_accounts SET \
             g_first_name = ?, g_last_name = ?, g_status = ?, g_admin = ?, g_suspension = ?, \
             r_disk_usage = ?, r_creation = ?, r_last_login = ?, r_last_webmail = ? \
             WHERE g_account_name = ?",
        )
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account_status_str(account.status))
        .bind(account.is_admin)
        .bind(&account.suspension)
        .bind(account.disk_usage)
        .bind(account.creation)
        .bind(account.last_login)
        .bind(account.last_webmail)
        .bind(&account.account_name)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn delete(&self, account_name: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM gapps_accounts WHERE g_account_name = ?")
            .bind(account_name)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Account>, StoreError> {
        let rows = sqlx::query("SELECT * FROM gapps_accounts")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        rows.into_iter().map(row_to_account).collect()
    }
}

#[async_trait]
impl NicknameStore for MySqlStore {
    async fn create(&self, n: &Nickname) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO gapps_nicknames (g_account_name, g_nickname) VALUES (?, ?)")
            .bind(&n.account_name)
            .bind(&n.nickname)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn delete(&self, nickname: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM gapps_nicknames WHERE g_nickname = ?")
            .bind(nickname)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn find(&self, nickname: &str) -> Result<Option<Nickname>, StoreError> {
        let row = sqlx::query("SELECT * FROM gapps_nicknames WHERE g_nickname = ?")
            .bind(nickname)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        match row {
            None => Ok(None),
            Some(row) => Ok(Some(Nickname {
                account_name: row.try_get("g_account_name").map_err(map_sqlx)?,
                nickname: row.try_get("g_nickname").map_err(map_sqlx)?,
            })),
        }
    }

    async fn all(&self) -> Result<Vec<Nickname>, StoreError> {
        let rows = sqlx::query("SELECT * FROM gapps_nicknames")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        rows.into_iter()
            .map(|row| {
                Ok(Nickname {
                    account_name: row.try_get("g_account_name").map_err(map_sqlx)?,
                    nickname: row.try_get("g_nickname").map_err(map_sqlx)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ReportingStore for MySqlStore {
    async fn last_report_date(&self) -> Result<Option<chrono::NaiveDate>, StoreError> {
        let row = sqlx::query("SELECT MAX(date) AS date FROM gapps_reporting")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.try_get("date").map_err(map_sqlx)
    }

    async fn insert_snapshot(&self, snapshot: &UsageSnapshot) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO gapps_reporting \
             (date, count_1_day_actives, count_7_day_actives, count_30_day_actives, usage_in_bytes) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(snapshot.date)
        .bind(snapshot.count_1_day_actives)
        .bind(snapshot.count_7_day_actives)
        .bind(snapshot.count_30_day_actives)
        .bind(snapshot.usage_in_bytes)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }
}
