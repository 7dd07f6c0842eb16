//! `r_activity`/`r_accounts` behavioral contracts: the Pacific-noon
//! reportable-date boundary, the monthly-batch quirk (§8), and the
//! silent-vs-noisy account field split.

mod common;

use std::sync::Arc;

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Timelike, Utc};
use chrono_tz::America::Los_Angeles;
use gappsd_core::job::{JobPriority, JobStatus};
use gappsd_core::queue::QueueManager;
use gappsd_core::registry::JobRegistry;
use gappsd_core::reports::DailyUsage;
use gappsd_core::store::{Account, AccountStatus, AccountStore, ReportingStore};

use common::Fixture;

/// Mirrors `UsageReportJob::latest_reportable_date`: a test-side oracle so
/// assertions don't hardcode a date that would go stale.
fn latest_reportable_date() -> NaiveDate {
    let pacific_now = Utc::now().with_timezone(&Los_Angeles);
    let back = if pacific_now.hour() < 12 { 2 } else { 1 };
    pacific_now.date_naive() - ChronoDuration::days(back)
}

fn distinct_months(start: NaiveDate, end: NaiveDate) -> usize {
    let mut months = std::collections::HashSet::new();
    let mut cursor = start;
    while cursor <= end {
        months.insert((cursor.year(), cursor.month()));
        cursor += ChronoDuration::days(1);
    }
    months.len()
}

async fn dispatch_one(fx: &Fixture) {
    let registry = Arc::new(JobRegistry::new());
    let mut queue = QueueManager::new(fx.jobs.clone(), registry, fx.deps(), fx.config.clone());
    queue.run_once().await.unwrap();
}

fn seed_usage(fx: &Fixture, date: NaiveDate) {
    fx.reports.seed(DailyUsage {
        date,
        count_1_day_actives: 10,
        count_7_day_actives: 50,
        count_30_day_actives: 200,
        used_quota_mb: 5,
    });
}

/// §8: inserts exactly one snapshot per calendar month touched by the
/// backlog, each dated the last unreported day of that month.
#[tokio::test]
async fn usage_report_inserts_one_snapshot_per_month_touched() {
    let mut config = common::test_config();
    config.activity_backlog_days = 35;
    let fx = Fixture::with_config(config);

    let latest = latest_reportable_date();
    let start = Utc::now().date_naive() - ChronoDuration::days(35);
    let expected_months = distinct_months(start, latest);

    let mut cursor = start;
    while cursor <= latest {
        seed_usage(&fx, cursor);
        cursor += ChronoDuration::days(1);
    }

    let q_id = fx.enqueue("r_activity", JobPriority::Offline, serde_json::json!({}));
    dispatch_one(&fx).await;

    let row = fx.jobs.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::Success);
    assert_eq!(row.r_result.as_deref(), Some(format!("{expected_months} days processed")).as_deref());

    let snapshots = fx.reporting.snapshots();
    assert_eq!(snapshots.len(), expected_months);
    assert_eq!(snapshots.iter().map(|s| s.date).max(), Some(latest));
    // MB -> bytes conversion.
    assert!(snapshots.iter().all(|s| s.usage_in_bytes == 5 * 1024 * 1024));
}

#[tokio::test]
async fn usage_report_is_a_no_op_once_caught_up() {
    let fx = Fixture::new();
    let latest = latest_reportable_date();
    fx.reporting.insert_snapshot(&gappsd_core::store::UsageSnapshot {
        date: latest,
        count_1_day_actives: 1,
        count_7_day_actives: 1,
        count_30_day_actives: 1,
        usage_in_bytes: 1,
    }).await.unwrap();

    let q_id = fx.enqueue("r_activity", JobPriority::Offline, serde_json::json!({}));
    dispatch_one(&fx).await;

    let row = fx.jobs.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::Success);
    assert_eq!(row.r_result.as_deref(), Some("0 days processed"));
    // Only the one snapshot seeded before the run exists.
    assert_eq!(fx.reporting.snapshots().len(), 1);
}

fn remote_user(username: &str, first: &str, last: &str) -> gappsd_core::directory::RemoteUser {
    gappsd_core::directory::RemoteUser {
        primary_email: format!("{username}@example.org"),
        given_name: first.into(),
        family_name: last.into(),
        is_admin: false,
        suspended: false,
        suspension_reason: None,
        creation_time: None,
        password_sha1: None,
    }
}

/// `r_accounts` writes creation/suspension fields directly (silent), but
/// only *enqueues* a `u_sync` follow-up when names diverge (noisy) rather
/// than overwriting them in place.
#[tokio::test]
async fn account_report_enqueues_sync_only_for_noisy_name_drift() {
    let fx = Fixture::new();
    fx.directory.seed_user(remote_user("alice", "Alice", "A"));
    let mut local = Account::new("alice");
    local.status = AccountStatus::Active;
    local.first_name = Some("Alicia".into());
    local.last_name = Some("A".into());
    fx.accounts.seed(local);

    let q_id = fx.enqueue("r_accounts", JobPriority::Offline, serde_json::json!({}));
    dispatch_one(&fx).await;

    let row = fx.jobs.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::Success);

    // Name was not silently overwritten...
    let account = fx.accounts.load("alice").await.unwrap().unwrap();
    assert_eq!(account.first_name.as_deref(), Some("Alicia"));

    // ...instead a u_sync follow-up was queued to reconcile it properly.
    let queued = fx.jobs.all();
    assert!(queued.iter().any(|r| r.j_type == "u_sync" && r.q_id != q_id));
}

#[tokio::test]
async fn account_report_enqueues_sync_for_remote_only_users() {
    let fx = Fixture::new();
    fx.directory.seed_user(remote_user("ghost", "Ghost", "G"));

    let q_id = fx.enqueue("r_accounts", JobPriority::Offline, serde_json::json!({}));
    dispatch_one(&fx).await;

    assert_eq!(fx.jobs.snapshot(q_id).unwrap().p_status, JobStatus::Success);
    let queued = fx.jobs.all();
    assert!(queued.iter().any(|r| r.j_type == "u_sync" && r.q_id != q_id));
}
