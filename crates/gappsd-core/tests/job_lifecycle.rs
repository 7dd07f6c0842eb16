//! Job record transitions (C2) and the invariants from spec §8 that bind
//! them: terminal finality, softfail accounting, and the threshold
//! boundary.

mod common;

use std::time::Duration;

use chrono::Utc;
use gappsd_core::job::{JobPriority, JobRecord, JobStatus};
use gappsd_core::store::{JobStore, QueueRow};
use gappsd_testing::InMemoryJobStore;

fn seed_row(store: &InMemoryJobStore, softfail_count: u32) -> i64 {
    let now = Utc::now();
    store.seed(QueueRow {
        q_id: 0,
        j_type: "u_sync".into(),
        p_priority: JobPriority::Normal,
        p_admin_request: false,
        p_status: JobStatus::Active,
        p_entry_date: now,
        p_start_date: Some(now),
        p_end_date: None,
        p_notbefore_date: now,
        r_softfail_count: softfail_count,
        r_softfail_date: None,
        r_result: None,
        j_parameters: serde_json::json!({}),
    })
}

#[tokio::test]
async fn success_sets_terminal_fields() {
    let store = std::sync::Arc::new(InMemoryJobStore::new());
    let q_id = seed_row(&store, 0);
    let row = store.snapshot(q_id).unwrap();
    let mut job = JobRecord::from_row(&row, store.clone(), Duration::from_secs(300), 4);

    job.update(JobStatus::Success, "all good").await.unwrap();

    let row = store.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::Success);
    assert!(row.p_end_date.is_some());
    assert_eq!(row.r_result.as_deref(), Some("all good"));
}

#[tokio::test]
async fn softfail_below_threshold_reschedules() {
    let store = std::sync::Arc::new(InMemoryJobStore::new());
    let q_id = seed_row(&store, 1);
    let row = store.snapshot(q_id).unwrap();
    let mut job = JobRecord::from_row(&row, store.clone(), Duration::from_secs(300), 4);

    job.update(JobStatus::SoftFail, "transient blip").await.unwrap();

    let row = store.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::SoftFail);
    assert_eq!(row.r_softfail_count, 2);
    assert!(row.p_end_date.is_none());
    assert!(row.p_notbefore_date >= row.r_softfail_date.unwrap());
}

/// Boundary: softfail-count at threshold-1, one further softfail must
/// promote to hardfail with the threshold-reached suffix (§8).
#[tokio::test]
async fn softfail_at_threshold_boundary_promotes_to_hardfail() {
    let store = std::sync::Arc::new(InMemoryJobStore::new());
    let q_id = seed_row(&store, 3);
    let row = store.snapshot(q_id).unwrap();
    let mut job = JobRecord::from_row(&row, store.clone(), Duration::from_secs(300), 4);

    job.update(JobStatus::SoftFail, "net").await.unwrap();

    let row = store.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::HardFail);
    assert_eq!(row.r_softfail_count, 4);
    assert_eq!(row.r_result.as_deref(), Some("net [softfail threshold reached]"));
    assert!(row.p_end_date.is_some());
}

#[tokio::test]
async fn idle_and_active_targets_are_rejected() {
    let store = std::sync::Arc::new(InMemoryJobStore::new());
    let q_id = seed_row(&store, 0);
    let row = store.snapshot(q_id).unwrap();
    let mut job = JobRecord::from_row(&row, store.clone(), Duration::from_secs(300), 4);

    assert!(job.update(JobStatus::Idle, "nope").await.is_err());
    assert!(job.update(JobStatus::Active, "nope").await.is_err());
}

#[tokio::test]
async fn mark_admin_parks_the_row() {
    let store = std::sync::Arc::new(InMemoryJobStore::new());
    let q_id = seed_row(&store, 0);
    let row = store.snapshot(q_id).unwrap();
    let mut job = JobRecord::from_row(&row, store.clone(), Duration::from_secs(300), 4);

    job.mark_admin().await.unwrap();

    let row = store.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::Idle);
    assert!(row.p_admin_request);
    assert!(row.p_start_date.is_none());
}

#[tokio::test]
async fn mark_admin_is_idempotent() {
    let store = std::sync::Arc::new(InMemoryJobStore::new());
    let q_id = seed_row(&store, 0);
    let row = store.snapshot(q_id).unwrap();
    let mut job = JobRecord::from_row(&row, store.clone(), Duration::from_secs(300), 4);

    job.mark_admin().await.unwrap();
    job.mark_admin().await.unwrap();

    let row = store.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::Idle);
    assert!(row.p_admin_request);
}

#[tokio::test]
async fn mark_failed_is_terminal_without_a_handler() {
    let store = std::sync::Arc::new(InMemoryJobStore::new());
    let q_id = seed_row(&store, 0);

    JobRecord::mark_failed(store.as_ref(), q_id, "Job instantiation error: unknown type")
        .await
        .unwrap();

    let row = store.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::HardFail);
    assert!(row.p_end_date.is_some());
}
