//! Admin console (C8) integration tests: forced-privileged instantiation
//! lets gated handlers run instead of parking, an empty partition reports
//! `Empty`, and a row with bad parameters is hardfailed and skipped
//! rather than left stuck.

mod common;

use gappsd_core::admin::{poll_admin_partition, AdminPoll};
use gappsd_core::job::{JobPriority, JobStatus};
use gappsd_core::registry::JobRegistry;
use gappsd_core::store::QueueRow;

use common::Fixture;

/// `u_delete` normally parks in non-privileged mode; the admin console
/// forces privileged mode so the operator's confirmed run actually
/// deletes instead of parking again.
#[tokio::test]
async fn admin_poll_forces_privileged_mode_so_gated_handlers_execute() {
    let fx = Fixture::new();
    fx.directory.seed_user(gappsd_core::directory::RemoteUser {
        primary_email: "jane@example.org".into(),
        given_name: "Jane".into(),
        family_name: "Doe".into(),
        is_admin: false,
        suspended: false,
        suspension_reason: None,
        creation_time: None,
        password_sha1: None,
    });

    let now = chrono::Utc::now();
    fx.jobs.seed(QueueRow {
        q_id: 0,
        j_type: "u_delete".into(),
        p_priority: JobPriority::Normal,
        p_admin_request: true,
        p_status: JobStatus::Idle,
        p_entry_date: now,
        p_start_date: None,
        p_end_date: None,
        p_notbefore_date: now,
        r_softfail_count: 0,
        r_softfail_date: None,
        r_result: None,
        j_parameters: serde_json::json!({ "username": "jane" }),
    });

    let registry = JobRegistry::new();
    let poll = poll_admin_partition(&registry, fx.jobs.clone(), fx.deps()).await.unwrap();
    let pending = match poll {
        AdminPoll::Ready(p) => p,
        _ => panic!("expected a ready admin job"),
    };

    assert_eq!(pending.describe_short(), "u_delete(jane)");
    pending.execute().await.unwrap();

    assert!(fx.directory.user("jane").is_none());
}

#[tokio::test]
async fn admin_poll_on_empty_partition_reports_empty() {
    let fx = Fixture::new();
    let registry = JobRegistry::new();
    let poll = poll_admin_partition(&registry, fx.jobs.clone(), fx.deps()).await.unwrap();
    assert!(matches!(poll, AdminPoll::Empty));
}

#[tokio::test]
async fn admin_poll_skips_and_hardfails_a_row_with_bad_parameters() {
    let fx = Fixture::new();
    let now = chrono::Utc::now();
    let q_id = fx.jobs.seed(QueueRow {
        q_id: 0,
        j_type: "u_delete".into(),
        p_priority: JobPriority::Normal,
        p_admin_request: true,
        p_status: JobStatus::Idle,
        p_entry_date: now,
        p_start_date: None,
        p_end_date: None,
        p_notbefore_date: now,
        r_softfail_count: 0,
        r_softfail_date: None,
        r_result: None,
        j_parameters: serde_json::json!({}), // missing required "username"
    });

    let registry = JobRegistry::new();
    let poll = poll_admin_partition(&registry, fx.jobs.clone(), fx.deps()).await.unwrap();
    assert!(matches!(poll, AdminPoll::Skipped));

    let row = fx.jobs.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::HardFail);
}

#[tokio::test]
async fn admin_poll_ignores_non_admin_rows() {
    let fx = Fixture::new();
    fx.enqueue("u_sync", JobPriority::Normal, serde_json::json!({ "username": "x" }));

    let registry = JobRegistry::new();
    let poll = poll_admin_partition(&registry, fx.jobs.clone(), fx.deps()).await.unwrap();
    assert!(matches!(poll, AdminPoll::Empty));
}
