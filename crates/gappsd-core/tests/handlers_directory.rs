//! Directory handler behavioral contracts (§4.5, §8 S1/S2/S7): user
//! create/delete/update/sync against the in-memory fakes.

mod common;

use gappsd_core::directory::RemoteUser;
use gappsd_core::job::{JobPriority, JobRecord, JobStatus};
use gappsd_core::registry::JobRegistry;
use gappsd_core::store::{Account, AccountStatus, AccountStore};

use common::Fixture;

fn remote_user(username: &str, is_admin: bool, suspended: bool) -> RemoteUser {
    RemoteUser {
        primary_email: format!("{username}@example.org"),
        given_name: "Given".into(),
        family_name: "Family".into(),
        is_admin,
        suspended,
        suspension_reason: None,
        creation_time: None,
        password_sha1: None,
    }
}

/// S1: successful user create — row terminates success, account mirror
/// gains an active row.
#[tokio::test]
async fn user_create_success_mirrors_the_new_account() {
    let fx = Fixture::new();
    let q_id = fx.enqueue(
        "u_create",
        JobPriority::Normal,
        serde_json::json!({
            "username": "john.doe",
            "first_name": "John",
            "last_name": "Doe",
            "password": "0123456789abcdef0123456789abcdef01234567",
        }),
    );

    let registry = JobRegistry::new();
    let mut queue = gappsd_core::queue::QueueManager::new(fx.jobs.clone(), std::sync::Arc::new(registry), fx.deps(), fx.config.clone());
    queue.run_once().await.unwrap();

    let row = fx.jobs.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::Success);

    let account = fx.accounts.load("john.doe").await.unwrap().unwrap();
    assert_eq!(account.status, AccountStatus::Active);
    assert_eq!(account.first_name.as_deref(), Some("John"));
}

/// u_create fails permanently (no retry) if the remote user already exists.
#[tokio::test]
async fn user_create_fails_permanently_on_existing_user() {
    let fx = Fixture::new();
    fx.directory.seed_user(remote_user("john.doe", false, false));
    let q_id = fx.enqueue(
        "u_create",
        JobPriority::Normal,
        serde_json::json!({
            "username": "john.doe",
            "first_name": "John",
            "last_name": "Doe",
            "password": "0123456789abcdef0123456789abcdef01234567",
        }),
    );

    let registry = JobRegistry::new();
    let mut queue = gappsd_core::queue::QueueManager::new(fx.jobs.clone(), std::sync::Arc::new(registry), fx.deps(), fx.config.clone());
    queue.run_once().await.unwrap();

    let row = fx.jobs.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::HardFail);
}

/// S2: delete refused in non-privileged mode — parks for admin, no remote
/// call is made.
#[tokio::test]
async fn user_delete_parks_for_admin_in_non_privileged_mode() {
    let fx = Fixture::new();
    fx.directory.seed_user(remote_user("jane", false, false));
    let q_id = fx.enqueue("u_delete", JobPriority::Normal, serde_json::json!({ "username": "jane" }));

    let registry = JobRegistry::new();
    let mut queue = gappsd_core::queue::QueueManager::new(fx.jobs.clone(), std::sync::Arc::new(registry), fx.deps(), fx.config.clone());
    queue.run_once().await.unwrap();

    let row = fx.jobs.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::Idle);
    assert!(row.p_admin_request);
    // The user is still present remotely: no delete call was made.
    assert!(fx.directory.user("jane").is_some());
}

#[tokio::test]
async fn user_delete_succeeds_in_privileged_mode() {
    let mut config = common::test_config();
    config.admin_only_jobs = true;
    let fx = Fixture::with_config(config);
    fx.directory.seed_user(remote_user("jane", false, false));
    fx.accounts.seed(Account::new("jane"));
    let q_id = fx.enqueue("u_delete", JobPriority::Normal, serde_json::json!({ "username": "jane" }));

    let registry = JobRegistry::new();
    let mut queue = gappsd_core::queue::QueueManager::new(fx.jobs.clone(), std::sync::Arc::new(registry), fx.deps(), fx.config.clone());
    queue.run_once().await.unwrap();

    let row = fx.jobs.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::Success);
    assert!(fx.directory.user("jane").is_none());
    assert!(fx.accounts.load("jane").await.unwrap().is_none());
}

#[tokio::test]
async fn user_delete_refuses_to_remove_an_administrator_even_privileged() {
    let mut config = common::test_config();
    config.admin_only_jobs = true;
    let fx = Fixture::with_config(config);
    fx.directory.seed_user(remote_user("root", true, false));
    let q_id = fx.enqueue("u_delete", JobPriority::Normal, serde_json::json!({ "username": "root" }));

    let registry = JobRegistry::new();
    let mut queue = gappsd_core::queue::QueueManager::new(fx.jobs.clone(), std::sync::Arc::new(registry), fx.deps(), fx.config.clone());
    queue.run_once().await.unwrap();

    let row = fx.jobs.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::HardFail);
    assert!(fx.directory.user("root").is_some());
}

/// §8 S7 / Open Question #1: non-privileged `u_update` parks when it would
/// touch `suspended`/`password` on an existing administrator, but name
/// changes on an admin go through directly.
#[tokio::test]
async fn user_update_parks_when_changing_admin_password_in_non_privileged_mode() {
    let fx = Fixture::new();
    fx.directory.seed_user(remote_user("root", true, false));
    let q_id = fx.enqueue(
        "u_update",
        JobPriority::Normal,
        serde_json::json!({ "username": "root", "password": "0123456789abcdef0123456789abcdef01234567" }),
    );

    let registry = JobRegistry::new();
    let mut queue = gappsd_core::queue::QueueManager::new(fx.jobs.clone(), std::sync::Arc::new(registry), fx.deps(), fx.config.clone());
    queue.run_once().await.unwrap();

    let row = fx.jobs.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::Idle);
    assert!(row.p_admin_request);
}

#[tokio::test]
async fn user_update_allows_name_change_on_an_administrator() {
    let fx = Fixture::new();
    fx.directory.seed_user(remote_user("root", true, false));
    let q_id = fx.enqueue(
        "u_update",
        JobPriority::Normal,
        serde_json::json!({ "username": "root", "first_name": "Rootie" }),
    );

    let registry = JobRegistry::new();
    let mut queue = gappsd_core::queue::QueueManager::new(fx.jobs.clone(), std::sync::Arc::new(registry), fx.deps(), fx.config.clone());
    queue.run_once().await.unwrap();

    let row = fx.jobs.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::Success);
    assert_eq!(fx.directory.user("root").unwrap().given_name, "Rootie");
}

#[tokio::test]
async fn user_update_parks_when_granting_admin_bit() {
    let fx = Fixture::new();
    fx.directory.seed_user(remote_user("alice", false, false));
    let q_id = fx.enqueue("u_update", JobPriority::Normal, serde_json::json!({ "username": "alice", "admin": true }));

    let registry = JobRegistry::new();
    let mut queue = gappsd_core::queue::QueueManager::new(fx.jobs.clone(), std::sync::Arc::new(registry), fx.deps(), fx.config.clone());
    queue.run_once().await.unwrap();

    let row = fx.jobs.snapshot(q_id).unwrap();
    assert_eq!(row.p_status, JobStatus::Idle);
    assert!(row.p_admin_request);
}

/// `u_sync` idempotence (§8): running it twice on an unchanged remote
/// snapshot leaves the local mirror identical after each call.
#[tokio::test]
async fn user_sync_is_idempotent() {
    let fx = Fixture::new();
    fx.directory.seed_user(remote_user("mia", false, false));

    let row = fx.jobs.snapshot(fx.enqueue("u_sync", JobPriority::Normal, serde_json::json!({ "username": "mia" }))).unwrap();
    let mut job = JobRecord::from_row(&row, fx.jobs.clone(), fx.config.job_softfail_delay, fx.config.job_softfail_threshold);
    let mut handler = gappsd_core::handlers::UserSyncJob::new(job, fx.deps()).unwrap();
    gappsd_core::handler::JobHandler::run(&mut handler).await.unwrap();
    let after_first = fx.accounts.load("mia").await.unwrap().unwrap();

    let row2 = fx.jobs.snapshot(fx.enqueue("u_sync", JobPriority::Normal, serde_json::json!({ "username": "mia" }))).unwrap();
    job = JobRecord::from_row(&row2, fx.jobs.clone(), fx.config.job_softfail_delay, fx.config.job_softfail_threshold);
    let mut handler2 = gappsd_core::handlers::UserSyncJob::new(job, fx.deps()).unwrap();
    gappsd_core::handler::JobHandler::run(&mut handler2).await.unwrap();
    let after_second = fx.accounts.load("mia").await.unwrap().unwrap();

    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn user_sync_resets_local_mirror_when_remote_is_absent() {
    let fx = Fixture::new();
    fx.accounts.seed({
        let mut a = Account::new("ghost");
        a.status = AccountStatus::Active;
        a.is_admin = Some(true);
        a
    });
    let q_id = fx.enqueue("u_sync", JobPriority::Normal, serde_json::json!({ "username": "ghost" }));

    let registry = JobRegistry::new();
    let mut queue = gappsd_core::queue::QueueManager::new(fx.jobs.clone(), std::sync::Arc::new(registry), fx.deps(), fx.config.clone());
    queue.run_once().await.unwrap();

    assert_eq!(fx.jobs.snapshot(q_id).unwrap().p_status, JobStatus::Success);
    let account = fx.accounts.load("ghost").await.unwrap().unwrap();
    assert_eq!(account.status, AccountStatus::Unprovisioned);
    assert!(account.is_admin.is_none());
}
