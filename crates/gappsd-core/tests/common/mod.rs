//! Shared fixtures for `gappsd-core`'s integration tests: a minimal but
//! valid `Config` and a `HandlerDeps` bundle wired to the in-memory fakes
//! from `gappsd-testing`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gappsd_core::config::Config;
use gappsd_core::deps::HandlerDeps;
use gappsd_core::job::{JobPriority, JobStatus};
use gappsd_core::store::QueueRow;
use gappsd_testing::{FakeDirectoryClient, FakeReportsClient, InMemoryAccountStore, InMemoryJobStore, InMemoryNicknameStore, InMemoryReportingStore};

pub fn test_config() -> Config {
    Config {
        mysql_hostname: "localhost".into(),
        mysql_username: "gappsd".into(),
        mysql_password: "".into(),
        mysql_database: "gapps".into(),

        gapps_domain: "example.org".into(),
        gapps_customer: "C1234".into(),
        gapps_oauth2_client: "svc@example.iam.gserviceaccount.com".into(),
        gapps_oauth2_secret: "/etc/gappsd/key.pem".into(),
        gapps_oauth2_user: "admin@example.org".into(),
        gapps_admin_email: "admin@example.org".into(),

        activity_backlog_days: 30,
        admin_only_jobs: false,
        job_softfail_delay: Duration::from_secs(300),
        job_softfail_threshold: 4,
        logfile_name: "".into(),
        logfile_rotation: 1,
        logfile_backlog: 90,
        logmail: false,
        logmail_delay: Duration::from_secs(1800),
        logmail_smtp: "".into(),
        logmail_domain_in_subject: false,
        queue_min_delay: Duration::from_millis(1),
        queue_delay_normal: Duration::from_millis(1),
        queue_delay_offline: Duration::from_millis(1),
        queue_warn_overflow: true,
        token_expiration: Duration::from_secs(86_400),
        max_run_time: Duration::from_secs(6 * 3600),
        read_only: false,
    }
}

pub struct Fixture {
    pub config: Arc<Config>,
    pub jobs: Arc<InMemoryJobStore>,
    pub accounts: Arc<InMemoryAccountStore>,
    pub nicknames: Arc<InMemoryNicknameStore>,
    pub reporting: Arc<InMemoryReportingStore>,
    pub directory: Arc<FakeDirectoryClient>,
    pub reports: Arc<FakeReportsClient>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            jobs: Arc::new(InMemoryJobStore::new()),
            accounts: Arc::new(InMemoryAccountStore::new()),
            nicknames: Arc::new(InMemoryNicknameStore::new()),
            reporting: Arc::new(InMemoryReportingStore::new()),
            directory: Arc::new(FakeDirectoryClient::new()),
            reports: Arc::new(FakeReportsClient::new()),
        }
    }

    pub fn deps(&self) -> HandlerDeps {
        HandlerDeps {
            config: self.config.clone(),
            jobs: self.jobs.clone(),
            accounts: self.accounts.clone(),
            nicknames: self.nicknames.clone(),
            reporting: self.reporting.clone(),
            directory: self.directory.clone(),
            reports: self.reports.clone(),
        }
    }

    /// Seeds an idle row of the given type/priority/parameters and
    /// returns its `q_id`.
    pub fn enqueue(&self, j_type: &str, priority: JobPriority, parameters: serde_json::Value) -> i64 {
        let now = Utc::now();
        self.jobs.seed(QueueRow {
            q_id: 0,
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
        })
    }
}
