//! Typed configuration surface (§6). The INI-file parsing itself lives in
//! `gappsd-config`; this struct is the contract that crate exposes and
//! the engine consumes.

use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct Config {
    pub mysql_hostname: String,
    pub mysql_username: String,
    pub mysql_password: String,
    pub mysql_database: String,

    pub gapps_domain: String,
    pub gapps_customer: String,
    pub gapps_oauth2_client: String,
    pub gapps_oauth2_secret: String,
    pub gapps_oauth2_user: String,
    pub gapps_admin_email: String,

    pub activity_backlog_days: i64,
    pub admin_only_jobs: bool,
    pub job_softfail_delay: Duration,
    pub job_softfail_threshold: u32,
    pub logfile_name: String,
    pub logfile_rotation: u32,
    pub logfile_backlog: u32,
    pub logmail: bool,
    pub logmail_delay: Duration,
    pub logmail_smtp: String,
    pub logmail_domain_in_subject: bool,
    pub queue_min_delay: Duration,
    pub queue_delay_normal: Duration,
    pub queue_delay_offline: Duration,
    pub queue_warn_overflow: bool,
    pub token_expiration: Duration,
    pub max_run_time: Duration,
    pub read_only: bool,
}

/// Builder used by `gappsd-config`'s INI loader. Keeping field assembly
/// here (rather than in the loader crate) means the "what counts as
/// mandatory" policy lives next to the struct it populates.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    pub mysql_hostname: Option<String>,
    pub mysql_username: Option<String>,
    pub mysql_password: Option<String>,
    pub mysql_database: Option<String>,

    pub gapps_domain: Option<String>,
    pub gapps_customer: Option<String>,
    pub gapps_oauth2_client: Option<String>,
    pub gapps_oauth2_secret: Option<String>,
    pub gapps_oauth2_user: Option<String>,
    pub gapps_admin_email: Option<String>,

    pub activity_backlog_days: Option<i64>,
    pub admin_only_jobs: Option<bool>,
    pub job_softfail_delay_secs: Option<u64>,
    pub job_softfail_threshold: Option<u32>,
    pub logfile_name: Option<String>,
    pub logfile_rotation: Option<u32>,
    pub logfile_backlog: Option<u32>,
    pub logmail: Option<bool>,
    pub logmail_delay_secs: Option<u64>,
    pub logmail_smtp: Option<String>,
    pub logmail_domain_in_subject: Option<bool>,
    pub queue_min_delay_secs: Option<u64>,
    pub queue_delay_normal_secs: Option<u64>,
    pub queue_delay_offline_secs: Option<u64>,
    pub queue_warn_overflow: Option<bool>,
    pub token_expiration_secs: Option<u64>,
    pub max_run_time_secs: Option<u64>,
    pub read_only: Option<bool>,
}

macro_rules! require {
    ($self:ident, $field:ident, $key:literal) => {
        $self
            .$field
            .clone()
            .ok_or_else(|| ConfigError::Missing($key.to_string()))?
    };
}

impl ConfigBuilder {
    /// Applies gappsd's defaults for the options that have one, then
    /// validates that every mandatory key (one with no default) is
    /// present.
    pub fn build(self) -> Result<Config, ConfigError> {
        Ok(Config {
            mysql_hostname: require!(self, mysql_hostname, "mysql.hostname"),
            mysql_username: require!(self, mysql_username, "mysql.username"),
            mysql_password: self.mysql_password.unwrap_or_default(),
            mysql_database: require!(self, mysql_database, "mysql.database"),

            gapps_domain: require!(self, gapps_domain, "gapps.domain"),
            gapps_customer: require!(self, gapps_customer, "gapps.customer"),
            gapps_oauth2_client: require!(self, gapps_oauth2_client, "gapps.oauth2-client"),
            gapps_oauth2_secret: require!(self, gapps_oauth2_secret, "gapps.oauth2-secret"),
            gapps_oauth2_user: require!(self, gapps_oauth2_user, "gapps.oauth2-user"),
            gapps_admin_email: require!(self, gapps_admin_email, "gapps.admin-email"),

            activity_backlog_days: self.activity_backlog_days.unwrap_or(30),
            admin_only_jobs: self.admin_only_jobs.unwrap_or(false),
            job_softfail_delay: Duration::from_secs(self.job_softfail_delay_secs.unwrap_or(300)),
            job_softfail_threshold: self.job_softfail_threshold.unwrap_or(4),
            logfile_name: self.logfile_name.unwrap_or_default(),
            logfile_rotation: self.logfile_rotation.unwrap_or(1),
            logfile_backlog: self.logfile_backlog.unwrap_or(90),
            logmail: self.logmail.unwrap_or(false),
            logmail_delay: Duration::from_secs(self.logmail_delay_secs.unwrap_or(1800)),
            logmail_smtp: self.logmail_smtp.unwrap_or_default(),
            logmail_domain_in_subject: self.logmail_domain_in_subject.unwrap_or(false),
            queue_min_delay: Duration::from_secs(self.queue_min_delay_secs.unwrap_or(2)),
            queue_delay_normal: Duration::from_secs(self.queue_delay_normal_secs.unwrap_or(10)),
            queue_delay_offline: Duration::from_secs(self.queue_delay_offline_secs.unwrap_or(30)),
            queue_warn_overflow: self.queue_warn_overflow.unwrap_or(true),
            token_expiration: Duration::from_secs(self.token_expiration_secs.unwrap_or(86_400)),
            max_run_time: Duration::from_secs(self.max_run_time_secs.unwrap_or(6 * 3600)),
            read_only: self.read_only.unwrap_or(false),
        })
    }
}
