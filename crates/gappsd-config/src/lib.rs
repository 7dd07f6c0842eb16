//! INI configuration loader. Keys are addressed as `section.key`, split
//! on the first dot, and fed into `gappsd_core::config::ConfigBuilder`.

use ini::Ini;

use gappsd_core::config::{Config, ConfigBuilder};
use gappsd_core::error::ConfigError;

/// Loads `path` and builds a validated `Config`. Every mandatory key
/// absent from the file surfaces as `ConfigError::Missing`.
pub fn load(path: &str) -> Result<Config, ConfigError> {
    let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Io(path.to_string(), e.to_string()))?;
    let reader = IniReader { ini };

    let mut builder = ConfigBuilder::default();

    builder.mysql_hostname = reader.str("mysql.hostname");
    builder.mysql_username = reader.str("mysql.username");
    builder.mysql_password = Some(reader.str("mysql.password").unwrap_or_default());
    builder.mysql_database = reader.str("mysql.database");

    builder.gapps_domain = reader.str("gapps.domain");
    builder.gapps_customer = reader.str("gapps.customer");
    builder.gapps_oauth2_client = reader.str("gapps.oauth2-client");
    builder.gapps_oauth2_secret = reader.str("gapps.oauth2-secret");
    builder.gapps_oauth2_user = reader.str("gapps.oauth2-user");
    builder.gapps_admin_email = reader.str("gapps.admin-email");

    builder.activity_backlog_days = reader.int("gappsd.activity-backlog")?;
    builder.admin_only_jobs = reader.bool("gappsd.admin-only-jobs")?;
    builder.job_softfail_delay_secs = reader.u64("gappsd.job-softfail-delay")?;
    builder.job_softfail_threshold = reader.u32("gappsd.job-softfail-threshold")?;
    builder.logfile_name = reader.str("gappsd.logfile-name");
    builder.logfile_rotation = reader.u32("gappsd.logfile-rotation")?;
    builder.logfile_backlog = reader.u32("gappsd.logfile-backlog")?;
    builder.logmail = reader.bool("gappsd.logmail")?;
    builder.logmail_delay_secs = reader.u64("gappsd.logmail-delay")?;
    builder.logmail_smtp = reader.str("gappsd.logmail-smtp");
    builder.logmail_domain_in_subject = reader.bool("gappsd.logmail-domain-in-subject")?;
    builder.queue_min_delay_secs = reader.u64("gappsd.queue-min-delay")?;
    builder.queue_delay_normal_secs = reader.u64("gappsd.queue-delay-normal")?;
    builder.queue_delay_offline_secs = reader.u64("gappsd.queue-delay-offline")?;
    builder.queue_warn_overflow = reader.bool("gappsd.queue-warn-overflow")?;
    builder.token_expiration_secs = reader.u64("gappsd.token-expiration")?;
    builder.max_run_time_secs = reader.u64("gappsd.max-run-time")?;
    builder.read_only = reader.bool("gappsd.read-only")?;

    builder.build()
}

struct IniReader {
    ini: Ini,
}

impl IniReader {
    fn raw(&self, dotted_key: &str) -> Option<&str> {
        let (section, key) = dotted_key.split_once('.')?;
        self.ini.section(Some(section))?.get(key)
    }

    fn str(&self, dotted_key: &str) -> Option<String> {
        self.raw(dotted_key).map(str::to_string)
    }

    fn int(&self, dotted_key: &str) -> Result<Option<i64>, ConfigError> {
        self.parsed(dotted_key, |v| v.parse::<i64>().ok())
    }

    fn u32(&self, dotted_key: &str) -> Result<Option<u32>, ConfigError> {
        self.parsed(dotted_key, |v| v.parse::<u32>().ok())
    }

    fn u64(&self, dotted_key: &str) -> Result<Option<u64>, ConfigError> {
        self.parsed(dotted_key, |v| v.parse::<u64>().ok())
    }

    fn bool(&self, dotted_key: &str) -> Result<Option<bool>, ConfigError> {
        self.parsed(dotted_key, |v| match v.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        })
    }

    fn parsed<T>(&self, dotted_key: &str, f: impl Fn(&str) -> Option<T>) -> Result<Option<T>, ConfigError> {
        match self.raw(dotted_key) {
            None => Ok(None),
            Some(v) => f(v)
                .map(Some)
                .ok_or_else(|| ConfigError::Invalid(dotted_key.to_string(), v.to_string())),
        }
    }
}
