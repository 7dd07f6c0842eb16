//! Process bootstrap shared by the `gappsd` daemon and the `gapps-cli`
//! admin console: load the config file, open the MySQL pool, build the
//! two Google API client singletons (§5, "process-wide API client
//! singletons") and assemble the `HandlerDeps` bundle the engine crate
//! consumes.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::mysql::MySqlPoolOptions;

use gappsd_core::config::Config;
use gappsd_core::deps::HandlerDeps;
use gappsd_core::registry::JobRegistry;
use gappsd_google::{GoogleDirectoryClient, GoogleReportsClient, ServiceAccountAuth, DIRECTORY_SCOPE, REPORTS_SCOPE};
use gappsd_sql::MySqlStore;

pub struct Bootstrap {
    pub config: Arc<Config>,
    pub store: Arc<MySqlStore>,
    pub deps: HandlerDeps,
    pub registry: Arc<JobRegistry>,
}

/// Builds everything a queue manager, supervisor, or admin console needs
/// to run, from a config file path. Fatal at startup on any failure
/// (missing key, bad DSN, unreadable service-account key) per §6.
pub async fn bootstrap(config_path: &str) -> Result<Bootstrap> {
    let config = gappsd_config::load(config_path)
        .with_context(|| format!("failed to load configuration from '{config_path}'"))?;
    let config = Arc::new(config);

    let dsn = format!(
        "mysql://{}:{}@{}/{}",
        config.mysql_username, config.mysql_password, config.mysql_hostname, config.mysql_database
    );
    let pool = MySqlPoolOptions::new()
        .max_connections(1)
        .connect(&dsn)
        .await
        .with_context(|| format!("failed to connect to mysql://{}/{}", config.mysql_hostname, config.mysql_database))?;
    let store = Arc::new(MySqlStore::new(pool));

    let private_key_pem = std::fs::read_to_string(&config.gapps_oauth2_secret)
        .with_context(|| format!("failed to read service account key at '{}'", config.gapps_oauth2_secret))?;

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()
        .context("failed to build HTTP client")?;

    let directory_auth = Arc::new(
        ServiceAccountAuth::new(&config.gapps_oauth2_client, &private_key_pem, &config.gapps_oauth2_user, DIRECTORY_SCOPE)
            .context("failed to initialize directory service-account credentials")?,
    );
    let reports_auth = Arc::new(
        ServiceAccountAuth::new(&config.gapps_oauth2_client, &private_key_pem, &config.gapps_oauth2_user, REPORTS_SCOPE)
            .context("failed to initialize reports service-account credentials")?,
    );

    let directory = Arc::new(GoogleDirectoryClient::new(
        http.clone(),
        directory_auth,
        config.gapps_domain.clone(),
        config.gapps_customer.clone(),
    ));
    let reports = Arc::new(GoogleReportsClient::new(http, reports_auth, config.gapps_customer.clone()));

    let deps = HandlerDeps {
        config: config.clone(),
        jobs: store.clone(),
        accounts: store.clone(),
        nicknames: store.clone(),
        reporting: store.clone(),
        directory,
        reports,
    };

    let registry = Arc::new(JobRegistry::new());

    Ok(Bootstrap {
        config,
        store,
        deps,
        registry,
    })
}

/// Installs a `tracing` subscriber per §6's `gappsd.logfile-*` keys: a
/// rotating file appender when `logfile-name` is set, stderr otherwise.
/// `verbose` raises the default filter from `info` to `debug`.
pub fn init_logging(config: &Config, verbose: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if config.logfile_name.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return None;
    }

    let path = std::path::Path::new(&config.logfile_name);
    let directory = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
    let filename = path.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_else(|| "gappsd.log".to_string());

    let appender = tracing_appender::rolling::daily(directory, filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    Some(guard)
}
