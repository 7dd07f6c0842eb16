//! Process-wide dependency bundle handed to every handler constructor.
//! Dependencies are owned values passed by reference, never a shared
//! mutable global (§9).

use std::sync::Arc;

use crate::config::Config;
use crate::directory::DirectoryClient;
use crate::reports::ReportsClient;
use crate::store::{AccountStore, JobStore, NicknameStore, ReportingStore};

#[derive(Clone)]
pub struct HandlerDeps {
    pub config: Arc<Config>,
    pub jobs: Arc<dyn JobStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub nicknames: Arc<dyn NicknameStore>,
    pub reporting: Arc<dyn ReportingStore>,
    pub directory: Arc<dyn DirectoryClient>,
    pub reports: Arc<dyn ReportsClient>,
}
