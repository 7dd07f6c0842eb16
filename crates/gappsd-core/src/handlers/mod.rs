//! Concrete handlers (C5): one module per job type, registered in
//! `crate::registry`.

mod account_report;
mod alias_create;
mod alias_delete;
mod alias_resync;
mod params;
mod sync;
mod usage_report;
mod user_create;
mod user_delete;
mod user_sync;
mod user_update;

pub use account_report::AccountReportJob;
pub use alias_create::AliasCreateJob;
pub use alias_delete::AliasDeleteJob;
pub use alias_resync::AliasResyncJob;
pub use usage_report::UsageReportJob;
pub use user_create::UserCreateJob;
pub use user_delete::UserDeleteJob;
pub use user_sync::UserSyncJob;
pub use user_update::UserUpdateJob;
