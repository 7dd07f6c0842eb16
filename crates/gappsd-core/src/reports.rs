//! Reports API client contract (external collaborator).

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub count_1_day_actives: i64,
    pub count_7_day_actives: i64,
    pub count_30_day_actives: i64,
    /// Raw "used quota in MB" value from the report, not yet converted to
    /// bytes (the caller multiplies by 1024*1024).
    pub used_quota_mb: i64,
}

#[async_trait]
pub trait ReportsClient: Send + Sync {
    /// Fetches the customer usage report for exactly one day.
    async fn daily_usage(&self, date: NaiveDate) -> Result<DailyUsage, ApiError>;
}
