//! `r_activity`: ingests the daily usage report for every day since the
//! last successful snapshot, bounded by a configured backlog. No side
//! effects on the remote side.
//!
//! Within a calendar month, only the last unreported day is actually
//! fetched and inserted; the report call counts toward "days processed"
//! once per month touched, not once per calendar day in the backlog.

use async_trait::async_trait;
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Timelike, Utc};
use chrono_tz::America::Los_Angeles;

use crate::deps::HandlerDeps;
use crate::error::{ApiError, JobError};
use crate::handler::JobHandler;
use crate::job::{JobRecord, JobStatus};
use crate::store::UsageSnapshot;

pub struct UsageReportJob {
    job: JobRecord,
    deps: HandlerDeps,
}

impl UsageReportJob {
    pub fn new(job: JobRecord, deps: HandlerDeps) -> Result<Self, JobError> {
        Ok(Self { job, deps })
    }

    /// (today - 2) if Pacific local time is before noon, else (today - 1).
    fn latest_reportable_date(&self) -> NaiveDate {
        let pacific_now = Utc::now().with_timezone(&Los_Angeles);
        let back = if pacific_now.hour() < 12 { 2 } else { 1 };
        pacific_now.date_naive() - ChronoDuration::days(back)
    }

    async fn days_to_process(&self, last_report: Option<NaiveDate>) -> Result<Vec<NaiveDate>, ApiError> {
        let latest = self.latest_reportable_date();
        let start = match last_report {
            Some(d) => d + ChronoDuration::days(1),
            None => {
                let backlog = self.deps.config.activity_backlog_days;
                Utc::now().date_naive() - ChronoDuration::days(backlog)
            }
        };

        let mut days = Vec::new();
        let mut cursor = start;
        while cursor <= latest {
            days.push(cursor);
            cursor += ChronoDuration::days(1);
        }
        Ok(days)
    }
}

#[async_trait]
impl JobHandler for UsageReportJob {
    async fn run(&mut self) -> Result<(), ApiError> {
        let mut last_report = self.deps.reporting.last_report_date().await?;
        let mut processed = 0u32;

        loop {
            let days = self.days_to_process(last_report).await?;
            if days.is_empty() {
                break;
            }

            let first = days[0];
            let date = days
                .iter()
                .copied()
                .filter(|d| d.year() == first.year() && d.month() == first.month())
                .max()
                .unwrap();

            let usage = self.deps.reports.daily_usage(date).await?;
            self.deps
                .reporting
                .insert_snapshot(&UsageSnapshot {
                    date: usage.date,
                    count_1_day_actives: usage.count_1_day_actives,
                    count_7_day_actives: usage.count_7_day_actives,
                    count_30_day_actives: usage.count_30_day_actives,
                    usage_in_bytes: usage.used_quota_mb * 1024 * 1024,
                })
                .await?;

            processed += 1;
            last_report = Some(date);
        }

        self.job.update(JobStatus::Success, format!("{processed} days processed")).await?;
        Ok(())
    }

    fn has_side_effects(&self) -> bool {
        false
    }

    fn describe_short(&self) -> String {
        "r_activity".to_string()
    }

    fn describe_long(&self) -> String {
        "Ingest daily usage reports since the last known snapshot".to_string()
    }

    fn job_mut(&mut self) -> &mut JobRecord {
        &mut self.job
    }

    fn job(&self) -> &JobRecord {
        &self.job
    }
}
