//! `ReportsClient` over the Google Workspace Admin SDK Reports API
//! (customer usage reports).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Method, StatusCode};

use gappsd_core::error::ApiError;
use gappsd_core::reports::{DailyUsage, ReportsClient};

use crate::auth::ServiceAccountAuth;
use crate::wire::{WireApiError, WireUsageReportsList};

const BASE_URL: &str = "https://admin.googleapis.com/admin/reports/v1/usage/dates";

pub struct GoogleReportsClient {
    http: reqwest::Client,
    auth: Arc<ServiceAccountAuth>,
    customer: String,
}

impl GoogleReportsClient {
    pub fn new(http: reqwest::Client, auth: Arc<ServiceAccountAuth>, customer: impl Into<String>) -> Self {
        Self {
            http,
            auth,
            customer: customer.into(),
        }
    }

    async fn authed_get(&self, url: &str) -> Result<reqwest::Response, ApiError> {
        let token = self.auth.bearer_token(&self.http).await?;
        let response = self
            .http
            .request(Method::GET, url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(ApiError::from_transport_error)?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let fresh = self.auth.refresh(&self.http).await?;
        let retried = self
            .http
            .request(Method::GET, url)
            .bearer_auth(&fresh)
            .send()
            .await
            .map_err(ApiError::from_transport_error)?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            let detail = retried.text().await.unwrap_or_default();
            return Err(ApiError::credential_after_token_reset(detail));
        }
        Ok(retried)
    }
}

#[async_trait]
impl ReportsClient for GoogleReportsClient {
    async fn daily_usage(&self, date: NaiveDate) -> Result<DailyUsage, ApiError> {
        let url = format!(
            "{BASE_URL}/{}?customerId={}&parameters=accounts:num_1day_logins,accounts:num_7day_logins,accounts:num_30day_logins,accounts:used_quota_in_mb",
            date.format("%Y-%m-%d"),
            self.customer,
        );

        let response = self.authed_get(&url).await?;
        let status = response.status();
        let body = response.text().await.map_err(ApiError::from_transport_error)?;
        if !status.is_success() {
            let message = serde_json::from_str::<WireApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ApiError::from_http_status(status.as_u16(), message));
        }

        let parsed: WireUsageReportsList =
            serde_json::from_str(&body).map_err(|e| ApiError::permanent(format!("malformed usage report body: {e}")))?;

        let report = parsed
            .usage_reports
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::transient(format!("no usage report available yet for {date}")))?;

        Ok(DailyUsage {
            date,
            count_1_day_actives: report.int_value("accounts:num_1day_logins").unwrap_or(0),
            count_7_day_actives: report.int_value("accounts:num_7day_logins").unwrap_or(0),
            count_30_day_actives: report.int_value("accounts:num_30day_logins").unwrap_or(0),
            used_quota_mb: report.int_value("accounts:used_quota_in_mb").unwrap_or(0),
        })
    }
}
