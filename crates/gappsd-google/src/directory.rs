//! `DirectoryClient` over the Google Workspace Admin SDK Directory API.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use gappsd_core::directory::{DirectoryClient, RemoteAlias, RemoteUser, RemoteUserPatch};
use gappsd_core::error::ApiError;

use crate::auth::ServiceAccountAuth;
use crate::wire::{WireAlias, WireAliasesList, WireApiError, WireName, WireUser, WireUsersList};

const BASE_URL: &str = "https://admin.googleapis.com/admin/directory/v1";
const MAX_RESULTS: u32 = 500;

pub struct GoogleDirectoryClient {
    http: reqwest::Client,
    auth: Arc<ServiceAccountAuth>,
    domain: String,
    customer: String,
}

impl GoogleDirectoryClient {
    pub fn new(http: reqwest::Client, auth: Arc<ServiceAccountAuth>, domain: impl Into<String>, customer: impl Into<String>) -> Self {
        Self {
            http,
            auth,
            domain: domain.into(),
            customer: customer.into(),
        }
    }

    fn qualify(&self, username: &str) -> String {
        if username.contains('@') {
            username.to_string()
        } else {
            format!("{username}@{}", self.domain)
        }
    }

    /// Issues one authenticated request, retrying exactly once on a 401
    /// after forcing a fresh token (§4.1: a second 401 is a credential
    /// failure, not a transient blip).
    async fn authed(&self, method: Method, url: &str, body: Option<&Value>) -> Result<reqwest::Response, ApiError> {
        let token = self.auth.bearer_token(&self.http).await?;
        let response = self.send_once(method.clone(), url, body, &token).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let fresh = self.auth.refresh(&self.http).await?;
        let retried = self.send_once(method, url, body, &fresh).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            let detail = retried.text().await.unwrap_or_default();
            return Err(ApiError::credential_after_token_reset(detail));
        }
        Ok(retried)
    }

    async fn send_once(&self, method: Method, url: &str, body: Option<&Value>, token: &str) -> Result<reqwest::Response, ApiError> {
        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(ApiError::from_transport_error)
    }

    async fn parse_ok<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await.map_err(ApiError::from_transport_error)?;
        if !status.is_success() {
            return Err(classify_error(status, &body));
        }
        serde_json::from_str(&body).map_err(|e| ApiError::permanent(format!("malformed response body: {e}")))
    }
}

fn classify_error(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<WireApiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    ApiError::from_http_status(status.as_u16(), message)
}

fn to_remote_user(user: WireUser) -> RemoteUser {
    RemoteUser {
        primary_email: user.primary_email,
        given_name: user.name.given_name,
        family_name: user.name.family_name,
        is_admin: user.is_admin,
        suspended: user.suspended,
        suspension_reason: user.suspension_reason,
        creation_time: user
            .creation_time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc)),
        password_sha1: None,
    }
}

#[async_trait]
impl DirectoryClient for GoogleDirectoryClient {
    async fn retrieve_user(&self, username: &str) -> Result<Option<RemoteUser>, ApiError> {
        let url = format!("{BASE_URL}/users/{}", self.qualify(username));
        let response = self.authed(Method::GET, &url, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let user: WireUser = Self::parse_ok(response).await?;
        Ok(Some(to_remote_user(user)))
    }

    async fn create_user(&self, user: &RemoteUser) -> Result<RemoteUser, ApiError> {
        let body = serde_json::json!({
            "primaryEmail": self.qualify(&user.primary_email),
            "name": { "givenName": user.given_name, "familyName": user.family_name },
            "password": user.password_sha1,
            "hashFunction": "SHA-1",
            "suspended": user.suspended,
        });
        let url = format!("{BASE_URL}/users");
        let response = self.authed(Method::POST, &url, Some(&body)).await?;
        let created: WireUser = Self::parse_ok(response).await?;
        Ok(to_remote_user(created))
    }

    async fn update_user(&self, username: &str, patch: &RemoteUserPatch) -> Result<RemoteUser, ApiError> {
        let current = self
            .retrieve_user(username)
            .await?
            .ok_or_else(|| ApiError::permanent(format!("user '{username}' disappeared before update could be applied")))?;

        let wire = WireUser {
            primary_email: self.qualify(username),
            name: WireName {
                given_name: patch.given_name.clone().unwrap_or(current.given_name),
                family_name: patch.family_name.clone().unwrap_or(current.family_name),
            },
            is_admin: patch.is_admin.unwrap_or(current.is_admin),
            suspended: patch.suspended.unwrap_or(current.suspended),
            suspension_reason: current.suspension_reason,
            creation_time: None,
            password: patch.password_sha1.clone(),
            hash_function: patch.password_sha1.as_ref().map(|_| "SHA-1".to_string()),
        };

        let url = format!("{BASE_URL}/users/{}", self.qualify(username));
        let response = self.authed(Method::PUT, &url, Some(&serde_json::to_value(&wire).unwrap())).await?;
        let updated: WireUser = Self::parse_ok(response).await?;
        Ok(to_remote_user(updated))
    }

    async fn delete_user(&self, username: &str) -> Result<(), ApiError> {
        let url = format!("{BASE_URL}/users/{}", self.qualify(username));
        let response = self.authed(Method::DELETE, &url, None).await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }
        Ok(())
    }

    async fn retrieve_aliases(&self, username: &str) -> Result<Vec<RemoteAlias>, ApiError> {
        let url = format!("{BASE_URL}/users/{}/aliases", self.qualify(username));
        let response = self.authed(Method::GET, &url, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let list: WireAliasesList = Self::parse_ok(response).await?;
        Ok(list
            .aliases
            .into_iter()
            .map(|a| RemoteAlias {
                alias: a.alias.split('@').next().unwrap_or(&a.alias).to_string(),
            })
            .collect())
    }

    async fn create_alias(&self, username: &str, alias: &str) -> Result<(), ApiError> {
        let url = format!("{BASE_URL}/users/{}/aliases", self.qualify(username));
        let body = serde_json::to_value(WireAlias { alias: self.qualify(alias) }).unwrap();
        let response = self.authed(Method::POST, &url, Some(&body)).await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }
        Ok(())
    }

    async fn delete_alias(&self, username: &str, alias: &str) -> Result<(), ApiError> {
        let url = format!("{BASE_URL}/users/{}/aliases/{}", self.qualify(username), self.qualify(alias));
        let response = self.authed(Method::DELETE, &url, None).await?;
        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }
        Ok(())
    }

    async fn list_all_users(&self) -> Result<Vec<RemoteUser>, ApiError> {
        let mut users = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!("{BASE_URL}/users?customer={}&maxResults={MAX_RESULTS}", self.customer);
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={token}"));
            }
            let response = self.authed(Method::GET, &url, None).await?;
            let page: WireUsersList = Self::parse_ok(response).await?;
            users.extend(page.users.into_iter().map(to_remote_user));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(users)
    }

    async fn list_all_aliases(&self) -> Result<Vec<(String, Vec<RemoteAlias>)>, ApiError> {
        let users = self.list_all_users().await?;
        let mut result = Vec::with_capacity(users.len());
        for user in users {
            let username = user.username().to_string();
            let aliases = self.retrieve_aliases(&username).await?;
            if !aliases.is_empty() {
                result.push((username, aliases));
            }
        }
        Ok(result)
    }
}
