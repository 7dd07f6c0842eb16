//! Directory API client contract (external collaborator, referenced at
//! its contract only — the real HTTP implementation lives in
//! `gappsd-google`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteUser {
    pub primary_email: String,
    pub given_name: String,
    pub family_name: String,
    pub is_admin: bool,
    pub suspended: bool,
    pub suspension_reason: Option<String>,
    pub creation_time: Option<DateTime<Utc>>,
    pub password_sha1: Option<String>,
}

impl RemoteUser {
    pub fn username(&self) -> &str {
        self.primary_email
            .split('@')
            .next()
            .unwrap_or(&self.primary_email)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteUserPatch {
    pub is_admin: Option<bool>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub password_sha1: Option<String>,
    pub suspended: Option<bool>,
}

impl RemoteUserPatch {
    pub fn empty() -> Self {
        Self {
            is_admin: None,
            given_name: None,
            family_name: None,
            password_sha1: None,
            suspended: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAlias {
    pub alias: String,
}

#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Returns `Ok(None)` on a 404 — "absent", not a permanent error
    /// (§4.5, "treat 404 on retrieve as absent").
    async fn retrieve_user(&self, username: &str) -> Result<Option<RemoteUser>, ApiError>;

    async fn create_user(&self, user: &RemoteUser) -> Result<RemoteUser, ApiError>;

    async fn update_user(&self, username: &str, patch: &RemoteUserPatch) -> Result<RemoteUser, ApiError>;

    async fn delete_user(&self, username: &str) -> Result<(), ApiError>;

    async fn retrieve_aliases(&self, username: &str) -> Result<Vec<RemoteAlias>, ApiError>;

    async fn create_alias(&self, username: &str, alias: &str) -> Result<(), ApiError>;

    async fn delete_alias(&self, username: &str, alias: &str) -> Result<(), ApiError>;

    /// Enumerates every user in the domain, alongside their aliases, for
    /// `alias-resync` and `account-report` (paged internally).
    async fn list_all_users(&self) -> Result<Vec<RemoteUser>, ApiError>;

    /// Enumerates `(username, aliases)` for every user, for `alias-resync`.
    async fn list_all_aliases(&self) -> Result<Vec<(String, Vec<RemoteAlias>)>, ApiError>;
}
