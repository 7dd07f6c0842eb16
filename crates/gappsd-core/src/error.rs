//! Error taxonomy (C1): every failure surfaced to the queue manager is
//! classified as permanent, transient, or credential before it crosses a
//! handler/store/client boundary.

use std::fmt;

/// A classified failure. `Credential` is a specialization of `Transient`
/// that the queue manager accounts for separately (§4.6.6).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The request was semantically rejected. No retry.
    #[error("{0}")]
    Permanent(String),
    /// A temporary condition; retry eligible.
    #[error("{0}")]
    Transient(String),
    /// Authentication refusal or challenge; retry eligible but counted
    /// against a distinct, lower threshold.
    #[error("{0}")]
    Credential(String),
}

impl ApiError {
    pub fn permanent(msg: impl Into<String>) -> Self {
        Self::Permanent(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Permanent(m) | ApiError::Transient(m) | ApiError::Credential(m) => m,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Permanent(_) => ErrorKind::Permanent,
            ApiError::Transient(_) => ErrorKind::Transient,
            ApiError::Credential(_) => ErrorKind::Credential,
        }
    }

    /// Maps an HTTP boundary outcome to the taxonomy, per §4.1.
    ///
    /// - 5xx -> Transient
    /// - 4xx other than 401/403 -> Permanent
    /// - 401 -> Transient (caller is expected to have attempted a token
    ///   reset already; a second 401 escalates to Credential)
    /// - 403 -> Credential
    pub fn from_http_status(status: u16, body: impl fmt::Display) -> Self {
        match status {
            401 => ApiError::transient(format!("HTTP 401 (auth refused): {body}")),
            403 => ApiError::credential(format!("HTTP 403 (forbidden): {body}")),
            400..=499 => ApiError::permanent(format!("HTTP {status}: {body}")),
            500..=599 => ApiError::transient(format!("HTTP {status}: {body}")),
            _ => ApiError::transient(format!("HTTP {status}: {body}")),
        }
    }

    /// A 401 seen again after an already-attempted token reset is an
    /// authentication failure proper, not a retryable transient blip.
    pub fn credential_after_token_reset(body: impl fmt::Display) -> Self {
        ApiError::credential(format!("authentication refused after token reset: {body}"))
    }

    /// Network/DNS/unrecognized failures are transient by default —
    /// defensive classification per §4.1.
    pub fn from_transport_error(err: impl fmt::Display) -> Self {
        ApiError::transient(format!("transport error: {err}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Permanent,
    Transient,
    Credential,
}

/// Errors raised by the store boundary (SQL driver wrapper contract): a
/// thin specialization of the same taxonomy as `ApiError`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("transient store error: {0}")]
    Transient(String),
    #[error("permanent store error: {0}")]
    Permanent(String),
    #[error("record already exists: {0}")]
    AlreadyExists(String),
    #[error("record not found: {0}")]
    NotFound(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Transient(m) => ApiError::transient(m),
            StoreError::Permanent(m) => ApiError::permanent(m),
            StoreError::AlreadyExists(m) => ApiError::permanent(m),
            StoreError::NotFound(m) => ApiError::permanent(m),
        }
    }
}

/// Errors raised while instantiating/validating a job from its queue row.
/// These never reach the handler: the scheduler converts them directly
/// via `JobRecord::mark_failed` (the row is permanently lost to dispatch).
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobError {
    #[error("job type '{0}' is undefined")]
    UnknownType(String),
    #[error("invalid job content: {0}")]
    Content(String),
    #[error("invalid job action: {0}")]
    Action(String),
}

impl From<JobError> for ApiError {
    fn from(e: JobError) -> Self {
        ApiError::permanent(e.to_string())
    }
}

/// Configuration-layer errors. Fatal and non-recoverable at startup.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("missing mandatory configuration key '{0}'")]
    Missing(String),
    #[error("invalid value for configuration key '{0}': {1}")]
    Invalid(String, String),
    #[error("failed to read configuration file '{0}': {1}")]
    Io(String, String),
}
