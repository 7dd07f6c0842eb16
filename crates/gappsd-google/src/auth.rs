//! Service-account JWT auth (domain-wide delegation): the daemon signs its
//! own bearer assertion with the service account's private key and trades
//! it for a short-lived OAuth2 access token, impersonating
//! `gapps.oauth2-user`.

use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use gappsd_core::error::ApiError;

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Refresh this far ahead of actual expiry so a request never races a
/// token that expires mid-flight.
const EXPIRY_SKEW: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    sub: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// One set of domain-wide-delegation credentials, shared by the directory
/// and reports clients (each uses its own scope, so each holds its own
/// cached token).
pub struct ServiceAccountAuth {
    client_email: String,
    signing_key: EncodingKey,
    subject: String,
    scope: &'static str,
    cached: RwLock<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(client_email: impl Into<String>, private_key_pem: &str, subject: impl Into<String>, scope: &'static str) -> Result<Self, ApiError> {
        let signing_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| ApiError::permanent(format!("invalid service account private key: {e}")))?;
        Ok(Self {
            client_email: client_email.into(),
            signing_key,
            subject: subject.into(),
            scope,
            cached: RwLock::new(None),
        })
    }

    pub async fn bearer_token(&self, http: &reqwest::Client) -> Result<String, ApiError> {
        if let Some(token) = self.cached.read().await.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.access_token.clone());
            }
        }
        self.refresh(http).await
    }

    /// Forces a new token even if the cached one looks unexpired. Called
    /// after a second consecutive 401 (§4.1): the cached token may be
    /// stale from the server's point of view even though our clock thinks
    /// it's still valid.
    pub async fn refresh(&self, http: &reqwest::Client) -> Result<String, ApiError> {
        let mut guard = self.cached.write().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.access_token.clone());
            }
        }

        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: self.scope,
            aud: TOKEN_ENDPOINT,
            sub: &self.subject,
            iat: now,
            exp: now + 3600,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| ApiError::permanent(format!("failed to sign service account assertion: {e}")))?;

        let response = http
            .post(TOKEN_ENDPOINT)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", &assertion)])
            .send()
            .await
            .map_err(ApiError::from_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let description = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| format!("{}: {}", e.error, e.error_description))
                .unwrap_or(body);
            return Err(if status.as_u16() == 401 || status.as_u16() == 403 {
                ApiError::credential(description)
            } else {
                ApiError::from_http_status(status.as_u16(), description)
            });
        }

        let parsed: TokenResponse = response.json().await.map_err(ApiError::from_transport_error)?;
        let expires_at = Instant::now() + Duration::from_secs(parsed.expires_in).saturating_sub(EXPIRY_SKEW);
        *guard = Some(CachedToken {
            access_token: parsed.access_token.clone(),
            expires_at,
        });
        Ok(parsed.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_an_invalid_private_key() {
        let result = ServiceAccountAuth::new(
            "svc@example.iam.gserviceaccount.com",
            "not a real PEM",
            "admin@example.org",
            crate::DIRECTORY_SCOPE,
        );
        assert!(result.is_err());
    }

    /// A still-fresh cached token short-circuits `bearer_token` entirely:
    /// no token endpoint call, no dependency on a real signing key.
    #[tokio::test]
    async fn bearer_token_returns_the_cached_token_without_refreshing() {
        let auth = ServiceAccountAuth {
            client_email: "svc@example.iam.gserviceaccount.com".into(),
            signing_key: EncodingKey::from_secret(b"unused-in-this-test"),
            subject: "admin@example.org".into(),
            scope: crate::DIRECTORY_SCOPE,
            cached: RwLock::new(Some(CachedToken {
                access_token: "cached-token".into(),
                expires_at: Instant::now() + Duration::from_secs(300),
            })),
        };

        let http = reqwest::Client::new();
        let token = auth.bearer_token(&http).await.unwrap();
        assert_eq!(token, "cached-token");
    }
}
