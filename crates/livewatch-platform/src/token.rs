//! Twitch app access token cache

use chrono::{DateTime, Utc};
use livewatch_platform_api::{SourceError, SourceResult};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Tokens are refreshed this long before they actually expire
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// An app access token and its expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Fails if `expires_in` does not describe a representable expiry
    pub fn from_response(response: AppTokenResponse, now: DateTime<Utc>) -> SourceResult<Self> {
        let expires_at = i64::try_from(response.expires_in)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                SourceError::Transient(format!(
                    "token expires_in out of range: {}",
                    response.expires_in
                ))
            })?;

        Ok(Self {
            access_token: response.access_token,
            expires_at,
        })
    }

    /// Usable at `now`, leaving the refresh margin
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// Body of a client-credentials token grant
#[derive(Debug, Clone, Deserialize)]
pub struct AppTokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

/// Owns the app access token for one client id.
///
/// Concurrent callers share a single refresh.
pub struct TokenCache {
    client: Client,
    auth_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(client: Client, auth_url: String, client_id: String, client_secret: String) -> Self {
        Self {
            client,
            auth_url,
            client_id,
            client_secret,
            cached: Mutex::new(None),
        }
    }

    /// A valid access token, requesting a new one if the cached one is
    /// missing or about to expire
    pub async fn access_token(&self) -> SourceResult<String> {
        let mut cached = self.cached.lock().await;
        let now = livewatch_util::now();

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(now) {
                return Ok(token.access_token.clone());
            }
            debug!(expires_at = %token.expires_at, "App access token expiring, refreshing");
        }

        let token = self.request_token(now).await?;
        info!(expires_at = %token.expires_at, "Obtained app access token");
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Drop the cached token so the next call requests a new one
    pub async fn invalidate(&self) {
        if self.cached.lock().await.take().is_some() {
            warn!("App access token rejected, invalidated");
        }
    }

    async fn request_token(&self, now: DateTime<Utc>) -> SourceResult<CachedToken> {
        let response = self
            .client
            .post(&self.auth_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| SourceError::Transient(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Transient(format!(
                "token request returned {}",
                status
            )));
        }

        let body: AppTokenResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Transient(format!("invalid token response: {}", e)))?;

        CachedToken::from_response(body, now)
    }
}
