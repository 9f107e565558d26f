//! Twitch Helix stream source

use async_trait::async_trait;
use livewatch_api::StreamSession;
use livewatch_platform_api::{ChannelProfile, SourceError, SourceResult, StreamSource};
use livewatch_util::ChannelId;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::TokenCache;

pub const TWITCH_CHANNEL_BASE_URL: &str = "https://www.twitch.tv";

/// Connection settings for the Helix API
#[derive(Debug, Clone)]
pub struct TwitchConfig {
    pub client_id: String,
    pub client_secret: String,
    /// e.g. `https://api.twitch.tv/helix`
    pub api_base_url: String,
    /// e.g. `https://id.twitch.tv/oauth2/token`
    pub auth_url: String,
    pub request_timeout: Duration,
}

/// Stream source backed by the Helix `users` and `streams` endpoints
pub struct TwitchSource {
    client: Client,
    api_base_url: String,
    client_id: String,
    tokens: TokenCache,
    healthy: AtomicBool,
}

#[derive(Debug, Deserialize)]
struct HelixPage<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct HelixUser {
    id: String,
    login: String,
    display_name: String,
    #[serde(default)]
    profile_image_url: String,
}

#[derive(Debug, Deserialize)]
struct HelixStream {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    game_name: String,
    #[serde(default)]
    viewer_count: u64,
    #[serde(default)]
    started_at: Option<String>,
    #[serde(default)]
    thumbnail_url: String,
}

impl TwitchSource {
    pub fn new(config: TwitchConfig) -> reqwest::Result<Self> {
        let client = crate::http_client(config.request_timeout)?;
        let tokens = TokenCache::new(
            client.clone(),
            config.auth_url,
            config.client_id.clone(),
            config.client_secret,
        );

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id,
            tokens,
            healthy: AtomicBool::new(true),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> SourceResult<HelixPage<T>> {
        let result = self.get_inner(endpoint, query).await;
        self.healthy.store(result.is_ok(), Ordering::Relaxed);
        result
    }

    async fn get_inner<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> SourceResult<HelixPage<T>> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/{}", self.api_base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(query)
            .header("Client-Id", &self.client_id)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| SourceError::Transient(format!("GET {} failed: {}", endpoint, e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
            return Err(SourceError::Transient(format!(
                "GET {} unauthorized, token invalidated",
                endpoint
            )));
        }
        if !status.is_success() {
            return Err(SourceError::Transient(format!(
                "GET {} returned {}",
                endpoint, status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::Transient(format!("GET {} unparseable: {}", endpoint, e)))
    }
}

#[async_trait]
impl StreamSource for TwitchSource {
    async fn resolve_channel(&self, handle: &str) -> SourceResult<ChannelProfile> {
        let login = normalize_handle(handle).ok_or_else(|| SourceError::NotFound(handle.into()))?;

        let page: HelixPage<HelixUser> = self.get("users", &[("login", login.as_str())]).await?;
        let profile = page
            .data
            .into_iter()
            .next()
            .map(profile_from_user)
            .ok_or_else(|| SourceError::NotFound(handle.into()))?;

        debug!(login = %profile.login, channel_id = %profile.id, "Resolved channel");
        Ok(profile)
    }

    async fn fetch_live_snapshot(&self, id: &ChannelId) -> SourceResult<Option<StreamSession>> {
        let page: HelixPage<HelixStream> = self.get("streams", &[("user_id", id.as_str())]).await?;
        Ok(session_from_streams(page.data))
    }

    fn channel_url(&self, login: &str) -> String {
        format!("{}/{}", TWITCH_CHANNEL_BASE_URL, login)
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}

/// Reduce user input to a Twitch login.
///
/// Accepts `name`, `@name` and channel URLs. Returns `None` for anything
/// that cannot be a login (logins are 1-25 of `[a-z0-9_]`).
pub fn normalize_handle(handle: &str) -> Option<String> {
    let mut login = handle.trim();
    for prefix in ["https://", "http://", "www.", "twitch.tv/"] {
        if let Some(rest) = login.strip_prefix(prefix) {
            login = rest;
        }
    }
    let login = login.trim_start_matches('@').trim_end_matches('/');

    let valid = !login.is_empty()
        && login.len() <= 25
        && login
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    valid.then(|| login.to_ascii_lowercase())
}

fn profile_from_user(user: HelixUser) -> ChannelProfile {
    ChannelProfile {
        id: ChannelId::new(user.id),
        login: user.login,
        display_name: user.display_name,
        avatar_url: (!user.profile_image_url.is_empty()).then_some(user.profile_image_url),
    }
}

fn session_from_streams(streams: Vec<HelixStream>) -> Option<StreamSession> {
    let stream = streams.into_iter().find(|s| s.kind == "live")?;

    let started_at = match stream.started_at.as_deref() {
        Some(raw) => {
            let parsed = livewatch_util::parse_timestamp(raw);
            if parsed.is_none() {
                warn!(started_at = %raw, "Unparseable stream start time");
            }
            parsed
        }
        None => None,
    };

    Some(StreamSession {
        title: stream.title,
        category: stream.game_name,
        viewer_count: stream.viewer_count,
        thumbnail_url_template: stream.thumbnail_url,
        started_at,
    })
}
