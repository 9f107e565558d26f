//! Validated configuration ready for use by the service

use crate::schema::{RawConfig, RawNotificationsConfig, RawSinkKind, RawTwitchConfig};
use livewatch_util::{RateLimit, DEFAULT_REQUESTS_PER_SECOND};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL_MINUTES: u64 = 5;
pub const DEFAULT_TWITCH_API_BASE_URL: &str = "https://api.twitch.tv/helix";
pub const DEFAULT_TWITCH_AUTH_URL: &str = "https://id.twitch.tv/oauth2/token";
pub const DEFAULT_DISCORD_API_BASE_URL: &str = "https://discord.com/api/v10";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 1280;
pub const DEFAULT_THUMBNAIL_HEIGHT: u32 = 720;

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service: ServiceSettings,
    pub poll: PollSettings,
    pub twitch: TwitchSettings,
    pub notifications: NotificationSettings,
}

impl ServiceConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let service = ServiceSettings {
            socket_path: raw
                .service
                .socket_path
                .unwrap_or_else(livewatch_util::socket_path_without_env),
            data_dir: raw
                .service
                .data_dir
                .unwrap_or_else(livewatch_util::data_dir_without_env),
            rate_limit: RateLimit::per_second(
                raw.service
                    .max_requests_per_second
                    .unwrap_or(DEFAULT_REQUESTS_PER_SECOND),
            ),
        };

        let poll = PollSettings {
            interval: Duration::from_secs(
                raw.poll
                    .interval_minutes
                    .unwrap_or(DEFAULT_POLL_INTERVAL_MINUTES)
                    * 60,
            ),
        };

        Self {
            service,
            poll,
            twitch: TwitchSettings::from_raw(raw.twitch),
            notifications: NotificationSettings::from_raw(raw.notifications),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    /// Per-client IPC request budget
    pub rate_limit: RateLimit,
}

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct TwitchSettings {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub api_base_url: String,
    pub auth_url: String,
    pub request_timeout: Duration,
}

impl TwitchSettings {
    fn from_raw(raw: RawTwitchConfig) -> Self {
        Self {
            client_id: raw.client_id,
            client_secret: raw.client_secret,
            api_base_url: raw
                .api_base_url
                .unwrap_or_else(|| DEFAULT_TWITCH_API_BASE_URL.to_string()),
            auth_url: raw
                .auth_url
                .unwrap_or_else(|| DEFAULT_TWITCH_AUTH_URL.to_string()),
            request_timeout: Duration::from_secs(
                raw.request_timeout_seconds
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS),
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub sink: SinkSettings,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}

impl NotificationSettings {
    fn from_raw(raw: RawNotificationsConfig) -> Self {
        let sink = match raw.kind {
            RawSinkKind::DiscordBot => SinkSettings::DiscordBot {
                bot_token: raw.bot_token,
                api_base_url: raw
                    .api_base_url
                    .unwrap_or_else(|| DEFAULT_DISCORD_API_BASE_URL.to_string()),
            },
            RawSinkKind::Webhook => SinkSettings::Webhook { urls: raw.webhooks },
        };

        Self {
            sink,
            thumbnail_width: raw.thumbnail_width.unwrap_or(DEFAULT_THUMBNAIL_WIDTH),
            thumbnail_height: raw.thumbnail_height.unwrap_or(DEFAULT_THUMBNAIL_HEIGHT),
        }
    }
}

/// Where notifications are delivered
#[derive(Debug, Clone)]
pub enum SinkSettings {
    DiscordBot {
        /// None until supplied by the environment
        bot_token: Option<String>,
        api_base_url: String,
    },
    Webhook {
        urls: Vec<String>,
    },
}

impl SinkSettings {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SinkSettings::DiscordBot { .. } => "discord_bot",
            SinkSettings::Webhook { .. } => "webhook",
        }
    }
}
