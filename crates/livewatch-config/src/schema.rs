//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global service settings
    #[serde(default)]
    pub service: RawServiceConfig,

    #[serde(default)]
    pub poll: RawPollConfig,

    pub twitch: RawTwitchConfig,

    pub notifications: RawNotificationsConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path
    pub socket_path: Option<PathBuf>,

    /// Data directory for the store
    pub data_dir: Option<PathBuf>,

    /// IPC requests each client may send per second
    pub max_requests_per_second: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPollConfig {
    /// Minutes between sweeps
    pub interval_minutes: Option<u64>,
}

/// Twitch Helix credentials and endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawTwitchConfig {
    pub client_id: String,

    /// May instead be supplied via the environment
    pub client_secret: Option<String>,

    pub api_base_url: Option<String>,

    pub auth_url: Option<String>,

    pub request_timeout_seconds: Option<u64>,
}

/// Notification sink selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawNotificationsConfig {
    pub kind: RawSinkKind,

    /// Discord bot token (discord_bot only). May instead be supplied via the environment.
    pub bot_token: Option<String>,

    /// Discord API base URL (discord_bot only)
    pub api_base_url: Option<String>,

    /// Webhook URLs (webhook only)
    #[serde(default)]
    pub webhooks: Vec<String>,

    pub thumbnail_width: Option<u32>,

    pub thumbnail_height: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RawSinkKind {
    /// Post into the first writable text channel of every guild the bot is in
    DiscordBot,
    /// Post to a fixed list of webhooks
    Webhook,
}
