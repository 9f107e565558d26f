//! Shared types for the livewatch API

use chrono::{DateTime, Utc};
use livewatch_util::ChannelId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Metadata of one live broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSession {
    pub title: String,
    pub category: String,
    pub viewer_count: u64,
    /// Thumbnail URL with `{width}` and `{height}` placeholders
    pub thumbnail_url_template: String,
    /// When the broadcast started. Identifies the session for deduplication.
    pub started_at: Option<DateTime<Utc>>,
}

impl StreamSession {
    /// Resolve the thumbnail template to a concrete size
    pub fn thumbnail_url(&self, width: u32, height: u32) -> String {
        self.thumbnail_url_template
            .replace("{width}", &width.to_string())
            .replace("{height}", &height.to_string())
    }
}

/// Last-known live state of a watched channel.
///
/// Session metadata exists only while live.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "session", rename_all = "snake_case")]
pub enum LiveState {
    #[default]
    Offline,
    Live(StreamSession),
}

impl LiveState {
    pub fn is_live(&self) -> bool {
        matches!(self, LiveState::Live(_))
    }

    pub fn session(&self) -> Option<&StreamSession> {
        match self {
            LiveState::Live(session) => Some(session),
            LiveState::Offline => None,
        }
    }
}

impl From<Option<StreamSession>> for LiveState {
    fn from(snapshot: Option<StreamSession>) -> Self {
        match snapshot {
            Some(session) => LiveState::Live(session),
            None => LiveState::Offline,
        }
    }
}

/// A channel whose live status is monitored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedEntity {
    pub id: ChannelId,
    /// Login handle used in commands and channel URLs
    pub login: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub state: LiveState,
}

impl WatchedEntity {
    pub fn is_live(&self) -> bool {
        self.state.is_live()
    }

    pub fn current_stream(&self) -> Option<&StreamSession> {
        self.state.session()
    }
}

/// Everything livewatch persists: the watch list and the dedup ledger.
///
/// Written wholesale on every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WatchState {
    /// Watched channels in insertion order
    #[serde(default)]
    pub watches: Vec<WatchedEntity>,
    /// Channel -> timestamp recorded at its last notification
    #[serde(default)]
    pub ledger: BTreeMap<ChannelId, DateTime<Utc>>,
}

/// How a sweep was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepTrigger {
    /// Process start
    Startup,
    /// Recurring timer
    Timer,
    /// Explicit `check_now` command
    Command,
}

/// A per-channel failure during a sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub channel_id: ChannelId,
    pub login: String,
    pub error: String,
}

/// Outcome of one full pass over the watch list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub trigger: SweepTrigger,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub checked: usize,
    /// Channels live at the end of the sweep
    pub live: Vec<WatchedEntity>,
    /// Channels a notification was dispatched for
    pub notified: Vec<ChannelId>,
    pub failures: Vec<SweepFailure>,
}

/// Role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// Same user as the service (or root) - may change the watch list
    Admin,
    /// Read-only observer
    Observer,
}

impl ClientRole {
    pub fn can_modify_watches(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }

    pub fn can_trigger_sweep(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub store_ok: bool,
    pub source_ok: bool,
    pub watch_count: usize,
    pub last_sweep: Option<DateTime<Utc>>,
}
