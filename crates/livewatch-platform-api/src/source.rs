//! Streaming platform source trait

use async_trait::async_trait;
use livewatch_api::StreamSession;
use livewatch_util::ChannelId;
use thiserror::Error;

/// Errors from a stream source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The handle or id does not exist on the platform. Not retriable.
    #[error("Channel not found: {0}")]
    NotFound(String),

    /// Network failure, bad status, unparseable body, auth refresh failure
    #[error("Transient source error: {0}")]
    Transient(String),
}

impl SourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound(_))
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Profile of a channel as resolved from its login handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelProfile {
    pub id: ChannelId,
    pub login: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Source of live/offline snapshots
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Resolve a login handle to the platform's stable identity
    async fn resolve_channel(&self, handle: &str) -> SourceResult<ChannelProfile>;

    /// Current broadcast of a channel. `None` means offline.
    async fn fetch_live_snapshot(&self, id: &ChannelId) -> SourceResult<Option<StreamSession>>;

    /// Public URL of a channel page
    fn channel_url(&self, login: &str) -> String;

    /// Whether the most recent request to the platform succeeded
    fn is_healthy(&self) -> bool {
        true
    }
}
