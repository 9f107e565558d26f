//! Go-live announcement payload

use chrono::{DateTime, Utc};
use livewatch_api::{StreamSession, WatchedEntity};

/// Everything a sink needs to announce a live session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveNotification {
    pub display_name: String,
    pub login: String,
    pub url: String,
    pub title: String,
    pub category: String,
    pub viewer_count: u64,
    /// Thumbnail with the size placeholders substituted
    pub thumbnail_url: String,
    pub avatar_url: Option<String>,
    pub session_start: Option<DateTime<Utc>>,
}

impl LiveNotification {
    pub fn new(
        entity: &WatchedEntity,
        session: &StreamSession,
        url: String,
        thumbnail_width: u32,
        thumbnail_height: u32,
    ) -> Self {
        Self {
            display_name: entity.display_name.clone(),
            login: entity.login.clone(),
            url,
            title: session.title.clone(),
            category: session.category.clone(),
            viewer_count: session.viewer_count,
            thumbnail_url: session.thumbnail_url(thumbnail_width, thumbnail_height),
            avatar_url: entity.avatar_url.clone(),
            session_start: session.started_at,
        }
    }

    /// One-line announcement text
    pub fn headline(&self) -> String {
        format!("{} is now live!", self.display_name)
    }
}
