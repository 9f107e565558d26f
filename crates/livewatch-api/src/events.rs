//! Event types for livewatch -> client streaming

use chrono::{DateTime, Utc};
use livewatch_util::ChannelId;
use serde::{Deserialize, Serialize};

use crate::{SweepTrigger, WatchedEntity, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: livewatch_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    WatchAdded {
        entity: WatchedEntity,
    },

    WatchRemoved {
        channel_id: ChannelId,
        login: String,
    },

    /// Channel transitioned offline -> live
    WentLive {
        entity: WatchedEntity,
        /// False when the session was already notified before
        notified: bool,
    },

    WentOffline {
        channel_id: ChannelId,
        display_name: String,
    },

    SweepCompleted {
        trigger: SweepTrigger,
        checked: usize,
        live: usize,
        failed: usize,
    },
}
