//! Audit event types

use chrono::{DateTime, Utc};
use livewatch_api::SweepTrigger;
use livewatch_util::ChannelId;
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    ServiceStarted,

    ServiceStopped,

    WatchAdded {
        channel_id: ChannelId,
        login: String,
    },

    WatchRemoved {
        channel_id: ChannelId,
        login: String,
    },

    /// Notification dispatched to the sink
    NotificationSent {
        channel_id: ChannelId,
        session_started_at: Option<DateTime<Utc>>,
        delivered: usize,
        failed: usize,
    },

    /// Went live, but this session was already notified
    NotificationSuppressed {
        channel_id: ChannelId,
        session_started_at: Option<DateTime<Utc>>,
        last_notified: DateTime<Utc>,
    },

    SweepCompleted {
        trigger: SweepTrigger,
        checked: usize,
        live: usize,
        failed: usize,
    },

    ClientConnected {
        client_id: String,
        role: String,
        uid: Option<u32>,
    },

    ClientDisconnected {
        client_id: String,
    },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Row ID, assigned by the store
    pub id: i64,

    pub timestamp: DateTime<Utc>,

    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0,
            timestamp: livewatch_util::now(),
            event,
        }
    }
}
