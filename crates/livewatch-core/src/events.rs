//! Core events emitted by the engine

use livewatch_api::{SweepReport, WatchedEntity};
use livewatch_util::ChannelId;

/// Events emitted by the watch service
#[derive(Debug, Clone)]
pub enum CoreEvent {
    WatchAdded {
        entity: WatchedEntity,
    },

    WatchRemoved {
        channel_id: ChannelId,
        login: String,
    },

    /// Channel went from offline to live
    WentLive {
        entity: WatchedEntity,
        /// False when the session had already been announced
        notified: bool,
    },

    WentOffline {
        channel_id: ChannelId,
        display_name: String,
    },

    SweepCompleted {
        report: SweepReport,
    },
}
