//! Notification policy
//!
//! Decides, per channel and per sweep, what a fresh snapshot means given the
//! last-known state and the dedup ledger. Pure: no I/O, no clock.

use chrono::{DateTime, Utc};
use livewatch_api::StreamSession;

/// What to do with one channel's snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Offline before and after
    StayedOffline,
    /// New session: store live state, announce, record in the ledger
    Notify,
    /// Went live, but this session was already announced
    Suppress { last_notified: DateTime<Utc> },
    /// Still live, refresh metadata
    Refresh,
    /// Live before, offline now
    WentOffline,
}

impl Decision {
    pub fn is_notify(&self) -> bool {
        matches!(self, Decision::Notify)
    }
}

/// Evaluate one snapshot.
///
/// A session is announced at most once: a new notification requires its
/// start to be strictly later than the last recorded one. A live snapshot
/// without a start time is always announced.
pub fn evaluate(
    prev_live: bool,
    snapshot: Option<&StreamSession>,
    last_notified: Option<DateTime<Utc>>,
) -> Decision {
    match (prev_live, snapshot) {
        (false, None) => Decision::StayedOffline,
        (true, None) => Decision::WentOffline,
        (true, Some(_)) => Decision::Refresh,
        (false, Some(session)) => match (session.started_at, last_notified) {
            (Some(started_at), Some(last_notified)) if started_at <= last_notified => {
                Decision::Suppress { last_notified }
            }
            _ => Decision::Notify,
        },
    }
}

/// Ledger value to record after a notification: the session start, or the
/// dispatch time when the platform did not report one
pub fn ledger_timestamp(
    session_start: Option<DateTime<Utc>>,
    dispatched_at: DateTime<Utc>,
) -> DateTime<Utc> {
    session_start.unwrap_or(dispatched_at)
}
