//! Store trait definitions

use livewatch_api::WatchState;

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // Watch state

    /// Load the persisted watch state. Returns an empty state on first run.
    fn load_state(&self) -> StoreResult<WatchState>;

    /// Replace the persisted watch state in a single write
    fn save_state(&self, state: &WatchState) -> StoreResult<()>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
