//! Watch registry: watched channels and the dedup ledger

use chrono::{DateTime, Utc};
use livewatch_api::{LiveState, WatchState, WatchedEntity};
use livewatch_store::{Store, StoreResult};
use livewatch_util::ChannelId;
use std::sync::Arc;
use tracing::debug;

/// In-memory view of the persisted [`WatchState`].
///
/// Every mutation is written through to the store as one snapshot. A
/// mutation whose write fails is not applied.
pub struct WatchRegistry {
    state: WatchState,
    store: Arc<dyn Store>,
}

impl WatchRegistry {
    /// Load the registry from the store. An absent snapshot is an empty registry.
    pub fn load(store: Arc<dyn Store>) -> StoreResult<Self> {
        let mut state = store.load_state()?;

        // Ledger entries for untracked channels are dropped
        let known: Vec<ChannelId> = state.watches.iter().map(|w| w.id.clone()).collect();
        state.ledger.retain(|id, _| known.contains(id));

        Ok(Self { state, store })
    }

    /// Start tracking a channel. Returns false, changing nothing, if it is
    /// already tracked. New entries always start offline.
    pub fn add(&mut self, mut entity: WatchedEntity) -> StoreResult<bool> {
        if self.contains(&entity.id) {
            return Ok(false);
        }

        entity.state = LiveState::Offline;
        let mut next = self.state.clone();
        next.watches.push(entity);
        self.commit(next)?;
        Ok(true)
    }

    /// Stop tracking a channel and forget its ledger entry. Returns true iff
    /// it was tracked.
    pub fn remove(&mut self, id: &ChannelId) -> StoreResult<bool> {
        if !self.contains(id) {
            return Ok(false);
        }

        let mut next = self.state.clone();
        next.watches.retain(|w| &w.id != id);
        next.ledger.remove(id);
        self.commit(next)?;
        Ok(true)
    }

    /// All watched channels, in insertion order
    pub fn list(&self) -> Vec<WatchedEntity> {
        self.state.watches.clone()
    }

    pub fn get(&self, id: &ChannelId) -> Option<&WatchedEntity> {
        self.state.watches.iter().find(|w| &w.id == id)
    }

    pub fn contains(&self, id: &ChannelId) -> bool {
        self.get(id).is_some()
    }

    /// Case-insensitive lookup by login handle
    pub fn find_by_login(&self, handle: &str) -> Option<&WatchedEntity> {
        self.state
            .watches
            .iter()
            .find(|w| w.login.eq_ignore_ascii_case(handle))
    }

    /// Replace a channel's live state (status and session metadata together).
    /// Returns the updated entity, or `None` if the channel is not tracked.
    pub fn set_live_state(
        &mut self,
        id: &ChannelId,
        state: LiveState,
    ) -> StoreResult<Option<WatchedEntity>> {
        let Some(idx) = self.state.watches.iter().position(|w| &w.id == id) else {
            return Ok(None);
        };

        if self.state.watches[idx].state == state {
            return Ok(Some(self.state.watches[idx].clone()));
        }

        let mut next = self.state.clone();
        next.watches[idx].state = state;
        let updated = next.watches[idx].clone();
        self.commit(next)?;
        Ok(Some(updated))
    }

    /// Record that a channel was notified. Ignored for untracked channels.
    pub fn record_notification(&mut self, id: &ChannelId, at: DateTime<Utc>) -> StoreResult<()> {
        if !self.contains(id) || self.state.ledger.get(id) == Some(&at) {
            return Ok(());
        }

        let mut next = self.state.clone();
        next.ledger.insert(id.clone(), at);
        self.commit(next)
    }

    /// Apply a live state and its ledger entry in a single write. Returns
    /// `None`, changing nothing, if the channel is not tracked.
    pub fn set_live_state_and_record(
        &mut self,
        id: &ChannelId,
        state: LiveState,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<WatchedEntity>> {
        let Some(idx) = self.state.watches.iter().position(|w| &w.id == id) else {
            return Ok(None);
        };

        let mut next = self.state.clone();
        next.watches[idx].state = state;
        next.ledger.insert(id.clone(), at);
        let updated = next.watches[idx].clone();
        self.commit(next)?;
        Ok(Some(updated))
    }

    pub fn last_notified(&self, id: &ChannelId) -> Option<DateTime<Utc>> {
        self.state.ledger.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.state.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.watches.is_empty()
    }

    /// Current persisted state
    pub fn state(&self) -> &WatchState {
        &self.state
    }

    fn commit(&mut self, next: WatchState) -> StoreResult<()> {
        self.store.save_state(&next)?;
        self.state = next;
        debug!(
            watch_count = self.state.watches.len(),
            ledger_entries = self.state.ledger.len(),
            "Registry persisted"
        );
        Ok(())
    }
}
