//! Command-facing watch service

use livewatch_api::{HealthStatus, LiveState, SweepReport, SweepTrigger, WatchedEntity};
use livewatch_platform_api::{NotificationSink, SourceError, StreamSource};
use livewatch_store::{AuditEvent, AuditEventType, Store, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

use crate::{CoreEvent, NotificationFormat, Sweeper, WatchRegistry};

/// Errors surfaced to command callers
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("No channel named '{0}'")]
    NotFound(String),

    #[error("Streaming platform unavailable: {0}")]
    TransientFetch(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<SourceError> for WatchError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::NotFound(handle) => WatchError::NotFound(handle),
            SourceError::Transient(msg) => WatchError::TransientFetch(msg),
        }
    }
}

pub type WatchResult<T> = Result<T, WatchError>;

/// Result of `add_watch`. `added` is false if the channel was already tracked,
/// in which case `entity` is the existing entry.
#[derive(Debug, Clone)]
pub struct AddOutcome {
    pub added: bool,
    pub entity: WatchedEntity,
}

/// Result of `remove_watch`. `entity` is the entry that was removed.
#[derive(Debug, Clone)]
pub struct RemoveOutcome {
    pub removed: bool,
    pub entity: Option<WatchedEntity>,
}

/// Owns the registry and the sweeper, and serves commands
pub struct WatchService {
    registry: Mutex<WatchRegistry>,
    sweeper: Sweeper,
    source: Arc<dyn StreamSource>,
    store: Arc<dyn Store>,
    events: mpsc::UnboundedSender<CoreEvent>,
}

impl WatchService {
    /// Load the registry from `store`.
    ///
    /// Returns the service and the receiving end of its event stream.
    pub fn new(
        source: Arc<dyn StreamSource>,
        sink: Arc<dyn NotificationSink>,
        store: Arc<dyn Store>,
        format: NotificationFormat,
    ) -> WatchResult<(Self, mpsc::UnboundedReceiver<CoreEvent>)> {
        let (events, events_rx) = mpsc::unbounded_channel();
        let registry = WatchRegistry::load(store.clone())?;

        info!(watch_count = registry.len(), sink = sink.name(), "Watch service initialized");

        let sweeper = Sweeper::new(source.clone(), sink, store.clone(), format, events.clone());

        Ok((
            Self {
                registry: Mutex::new(registry),
                sweeper,
                source,
                store,
                events,
            },
            events_rx,
        ))
    }

    /// Resolve a handle and start watching it
    pub async fn add_watch(&self, handle: &str) -> WatchResult<AddOutcome> {
        let profile = self.source.resolve_channel(handle).await?;

        let entity = WatchedEntity {
            id: profile.id,
            login: profile.login,
            display_name: profile.display_name,
            avatar_url: profile.avatar_url,
            added_at: livewatch_util::now(),
            state: LiveState::Offline,
        };

        let mut registry = self.registry.lock().await;
        if let Some(existing) = registry.get(&entity.id) {
            return Ok(AddOutcome {
                added: false,
                entity: existing.clone(),
            });
        }
        registry.add(entity.clone())?;
        drop(registry);

        info!(channel_id = %entity.id, login = %entity.login, "Watch added");
        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::WatchAdded {
            channel_id: entity.id.clone(),
            login: entity.login.clone(),
        }));
        let _ = self.events.send(CoreEvent::WatchAdded {
            entity: entity.clone(),
        });

        Ok(AddOutcome {
            added: true,
            entity,
        })
    }

    /// Stop watching a channel.
    ///
    /// Tracked logins are matched locally; anything else is resolved through
    /// the source so that renamed channels can still be removed.
    pub async fn remove_watch(&self, handle: &str) -> WatchResult<RemoveOutcome> {
        let local_login = handle.trim().trim_start_matches('@');
        let local = self
            .registry
            .lock()
            .await
            .find_by_login(local_login)
            .map(|w| w.id.clone());

        let id = match local {
            Some(id) => id,
            None => self.source.resolve_channel(handle).await?.id,
        };

        let mut registry = self.registry.lock().await;
        let Some(entity) = registry.get(&id).cloned() else {
            return Ok(RemoveOutcome {
                removed: false,
                entity: None,
            });
        };
        let removed = registry.remove(&id)?;
        drop(registry);

        if removed {
            info!(channel_id = %entity.id, login = %entity.login, "Watch removed");
            let _ = self.store.append_audit(AuditEvent::new(AuditEventType::WatchRemoved {
                channel_id: entity.id.clone(),
                login: entity.login.clone(),
            }));
            let _ = self.events.send(CoreEvent::WatchRemoved {
                channel_id: entity.id.clone(),
                login: entity.login.clone(),
            });
        }

        Ok(RemoveOutcome {
            removed,
            entity: Some(entity),
        })
    }

    /// Watched channels in insertion order
    pub async fn list_watches(&self) -> Vec<WatchedEntity> {
        self.registry.lock().await.list()
    }

    /// Run a sweep now, waiting for any running sweep first
    pub async fn force_sweep_and_report(&self) -> SweepReport {
        self.sweeper.sweep(&self.registry, SweepTrigger::Command).await
    }

    /// Scheduled sweep. Skipped (returns `None`) if a sweep is already running.
    pub async fn scheduled_sweep(&self, trigger: SweepTrigger) -> Option<SweepReport> {
        self.sweeper.try_sweep(&self.registry, trigger).await
    }

    pub async fn health(&self) -> HealthStatus {
        let watch_count = self.registry.lock().await.len();
        HealthStatus {
            live: true,
            store_ok: self.store.is_healthy(),
            source_ok: self.source.is_healthy(),
            watch_count,
            last_sweep: self.sweeper.last_sweep().await,
        }
    }
}
