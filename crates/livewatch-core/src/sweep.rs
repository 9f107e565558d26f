//! Sweeps: one sequential pass over the watch list

use chrono::{DateTime, Utc};
use livewatch_api::{LiveState, SweepFailure, SweepReport, SweepTrigger, WatchedEntity};
use livewatch_platform_api::{LiveNotification, NotificationSink, StreamSource};
use livewatch_store::{AuditEvent, AuditEventType, Store};
use livewatch_util::{ChannelId, MonotonicInstant};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::{policy, CoreEvent, Decision, WatchRegistry};

/// Thumbnail size requested for announcements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationFormat {
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}

impl Default for NotificationFormat {
    fn default() -> Self {
        Self {
            thumbnail_width: 1280,
            thumbnail_height: 720,
        }
    }
}

/// Runs sweeps. At most one sweep runs at a time.
pub struct Sweeper {
    source: Arc<dyn StreamSource>,
    sink: Arc<dyn NotificationSink>,
    store: Arc<dyn Store>,
    format: NotificationFormat,
    events: mpsc::UnboundedSender<CoreEvent>,
    guard: Mutex<()>,
    last_sweep: Mutex<Option<DateTime<Utc>>>,
}

/// Per-channel result inside a sweep
enum ChannelOutcome {
    Unchanged,
    Notified,
    Failed(String),
}

impl Sweeper {
    pub fn new(
        source: Arc<dyn StreamSource>,
        sink: Arc<dyn NotificationSink>,
        store: Arc<dyn Store>,
        format: NotificationFormat,
        events: mpsc::UnboundedSender<CoreEvent>,
    ) -> Self {
        Self {
            source,
            sink,
            store,
            format,
            events,
            guard: Mutex::new(()),
            last_sweep: Mutex::new(None),
        }
    }

    /// Sweep unless one is already running. Returns `None` if skipped.
    pub async fn try_sweep(
        &self,
        registry: &Mutex<WatchRegistry>,
        trigger: SweepTrigger,
    ) -> Option<SweepReport> {
        let Ok(_guard) = self.guard.try_lock() else {
            warn!(?trigger, "Previous sweep still running, skipping");
            return None;
        };
        Some(self.run(registry, trigger).await)
    }

    /// Wait for any running sweep to finish, then run a fresh one
    pub async fn sweep(&self, registry: &Mutex<WatchRegistry>, trigger: SweepTrigger) -> SweepReport {
        let _guard = self.guard.lock().await;
        self.run(registry, trigger).await
    }

    /// Start time of the last completed sweep
    pub async fn last_sweep(&self) -> Option<DateTime<Utc>> {
        *self.last_sweep.lock().await
    }

    async fn run(&self, registry: &Mutex<WatchRegistry>, trigger: SweepTrigger) -> SweepReport {
        let started_at = livewatch_util::now();
        let started = MonotonicInstant::now();
        let targets = registry.lock().await.list();

        debug!(?trigger, channel_count = targets.len(), "Sweep started");

        let mut notified = Vec::new();
        let mut failures = Vec::new();

        for entity in &targets {
            match self.process(registry, entity).await {
                ChannelOutcome::Unchanged => {}
                ChannelOutcome::Notified => notified.push(entity.id.clone()),
                ChannelOutcome::Failed(error) => failures.push(SweepFailure {
                    channel_id: entity.id.clone(),
                    login: entity.login.clone(),
                    error,
                }),
            }
        }

        let live: Vec<WatchedEntity> = registry
            .lock()
            .await
            .list()
            .into_iter()
            .filter(|w| w.is_live())
            .collect();

        let report = SweepReport {
            trigger,
            started_at,
            duration: started.elapsed(),
            checked: targets.len(),
            live,
            notified,
            failures,
        };

        info!(
            ?trigger,
            checked = report.checked,
            live = report.live.len(),
            notified = report.notified.len(),
            failed = report.failures.len(),
            duration = %livewatch_util::format_duration(report.duration),
            "Sweep completed"
        );

        let _ = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::SweepCompleted {
                trigger,
                checked: report.checked,
                live: report.live.len(),
                failed: report.failures.len(),
            }));

        *self.last_sweep.lock().await = Some(started_at);
        let _ = self.events.send(CoreEvent::SweepCompleted {
            report: report.clone(),
        });

        report
    }

    async fn process(&self, registry: &Mutex<WatchRegistry>, entity: &WatchedEntity) -> ChannelOutcome {
        let id = &entity.id;

        // No lock is held while fetching
        let snapshot = match self.source.fetch_live_snapshot(id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(channel_id = %id, login = %entity.login, error = %e, "Snapshot fetch failed");
                return ChannelOutcome::Failed(e.to_string());
            }
        };

        let (decision, updated) = {
            let mut registry = registry.lock().await;
            let Some(current) = registry.get(id) else {
                debug!(channel_id = %id, "Channel removed during fetch, dropping snapshot");
                return ChannelOutcome::Unchanged;
            };

            let decision =
                policy::evaluate(current.is_live(), snapshot.as_ref(), registry.last_notified(id));
            let state = LiveState::from(snapshot);

            if decision == Decision::Notify {
                // Committed together with the ledger entry once delivery returns
                let mut pending = current.clone();
                pending.state = state;
                (decision, pending)
            } else {
                match registry.set_live_state(id, state) {
                    Ok(Some(updated)) => (decision, updated),
                    Ok(None) => return ChannelOutcome::Unchanged,
                    Err(e) => {
                        error!(channel_id = %id, error = %e, "Failed to persist live state");
                        return ChannelOutcome::Failed(e.to_string());
                    }
                }
            }
        };

        match decision {
            Decision::StayedOffline => {
                debug!(channel_id = %id, "Still offline");
                ChannelOutcome::Unchanged
            }
            Decision::Refresh => {
                debug!(channel_id = %id, "Still live, state refreshed");
                ChannelOutcome::Unchanged
            }
            Decision::WentOffline => {
                info!(channel_id = %id, login = %updated.login, "Channel went offline");
                let _ = self.events.send(CoreEvent::WentOffline {
                    channel_id: id.clone(),
                    display_name: updated.display_name.clone(),
                });
                ChannelOutcome::Unchanged
            }
            Decision::Suppress { last_notified } => {
                let session_started_at = updated.current_stream().and_then(|s| s.started_at);
                info!(
                    channel_id = %id,
                    login = %updated.login,
                    last_notified = %last_notified,
                    "Session already announced, suppressing notification"
                );
                let _ = self
                    .store
                    .append_audit(AuditEvent::new(AuditEventType::NotificationSuppressed {
                        channel_id: id.clone(),
                        session_started_at,
                        last_notified,
                    }));
                let _ = self.events.send(CoreEvent::WentLive {
                    entity: updated,
                    notified: false,
                });
                ChannelOutcome::Unchanged
            }
            Decision::Notify => self.notify(registry, id, updated).await,
        }
    }

    async fn notify(
        &self,
        registry: &Mutex<WatchRegistry>,
        id: &ChannelId,
        entity: WatchedEntity,
    ) -> ChannelOutcome {
        let Some(session) = entity.current_stream() else {
            return ChannelOutcome::Unchanged;
        };

        let notification = LiveNotification::new(
            &entity,
            session,
            self.source.channel_url(&entity.login),
            self.format.thumbnail_width,
            self.format.thumbnail_height,
        );

        info!(channel_id = %id, login = %entity.login, sink = self.sink.name(), "Channel went live, notifying");
        let report = self.sink.deliver(&notification).await;

        for (destination, e) in report.failures() {
            warn!(channel_id = %id, destination = %destination, error = %e, "Destination delivery failed");
        }

        let recorded = policy::ledger_timestamp(session.started_at, livewatch_util::now());
        let ledger_result = registry
            .lock()
            .await
            .set_live_state_and_record(id, entity.state.clone(), recorded);

        let _ = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::NotificationSent {
                channel_id: id.clone(),
                session_started_at: session.started_at,
                delivered: report.delivered_count(),
                failed: report.failed_count(),
            }));

        let _ = self.events.send(CoreEvent::WentLive {
            entity: entity.clone(),
            notified: true,
        });

        match ledger_result {
            Ok(Some(_)) => ChannelOutcome::Notified,
            Ok(None) => {
                debug!(channel_id = %id, "Channel removed during delivery, nothing recorded");
                ChannelOutcome::Notified
            }
            Err(e) => {
                error!(channel_id = %id, error = %e, "Failed to record notification");
                ChannelOutcome::Failed(format!("notification sent but not recorded: {}", e))
            }
        }
    }
}
