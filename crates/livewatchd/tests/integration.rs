//! Integration tests for livewatchd
//!
//! These tests verify the end-to-end behavior of the daemon's components
//! wired together: store, watch service, mocks and the IPC layer.

use chrono::{DateTime, TimeZone, Utc};
use livewatch_api::{
    Command, Event, EventPayload, Response, ResponsePayload, StreamSession, SweepTrigger,
};
use livewatch_core::{CoreEvent, NotificationFormat, WatchService};
use livewatch_ipc::{IpcClient, IpcServer, ServerMessage};
use livewatch_platform_api::{MockSink, MockSource};
use livewatch_store::{AuditEventType, SqliteStore, Store};
use livewatch_util::ChannelId;
use std::sync::Arc;
use std::time::Duration;

fn session_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn live_session() -> StreamSession {
    StreamSession {
        title: "New year stream".into(),
        category: "Just Chatting".into(),
        viewer_count: 250,
        thumbnail_url_template: "https://cdn/live_user_alice-{width}x{height}.jpg".into(),
        started_at: Some(session_start()),
    }
}

#[tokio::test]
async fn test_add_go_live_and_repeat_sweep() {
    let source = Arc::new(MockSource::new());
    let sink = Arc::new(MockSink::with_destinations(["guild:1", "guild:2"]));
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let (watch, mut events) = WatchService::new(
        source.clone(),
        sink.clone(),
        store.clone(),
        NotificationFormat {
            thumbnail_width: 640,
            thumbnail_height: 360,
        },
    )
    .unwrap();

    source.add_channel("123", "alice");

    // 1. Empty store, add resolves to id 123
    let outcome = watch.add_watch("alice").await.unwrap();
    assert!(outcome.added);
    let watches = watch.list_watches().await;
    assert_eq!(watches.len(), 1);
    assert_eq!(watches[0].id, ChannelId::new("123"));
    assert!(!watches[0].is_live());

    // 2. Sweep sees the channel live
    let id = ChannelId::new("123");
    source.set_snapshot(&id, Some(live_session()));
    let report = watch.force_sweep_and_report().await;

    assert_eq!(report.trigger, SweepTrigger::Command);
    assert_eq!(report.notified, vec![id.clone()]);
    assert_eq!(sink.received().len(), 1);
    assert_eq!(sink.delivered().len(), 2);

    let notification = &sink.received()[0];
    assert_eq!(notification.display_name, "alice");
    assert_eq!(
        notification.thumbnail_url,
        "https://cdn/live_user_alice-640x360.jpg"
    );
    assert_eq!(notification.session_start, Some(session_start()));

    let state = store.load_state().unwrap();
    assert_eq!(state.ledger.get(&id), Some(&session_start()));
    assert!(state.watches[0].is_live());

    // 3. Identical sweep: no new notification, still live
    let report = watch.force_sweep_and_report().await;
    assert!(report.notified.is_empty());
    assert_eq!(report.live.len(), 1);
    assert_eq!(sink.received().len(), 1);

    let mut went_live = 0;
    let mut sweeps = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            CoreEvent::WentLive { notified, .. } => {
                assert!(notified);
                went_live += 1;
            }
            CoreEvent::SweepCompleted { .. } => sweeps += 1,
            _ => {}
        }
    }
    assert_eq!(went_live, 1);
    assert_eq!(sweeps, 2);

    // Audit trail
    let audits = store.get_recent_audits(20).unwrap();
    let sent: Vec<_> = audits
        .iter()
        .filter_map(|a| match &a.event {
            AuditEventType::NotificationSent {
                delivered, failed, ..
            } => Some((*delivered, *failed)),
            _ => None,
        })
        .collect();
    assert_eq!(sent, vec![(2, 0)]);
    assert!(audits
        .iter()
        .any(|a| matches!(a.event, AuditEventType::WatchAdded { .. })));
}

#[tokio::test]
async fn test_dedup_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("livewatchd.db");
    let id = ChannelId::new("123");

    {
        let source = Arc::new(MockSource::new());
        let sink = Arc::new(MockSink::new());
        let store = Arc::new(SqliteStore::open(&db_path).unwrap());
        let (watch, _events) =
            WatchService::new(source.clone(), sink.clone(), store, NotificationFormat::default())
                .unwrap();

        source.add_channel("123", "alice");
        watch.add_watch("alice").await.unwrap();
        source.set_snapshot(&id, Some(live_session()));
        watch.scheduled_sweep(SweepTrigger::Startup).await.unwrap();
        assert_eq!(sink.received().len(), 1);
    }

    // Restart while the same broadcast is still running, after a missed
    // offline period
    let source = Arc::new(MockSource::new());
    let sink = Arc::new(MockSink::new());
    let store = Arc::new(SqliteStore::open(&db_path).unwrap());
    let (watch, _events) =
        WatchService::new(source.clone(), sink.clone(), store, NotificationFormat::default())
            .unwrap();

    assert!(watch.list_watches().await[0].is_live());
    source.push_snapshots(&id, [Ok(None), Ok(Some(live_session()))]);

    watch.scheduled_sweep(SweepTrigger::Startup).await.unwrap();
    watch.scheduled_sweep(SweepTrigger::Timer).await.unwrap();
    assert!(sink.received().is_empty());

    // A genuinely new broadcast is announced
    let mut next = live_session();
    next.started_at = Some(session_start() + chrono::Duration::hours(6));
    source.push_snapshots(&id, [Ok(None), Ok(Some(next))]);
    watch.scheduled_sweep(SweepTrigger::Timer).await.unwrap();
    watch.scheduled_sweep(SweepTrigger::Timer).await.unwrap();
    watch.scheduled_sweep(SweepTrigger::Timer).await.unwrap();
    assert_eq!(sink.received().len(), 1);
}

fn payload(event: CoreEvent) -> EventPayload {
    match event {
        CoreEvent::WatchAdded { entity } => EventPayload::WatchAdded { entity },
        CoreEvent::WatchRemoved { channel_id, login } => {
            EventPayload::WatchRemoved { channel_id, login }
        }
        CoreEvent::WentLive { entity, notified } => EventPayload::WentLive { entity, notified },
        CoreEvent::WentOffline {
            channel_id,
            display_name,
        } => EventPayload::WentOffline {
            channel_id,
            display_name,
        },
        CoreEvent::SweepCompleted { report } => EventPayload::SweepCompleted {
            trigger: report.trigger,
            checked: report.checked,
            live: report.live.len(),
            failed: report.failures.len(),
        },
    }
}

#[tokio::test]
async fn test_events_reach_ipc_subscribers() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("livewatch.sock");

    let mut server = IpcServer::new(&socket_path);
    server.start().await.unwrap();
    let mut messages = server.take_message_receiver().await.unwrap();
    let server = Arc::new(server);

    let accept = server.clone();
    tokio::spawn(async move {
        let _ = accept.run().await;
    });

    let responder = server.clone();
    tokio::spawn(async move {
        while let Some(msg) = messages.recv().await {
            if let ServerMessage::Request { client_id, request } = msg {
                let response = match request.command {
                    Command::SubscribeEvents => Response::success(
                        request.request_id,
                        ResponsePayload::Subscribed {
                            client_id: client_id.clone(),
                        },
                    ),
                    _ => Response::success(request.request_id, ResponsePayload::Pong),
                };
                let _ = responder.send_response(&client_id, response).await;
            }
        }
    });

    let source = Arc::new(MockSource::new());
    let (watch, mut core_events) = WatchService::new(
        source.clone(),
        Arc::new(MockSink::new()),
        Arc::new(SqliteStore::in_memory().unwrap()),
        NotificationFormat::default(),
    )
    .unwrap();

    let forwarder = server.clone();
    tokio::spawn(async move {
        while let Some(event) = core_events.recv().await {
            forwarder.broadcast_event(Event::new(payload(event)));
        }
    });

    let client = IpcClient::connect(&socket_path).await.unwrap();
    let mut stream = client.subscribe().await.unwrap();

    source.add_channel("123", "alice");
    watch.add_watch("alice").await.unwrap();
    source.set_snapshot(&ChannelId::new("123"), Some(live_session()));
    watch.force_sweep_and_report().await;

    let mut seen = Vec::new();
    while seen.len() < 3 {
        let event = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("timed out waiting for event")
            .unwrap();
        seen.push(event.payload);
    }

    assert!(matches!(seen[0], EventPayload::WatchAdded { .. }));
    assert!(matches!(seen[1], EventPayload::WentLive { notified: true, .. }));
    assert!(matches!(
        seen[2],
        EventPayload::SweepCompleted {
            checked: 1,
            live: 1,
            failed: 0,
            ..
        }
    ));
}
