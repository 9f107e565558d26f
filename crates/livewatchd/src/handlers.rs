//! Command handling and event mapping for the IPC surface

use livewatch_api::{
    ClientInfo, Command, ErrorCode, ErrorInfo, EventPayload, Response, ResponsePayload,
};
use livewatch_core::{AddOutcome, CoreEvent, RemoveOutcome, WatchError, WatchService};
use tracing::debug;

/// Execute one command on behalf of a client
pub async fn handle_command(
    watch: &WatchService,
    client: &ClientInfo,
    request_id: u64,
    command: Command,
) -> Response {
    debug!(client_id = %client.client_id, request_id, command = ?command, "Handling command");

    match command {
        Command::AddWatch { handle } => {
            if !client.role.can_modify_watches() {
                return permission_denied(request_id);
            }

            match watch.add_watch(&handle).await {
                Ok(AddOutcome {
                    added: true,
                    entity,
                }) => Response::success(request_id, ResponsePayload::WatchAdded { entity }),
                Ok(AddOutcome {
                    added: false,
                    entity,
                }) => Response::error(
                    request_id,
                    ErrorInfo::new(
                        ErrorCode::DuplicateWatch,
                        format!("{} is already being watched", entity.display_name),
                    ),
                ),
                Err(e) => Response::error(request_id, watch_error_info(&e)),
            }
        }

        Command::RemoveWatch { handle } => {
            if !client.role.can_modify_watches() {
                return permission_denied(request_id);
            }

            match watch.remove_watch(&handle).await {
                Ok(RemoveOutcome {
                    removed: true,
                    entity: Some(entity),
                }) => Response::success(
                    request_id,
                    ResponsePayload::WatchRemoved {
                        channel_id: entity.id,
                        login: entity.login,
                    },
                ),
                Ok(_) => Response::error(
                    request_id,
                    ErrorInfo::new(
                        ErrorCode::UnknownWatch,
                        format!("{} is not being watched", handle),
                    ),
                ),
                Err(e) => Response::error(request_id, watch_error_info(&e)),
            }
        }

        Command::ListWatches => Response::success(
            request_id,
            ResponsePayload::Watches {
                watches: watch.list_watches().await,
            },
        ),

        Command::CheckNow => {
            if !client.role.can_trigger_sweep() {
                return permission_denied(request_id);
            }

            let report = watch.force_sweep_and_report().await;
            Response::success(request_id, ResponsePayload::Sweep(report))
        }

        Command::GetHealth => {
            Response::success(request_id, ResponsePayload::Health(watch.health().await))
        }

        Command::SubscribeEvents => Response::success(
            request_id,
            ResponsePayload::Subscribed {
                client_id: client.client_id.clone(),
            },
        ),

        Command::UnsubscribeEvents => Response::success(request_id, ResponsePayload::Unsubscribed),

        Command::Ping => Response::success(request_id, ResponsePayload::Pong),
    }
}

fn permission_denied(request_id: u64) -> Response {
    Response::error(
        request_id,
        ErrorInfo::new(
            ErrorCode::PermissionDenied,
            "Only the service user may change watches or trigger checks",
        ),
    )
}

/// Map a command failure to its wire error
pub fn watch_error_info(error: &WatchError) -> ErrorInfo {
    let code = match error {
        WatchError::NotFound(_) => ErrorCode::NotFound,
        WatchError::TransientFetch(_) => ErrorCode::FetchFailed,
        WatchError::Store(_) => ErrorCode::StoreError,
    };
    ErrorInfo::new(code, error.to_string())
}

/// Map a core event to the payload broadcast to subscribers
pub fn event_payload(event: CoreEvent) -> EventPayload {
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use livewatch_api::{ClientRole, ResponseResult, StreamSession};
    use livewatch_core::NotificationFormat;
    use livewatch_platform_api::{MockSink, MockSource};
    use livewatch_store::SqliteStore;
    use livewatch_util::{ChannelId, ClientId};
    use std::sync::Arc;

    fn service() -> (WatchService, Arc<MockSource>) {
        let source = Arc::new(MockSource::new());
        let (watch, _events) = WatchService::new(
            source.clone(),
            Arc::new(MockSink::new()),
            Arc::new(SqliteStore::in_memory().unwrap()),
            NotificationFormat::default(),
        )
        .unwrap();
        (watch, source)
    }

    fn admin() -> ClientInfo {
        ClientInfo::new(ClientId::new(), ClientRole::Admin).with_uid(1000)
    }

    fn observer() -> ClientInfo {
        ClientInfo::new(ClientId::new(), ClientRole::Observer).with_uid(1001)
    }

    fn error_code(response: &Response) -> Option<ErrorCode> {
        match &response.result {
            ResponseResult::Err(e) => Some(e.code),
            ResponseResult::Ok(_) => None,
        }
    }

    fn add(handle: &str) -> Command {
        Command::AddWatch {
            handle: handle.into(),
        }
    }

    #[tokio::test]
    async fn add_and_duplicate() {
        let (watch, source) = service();
        source.add_channel("123", "alice");

        let response = handle_command(&watch, &admin(), 1, add("alice")).await;
        assert_eq!(response.request_id, 1);
        assert!(matches!(
            response.result,
            ResponseResult::Ok(ResponsePayload::WatchAdded { .. })
        ));

        let response = handle_command(&watch, &admin(), 2, add("alice")).await;
        assert_eq!(error_code(&response), Some(ErrorCode::DuplicateWatch));
    }

    #[tokio::test]
    async fn add_errors() {
        let (watch, source) = service();

        let response = handle_command(&watch, &admin(), 1, add("ghost")).await;
        assert_eq!(error_code(&response), Some(ErrorCode::NotFound));

        *source.fail_resolve.lock().unwrap() = Some("503 Service Unavailable".into());
        let response = handle_command(&watch, &admin(), 2, add("ghost")).await;
        assert_eq!(error_code(&response), Some(ErrorCode::FetchFailed));
    }

    #[tokio::test]
    async fn remove_unknown() {
        let (watch, source) = service();
        source.add_channel("123", "alice");

        let response = handle_command(
            &watch,
            &admin(),
            1,
            Command::RemoveWatch {
                handle: "alice".into(),
            },
        )
        .await;
        assert_eq!(error_code(&response), Some(ErrorCode::UnknownWatch));
    }

    #[tokio::test]
    async fn remove_watched() {
        let (watch, source) = service();
        source.add_channel("123", "alice");
        handle_command(&watch, &admin(), 1, add("alice")).await;

        let response = handle_command(
            &watch,
            &admin(),
            2,
            Command::RemoveWatch {
                handle: "Alice".into(),
            },
        )
        .await;
        match response.result {
            ResponseResult::Ok(ResponsePayload::WatchRemoved { channel_id, login }) => {
                assert_eq!(channel_id, ChannelId::new("123"));
                assert_eq!(login, "alice");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn observers_are_read_only() {
        let (watch, source) = service();
        source.add_channel("123", "alice");

        let response = handle_command(&watch, &observer(), 1, add("alice")).await;
        assert_eq!(error_code(&response), Some(ErrorCode::PermissionDenied));

        let response = handle_command(&watch, &observer(), 2, Command::CheckNow).await;
        assert_eq!(error_code(&response), Some(ErrorCode::PermissionDenied));

        let response = handle_command(&watch, &observer(), 3, Command::ListWatches).await;
        assert!(matches!(
            response.result,
            ResponseResult::Ok(ResponsePayload::Watches { .. })
        ));
    }

    #[tokio::test]
    async fn check_now_reports_live() {
        let (watch, source) = service();
        source.add_channel("123", "alice");
        handle_command(&watch, &admin(), 1, add("alice")).await;

        source.set_snapshot(
            &ChannelId::new("123"),
            Some(StreamSession {
                title: "hello".into(),
                category: "Chess".into(),
                viewer_count: 5,
                thumbnail_url_template: String::new(),
                started_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            }),
        );

        let response = handle_command(&watch, &admin(), 2, Command::CheckNow).await;
        match response.result {
            ResponseResult::Ok(ResponsePayload::Sweep(report)) => {
                assert_eq!(report.live.len(), 1);
                assert_eq!(report.notified, vec![ChannelId::new("123")]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn ping_and_subscribe() {
        let (watch, _source) = service();
        let client = admin();

        let response = handle_command(&watch, &client, 1, Command::Ping).await;
        assert!(matches!(response.result, ResponseResult::Ok(ResponsePayload::Pong)));

        let response = handle_command(&watch, &client, 2, Command::SubscribeEvents).await;
        match response.result {
            ResponseResult::Ok(ResponsePayload::Subscribed { client_id }) => {
                assert_eq!(client_id, client.client_id)
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn store_errors_map_to_store_code() {
        let info = watch_error_info(&WatchError::Store(
            livewatch_store::StoreError::Database("disk full".into()),
        ));
        assert_eq!(info.code, ErrorCode::StoreError);
        assert!(info.message.contains("disk full"));
    }
}
