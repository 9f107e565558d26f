//! Command types for the livewatch protocol

use livewatch_util::{ChannelId, ClientId};
use serde::{Deserialize, Serialize};

use crate::{ClientRole, HealthStatus, SweepReport, WatchedEntity, API_VERSION};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    pub api_version: u32,
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    pub api_version: u32,
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    /// Handle does not resolve to a channel on the platform
    NotFound,
    /// Channel is already watched
    DuplicateWatch,
    /// Channel is not watched
    UnknownWatch,
    /// The platform API call failed; try again later
    FetchFailed,
    PermissionDenied,
    RateLimited,
    StoreError,
    InternalError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Start watching a channel by login handle
    AddWatch { handle: String },

    /// Stop watching a channel by login handle
    RemoveWatch { handle: String },

    /// List watched channels
    ListWatches,

    /// Run a sweep now and report the channels that are live
    CheckNow,

    GetHealth,

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    UnsubscribeEvents,

    /// Ping for keepalive
    Ping,
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    WatchAdded { entity: WatchedEntity },
    WatchRemoved { channel_id: ChannelId, login: String },
    Watches { watches: Vec<WatchedEntity> },
    Sweep(SweepReport),
    Health(HealthStatus),
    Subscribed { client_id: ClientId },
    Unsubscribed,
    Pong,
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub role: ClientRole,
    /// Unix UID if available
    pub uid: Option<u32>,
}

impl ClientInfo {
    pub fn new(client_id: ClientId, role: ClientRole) -> Self {
        Self {
            client_id,
            role,
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_wire_format() {
        let req = Request::new(7, Command::AddWatch { handle: "alice".into() });
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["request_id"], 7);
        assert_eq!(json["command"]["type"], "add_watch");
        assert_eq!(json["command"]["handle"], "alice");
    }

    #[test]
    fn parse_unit_command() {
        let req: Request =
            serde_json::from_str(r#"{"request_id":1,"api_version":1,"command":{"type":"check_now"}}"#)
                .unwrap();
        assert!(matches!(req.command, Command::CheckNow));
    }

    #[test]
    fn error_response_serialization() {
        let resp = Response::error(
            3,
            ErrorInfo::new(ErrorCode::DuplicateWatch, "alice is already watched"),
        );

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["result"]["err"]["code"], "duplicate_watch");

        let parsed: Response = serde_json::from_value(json).unwrap();
        match parsed.result {
            ResponseResult::Err(e) => assert_eq!(e.code, ErrorCode::DuplicateWatch),
            ResponseResult::Ok(_) => panic!("expected error"),
        }
    }
}
