//! IPC server implementation

use livewatch_api::{
    ClientInfo, ClientRole, Command, ErrorCode, ErrorInfo, Event, Request, Response,
};
use livewatch_util::ClientId;
use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::{IpcError, IpcResult};

/// Message from client to server
pub enum ServerMessage {
    Request {
        client_id: ClientId,
        request: Request,
    },
    ClientConnected {
        client_id: ClientId,
        info: ClientInfo,
    },
    ClientDisconnected {
        client_id: ClientId,
    },
}

type ClientMap = Arc<RwLock<HashMap<ClientId, ClientHandle>>>;

/// IPC Server
pub struct IpcServer {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    clients: ClientMap,
    event_tx: broadcast::Sender<Event>,
    message_tx: mpsc::UnboundedSender<ServerMessage>,
    message_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<ServerMessage>>>>,
}

struct ClientHandle {
    info: ClientInfo,
    response_tx: mpsc::UnboundedSender<String>,
    subscribed: bool,
}

impl IpcServer {
    /// Create a new IPC server
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            listener: None,
            clients: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
            message_tx,
            message_rx: Arc::new(Mutex::new(Some(message_rx))),
        }
    }

    /// Start listening
    pub async fn start(&mut self) -> IpcResult<()> {
        // Remove stale socket from a previous run
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;

        // Owner and group only
        std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o660))?;

        info!(path = %self.socket_path.display(), "IPC server listening");

        self.listener = Some(listener);

        Ok(())
    }

    /// Get receiver for server messages
    pub async fn take_message_receiver(&self) -> Option<mpsc::UnboundedReceiver<ServerMessage>> {
        self.message_rx.lock().await.take()
    }

    /// Accept connections in a loop
    pub async fn run(&self) -> IpcResult<()> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| IpcError::ServerError("Server not started".into()))?;

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let client_id = ClientId::new();
                    let uid = get_peer_uid(&stream);
                    let role = role_for_uid(uid, nix::unistd::getuid().as_raw());

                    let info = ClientInfo::new(client_id.clone(), role);
                    let info = match uid {
                        Some(u) => info.with_uid(u),
                        None => info,
                    };

                    info!(client_id = %client_id, uid = ?uid, role = ?role, "Client connected");

                    self.handle_client(stream, client_id, info).await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    async fn handle_client(&self, stream: UnixStream, client_id: ClientId, info: ClientInfo) {
        let (read_half, write_half) = stream.into_split();
        let (response_tx, mut response_rx) = mpsc::unbounded_channel::<String>();

        self.clients.write().await.insert(
            client_id.clone(),
            ClientHandle {
                info: info.clone(),
                response_tx: response_tx.clone(),
                subscribed: false,
            },
        );

        let _ = self.message_tx.send(ServerMessage::ClientConnected {
            client_id: client_id.clone(),
            info,
        });

        // Reader task
        let clients = self.clients.clone();
        let message_tx = self.message_tx.clone();
        let reader_id = client_id.clone();

        tokio::spawn(async move {
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        debug!(client_id = %reader_id, "Client disconnected (EOF)");
                        break;
                    }
                    Ok(_) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }

                        match serde_json::from_str::<Request>(line) {
                            Ok(request) => {
                                let subscribed = match request.command {
                                    Command::SubscribeEvents => Some(true),
                                    Command::UnsubscribeEvents => Some(false),
                                    _ => None,
                                };
                                if let Some(subscribed) = subscribed {
                                    if let Some(handle) = clients.write().await.get_mut(&reader_id) {
                                        handle.subscribed = subscribed;
                                    }
                                }

                                let _ = message_tx.send(ServerMessage::Request {
                                    client_id: reader_id.clone(),
                                    request,
                                });
                            }
                            Err(e) => {
                                warn!(client_id = %reader_id, error = %e, "Invalid request");
                                let response = Response::error(
                                    0,
                                    ErrorInfo::new(
                                        ErrorCode::InvalidRequest,
                                        format!("Invalid request: {}", e),
                                    ),
                                );
                                if let Ok(json) = serde_json::to_string(&response) {
                                    let _ = response_tx.send(json);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        debug!(client_id = %reader_id, error = %e, "Read error");
                        break;
                    }
                }
            }

            // Dropping the stored sender lets the writer finish
            clients.write().await.remove(&reader_id);
        });

        // Writer task
        let mut event_rx = self.event_tx.subscribe();
        let clients = self.clients.clone();
        let message_tx = self.message_tx.clone();
        let writer_id = client_id;

        tokio::spawn(async move {
            let mut writer = write_half;

            loop {
                tokio::select! {
                    response = response_rx.recv() => {
                        let Some(mut msg) = response else {
                            break;
                        };
                        msg.push('\n');
                        if let Err(e) = writer.write_all(msg.as_bytes()).await {
                            debug!(client_id = %writer_id, error = %e, "Write error");
                            break;
                        }
                    }

                    event = event_rx.recv() => {
                        let event = match event {
                            Ok(event) => event,
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                warn!(client_id = %writer_id, skipped, "Client lagging, events dropped");
                                continue;
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        };

                        let is_subscribed = clients
                            .read()
                            .await
                            .get(&writer_id)
                            .map(|h| h.subscribed)
                            .unwrap_or(false);

                        if is_subscribed {
                            if let Ok(mut msg) = serde_json::to_string(&event) {
                                msg.push('\n');
                                if let Err(e) = writer.write_all(msg.as_bytes()).await {
                                    debug!(client_id = %writer_id, error = %e, "Event write error");
                                    break;
                                }
                            }
                        }
                    }
                }
            }

            let _ = message_tx.send(ServerMessage::ClientDisconnected {
                client_id: writer_id.clone(),
            });
            clients.write().await.remove(&writer_id);
        });
    }

    /// Send a response to a specific client
    pub async fn send_response(&self, client_id: &ClientId, response: Response) -> IpcResult<()> {
        let json = serde_json::to_string(&response)?;

        let clients = self.clients.read().await;
        match clients.get(client_id) {
            Some(handle) => handle
                .response_tx
                .send(json)
                .map_err(|_| IpcError::ConnectionClosed),
            None => Err(IpcError::ConnectionClosed),
        }
    }

    /// Broadcast an event to all subscribed clients
    pub fn broadcast_event(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }

    pub async fn get_client_info(&self, client_id: &ClientId) -> Option<ClientInfo> {
        let clients = self.clients.read().await;
        clients.get(client_id).map(|h| h.info.clone())
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Remove the socket file
    pub fn shutdown(&self) {
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The service's own user and root may change the watch list
fn role_for_uid(peer_uid: Option<u32>, service_uid: u32) -> ClientRole {
    match peer_uid {
        Some(0) => ClientRole::Admin,
        Some(u) if u == service_uid => ClientRole::Admin,
        _ => ClientRole::Observer,
    }
}

/// Get peer UID from Unix socket
fn get_peer_uid(stream: &UnixStream) -> Option<u32> {
    use std::os::unix::io::AsFd;

    let fd = stream.as_fd();

    match nix::sys::socket::getsockopt(&fd, nix::sys::socket::sockopt::PeerCredentials) {
        Ok(cred) => Some(cred.uid()),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IpcClient;
    use livewatch_api::{EventPayload, ResponsePayload, ResponseResult};
    use livewatch_util::ChannelId;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn started_server(path: &Path) -> (Arc<IpcServer>, mpsc::UnboundedReceiver<ServerMessage>) {
        let mut server = IpcServer::new(path);
        server.start().await.unwrap();
        let rx = server.take_message_receiver().await.unwrap();
        let server = Arc::new(server);

        let runner = server.clone();
        tokio::spawn(async move {
            let _ = runner.run().await;
        });

        (server, rx)
    }

    /// Answer every request with Pong (or Subscribed) until the channel closes
    fn answer_requests(server: Arc<IpcServer>, mut rx: mpsc::UnboundedReceiver<ServerMessage>) {
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let ServerMessage::Request { client_id, request } = msg {
                    let payload = match request.command {
                        Command::SubscribeEvents => ResponsePayload::Subscribed {
                            client_id: client_id.clone(),
                        },
                        _ => ResponsePayload::Pong,
                    };
                    let _ = server
                        .send_response(&client_id, Response::success(request.request_id, payload))
                        .await;
                }
            }
        });
    }

    #[tokio::test]
    async fn test_server_start() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("nested").join("test.sock");

        let mut server = IpcServer::new(&socket_path);
        server.start().await.unwrap();

        assert!(socket_path.exists());
        drop(server);
        assert!(!socket_path.exists());
    }

    #[tokio::test]
    async fn test_run_requires_start() {
        let dir = tempdir().unwrap();
        let server = IpcServer::new(dir.path().join("test.sock"));
        assert!(matches!(server.run().await, Err(IpcError::ServerError(_))));
    }

    #[test]
    fn test_roles() {
        assert_eq!(role_for_uid(Some(0), 1000), ClientRole::Admin);
        assert_eq!(role_for_uid(Some(1000), 1000), ClientRole::Admin);
        assert_eq!(role_for_uid(Some(1001), 1000), ClientRole::Observer);
        assert_eq!(role_for_uid(None, 1000), ClientRole::Observer);
    }

    #[tokio::test]
    async fn test_request_response_roundtrip() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("test.sock");
        let (server, mut rx) = started_server(&socket_path).await;

        let mut client = IpcClient::connect(&socket_path).await.unwrap();

        // First message is the connection notice, with our own uid as admin
        match rx.recv().await.unwrap() {
            ServerMessage::ClientConnected { info, .. } => {
                assert_eq!(info.role, ClientRole::Admin);
                assert!(info.uid.is_some());
            }
            _ => panic!("expected ClientConnected"),
        }
        answer_requests(server, rx);

        let response = client.send(Command::Ping).await.unwrap();
        assert_eq!(response.request_id, 1);
        assert!(matches!(response.result, ResponseResult::Ok(ResponsePayload::Pong)));

        let response = client.send(Command::ListWatches).await.unwrap();
        assert_eq!(response.request_id, 2);
    }

    #[tokio::test]
    async fn test_invalid_request_gets_error() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("test.sock");
        let (_server, _rx) = started_server(&socket_path).await;

        let stream = UnixStream::connect(&socket_path).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        write_half.write_all(b"{not json}\n").await.unwrap();

        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();

        let response: Response = serde_json::from_str(line.trim()).unwrap();
        match response.result {
            ResponseResult::Err(e) => assert_eq!(e.code, ErrorCode::InvalidRequest),
            ResponseResult::Ok(_) => panic!("expected error"),
        }
    }

    #[tokio::test]
    async fn test_events_only_reach_subscribers() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("test.sock");
        let (server, rx) = started_server(&socket_path).await;
        answer_requests(server.clone(), rx);

        let mut plain = IpcClient::connect(&socket_path).await.unwrap();
        let subscriber = IpcClient::connect(&socket_path).await.unwrap();
        let mut events = subscriber.subscribe().await.unwrap();

        server.broadcast_event(Event::new(EventPayload::WentOffline {
            channel_id: ChannelId::new("123"),
            display_name: "Alice".into(),
        }));

        let event = tokio::time::timeout(Duration::from_secs(2), events.next())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event.payload, EventPayload::WentOffline { .. }));

        // The unsubscribed client sees only its own response
        let response = plain.send(Command::Ping).await.unwrap();
        assert!(matches!(response.result, ResponseResult::Ok(ResponsePayload::Pong)));
    }

    #[tokio::test]
    async fn test_disconnect_is_reported() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("test.sock");
        let (server, mut rx) = started_server(&socket_path).await;

        let client = IpcClient::connect(&socket_path).await.unwrap();
        let connected = match rx.recv().await.unwrap() {
            ServerMessage::ClientConnected { client_id, .. } => client_id,
            _ => panic!("expected ClientConnected"),
        };
        drop(client);

        let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match msg {
            ServerMessage::ClientDisconnected { client_id } => assert_eq!(client_id, connected),
            _ => panic!("expected ClientDisconnected"),
        }
        assert!(server.get_client_info(&connected).await.is_none());
    }
}
