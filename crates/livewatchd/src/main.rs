//! livewatchd - The livewatch background service
//!
//! This is the main entry point for the livewatchd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Twitch source and Discord sink
//! - Watch service (registry, policy, sweeper)
//! - Sweep timer
//! - IPC server

mod handlers;
mod scheduler;

use anyhow::{Context, Result};
use clap::Parser;
use livewatch_api::{ErrorCode, ErrorInfo, Event, Response};
use livewatch_config::{load_config, ServiceConfig, SinkSettings};
use livewatch_core::{CoreEvent, NotificationFormat, WatchService};
use livewatch_ipc::{IpcServer, ServerMessage};
use livewatch_platform::{
    DiscordBotConfig, DiscordBotSink, TwitchConfig, TwitchSource, WebhookSink,
};
use livewatch_platform_api::{NotificationSink, StreamSource};
use livewatch_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use livewatch_util::{default_config_path, RateLimiter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// livewatchd - Go-live notifications for watched Twitch channels
#[derive(Parser, Debug)]
#[command(name = "livewatchd")]
#[command(about = "Go-live notifications for watched Twitch channels", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/livewatch/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set LIVEWATCH_SOCKET env var)
    #[arg(short, long, env = "LIVEWATCH_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set LIVEWATCH_DATA_DIR env var)
    #[arg(short, long, env = "LIVEWATCH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Twitch client secret (overrides the config file)
    #[arg(long, env = "LIVEWATCH_TWITCH_CLIENT_SECRET", hide_env_values = true)]
    twitch_client_secret: Option<String>,

    /// Discord bot token (overrides the config file)
    #[arg(long, env = "LIVEWATCH_DISCORD_TOKEN", hide_env_values = true)]
    discord_token: Option<String>,
}

/// Main service state
struct Service {
    watch: Arc<WatchService>,
    core_events: mpsc::UnboundedReceiver<CoreEvent>,
    ipc: Arc<IpcServer>,
    store: Arc<dyn Store>,
    rate_limiter: RateLimiter,
    poll_interval: Duration,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let config = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            poll_interval = %livewatch_util::format_duration(config.poll.interval),
            sink = config.notifications.sink.kind_name(),
            "Configuration loaded"
        );

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| config.service.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join("livewatchd.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

        let source = build_source(&config, args)?;
        let sink = build_sink(&config, args)?;

        let format = NotificationFormat {
            thumbnail_width: config.notifications.thumbnail_width,
            thumbnail_height: config.notifications.thumbnail_height,
        };
        let (watch, core_events) = WatchService::new(source, sink, store.clone(), format)
            .context("Failed to load watch state")?;

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        let rate_limiter = RateLimiter::new(config.service.rate_limit);
        debug!(
            burst = config.service.rate_limit.burst,
            per = ?config.service.rate_limit.per,
            "Client rate limit configured"
        );

        Ok(Self {
            watch: Arc::new(watch),
            core_events,
            ipc: Arc::new(ipc),
            store,
            rate_limiter,
            poll_interval: config.poll.interval,
        })
    }

    async fn run(self) -> Result<()> {
        let ipc_ref = self.ipc.clone();
        let mut ipc_messages = ipc_ref
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        let watch = self.watch.clone();
        let store = self.store.clone();
        let rate_limiter = Arc::new(Mutex::new(self.rate_limiter));
        let mut core_events = self.core_events;

        let ipc_accept = ipc_ref.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        let sweeps = scheduler::spawn_scheduler(watch.clone(), self.poll_interval);

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                Some(event) = core_events.recv() => {
                    ipc_ref.broadcast_event(Event::new(handlers::event_payload(event)));
                }

                Some(msg) = ipc_messages.recv() => {
                    Self::handle_ipc_message(&watch, &ipc_ref, &store, &rate_limiter, msg).await;
                }
            }
        }

        info!("Shutting down livewatchd");
        sweeps.abort();

        if let Err(e) = store.append_audit(AuditEvent::new(AuditEventType::ServiceStopped)) {
            warn!(error = %e, "Failed to log service shutdown");
        }

        ipc_ref.shutdown();
        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_ipc_message(
        watch: &Arc<WatchService>,
        ipc: &Arc<IpcServer>,
        store: &Arc<dyn Store>,
        rate_limiter: &Arc<Mutex<RateLimiter>>,
        msg: ServerMessage,
    ) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                {
                    let mut limiter = rate_limiter.lock().await;
                    if !limiter.check(&client_id) {
                        let retry_after = limiter.retry_after(&client_id);
                        let response = Response::error(
                            request.request_id,
                            ErrorInfo::new(
                                ErrorCode::RateLimited,
                                format!("Too many requests, retry in {}ms", retry_after.as_millis().max(1)),
                            ),
                        );
                        let _ = ipc.send_response(&client_id, response).await;
                        return;
                    }
                }

                let Some(client) = ipc.get_client_info(&client_id).await else {
                    debug!(client_id = %client_id, "Request from disconnected client dropped");
                    return;
                };

                // Commands may wait on a sweep, so they run off the main loop
                let watch = watch.clone();
                let ipc = ipc.clone();
                tokio::spawn(async move {
                    let response =
                        handlers::handle_command(&watch, &client, request.request_id, request.command)
                            .await;
                    if let Err(e) = ipc.send_response(&client_id, response).await {
                        debug!(client_id = %client_id, error = %e, "Failed to send response");
                    }
                });
            }

            ServerMessage::ClientConnected { client_id, info } => {
                info!(
                    client_id = %client_id,
                    role = ?info.role,
                    uid = ?info.uid,
                    "Client connected"
                );

                let _ = store.append_audit(AuditEvent::new(AuditEventType::ClientConnected {
                    client_id: client_id.to_string(),
                    role: format!("{:?}", info.role),
                    uid: info.uid,
                }));
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");

                let _ = store.append_audit(AuditEvent::new(AuditEventType::ClientDisconnected {
                    client_id: client_id.to_string(),
                }));

                rate_limiter.lock().await.remove_client(&client_id);
            }
        }
    }
}

fn build_source(config: &ServiceConfig, args: &Args) -> Result<Arc<dyn StreamSource>> {
    let client_secret = args
        .twitch_client_secret
        .clone()
        .or_else(|| config.twitch.client_secret.clone())
        .context("Twitch client secret missing: set twitch.client_secret or LIVEWATCH_TWITCH_CLIENT_SECRET")?;

    let source = TwitchSource::new(TwitchConfig {
        client_id: config.twitch.client_id.clone(),
        client_secret,
        api_base_url: config.twitch.api_base_url.clone(),
        auth_url: config.twitch.auth_url.clone(),
        request_timeout: config.twitch.request_timeout,
    })
    .context("Failed to create Twitch HTTP client")?;

    info!(api_base_url = %config.twitch.api_base_url, "Twitch source initialized");
    Ok(Arc::new(source))
}

fn build_sink(config: &ServiceConfig, args: &Args) -> Result<Arc<dyn NotificationSink>> {
    let timeout = config.twitch.request_timeout;

    let sink: Arc<dyn NotificationSink> = match &config.notifications.sink {
        SinkSettings::DiscordBot {
            bot_token,
            api_base_url,
        } => {
            let bot_token = args
                .discord_token
                .clone()
                .or_else(|| bot_token.clone())
                .context("Discord bot token missing: set notifications.bot_token or LIVEWATCH_DISCORD_TOKEN")?;

            Arc::new(
                DiscordBotSink::new(DiscordBotConfig {
                    bot_token,
                    api_base_url: api_base_url.clone(),
                    request_timeout: timeout,
                })
                .context("Failed to create Discord HTTP client")?,
            )
        }
        SinkSettings::Webhook { urls } => {
            info!(webhook_count = urls.len(), "Using webhook sink");
            Arc::new(
                WebhookSink::new(urls.clone(), timeout)
                    .context("Failed to create webhook HTTP client")?,
            )
        }
    };

    Ok(sink)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "livewatchd starting"
    );

    if livewatch_util::is_mock_time_active() {
        warn!(now = %livewatch_util::format_datetime_full(&livewatch_util::now()), "Mock time active");
    }

    let service = Service::new(&args).await?;
    service.run().await
}
