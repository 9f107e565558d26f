//! livewatchctl - command-line client for livewatchd

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use livewatch_api::{
    Command, EventPayload, HealthStatus, ResponsePayload, ResponseResult, SweepReport,
    WatchedEntity,
};
use livewatch_ipc::IpcClient;
use livewatch_util::{default_socket_path, format_datetime_full, format_duration};
use std::path::PathBuf;

/// livewatchctl - manage the channels livewatchd watches
#[derive(Parser, Debug)]
#[command(name = "livewatchctl")]
#[command(about = "Manage the channels livewatchd watches", long_about = None)]
struct Args {
    /// Socket path (or set LIVEWATCH_SOCKET env var)
    #[arg(short, long, env = "LIVEWATCH_SOCKET", default_value_os_t = default_socket_path())]
    socket: PathBuf,

    /// Print raw JSON responses
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Start watching a channel
    Add { handle: String },
    /// Stop watching a channel
    Remove { handle: String },
    /// List watched channels
    List,
    /// Check all channels now and show who is live
    Check,
    /// Show service health
    Health,
    /// Stream events until interrupted
    Events,
}

impl Cmd {
    fn to_command(&self) -> Command {
        match self {
            Cmd::Add { handle } => Command::AddWatch {
                handle: handle.clone(),
            },
            Cmd::Remove { handle } => Command::RemoveWatch {
                handle: handle.clone(),
            },
            Cmd::List => Command::ListWatches,
            Cmd::Check => Command::CheckNow,
            Cmd::Health => Command::GetHealth,
            Cmd::Events => Command::SubscribeEvents,
        }
    }
}

fn print_entity(entity: &WatchedEntity) {
    match entity.current_stream() {
        Some(stream) => println!(
            "{:<24} LIVE     {} - {} ({} viewers)",
            entity.display_name, stream.category, stream.title, stream.viewer_count
        ),
        None => println!("{:<24} offline", entity.display_name),
    }
}

fn print_report(report: &SweepReport) {
    println!(
        "Checked {} channel(s) in {}",
        report.checked,
        format_duration(report.duration)
    );
    if report.live.is_empty() {
        println!("Nobody is live.");
    }
    for entity in &report.live {
        print_entity(entity);
        if report.notified.contains(&entity.id) {
            println!("{:<24} announced just now", "");
        }
    }
    for failure in &report.failures {
        println!("{:<24} ERROR    {}", failure.login, failure.error);
    }
}

fn print_health(health: &HealthStatus) {
    let ok = |b: bool| if b { "ok" } else { "FAILING" };
    println!("store:    {}", ok(health.store_ok));
    println!("twitch:   {}", ok(health.source_ok));
    println!("watches:  {}", health.watch_count);
    match &health.last_sweep {
        Some(at) => println!("last run: {}", format_datetime_full(at)),
        None => println!("last run: never"),
    }
}

fn print_payload(payload: &ResponsePayload) {
    match payload {
        ResponsePayload::WatchAdded { entity } => {
            println!("Now watching {} ({})", entity.display_name, entity.id)
        }
        ResponsePayload::WatchRemoved { login, .. } => println!("Stopped watching {}", login),
        ResponsePayload::Watches { watches } => {
            if watches.is_empty() {
                println!("No channels watched.");
            }
            watches.iter().for_each(print_entity);
        }
        ResponsePayload::Sweep(report) => print_report(report),
        ResponsePayload::Health(health) => print_health(health),
        ResponsePayload::Subscribed { .. } | ResponsePayload::Unsubscribed => {}
        ResponsePayload::Pong => println!("pong"),
    }
}

fn describe_event(payload: &EventPayload) -> String {
    match payload {
        EventPayload::WatchAdded { entity } => format!("watching {}", entity.display_name),
        EventPayload::WatchRemoved { login, .. } => format!("stopped watching {}", login),
        EventPayload::WentLive { entity, notified } => format!(
            "{} went live{}",
            entity.display_name,
            if *notified { "" } else { " (already announced)" }
        ),
        EventPayload::WentOffline { display_name, .. } => format!("{} went offline", display_name),
        EventPayload::SweepCompleted {
            trigger,
            checked,
            live,
            failed,
        } => format!(
            "sweep ({:?}): {} checked, {} live, {} failed",
            trigger, checked, live, failed
        ),
    }
}

async fn stream_events(client: IpcClient, json: bool) -> Result<()> {
    let mut events = client.subscribe().await.context("Failed to subscribe")?;
    loop {
        let event = events.next().await.context("Event stream ended")?;
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!(
                "[{}] {}",
                format_datetime_full(&event.timestamp),
                describe_event(&event.payload)
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut client = IpcClient::connect(&args.socket)
        .await
        .with_context(|| format!("Failed to connect to livewatchd at {:?}", args.socket))?;

    if matches!(args.command, Cmd::Events) {
        return stream_events(client, args.json).await;
    }

    let response = client.send(args.command.to_command()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    match response.result {
        ResponseResult::Ok(payload) => {
            if !args.json {
                print_payload(&payload);
            }
            Ok(())
        }
        ResponseResult::Err(e) => bail!("{:?}: {}", e.code, e.message),
    }
}
