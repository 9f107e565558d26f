//! Platform adapters for livewatch
//!
//! This crate provides:
//! - [`TwitchSource`]: live snapshots from the Twitch Helix API, with an
//!   app access token cache
//! - [`DiscordBotSink`]: posts to the first writable text channel of every
//!   guild the bot is in
//! - [`WebhookSink`]: posts to a fixed list of Discord webhooks

mod discord;
mod token;
mod twitch;

pub use discord::*;
pub use token::*;
pub use twitch::*;

use std::time::Duration;

/// Default timeout for every outgoing HTTP request
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(concat!("livewatch/", env!("CARGO_PKG_VERSION")))
        .build()
}
