//! Discord notification sinks

use async_trait::async_trait;
use livewatch_platform_api::{DeliveryReport, LiveNotification, NotificationSink, SinkError, SinkResult};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Twitch purple
const EMBED_COLOR: u32 = 0x9146FF;

/// Discord channel type for guild text channels
const GUILD_TEXT: u8 = 0;

/// Longest response body kept in an error
const MAX_ERROR_BODY: usize = 200;

/// Build the message body for a go-live announcement
pub fn embed_message(notification: &LiveNotification) -> Value {
    let title = non_empty(&notification.title, "Untitled stream");
    let category = non_empty(&notification.category, "No category");

    let mut author = json!({
        "name": notification.display_name,
        "url": notification.url,
    });
    if let Some(avatar) = &notification.avatar_url {
        author["icon_url"] = json!(avatar);
    }

    let mut embed = json!({
        "title": title,
        "url": notification.url,
        "color": EMBED_COLOR,
        "author": author,
        "fields": [
            { "name": "Category", "value": category, "inline": true },
            { "name": "Viewers", "value": notification.viewer_count.to_string(), "inline": true },
        ],
    });
    if !notification.thumbnail_url.is_empty() {
        embed["image"] = json!({ "url": notification.thumbnail_url });
    }
    if let Some(start) = notification.session_start {
        embed["timestamp"] = json!(start.to_rfc3339());
    }

    json!({
        "content": format!("{} {}", notification.headline(), notification.url),
        "embeds": [embed],
    })
}

fn non_empty<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

async fn send_checked(request: RequestBuilder) -> SinkResult<reqwest::Response> {
    let response = request
        .send()
        .await
        .map_err(|e| SinkError::Http(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(MAX_ERROR_BODY)
        .collect();
    Err(SinkError::Rejected {
        status: status.as_u16(),
        body,
    })
}

/// Settings for [`DiscordBotSink`]
#[derive(Debug, Clone)]
pub struct DiscordBotConfig {
    pub bot_token: String,
    /// e.g. `https://discord.com/api/v10`
    pub api_base_url: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
struct Guild {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GuildChannel {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    position: i64,
}

/// Text channels in the order they appear in the client
fn text_channels_by_position(channels: Vec<GuildChannel>) -> Vec<GuildChannel> {
    let mut text: Vec<_> = channels.into_iter().filter(|c| c.kind == GUILD_TEXT).collect();
    text.sort_by_key(|c| c.position);
    text
}

/// Bot sink: announces in the first writable text channel of every guild.
///
/// Guilds are discovered on every delivery. The channel that accepted the
/// last post in a guild is tried first next time.
pub struct DiscordBotSink {
    client: Client,
    api_base_url: String,
    auth_header: String,
    preferred_channels: Mutex<HashMap<String, String>>,
}

impl DiscordBotSink {
    pub fn new(config: DiscordBotConfig) -> reqwest::Result<Self> {
        Ok(Self {
            client: crate::http_client(config.request_timeout)?,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_header: format!("Bot {}", config.bot_token),
            preferred_channels: Mutex::new(HashMap::new()),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> SinkResult<T> {
        let request = self
            .client
            .get(format!("{}{}", self.api_base_url, path))
            .header("Authorization", &self.auth_header);

        send_checked(request)
            .await?
            .json()
            .await
            .map_err(|e| SinkError::Discovery(format!("{}: {}", path, e)))
    }

    async fn post_to_channel(&self, channel_id: &str, body: &Value) -> SinkResult<()> {
        let request = self
            .client
            .post(format!("{}/channels/{}/messages", self.api_base_url, channel_id))
            .header("Authorization", &self.auth_header)
            .json(body);

        send_checked(request).await.map(|_| ())
    }

    /// Try text channels in order until one accepts the message
    async fn deliver_to_guild(&self, guild: &Guild, body: &Value) -> SinkResult<String> {
        let channels: Vec<GuildChannel> = self
            .get_json(&format!("/guilds/{}/channels", guild.id))
            .await
            .map_err(|e| SinkError::Discovery(e.to_string()))?;

        let mut candidates: Vec<String> = text_channels_by_position(channels)
            .into_iter()
            .map(|c| c.id)
            .collect();

        let preferred = self.preferred_channels.lock().await.get(&guild.id).cloned();
        if let Some(preferred) = preferred {
            if let Some(idx) = candidates.iter().position(|c| *c == preferred) {
                let channel = candidates.remove(idx);
                candidates.insert(0, channel);
            }
        }

        for channel_id in candidates {
            match self.post_to_channel(&channel_id, body).await {
                Ok(()) => return Ok(channel_id),
                Err(e) => {
                    debug!(guild_id = %guild.id, channel_id = %channel_id, error = %e, "Channel not writable");
                }
            }
        }

        Err(SinkError::NoWritableChannel)
    }
}

#[async_trait]
impl NotificationSink for DiscordBotSink {
    async fn deliver(&self, notification: &LiveNotification) -> DeliveryReport {
        let mut report = DeliveryReport::new();
        let body = embed_message(notification);

        let guilds: Vec<Guild> = match self.get_json("/users/@me/guilds").await {
            Ok(guilds) => guilds,
            Err(e) => {
                warn!(error = %e, "Failed to list guilds");
                report.record_failure("guilds", SinkError::Discovery(e.to_string()));
                return report;
            }
        };

        for guild in &guilds {
            let destination = format!("guild:{}", guild.id);
            match self.deliver_to_guild(guild, &body).await {
                Ok(channel_id) => {
                    info!(guild_id = %guild.id, guild = %guild.name, channel_id = %channel_id, "Notification delivered");
                    self.preferred_channels
                        .lock()
                        .await
                        .insert(guild.id.clone(), channel_id);
                    report.record_success(destination);
                }
                Err(e) => {
                    warn!(guild_id = %guild.id, guild = %guild.name, error = %e, "Notification delivery failed");
                    report.record_failure(destination, e);
                }
            }
        }

        report
    }

    fn name(&self) -> &'static str {
        "discord_bot"
    }
}

/// Webhook sink: posts to each configured webhook URL
pub struct WebhookSink {
    client: Client,
    urls: Vec<String>,
}

impl WebhookSink {
    pub fn new(urls: Vec<String>, request_timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: crate::http_client(request_timeout)?,
            urls,
        })
    }
}

/// Label for a webhook that does not leak its token
pub fn webhook_label(url: &str) -> String {
    url.split("/webhooks/")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .filter(|id| !id.is_empty())
        .map(|id| format!("webhook:{}", id))
        .unwrap_or_else(|| "webhook".to_string())
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, notification: &LiveNotification) -> DeliveryReport {
        let mut report = DeliveryReport::new();
        let body = embed_message(notification);

        for url in &self.urls {
            let label = webhook_label(url);
            match send_checked(self.client.post(url).json(&body)).await {
                Ok(_) => {
                    info!(destination = %label, "Notification delivered");
                    report.record_success(label);
                }
                Err(e) => {
                    warn!(destination = %label, error = %e, "Notification delivery failed");
                    report.record_failure(label, e);
                }
            }
        }

        report
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn notification() -> LiveNotification {
        LiveNotification {
            display_name: "Alice".into(),
            login: "alice".into(),
            url: "https://www.twitch.tv/alice".into(),
            title: "Any% attempts".into(),
            category: "Celeste".into(),
            viewer_count: 42,
            thumbnail_url: "https://cdn/alice-1280x720.jpg".into(),
            avatar_url: Some("https://cdn/alice.png".into()),
            session_start: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        }
    }

    #[test]
    fn embed_shape() {
        let body = embed_message(&notification());
        let embed = &body["embeds"][0];

        assert_eq!(body["content"], "Alice is now live! https://www.twitch.tv/alice");
        assert_eq!(embed["title"], "Any% attempts");
        assert_eq!(embed["url"], "https://www.twitch.tv/alice");
        assert_eq!(embed["author"]["icon_url"], "https://cdn/alice.png");
        assert_eq!(embed["fields"][0]["value"], "Celeste");
        assert_eq!(embed["fields"][1]["value"], "42");
        assert_eq!(embed["image"]["url"], "https://cdn/alice-1280x720.jpg");
        assert_eq!(embed["timestamp"], "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn embed_fills_blank_fields() {
        let mut n = notification();
        n.title = " ".into();
        n.category = String::new();
        n.thumbnail_url = String::new();
        n.avatar_url = None;
        n.session_start = None;

        let body = embed_message(&n);
        let embed = &body["embeds"][0];
        assert_eq!(embed["title"], "Untitled stream");
        assert_eq!(embed["fields"][0]["value"], "No category");
        assert!(embed.get("image").is_none());
        assert!(embed.get("timestamp").is_none());
        assert!(embed["author"].get("icon_url").is_none());
    }

    #[test]
    fn text_channels_sorted_by_position() {
        let channels: Vec<GuildChannel> = serde_json::from_str(
            r#"[
                {"id":"10","type":4,"position":0,"name":"Text Channels"},
                {"id":"11","type":0,"position":2,"name":"general"},
                {"id":"12","type":2,"position":1,"name":"voice"},
                {"id":"13","type":0,"position":1,"name":"announcements"}
            ]"#,
        )
        .unwrap();

        let ids: Vec<_> = text_channels_by_position(channels)
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["13", "11"]);
    }

    #[test]
    fn webhook_labels_hide_token() {
        assert_eq!(
            webhook_label("https://discord.com/api/webhooks/1234/secret-token"),
            "webhook:1234"
        );
        assert_eq!(webhook_label("https://example.com/hook"), "webhook");
    }

    #[tokio::test]
    async fn unreachable_webhooks_are_reported_individually() {
        let sink = WebhookSink::new(
            vec![
                "http://127.0.0.1:9/api/webhooks/1/a".into(),
                "http://127.0.0.1:9/api/webhooks/2/b".into(),
            ],
            Duration::from_secs(2),
        )
        .unwrap();

        let report = sink.deliver(&notification()).await;
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.failed_count(), 2);
        assert_eq!(report.outcomes[1].destination, "webhook:2");
    }
}
