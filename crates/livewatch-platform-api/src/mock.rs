//! Scripted source and recording sink for tests

use async_trait::async_trait;
use livewatch_api::StreamSession;
use livewatch_util::ChannelId;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{
    ChannelProfile, DeliveryReport, LiveNotification, NotificationSink, SinkError, SourceError,
    SourceResult, StreamSource,
};

type Snapshot = SourceResult<Option<StreamSession>>;

/// Mock stream source.
///
/// Snapshots are scripted per channel as a queue. Each fetch pops the front;
/// the last entry keeps being returned once the queue is down to one. A
/// channel with no script is offline.
pub struct MockSource {
    profiles: Arc<Mutex<HashMap<String, ChannelProfile>>>,
    snapshots: Arc<Mutex<HashMap<ChannelId, VecDeque<Snapshot>>>>,
    fetch_log: Arc<Mutex<Vec<ChannelId>>>,
    healthy: AtomicBool,

    /// Make every resolve fail transiently
    pub fail_resolve: Arc<Mutex<Option<String>>>,

    /// Delay applied to every snapshot fetch
    pub fetch_delay: Arc<Mutex<Option<Duration>>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            profiles: Arc::new(Mutex::new(HashMap::new())),
            snapshots: Arc::new(Mutex::new(HashMap::new())),
            fetch_log: Arc::new(Mutex::new(Vec::new())),
            healthy: AtomicBool::new(true),
            fail_resolve: Arc::new(Mutex::new(None)),
            fetch_delay: Arc::new(Mutex::new(None)),
        }
    }

    /// Register a channel that `resolve_channel` will find
    pub fn add_channel(&self, id: &str, login: &str) -> ChannelProfile {
        let profile = ChannelProfile {
            id: ChannelId::new(id),
            login: login.to_lowercase(),
            display_name: login.to_string(),
            avatar_url: Some(format!("https://cdn.example/{}.png", login.to_lowercase())),
        };
        self.profiles
            .lock()
            .unwrap()
            .insert(login.to_lowercase(), profile.clone());
        profile
    }

    /// Replace the script for a channel with a single sticky snapshot
    pub fn set_snapshot(&self, id: &ChannelId, snapshot: Option<StreamSession>) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(id.clone(), VecDeque::from([Ok(snapshot)]));
    }

    /// Make fetches for a channel fail transiently until replaced
    pub fn fail_fetch(&self, id: &ChannelId, message: &str) {
        self.snapshots.lock().unwrap().insert(
            id.clone(),
            VecDeque::from([Err(SourceError::Transient(message.to_string()))]),
        );
    }

    /// Append snapshots to a channel's script
    pub fn push_snapshots(&self, id: &ChannelId, script: impl IntoIterator<Item = Snapshot>) {
        self.snapshots
            .lock()
            .unwrap()
            .entry(id.clone())
            .or_default()
            .extend(script);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Channels fetched so far, in order
    pub fn fetch_log(&self) -> Vec<ChannelId> {
        self.fetch_log.lock().unwrap().clone()
    }

    fn next_snapshot(&self, id: &ChannelId) -> Snapshot {
        let mut snapshots = self.snapshots.lock().unwrap();
        match snapshots.get_mut(id) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Ok(None)),
            Some(queue) => queue.front().cloned().unwrap_or(Ok(None)),
            None => Ok(None),
        }
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamSource for MockSource {
    async fn resolve_channel(&self, handle: &str) -> SourceResult<ChannelProfile> {
        if let Some(message) = self.fail_resolve.lock().unwrap().clone() {
            return Err(SourceError::Transient(message));
        }

        self.profiles
            .lock()
            .unwrap()
            .get(&handle.to_lowercase())
            .cloned()
            .ok_or_else(|| SourceError::NotFound(handle.to_string()))
    }

    async fn fetch_live_snapshot(&self, id: &ChannelId) -> SourceResult<Option<StreamSession>> {
        self.fetch_log.lock().unwrap().push(id.clone());

        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.next_snapshot(id)
    }

    fn channel_url(&self, login: &str) -> String {
        format!("https://stream.example/{}", login)
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

/// Mock sink that records every notification it is handed
pub struct MockSink {
    destinations: Vec<String>,
    failing: Arc<Mutex<HashSet<String>>>,
    received: Arc<Mutex<Vec<LiveNotification>>>,
    delivered: Arc<Mutex<Vec<(String, LiveNotification)>>>,

    /// Delay applied before every delivery
    pub deliver_delay: Arc<Mutex<Option<Duration>>>,
}

impl MockSink {
    /// A sink with a single destination named `default`
    pub fn new() -> Self {
        Self::with_destinations(["default"])
    }

    pub fn with_destinations<I, S>(destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            destinations: destinations.into_iter().map(Into::into).collect(),
            failing: Arc::new(Mutex::new(HashSet::new())),
            received: Arc::new(Mutex::new(Vec::new())),
            delivered: Arc::new(Mutex::new(Vec::new())),
            deliver_delay: Arc::new(Mutex::new(None)),
        }
    }

    /// Make deliveries to one destination fail
    pub fn fail_destination(&self, destination: &str) {
        self.failing.lock().unwrap().insert(destination.to_string());
    }

    /// Every notification passed to `deliver`, regardless of outcome
    pub fn received(&self) -> Vec<LiveNotification> {
        self.received.lock().unwrap().clone()
    }

    /// Successful deliveries as (destination, notification)
    pub fn delivered(&self) -> Vec<(String, LiveNotification)> {
        self.delivered.lock().unwrap().clone()
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for MockSink {
    async fn deliver(&self, notification: &LiveNotification) -> DeliveryReport {
        self.received.lock().unwrap().push(notification.clone());

        let delay = *self.deliver_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self.failing.lock().unwrap().clone();
        let mut report = DeliveryReport::new();
        for destination in &self.destinations {
            if failing.contains(destination) {
                report.record_failure(
                    destination.clone(),
                    SinkError::Rejected {
                        status: 403,
                        body: "Missing Permissions".into(),
                    },
                );
            } else {
                self.delivered
                    .lock()
                    .unwrap()
                    .push((destination.clone(), notification.clone()));
                report.record_success(destination.clone());
            }
        }
        report
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(title: &str) -> StreamSession {
        StreamSession {
            title: title.into(),
            category: "Just Chatting".into(),
            viewer_count: 1,
            thumbnail_url_template: String::new(),
            started_at: None,
        }
    }

    #[tokio::test]
    async fn resolve_is_case_insensitive() {
        let source = MockSource::new();
        source.add_channel("123", "Alice");

        let profile = source.resolve_channel("ALICE").await.unwrap();
        assert_eq!(profile.id, ChannelId::new("123"));
        assert_eq!(profile.login, "alice");

        let err = source.resolve_channel("bob").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn scripted_snapshots_stick_on_last() {
        let source = MockSource::new();
        let id = ChannelId::new("1");
        source.push_snapshots(&id, [Ok(None), Ok(Some(session("a")))]);

        assert_eq!(source.fetch_live_snapshot(&id).await.unwrap(), None);
        let live = source.fetch_live_snapshot(&id).await.unwrap().unwrap();
        assert_eq!(live.title, "a");
        let again = source.fetch_live_snapshot(&id).await.unwrap().unwrap();
        assert_eq!(again.title, "a");

        assert_eq!(source.fetch_log().len(), 3);
    }

    #[tokio::test]
    async fn unscripted_channel_is_offline() {
        let source = MockSource::new();
        let snapshot = source
            .fetch_live_snapshot(&ChannelId::new("nope"))
            .await
            .unwrap();
        assert!(snapshot.is_none());
    }

    #[tokio::test]
    async fn sink_isolates_failing_destination() {
        let sink = MockSink::with_destinations(["a", "b", "c"]);
        sink.fail_destination("b");

        let notification = LiveNotification {
            display_name: "Alice".into(),
            login: "alice".into(),
            url: "https://stream.example/alice".into(),
            title: "hi".into(),
            category: "Chess".into(),
            viewer_count: 1,
            thumbnail_url: String::new(),
            avatar_url: None,
            session_start: None,
        };
        let report = sink.deliver(&notification).await;

        assert_eq!(report.delivered_count(), 2);
        assert_eq!(report.failed_count(), 1);
        let destinations: Vec<_> = sink.delivered().into_iter().map(|(d, _)| d).collect();
        assert_eq!(destinations, vec!["a", "c"]);
        assert_eq!(sink.received().len(), 1);
    }
}
