//! Per-client request limiting for the IPC socket

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::ClientId;

/// Requests per second allowed for each client unless configured otherwise
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 30;

/// A request budget: `burst` requests, refilled continuously over `per`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub burst: u32,
    pub per: Duration,
}

impl RateLimit {
    pub fn per_second(requests: u32) -> Self {
        Self {
            burst: requests,
            per: Duration::from_secs(1),
        }
    }

    fn tokens_per_sec(&self) -> f64 {
        f64::from(self.burst) / self.per.as_secs_f64().max(f64::EPSILON)
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::per_second(DEFAULT_REQUESTS_PER_SECOND)
    }
}

/// Token bucket per connected client.
///
/// A client starts with a full bucket. Buckets are dropped on disconnect.
#[derive(Debug)]
pub struct RateLimiter {
    limit: RateLimit,
    clients: HashMap<ClientId, ClientBucket>,
}

#[derive(Debug)]
struct ClientBucket {
    tokens: f64,
    updated: Instant,
}

impl ClientBucket {
    fn refill(&mut self, limit: &RateLimit, now: Instant) {
        let elapsed = now.saturating_duration_since(self.updated).as_secs_f64();
        self.tokens = (self.tokens + elapsed * limit.tokens_per_sec()).min(f64::from(limit.burst));
        self.updated = now;
    }
}

impl RateLimiter {
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            clients: HashMap::new(),
        }
    }

    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    /// Take one request from the client's budget. `false` means rate limited.
    pub fn check(&mut self, client_id: &ClientId) -> bool {
        self.check_at(client_id, Instant::now())
    }

    /// How long until the client may send again. Zero if it may now.
    pub fn retry_after(&self, client_id: &ClientId) -> Duration {
        self.retry_after_at(client_id, Instant::now())
    }

    /// Forget a client's bucket (on disconnect)
    pub fn remove_client(&mut self, client_id: &ClientId) {
        self.clients.remove(client_id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    fn check_at(&mut self, client_id: &ClientId, now: Instant) -> bool {
        let limit = self.limit;
        let bucket = self
            .clients
            .entry(client_id.clone())
            .or_insert_with(|| ClientBucket {
                tokens: f64::from(limit.burst),
                updated: now,
            });
        bucket.refill(&limit, now);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn retry_after_at(&self, client_id: &ClientId, now: Instant) -> Duration {
        let Some(bucket) = self.clients.get(client_id) else {
            return Duration::ZERO;
        };

        let elapsed = now.saturating_duration_since(bucket.updated).as_secs_f64();
        let tokens = bucket.tokens + elapsed * self.limit.tokens_per_sec();
        if tokens >= 1.0 || self.limit.burst == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64((1.0 - tokens) / self.limit.tokens_per_sec())
    }
}
