use crate::clock::SharedClock;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Client id used when a request carries no forwarding address.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

#[derive(Debug, Clone, Copy)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

/// Per-client request counter.
///
/// A client's window restarts on the first check that finds it older than
/// `window_duration`, not on a fixed schedule, so a burst straddling a reset can
/// get up to twice `max_requests` through in a short span.
pub struct RateLimiter {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
    max_requests: u32,
    window_duration: chrono::Duration,
    clock: SharedClock,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_duration: chrono::Duration, clock: SharedClock) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_requests,
            window_duration,
            clock,
        }
    }

    /// Counts one request for `client_id` and reports whether it is within quota.
    pub fn check(&self, client_id: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let entry = entries
            .entry(client_id.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                window_start: now,
            });

        if now - entry.window_start > self.window_duration {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count = entry.count.saturating_add(1);
        let allowed = entry.count <= self.max_requests;
        if !allowed {
            tracing::warn!(client = client_id, count = entry.count, "rate limit exceeded");
        }
        allowed
    }

    /// Drops clients whose window has already expired and returns how many were removed.
    ///
    /// An expired entry would be reset on its next check anyway, so removing it
    /// does not change any future decision.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| now - entry.window_start <= self.window_duration);
        before - entries.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.entries.lock().len()
    }
}
