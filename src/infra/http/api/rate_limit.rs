use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Counter bumped for every rejected request.
pub const RATE_LIMITED_TOTAL: &str = "chaptrack_rate_limited_total";

/// Outcome of a rate-limit check for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: u64 },
}

/// Sliding-window limiter keyed by client address.
#[derive(Debug, Clone)]
pub struct ApiRateLimiter {
    window: Duration,
    max_requests: u32,
    buckets: Arc<DashMap<String, Vec<Instant>>>,
}

impl ApiRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            buckets: Arc::new(DashMap::new()),
        }
    }

    pub fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        let window = self.window;

        let mut entry = self.buckets.entry(client.to_string()).or_default();
        entry.retain(|instant| now.duration_since(*instant) < window);

        let used = u32::try_from(entry.len()).unwrap_or(u32::MAX);
        let remaining = self.max_requests.saturating_sub(used);
        if remaining == 0 {
            let retry_after = entry
                .first()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            return RateDecision::Limited {
                retry_after_secs: ceil_secs(retry_after),
            };
        }

        entry.push(now);
        // after push, one fewer slot remains
        RateDecision::Allowed {
            remaining: remaining.saturating_sub(1),
        }
    }

    /// Drop clients whose whole history fell out of the window.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let window = self.window;
        let before = self.buckets.len();
        self.buckets.retain(|_, hits| {
            hits.retain(|instant| now.duration_since(*instant) < window);
            !hits.is_empty()
        });
        before.saturating_sub(self.buckets.len())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn limit(&self) -> u32 {
        self.max_requests
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    let secs = if duration.subsec_nanos() > 0 { secs + 1 } else { secs };
    secs.max(1)
}
