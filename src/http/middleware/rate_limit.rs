//! Fixed-window rate limiting per client.

use crate::http::HttpRequest;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    window: u64,
    count: u32,
}

/// Counts requests per client key in fixed windows of `window` length
///
/// Keys from past windows are evicted when the table fills up; the table
/// never holds more than `max_clients` keys. A new client arriving while
/// every slot belongs to the current window is limited.
pub struct FixedWindowLimiter {
    window_secs: u64,
    max_requests: u32,
    max_clients: usize,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl FixedWindowLimiter {
    pub fn new(window: Duration, max_requests: u32, max_clients: usize) -> Self {
        Self {
            window_secs: window.as_secs().max(1),
            max_requests,
            max_clients: max_clients.max(1),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    /// Count one request from `key` now
    pub fn check(&self, key: &str) -> RateDecision {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.check_at(key, now)
    }

    /// Count one request from `key` at `now` (seconds since the epoch)
    pub fn check_at(&self, key: &str, now: u64) -> RateDecision {
        let window = now / self.window_secs;
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if !buckets.contains_key(key) && buckets.len() >= self.max_clients {
            buckets.retain(|_, bucket| bucket.window == window);
            if buckets.len() >= self.max_clients {
                tracing::warn!(
                    clients = buckets.len(),
                    "rate limiter table full; limiting new client"
                );
                return RateDecision::Limited;
            }
        }

        let bucket = buckets
            .entry(key.to_string())
            .or_insert(Bucket { window, count: 0 });
        if bucket.window != window {
            *bucket = Bucket { window, count: 0 };
        }
        bucket.count = bucket.count.saturating_add(1);

        if bucket.count > self.max_requests {
            RateDecision::Limited
        } else {
            RateDecision::Allowed
        }
    }

    pub fn tracked_clients(&self) -> usize {
        match self.buckets.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

/// Client key: first `X-Forwarded-For` hop, then `X-Real-Ip`, else `unknown`
pub fn client_key(req: &HttpRequest) -> String {
    req.header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            req.header("x-real-ip")
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .unwrap_or("unknown")
        .to_string()
}
