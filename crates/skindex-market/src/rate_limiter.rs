//! Rate limiting for pricing provider requests.
//!
//! Sliding-window limiter shared by every concurrent valuation: at most
//! `max_requests` slots are handed out per `window`. Callers over the limit
//! suspend until the oldest slot leaves the window; nothing is rejected.
//! One instance is created at startup and injected into the client.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use skindex_telemetry::Metrics;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Rate limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per window. Default: 60.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Window size in milliseconds. Default: 60,000 (1 minute).
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

fn default_max_requests() -> u32 {
    60
}

fn default_window_ms() -> u64 {
    60_000
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
        }
    }
}

/// Sliding-window rate limiter.
pub struct RateLimiter {
    /// Maximum requests per window.
    max_requests: u32,
    /// Window size.
    window: Duration,
    /// Start times of requests still inside the window.
    timestamps: Mutex<VecDeque<Instant>>,
    /// Slots handed out since creation.
    total_acquired: AtomicU64,
    /// Acquisitions that had to wait.
    total_waited: AtomicU64,
}

impl RateLimiter {
    /// Create a new rate limiter.
    ///
    /// # Arguments
    /// * `max_requests` - Maximum requests per window (clamped to at least 1)
    /// * `window` - Window size
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            max_requests,
            window,
            timestamps: Mutex::new(VecDeque::with_capacity(max_requests as usize)),
            total_acquired: AtomicU64::new(0),
            total_waited: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_millis(config.window_ms))
    }

    /// Reserve a slot now, or report how long until one frees up.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut timestamps = self.timestamps.lock();
        Self::evict_expired(&mut timestamps, now, self.window);

        if timestamps.len() < self.max_requests as usize {
            timestamps.push_back(now);
            self.total_acquired.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        let oldest = timestamps.front().copied().unwrap_or(now);
        let wait = self.window.saturating_sub(now.duration_since(oldest));
        Err(wait.max(Duration::from_millis(1)))
    }

    /// Wait until a slot is available, then take it.
    pub async fn acquire(&self) {
        let mut waited = false;
        loop {
            match self.try_acquire() {
                Ok(()) => {
                    if waited {
                        self.total_waited.fetch_add(1, Ordering::Relaxed);
                        Metrics::rate_limit_wait();
                    }
                    return;
                }
                Err(wait) => {
                    if !waited {
                        debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, queueing request");
                    }
                    waited = true;
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Get current request count in window.
    pub fn current_count(&self) -> u32 {
        let mut timestamps = self.timestamps.lock();
        Self::evict_expired(&mut timestamps, Instant::now(), self.window);
        timestamps.len() as u32
    }

    /// Get remaining capacity.
    pub fn remaining_capacity(&self) -> u32 {
        self.max_requests.saturating_sub(self.current_count())
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn total_acquired(&self) -> u64 {
        self.total_acquired.load(Ordering::Relaxed)
    }

    pub fn total_waited(&self) -> u64 {
        self.total_waited.load(Ordering::Relaxed)
    }

    fn evict_expired(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while timestamps
            .front()
            .is_some_and(|&t| now.duration_since(t) >= window)
        {
            timestamps.pop_front();
        }
    }
}
