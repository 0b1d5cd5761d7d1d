//! Rate limiting middleware.
//!
//! Sliding window per client IP: a client may make `limit` requests within
//! any `window`. A background task prunes expired entries every `window`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;
use crate::http::error::HandlerError;
use crate::observability::metrics;
use crate::routing::Middleware;

/// State for the sliding-window limiter.
pub struct RateLimiter {
    requests: Mutex<HashMap<String, VecDeque<Instant>>>,
    limit: usize,
    window: Duration,
}

fn prune(times: &mut VecDeque<Instant>, cutoff: Instant) {
    while times.front().is_some_and(|t| *t <= cutoff) {
        times.pop_front();
    }
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            limit,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests, Duration::from_secs(config.window_secs))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Instant>>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a request from `key` if it is within the limit.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let cutoff = now.checked_sub(self.window).unwrap_or(now);
        let mut requests = self.lock();
        let times = requests.entry(key.to_string()).or_default();
        prune(times, cutoff);

        if times.len() >= self.limit {
            return false;
        }
        times.push_back(now);
        true
    }

    /// Drop expired timestamps and forget idle clients.
    pub fn cleanup(&self) {
        self.cleanup_at(Instant::now());
    }

    fn cleanup_at(&self, now: Instant) {
        let cutoff = now.checked_sub(self.window).unwrap_or(now);
        let mut requests = self.lock();
        requests.retain(|_, times| {
            prune(times, cutoff);
            !times.is_empty()
        });
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    /// Spawn the periodic cleanup task. It exits on shutdown.
    pub fn spawn_cleanup(self: &Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(limiter.window);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        limiter.cleanup();
                        tracing::trace!(clients = limiter.tracked_clients(), "Rate limiter pruned");
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Rate limiter cleanup stopping");
                        break;
                    }
                }
            }
        })
    }
}

/// Middleware failing the chain for clients over the limit.
pub fn rate_limit_middleware(limiter: Arc<RateLimiter>) -> Middleware {
    Middleware::new(move |req, _res| {
        let key = req
            .peer_addr
            .map(|addr| addr.ip().to_string())
            .unwrap_or_default();

        if limiter.allow(&key) {
            Ok(())
        } else {
            tracing::warn!(client = %key, "Rate limit exceeded");
            metrics::record_rate_limited();
            Err(HandlerError::new("Too Many Requests"))
        }
    })
}
