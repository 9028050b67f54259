//! Rate limiter for failed sign-in attempts

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::SignInConfig;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Failed attempts allowed within one window
    pub max_attempts: u32,
    /// Window over which failures are counted
    pub window: Duration,
    /// How long a key stays locked once it exceeds the limit
    pub lockout: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(300),  // 5 minutes
            lockout: Duration::from_secs(900), // 15 minutes
        }
    }
}

impl From<&SignInConfig> for RateLimiterConfig {
    fn from(config: &SignInConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            window: Duration::from_secs(config.window_secs),
            lockout: Duration::from_secs(config.lockout_secs),
        }
    }
}

/// Failures recorded for one key
#[derive(Debug)]
struct FailureEntry {
    /// Failed attempts in the current window
    failures: u32,
    /// Start of the current window
    window_start: Instant,
    /// Set once the key exceeded the limit
    locked_until: Option<Instant>,
}

impl FailureEntry {
    /// Whether the entry still affects a decision at `now`. Locked entries
    /// live until the lockout ends, the others until their window closes.
    fn is_live(&self, now: Instant, config: &RateLimiterConfig) -> bool {
        match self.locked_until {
            Some(until) => now < until,
            None => now.saturating_duration_since(self.window_start) < config.window,
        }
    }
}

/// Counts failed attempts per key and locks keys that fail too often
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Limits applied to every key
    config: RateLimiterConfig,
    /// Failure state per key
    entries: Arc<Mutex<HashMap<String, FailureEntry>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Whether `key` may attempt again
    pub async fn is_allowed(&self, key: &str) -> bool {
        self.is_allowed_at(key, Instant::now()).await
    }

    /// Record a failed attempt for `key`
    pub async fn record_failure(&self, key: &str) {
        self.record_failure_at(key, Instant::now()).await
    }

    /// Forget all failures of `key`
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    async fn is_allowed_at(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.entries.lock().await;
        self.prune(&mut entries, now);

        !entries
            .get(key)
            .and_then(|entry| entry.locked_until)
            .is_some_and(|until| now < until)
    }

    async fn record_failure_at(&self, key: &str, now: Instant) {
        let mut entries = self.entries.lock().await;
        self.prune(&mut entries, now);

        let entry = entries.entry(key.to_string()).or_insert(FailureEntry {
            failures: 0,
            window_start: now,
            locked_until: None,
        });

        entry.failures += 1;
        if entry.failures >= self.config.max_attempts && entry.locked_until.is_none() {
            entry.locked_until = Some(now + self.config.lockout);
            warn!(
                "Locked sign-in for {} for {} seconds",
                key,
                self.config.lockout.as_secs()
            );
        }
    }

    /// Drop entries whose window closed without a lockout and entries whose
    /// lockout ended
    fn prune(&self, entries: &mut HashMap<String, FailureEntry>, now: Instant) {
        entries.retain(|_, entry| entry.is_live(now, &self.config));
    }
}
