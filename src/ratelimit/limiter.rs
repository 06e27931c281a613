//! Core fixed-window rate limiter.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::{Result, TollgateError};

use super::counter::{now_secs, CounterRecord, Decision, Outcome, QuotaStatus};
use super::descriptor::ClientKey;
use super::store::{CounterStore, StoreError, StoreResult};

/// Default number of requests allowed per window.
pub const DEFAULT_MAX_REQUESTS: u64 = 100;
/// Default window length in seconds.
pub const DEFAULT_WINDOW_SECONDS: u64 = 900;

/// What the reported reset value means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetStrategy {
    /// The configured window length, whatever the position in the window
    #[default]
    Window,
    /// Seconds left until the client's current window ends
    Remaining,
}

/// Configuration for a rate limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterConfig {
    /// Maximum requests allowed in one window
    pub max_requests: u64,
    /// Window length in seconds
    pub window_seconds: u64,
    /// How the reset value is computed
    pub reset_strategy: ResetStrategy,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_seconds: DEFAULT_WINDOW_SECONDS,
            reset_strategy: ResetStrategy::default(),
        }
    }
}

impl LimiterConfig {
    /// Create a configuration with the default reset strategy.
    pub fn new(max_requests: u64, window_seconds: u64) -> Self {
        Self {
            max_requests,
            window_seconds,
            reset_strategy: ResetStrategy::default(),
        }
    }

    /// Set the reset strategy.
    pub fn with_reset_strategy(mut self, reset_strategy: ResetStrategy) -> Self {
        self.reset_strategy = reset_strategy;
        self
    }

    /// Reject zero limits and zero-length windows.
    pub fn validate(&self) -> Result<()> {
        if self.max_requests == 0 {
            return Err(TollgateError::Config(
                "max_requests must be greater than zero".to_string(),
            ));
        }
        if self.window_seconds == 0 {
            return Err(TollgateError::Config(
                "window_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-client fixed-window rate limiter.
///
/// The limiter keeps no state of its own; every counter lives in the
/// injected [`CounterStore`]. It is safe to share across tasks.
pub struct RateLimiter {
    /// Counter storage
    store: Arc<dyn CounterStore>,
    /// Quota applied to every client
    config: LimiterConfig,
}

impl RateLimiter {
    /// Create a new rate limiter over `store`.
    ///
    /// Fails if the configuration allows no requests or has an empty window.
    pub fn new(store: Arc<dyn CounterStore>, config: LimiterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// The configuration this limiter enforces.
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Count a request from `client` against the wall clock.
    pub async fn check(&self, client: &ClientKey) -> Result<Decision> {
        self.evaluate(client.as_str(), now_secs()).await
    }

    /// Count a request from `client_key` arriving at `now` (epoch seconds)
    /// and decide whether it may proceed.
    ///
    /// Every await point is a single store operation, so dropping the
    /// returned future never leaves a partial update behind. Store failures
    /// abort the evaluation without a decision.
    pub async fn evaluate(&self, client_key: &str, now: u64) -> Result<Decision> {
        let window_expiry = now.saturating_add(self.config.window_seconds);

        trace!(key = %client_key, now, "Evaluating rate limit");

        let record = match self.store.get(client_key).await? {
            None => {
                debug!(key = %client_key, window_expiry, "Starting new rate limit window");
                self.start_window(client_key, window_expiry).await?
            }
            Some(record) if record.is_expired(now) => {
                debug!(
                    key = %client_key,
                    previous_count = record.count,
                    window_expiry,
                    "Window elapsed, resetting counter"
                );
                match self.store.reset_window(client_key, 1, window_expiry, now).await {
                    Err(StoreError::NotFound(_)) => {
                        debug!(key = %client_key, "Counter removed before reset, starting new window");
                        self.start_window(client_key, window_expiry).await?
                    }
                    other => other?,
                }
            }
            Some(_) => match self.store.increment(client_key).await {
                Err(StoreError::NotFound(_)) => {
                    debug!(key = %client_key, "Counter removed before increment, starting new window");
                    self.start_window(client_key, window_expiry).await?
                }
                other => other?,
            },
        };

        let decision = self.decide(&record, now);
        if !decision.is_allowed() {
            debug!(
                key = %client_key,
                count = record.count,
                limit = self.config.max_requests,
                "Rate limit exceeded"
            );
        }
        Ok(decision)
    }

    /// Create the first record of a window. If a concurrent request got
    /// there first, this request is counted against that record instead.
    /// If that record is evicted before the increment, creation is tried
    /// once more.
    async fn start_window(&self, key: &str, window_expiry: u64) -> StoreResult<CounterRecord> {
        match self.store.create(key, 1, window_expiry).await {
            Err(StoreError::AlreadyExists(_)) => {
                debug!(key = %key, "Counter created concurrently, incrementing instead");
                match self.store.increment(key).await {
                    Err(StoreError::NotFound(_)) => {
                        debug!(key = %key, "Counter removed before increment, creating again");
                        self.store.create(key, 1, window_expiry).await
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    fn decide(&self, record: &CounterRecord, now: u64) -> Decision {
        let outcome = if record.count > self.config.max_requests {
            Outcome::Deny
        } else {
            Outcome::Allow
        };

        let reset = match self.config.reset_strategy {
            ResetStrategy::Window => self.config.window_seconds,
            ResetStrategy::Remaining => record.seconds_until_reset(now),
        };

        Decision {
            outcome,
            count: record.count,
            status: QuotaStatus {
                limit: self.config.max_requests,
                remaining: signed(self.config.max_requests).saturating_sub(signed(record.count)),
                reset,
            },
        }
    }
}

fn signed(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
