//! Counter records and the decisions derived from them.

use serde::{Deserialize, Serialize};

/// The per-client counter kept by a [`CounterStore`](super::CounterStore).
///
/// `count` is at least 1 whenever a record exists. `window_expiry` is the
/// epoch second at which the current window ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    /// Client key this record belongs to
    pub key: String,
    /// Requests counted in the current window
    pub count: u64,
    /// End of the current window, in seconds since the epoch
    pub window_expiry: u64,
}

impl CounterRecord {
    /// Create a record for a window that was just started.
    pub fn new(key: impl Into<String>, count: u64, window_expiry: u64) -> Self {
        Self {
            key: key.into(),
            count,
            window_expiry,
        }
    }

    /// Whether the window has elapsed at `now`.
    ///
    /// A request arriving exactly at `window_expiry` still belongs to the
    /// current window.
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.window_expiry
    }

    /// Seconds left until the window ends, zero once it has passed.
    pub fn seconds_until_reset(&self, now: u64) -> u64 {
        self.window_expiry.saturating_sub(now)
    }
}

/// Current wall-clock time in seconds since the epoch.
pub fn now_secs() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// Whether a request may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Within quota
    Allow,
    /// Over quota for the current window
    Deny,
}

/// A client's standing against its quota after a request was counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    /// Configured requests per window
    pub limit: u64,
    /// `limit - count`; negative once the client is over quota
    pub remaining: i64,
    /// Value reported as the reset time, in seconds
    pub reset: u64,
}

/// The result of evaluating one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Allow or deny
    pub outcome: Outcome,
    /// Counter value after this request was counted
    pub count: u64,
    /// Quota status for response metadata
    pub status: QuotaStatus,
}

impl Decision {
    /// Returns `true` if the request may proceed.
    pub fn is_allowed(&self) -> bool {
        self.outcome == Outcome::Allow
    }
}
