//! Rate limiting logic and state management.

mod counter;
mod descriptor;
mod limiter;
mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use counter::{now_secs, CounterRecord, Decision, Outcome, QuotaStatus};
pub use descriptor::ClientKey;
pub use limiter::{
    LimiterConfig, RateLimiter, ResetStrategy, DEFAULT_MAX_REQUESTS,
    DEFAULT_WINDOW_SECONDS,
};
pub use store::{CounterStore, MemoryStore, StoreError, StoreResult};
