//! Counter storage for rate limit state.
//!
//! The [`CounterStore`] trait is the only state the limiter touches. Each
//! operation must be indivisible with respect to other operations on the
//! same key: the limiter never reads a count, adds to it and writes it
//! back itself.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::counter::{now_secs, CounterRecord};

/// Errors returned by counter stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("counter for key '{0}' already exists")]
    AlreadyExists(String),
    #[error("no counter for key '{0}'")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Key-value storage for counter records.
///
/// Mutating operations return the record as it stands after the update;
/// that count is authoritative for the decision.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Fetch the record for `key`, if any.
    async fn get(&self, key: &str) -> StoreResult<Option<CounterRecord>>;

    /// Insert a new record. Fails with [`StoreError::AlreadyExists`] if one
    /// is already present.
    async fn create(&self, key: &str, count: u64, window_expiry: u64)
        -> StoreResult<CounterRecord>;

    /// Start a new window on an existing record whose window has elapsed
    /// at `now`, setting its count and expiry.
    ///
    /// The expiry check and the write happen as one step. If the window is
    /// live again (a concurrent request already reset it), the record is
    /// incremented instead.
    async fn reset_window(
        &self,
        key: &str,
        count: u64,
        window_expiry: u64,
        now: u64,
    ) -> StoreResult<CounterRecord>;

    /// Add one to the count of an existing record, keeping its expiry.
    async fn increment(&self, key: &str) -> StoreResult<CounterRecord>;
}

/// In-process counter store.
///
/// Backed by a sharded map; every operation holds the shard lock for its
/// key for the whole update.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, CounterRecord>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with room for `capacity` clients.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: DashMap::with_capacity(capacity),
        }
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no records are held.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove records whose window ended more than `grace` seconds before
    /// `now`. Returns the number of records removed.
    ///
    /// Eviction only bounds memory: an evicted client simply starts a new
    /// window on its next request.
    pub fn evict_expired(&self, now: u64, grace: u64) -> usize {
        let mut removed = 0;
        self.records.retain(|_, record| {
            let keep = record.window_expiry.saturating_add(grace) >= now;
            if !keep {
                removed += 1;
            }
            keep
        });

        if removed > 0 {
            debug!(removed, remaining = self.records.len(), "Evicted stale counters");
        }
        removed
    }

    /// Spawn a background task that evicts stale records every `every`.
    ///
    /// The task runs until the returned handle is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration, grace: u64) -> JoinHandle<()> {
        info!(interval = ?every, grace_secs = grace, "Starting counter sweeper");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.evict_expired(now_secs(), grace);
            }
        })
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<CounterRecord>> {
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    async fn create(
        &self,
        key: &str,
        count: u64,
        window_expiry: u64,
    ) -> StoreResult<CounterRecord> {
        match self.records.entry(key.to_string()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(key.to_string())),
            Entry::Vacant(slot) => {
                let record = CounterRecord::new(key, count, window_expiry);
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn reset_window(
        &self,
        key: &str,
        count: u64,
        window_expiry: u64,
        now: u64,
    ) -> StoreResult<CounterRecord> {
        let mut record = self
            .records
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        if record.is_expired(now) {
            record.count = count;
            record.window_expiry = window_expiry;
        } else {
            record.count = record.count.saturating_add(1);
        }
        Ok(record.value().clone())
    }

    async fn increment(&self, key: &str) -> StoreResult<CounterRecord> {
        let mut record = self
            .records
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        record.count = record.count.saturating_add(1);
        Ok(record.value().clone())
    }
}
