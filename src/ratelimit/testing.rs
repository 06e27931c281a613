//! Store doubles for exercising failure and race paths.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Barrier;

use super::counter::CounterRecord;
use super::store::{CounterStore, MemoryStore, StoreError, StoreResult};

/// How a [`FaultyStore`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultMode {
    /// Every operation fails
    FailAll,
    /// Reads succeed, every write fails
    FailWrites,
    /// Reads always report the key as absent
    StaleReads,
    /// Reads always report a live record, whatever the store holds
    PhantomReads,
    /// Reads always report an expired record, whatever the store holds
    ExpiredPhantomReads,
    /// Reads report the key as absent and the first create reports a
    /// collision without inserting anything
    SpuriousCollision,
}

/// A [`MemoryStore`] wrapper that injects faults.
pub struct FaultyStore {
    pub inner: MemoryStore,
    mode: FaultMode,
    collided: AtomicBool,
}

impl FaultyStore {
    pub fn new(mode: FaultMode) -> Self {
        Self {
            inner: MemoryStore::new(),
            mode,
            collided: AtomicBool::new(false),
        }
    }

    fn unavailable() -> StoreError {
        StoreError::Unavailable("injected fault".to_string())
    }

    fn check_write(&self) -> StoreResult<()> {
        match self.mode {
            FaultMode::FailAll | FaultMode::FailWrites => Err(Self::unavailable()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl CounterStore for FaultyStore {
    async fn get(&self, key: &str) -> StoreResult<Option<CounterRecord>> {
        match self.mode {
            FaultMode::FailAll => Err(Self::unavailable()),
            FaultMode::StaleReads | FaultMode::SpuriousCollision => Ok(None),
            FaultMode::PhantomReads => Ok(Some(CounterRecord::new(key, 1, u64::MAX))),
            FaultMode::ExpiredPhantomReads => Ok(Some(CounterRecord::new(key, 5, 0))),
            FaultMode::FailWrites => self.inner.get(key).await,
        }
    }

    async fn create(
        &self,
        key: &str,
        count: u64,
        window_expiry: u64,
    ) -> StoreResult<CounterRecord> {
        self.check_write()?;
        if self.mode == FaultMode::SpuriousCollision && !self.collided.swap(true, Ordering::SeqCst)
        {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        self.inner.create(key, count, window_expiry).await
    }

    async fn reset_window(
        &self,
        key: &str,
        count: u64,
        window_expiry: u64,
        now: u64,
    ) -> StoreResult<CounterRecord> {
        self.check_write()?;
        self.inner.reset_window(key, count, window_expiry, now).await
    }

    async fn increment(&self, key: &str) -> StoreResult<CounterRecord> {
        self.check_write()?;
        self.inner.increment(key).await
    }
}

/// A [`MemoryStore`] wrapper whose reads wait until `parties` callers are
/// reading at once, so every caller sees the same snapshot.
pub struct GatedStore {
    pub inner: MemoryStore,
    gate: Barrier,
}

impl GatedStore {
    pub fn new(parties: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            gate: Barrier::new(parties),
        }
    }
}

#[async_trait]
impl CounterStore for GatedStore {
    async fn get(&self, key: &str) -> StoreResult<Option<CounterRecord>> {
        let snapshot = self.inner.get(key).await?;
        self.gate.wait().await;
        Ok(snapshot)
    }

    async fn create(
        &self,
        key: &str,
        count: u64,
        window_expiry: u64,
    ) -> StoreResult<CounterRecord> {
        self.inner.create(key, count, window_expiry).await
    }

    async fn reset_window(
        &self,
        key: &str,
        count: u64,
        window_expiry: u64,
        now: u64,
    ) -> StoreResult<CounterRecord> {
        self.inner.reset_window(key, count, window_expiry, now).await
    }

    async fn increment(&self, key: &str) -> StoreResult<CounterRecord> {
        self.inner.increment(key).await
    }
}
