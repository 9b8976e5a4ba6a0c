//! Test infrastructure shared by storage and domain tests.
//!
//! `TestEnvironment` owns a temporary data directory that is removed when it
//! is dropped, even if the test panics. The store wrappers let tests observe
//! or break the store a service talks to.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{NewTransaction, Period, Transaction, TransactionType};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use super::csv::CsvConnection;
use super::subscriptions::{Subscription, SubscriptionHub};
use super::traits::{ChangeListener, Connection, TransactionStore};

/// Temporary data directory plus a CSV connection rooted in it
pub struct TestEnvironment {
    pub connection: CsvConnection,
    /// Base directory path for manual inspection if needed
    pub base_path: std::path::PathBuf,
    _temp_dir: TempDir, // Keep alive to prevent cleanup
}

impl TestEnvironment {
    /// Create a new test environment with a temporary directory
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let connection = CsvConnection::new(temp_dir.path())?;
        Ok(Self {
            connection,
            base_path: temp_dir.path().to_path_buf(),
            _temp_dir: temp_dir,
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_path
    }
}

/// Store whose every operation fails
#[derive(Clone, Default)]
pub struct FailingStore;

#[async_trait]
impl TransactionStore for FailingStore {
    async fn insert(&self, _transaction: NewTransaction) -> Result<String> {
        Err(anyhow!("store unavailable: write rejected"))
    }

    async fn query_by_period_and_type(
        &self,
        _period: Period,
        _transaction_type: Option<TransactionType>,
    ) -> Result<Vec<Transaction>> {
        Err(anyhow!("store unavailable: query rejected"))
    }

    async fn subscribe(&self, _period: Period, _on_change: ChangeListener) -> Result<Subscription> {
        Err(anyhow!("store unavailable: subscription rejected"))
    }
}

impl Connection for FailingStore {
    type TransactionRepository = FailingStore;

    fn create_transaction_repository(&self) -> Self::TransactionRepository {
        self.clone()
    }
}

/// Call counters of a [`CountingStore`]
#[derive(Default)]
pub struct StoreCalls {
    pub inserts: AtomicUsize,
    pub queries: AtomicUsize,
    pub subscribes: AtomicUsize,
}

impl StoreCalls {
    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn subscribes(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    /// Any call at all that would touch stored data
    pub fn data_access(&self) -> usize {
        self.inserts() + self.queries() + self.subscribes()
    }
}

/// Wraps a store and counts every call made through it
#[derive(Clone)]
pub struct CountingStore<S> {
    inner: S,
    calls: Arc<StoreCalls>,
}

impl<S: TransactionStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: Arc::new(StoreCalls::default()),
        }
    }

    pub fn calls(&self) -> Arc<StoreCalls> {
        self.calls.clone()
    }
}

#[async_trait]
impl<S: TransactionStore> TransactionStore for CountingStore<S> {
    async fn insert(&self, transaction: NewTransaction) -> Result<String> {
        self.calls.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(transaction).await
    }

    async fn query_by_period_and_type(
        &self,
        period: Period,
        transaction_type: Option<TransactionType>,
    ) -> Result<Vec<Transaction>> {
        self.calls.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query_by_period_and_type(period, transaction_type).await
    }

    async fn subscribe(&self, period: Period, on_change: ChangeListener) -> Result<Subscription> {
        self.calls.subscribes.fetch_add(1, Ordering::SeqCst);
        self.inner.subscribe(period, on_change).await
    }
}

impl<S: TransactionStore + Clone + 'static> Connection for CountingStore<S> {
    type TransactionRepository = CountingStore<S>;

    fn create_transaction_repository(&self) -> Self::TransactionRepository {
        self.clone()
    }
}

/// Store whose queries for one period wait until the test opens the gate
#[derive(Clone)]
pub struct GatedStore<S> {
    inner: S,
    blocked: Period,
    gate: Arc<Semaphore>,
}

impl<S: TransactionStore> GatedStore<S> {
    pub fn new(inner: S, blocked: Period) -> Self {
        Self {
            inner,
            blocked,
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    /// Let `count` blocked queries through
    pub fn open(&self, count: usize) {
        self.gate.add_permits(count);
    }
}

#[async_trait]
impl<S: TransactionStore> TransactionStore for GatedStore<S> {
    async fn insert(&self, transaction: NewTransaction) -> Result<String> {
        self.inner.insert(transaction).await
    }

    async fn query_by_period_and_type(
        &self,
        period: Period,
        transaction_type: Option<TransactionType>,
    ) -> Result<Vec<Transaction>> {
        if period == self.blocked {
            let _permit = self.gate.acquire().await?;
        }
        self.inner.query_by_period_and_type(period, transaction_type).await
    }

    async fn subscribe(&self, period: Period, on_change: ChangeListener) -> Result<Subscription> {
        self.inner.subscribe(period, on_change).await
    }
}

impl<S: TransactionStore + Clone + 'static> Connection for GatedStore<S> {
    type TransactionRepository = GatedStore<S>;

    fn create_transaction_repository(&self) -> Self::TransactionRepository {
        self.clone()
    }
}

/// Store that accepts subscriptions on a hub the test drives directly
#[derive(Clone, Default)]
pub struct HubOnlyStore {
    pub hub: SubscriptionHub,
}

#[async_trait]
impl TransactionStore for HubOnlyStore {
    async fn insert(&self, _transaction: NewTransaction) -> Result<String> {
        Err(anyhow!("read-only store"))
    }

    async fn query_by_period_and_type(
        &self,
        _period: Period,
        _transaction_type: Option<TransactionType>,
    ) -> Result<Vec<Transaction>> {
        Ok(Vec::new())
    }

    async fn subscribe(&self, period: Period, on_change: ChangeListener) -> Result<Subscription> {
        Ok(self.hub.register(period, on_change, &[]))
    }
}

impl Connection for HubOnlyStore {
    type TransactionRepository = HubOnlyStore;

    fn create_transaction_repository(&self) -> Self::TransactionRepository {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_cleanup() -> Result<()> {
        let base_path;
        {
            let env = TestEnvironment::new()?;
            base_path = env.base_path.clone();
            assert!(base_path.exists());
            // Environment dropped here
        }
        assert!(!base_path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_counting_store_counts_calls() -> Result<()> {
        let env = TestEnvironment::new()?;
        let store = CountingStore::new(env.connection.create_transaction_repository());
        let period = Period::new(4, 2025)?;

        store.query_by_period_and_type(period, None).await?;
        store.query_by_period_and_type(period, Some(TransactionType::Income)).await?;

        let calls = store.calls();
        assert_eq!(calls.queries(), 2);
        assert_eq!(calls.data_access(), 2);
        Ok(())
    }
}
