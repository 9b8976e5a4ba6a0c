//! In-process transaction store.
//!
//! Keeps every record in memory and pushes changes through the connection's
//! subscription hub. Used as the managed-store stand-in and in tests.

use anyhow::Result;
use async_trait::async_trait;
use shared::{NewTransaction, Period, Transaction, TransactionType};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

use super::subscriptions::{Subscription, SubscriptionHub};
use super::traits::{ChangeListener, Connection, TransactionStore};
use super::{filter_records, unique_transaction_id};

#[derive(Clone, Default)]
pub struct MemoryTransactionStore {
    records: Arc<Mutex<Vec<Transaction>>>,
    hub: SubscriptionHub,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with existing records, kept as they are
    pub fn with_records(records: Vec<Transaction>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            hub: SubscriptionHub::new(),
        }
    }

    pub fn hub(&self) -> &SubscriptionHub {
        &self.hub
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Transaction>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn insert(&self, transaction: NewTransaction) -> Result<String> {
        let period = transaction.period()?;
        let mut records = self.lock();
        let id = unique_transaction_id(
            &records,
            transaction.transaction_type,
            transaction.timestamp.timestamp_millis(),
        );
        records.push(transaction.with_id(id.clone()));
        info!("Stored transaction {} in memory ({} total)", id, records.len());

        let snapshot = filter_records(&records, period, None);
        self.hub.publish(period, &snapshot);
        Ok(id)
    }

    async fn query_by_period_and_type(
        &self,
        period: Period,
        transaction_type: Option<TransactionType>,
    ) -> Result<Vec<Transaction>> {
        Ok(filter_records(&self.lock(), period, transaction_type))
    }

    async fn subscribe(&self, period: Period, on_change: ChangeListener) -> Result<Subscription> {
        let records = self.lock();
        let snapshot = filter_records(&records, period, None);
        Ok(self.hub.register(period, on_change, &snapshot))
    }
}

/// Connection handing out repositories over one shared in-memory store
#[derive(Clone, Default)]
pub struct MemoryConnection {
    store: MemoryTransactionStore,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: MemoryTransactionStore) -> Self {
        Self { store }
    }
}

impl Connection for MemoryConnection {
    type TransactionRepository = MemoryTransactionStore;

    fn create_transaction_repository(&self) -> Self::TransactionRepository {
        self.store.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn new_transaction(
        name: &str,
        transaction_type: TransactionType,
        amount: f64,
        month: u32,
    ) -> NewTransaction {
        NewTransaction {
            name: name.to_string(),
            transaction_type,
            kind: "Groceries".to_string(),
            amount,
            month,
            year: 2025,
            timestamp: Utc.with_ymd_and_hms(2025, month, 3, 9, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_unique_ids() {
        let store = MemoryTransactionStore::new();
        let first = store
            .insert(new_transaction("nir", TransactionType::Expense, -10.0, 2))
            .await
            .unwrap();
        let second = store
            .insert(new_transaction("nir", TransactionType::Expense, -20.0, 2))
            .await
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_query_filters_by_period_and_type() {
        let store = MemoryTransactionStore::new();
        store.insert(new_transaction("nir", TransactionType::Expense, -10.0, 2)).await.unwrap();
        store.insert(new_transaction("dana", TransactionType::Income, 300.0, 2)).await.unwrap();
        store.insert(new_transaction("nir", TransactionType::Expense, -5.0, 3)).await.unwrap();

        let february = Period::new(2, 2025).unwrap();
        let all = store.query_by_period_and_type(february, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let expenses = store
            .query_by_period_and_type(february, Some(TransactionType::Expense))
            .await
            .unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].amount, -10.0);
    }

    #[tokio::test]
    async fn test_subscribe_receives_full_result_set_on_change() {
        let store = MemoryTransactionStore::new();
        let february = Period::new(2, 2025).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let listener: ChangeListener = Arc::new(move |records: &[Transaction]| {
            sink.lock().unwrap().push(records.len());
        });

        let subscription = store.subscribe(february, listener).await.unwrap();
        store.insert(new_transaction("nir", TransactionType::Expense, -10.0, 2)).await.unwrap();
        store.insert(new_transaction("nir", TransactionType::Expense, -10.0, 3)).await.unwrap();
        store.insert(new_transaction("dana", TransactionType::Income, 50.0, 2)).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(subscription.period(), february);
    }

    #[tokio::test]
    async fn test_connection_repositories_share_subscribers() {
        let connection = MemoryConnection::new();
        let writer = connection.create_transaction_repository();
        let reader = connection.create_transaction_repository();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let listener: ChangeListener = Arc::new(move |_records: &[Transaction]| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let _subscription = reader
            .subscribe(Period::new(2, 2025).unwrap(), listener)
            .await
            .unwrap();
        writer.insert(new_transaction("nir", TransactionType::Expense, -1.0, 2)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(reader.hub().active_count(), 1);
    }
}
