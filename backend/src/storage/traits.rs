//! # Storage Traits
//!
//! This module defines the storage abstraction traits that allow different
//! storage backends to be used interchangeably in the domain layer.

use anyhow::Result;
use async_trait::async_trait;
use shared::{NewTransaction, Period, Transaction, TransactionType};
use std::sync::Arc;

use super::subscriptions::Subscription;

/// Callback receiving the full result set of a subscribed period on every change
pub type ChangeListener = Arc<dyn Fn(&[Transaction]) + Send + Sync>;

/// Trait defining the interface for transaction storage operations
///
/// Implementations stand in for the managed document store: durable,
/// queryable by period and type, and able to push the current result set of a
/// period to subscribers whenever it changes.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Store a new transaction and return the ID it was assigned
    async fn insert(&self, transaction: NewTransaction) -> Result<String>;

    /// List the transactions of one period, optionally restricted to one type
    async fn query_by_period_and_type(
        &self,
        period: Period,
        transaction_type: Option<TransactionType>,
    ) -> Result<Vec<Transaction>>;

    /// Register `on_change` for `period`.
    ///
    /// The listener is called once with the current result set before this
    /// returns, then again after every change to the period. It must not call
    /// back into the store. Dropping the returned handle unsubscribes.
    async fn subscribe(&self, period: Period, on_change: ChangeListener) -> Result<Subscription>;
}

/// Trait defining the interface for storage connections
///
/// This trait abstracts away the specific connection type (in-memory, CSV, etc.)
/// and provides factory methods for creating repositories. Repositories created
/// from one connection share data and subscribers.
pub trait Connection: Send + Sync + Clone {
    /// The type of TransactionStore this connection creates
    type TransactionRepository: TransactionStore + Clone + 'static;

    /// Create a new transaction repository for this connection
    fn create_transaction_repository(&self) -> Self::TransactionRepository;
}
