//! # Storage Module
//!
//! Adapters for the transaction record store.
//!
//! The domain layer only sees the [`TransactionStore`] trait: insert a record,
//! query one period (optionally one type), and subscribe to a period's result
//! set. Two backends implement it:
//!
//! - **memory**: process-local store standing in for the managed document store
//! - **csv**: a single `transactions.csv` in the data directory, rewritten
//!   atomically on every insert
//!
//! Both share a [`SubscriptionHub`] per connection so every repository created
//! from one connection sees the same subscribers.

pub mod csv;
pub mod memory;
pub mod subscriptions;
pub mod traits;

#[cfg(test)]
pub mod test_utils;

pub use self::csv::{CsvConnection, CsvTransactionRepository};
pub use self::memory::{MemoryConnection, MemoryTransactionStore};
pub use subscriptions::{Subscription, SubscriptionHub};
pub use traits::{ChangeListener, Connection, TransactionStore};

use shared::{Transaction, TransactionType};
use tracing::info;

/// Pick a transaction ID not used by `existing`.
///
/// IDs embed the creation millisecond; on a clash the millisecond is bumped
/// until the ID is unique.
pub(crate) fn unique_transaction_id(
    existing: &[Transaction],
    transaction_type: TransactionType,
    epoch_millis: i64,
) -> String {
    let mut millis = epoch_millis;
    loop {
        let candidate = Transaction::generate_id(transaction_type, millis);
        if !existing.iter().any(|t| t.id == candidate) {
            if millis != epoch_millis {
                info!("Resolved transaction ID conflict: bumped {} ms", millis - epoch_millis);
            }
            return candidate;
        }
        millis += 1;
    }
}

/// Records of `period` (and `transaction_type`, if given) out of `all`
pub(crate) fn filter_records(
    all: &[Transaction],
    period: shared::Period,
    transaction_type: Option<TransactionType>,
) -> Vec<Transaction> {
    all.iter()
        .filter(|t| t.belongs_to(period))
        .filter(|t| transaction_type.map_or(true, |ty| t.transaction_type == ty))
        .cloned()
        .collect()
}
