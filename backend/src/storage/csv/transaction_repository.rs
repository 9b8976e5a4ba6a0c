use ::csv::{ReaderBuilder, WriterBuilder};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use shared::{NewTransaction, Period, Transaction, TransactionType};
use std::fs::{self, OpenOptions};
use std::io::BufWriter;
use tracing::{debug, info};

use super::connection::{CsvConnection, TRANSACTIONS_HEADER};
use crate::storage::subscriptions::Subscription;
use crate::storage::traits::{ChangeListener, TransactionStore};
use crate::storage::{filter_records, unique_transaction_id};

/// CSV-based transaction repository
#[derive(Clone)]
pub struct CsvTransactionRepository {
    connection: CsvConnection,
}

impl CsvTransactionRepository {
    /// Create a new CSV transaction repository
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    /// Read every transaction from the CSV file
    fn read_transactions(&self) -> Result<Vec<Transaction>> {
        self.connection.ensure_transactions_file_exists()?;

        let file_path = self.connection.transactions_file_path();
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(&file_path)
            .with_context(|| format!("Failed to open {}", file_path.display()))?;

        let mut transactions = Vec::new();
        for (index, result) in csv_reader.deserialize::<Transaction>().enumerate() {
            let transaction: Transaction = result.with_context(|| {
                format!("Malformed record {} in {}", index + 1, file_path.display())
            })?;
            let (id_type, _) = Transaction::parse_id(&transaction.id).with_context(|| {
                format!("Bad transaction ID {:?} in {}", transaction.id, file_path.display())
            })?;
            if id_type != transaction.transaction_type {
                bail!(
                    "Transaction {} is stored as {} in {}",
                    transaction.id,
                    transaction.transaction_type,
                    file_path.display()
                );
            }
            transactions.push(transaction);
        }

        debug!("Read {} transactions from {}", transactions.len(), file_path.display());
        Ok(transactions)
    }

    /// Write all transactions to the CSV file
    fn write_transactions(&self, transactions: &[Transaction]) -> Result<()> {
        let file_path = self.connection.transactions_file_path();

        // Create a temporary file for atomic write
        let temp_path = file_path.with_extension("tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to open {}", temp_path.display()))?;

            let mut csv_writer = WriterBuilder::new()
                .has_headers(false)
                .from_writer(BufWriter::new(file));

            csv_writer.write_record(TRANSACTIONS_HEADER)?;
            for transaction in transactions {
                csv_writer.serialize(transaction)?;
            }

            csv_writer.flush()?;
        }

        // Atomic move from temp to final file
        fs::rename(&temp_path, &file_path)
            .with_context(|| format!("Failed to replace {}", file_path.display()))?;

        Ok(())
    }
}

#[async_trait]
impl TransactionStore for CsvTransactionRepository {
    async fn insert(&self, transaction: NewTransaction) -> Result<String> {
        let period = transaction.period()?;
        let _guard = self.connection.lock_writes();

        let mut transactions = self.read_transactions()?;
        let id = unique_transaction_id(
            &transactions,
            transaction.transaction_type,
            transaction.timestamp.timestamp_millis(),
        );
        transactions.push(transaction.with_id(id.clone()));

        // Keep the file in creation order
        transactions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        self.write_transactions(&transactions)?;
        info!("Stored transaction in CSV: {}", id);

        let snapshot = filter_records(&transactions, period, None);
        self.connection.hub().publish(period, &snapshot);
        Ok(id)
    }

    async fn query_by_period_and_type(
        &self,
        period: Period,
        transaction_type: Option<TransactionType>,
    ) -> Result<Vec<Transaction>> {
        let transactions = self.read_transactions()?;
        Ok(filter_records(&transactions, period, transaction_type))
    }

    async fn subscribe(&self, period: Period, on_change: ChangeListener) -> Result<Subscription> {
        let _guard = self.connection.lock_writes();
        let snapshot = filter_records(&self.read_transactions()?, period, None);
        Ok(self.connection.hub().register(period, on_change, &snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::TestEnvironment;
    use crate::storage::traits::Connection;
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    fn new_transaction(
        name: &str,
        transaction_type: TransactionType,
        amount: f64,
        day: u32,
    ) -> NewTransaction {
        let kind = match transaction_type {
            TransactionType::Expense => "Groceries",
            TransactionType::Income => "Salary",
        };
        NewTransaction {
            name: name.to_string(),
            transaction_type,
            kind: kind.to_string(),
            amount,
            month: 1,
            year: 2025,
            timestamp: Utc.with_ymd_and_hms(2025, 1, day, 8, 30, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_query_round_trip() {
        let env = TestEnvironment::new().unwrap();
        let repository = env.connection.create_transaction_repository();

        let id = repository
            .insert(new_transaction("nir", TransactionType::Expense, -120.5, 4))
            .await
            .unwrap();
        repository
            .insert(new_transaction("dana", TransactionType::Income, 9000.0, 1))
            .await
            .unwrap();

        let january = Period::new(1, 2025).unwrap();
        let all = repository.query_by_period_and_type(january, None).await.unwrap();
        assert_eq!(all.len(), 2);
        // File is kept in creation order
        assert_eq!(all[0].name, "dana");
        assert_eq!(all[1].id, id);
        assert_eq!(all[1].amount, -120.5);
        assert_eq!(all[1].kind, "Groceries");

        let incomes = repository
            .query_by_period_and_type(january, Some(TransactionType::Income))
            .await
            .unwrap();
        assert_eq!(incomes.len(), 1);
        assert_eq!(incomes[0].amount, 9000.0);
    }

    #[tokio::test]
    async fn test_records_survive_reopening_the_directory() {
        let env = TestEnvironment::new().unwrap();
        env.connection
            .create_transaction_repository()
            .insert(new_transaction("nir", TransactionType::Expense, -30.0, 2))
            .await
            .unwrap();

        let reopened = CsvConnection::new(env.base_directory()).unwrap();
        let records = reopened
            .create_transaction_repository()
            .query_by_period_and_type(Period::new(1, 2025).unwrap(), None)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].transaction_type, TransactionType::Expense);
        assert!(!env.base_directory().join("transactions.tmp").exists());
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error_not_an_empty_result() {
        let env = TestEnvironment::new().unwrap();
        let content = concat!(
            "id,name,type,kind,amount,month,year,timestamp\n",
            "x,nir,Expense,Groceries,not-a-number,1,2025,2025-01-01T00:00:00Z\n",
        );
        fs::write(env.connection.transactions_file_path(), content).unwrap();

        let result = env
            .connection
            .create_transaction_repository()
            .query_by_period_and_type(Period::new(1, 2025).unwrap(), None)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ids_must_match_their_record() {
        let env = TestEnvironment::new().unwrap();
        let repository = env.connection.create_transaction_repository();
        let january = Period::new(1, 2025).unwrap();
        let write_row = |id: &str| {
            let content = format!(
                "id,name,type,kind,amount,month,year,timestamp\n\
                 {},nir,Expense,Groceries,-5,1,2025,2025-01-01T00:00:00Z\n",
                id
            );
            fs::write(env.connection.transactions_file_path(), content).unwrap();
        };

        write_row("x");
        let err = repository.query_by_period_and_type(january, None).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid transaction ID format"));

        write_row("transaction::income::1735689600000");
        assert!(repository.query_by_period_and_type(january, None).await.is_err());
    }

    #[tokio::test]
    async fn test_subscribers_see_inserts_from_other_repositories() {
        let env = TestEnvironment::new().unwrap();
        let reader = env.connection.create_transaction_repository();
        let writer = env.connection.create_transaction_repository();
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let sink = sizes.clone();
        let listener: ChangeListener = Arc::new(move |records: &[Transaction]| {
            sink.lock().unwrap().push(records.len());
        });

        let _subscription = reader
            .subscribe(Period::new(1, 2025).unwrap(), listener)
            .await
            .unwrap();
        writer
            .insert(new_transaction("nir", TransactionType::Expense, -1.0, 5))
            .await
            .unwrap();

        assert_eq!(*sizes.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_inserts_from_separate_repositories_all_persist() {
        let env = TestEnvironment::new().unwrap();

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let repository = env.connection.create_transaction_repository();
                tokio::spawn(async move {
                    let name = format!("member{}", i);
                    repository
                        .insert(new_transaction(&name, TransactionType::Expense, -1.0, 3))
                        .await
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap().unwrap());
        }

        let stored = env
            .connection
            .create_transaction_repository()
            .query_by_period_and_type(Period::new(1, 2025).unwrap(), None)
            .await
            .unwrap();
        let stored_ids: HashSet<String> = stored.iter().map(|t| t.id.clone()).collect();

        assert_eq!(ids.len(), 64);
        assert_eq!(stored.len(), 64);
        assert_eq!(stored_ids, ids);
        assert!(!env.base_directory().join("transactions.tmp").exists());
    }
}
