use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

use super::transaction_repository::CsvTransactionRepository;
use crate::storage::subscriptions::SubscriptionHub;
use crate::storage::traits::Connection;

/// Header row of `transactions.csv`
pub const TRANSACTIONS_HEADER: [&str; 8] =
    ["id", "name", "type", "kind", "amount", "month", "year", "timestamp"];

/// CsvConnection manages the data directory and the transactions file in it
#[derive(Clone)]
pub struct CsvConnection {
    base_directory: PathBuf,
    hub: SubscriptionHub,
    /// Shared by every repository created from this connection or its clones
    write_lock: Arc<Mutex<()>>,
}

impl CsvConnection {
    /// Create a new CSV connection with a base directory
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).with_context(|| {
                format!("Failed to create data directory {}", base_path.display())
            })?;
            info!("Created data directory: {}", base_path.display());
        }

        Ok(Self {
            base_directory: base_path,
            hub: SubscriptionHub::new(),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Get the base directory path
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn hub(&self) -> &SubscriptionHub {
        &self.hub
    }

    /// Hold while reading a snapshot that a concurrent rewrite must not
    /// replace, or while rewriting the transactions file
    pub fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn transactions_file_path(&self) -> PathBuf {
        self.base_directory.join("transactions.csv")
    }

    /// Ensure the transactions file exists with its header row
    pub fn ensure_transactions_file_exists(&self) -> Result<()> {
        let file_path = self.transactions_file_path();

        if !file_path.exists() {
            let header = format!("{}\n", TRANSACTIONS_HEADER.join(","));
            fs::write(&file_path, header)
                .with_context(|| format!("Failed to create {}", file_path.display()))?;
            info!("Created transactions file: {}", file_path.display());
        }

        Ok(())
    }
}

impl Connection for CsvConnection {
    type TransactionRepository = CsvTransactionRepository;

    fn create_transaction_repository(&self) -> Self::TransactionRepository {
        CsvTransactionRepository::new(self.clone())
    }
}
