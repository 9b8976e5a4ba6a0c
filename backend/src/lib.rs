//! # Family Expenses
//!
//! Household expense and income tracking: allow-listed members log
//! transactions, see per-person monthly totals, and compare a rolling window
//! of months by category.
//!
//! ## Architecture
//!
//! ```text
//! io        identity providers, text presentation
//!     ↓
//! domain    access gate, aggregation, analytics, write path, session
//!     ↓
//! storage   TransactionStore trait, memory and CSV stores, subscriptions
//! ```
//!
//! Record and view types shared with any presentation layer live in the
//! `shared` crate.

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::{AnalyticsService, SessionController, TransactionService};
use crate::io::IdentityProvider;
use crate::storage::CsvConnection;

/// Session controller over the CSV store in the configured data directory
pub type CsvSession<P> = SessionController<CsvConnection, P>;

/// Wire up storage and domain services for one session
pub fn initialize_backend<P: IdentityProvider>(
    config: &AppConfig,
    provider: P,
) -> Result<CsvSession<P>> {
    let data_directory = config.data_directory();
    info!("Setting up CSV storage in {}", data_directory.display());
    let connection = Arc::new(
        CsvConnection::new(&data_directory)
            .with_context(|| format!("Cannot open data directory {}", data_directory.display()))?,
    );

    info!("Setting up domain services");
    let transactions = TransactionService::new(
        connection.clone(),
        config.catalog(),
        config.catalog_start_year,
        config.currency_symbol.clone(),
    );
    let analytics = AnalyticsService::new(connection.clone(), config.engine(), config.window_size);

    info!("Setting up session");
    let gate = config.access_gate();
    if gate.is_empty() {
        warn!("Allow-list is empty; every sign-in will be denied");
    } else {
        info!("Allow-list has {} accounts", gate.len());
    }
    Ok(SessionController::new(
        connection,
        provider,
        gate,
        transactions,
        analytics,
    ))
}
