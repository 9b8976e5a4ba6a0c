//! # CSV Storage
//!
//! File-backed transaction store. All records live in one file:
//!
//! ```text
//! data/
//! └── transactions.csv
//! ```
//!
//! Writes go to a temp file that is renamed over the original, so a crash
//! mid-write never leaves a truncated file behind.

pub mod connection;
pub mod transaction_repository;

pub use connection::CsvConnection;
pub use transaction_repository::CsvTransactionRepository;
