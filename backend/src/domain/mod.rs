//! # Domain Module
//!
//! Business rules of the household ledger, independent of any store or UI.
//!
//! ## Module Organization
//!
//! - **access_gate**: allow-list check run on every sign-in
//! - **catalog**: expense and income category catalogs
//! - **aggregation**: pure reductions into totals, rows and category breakdowns
//! - **analytics_service**: store reads for one period or a window of periods
//! - **analytics_panel**: keeps only the newest analytics refresh
//! - **transaction_service**: validation and the write path
//! - **session**: the session state machine tying the rest together
//!
//! ## Business Rules
//!
//! - Expenses are stored negative, incomes positive; totals are magnitudes
//! - A transaction belongs to the period selected when it was written
//! - Nobody outside the allow-list reaches the store
//! - A failed read is reported as a failure, never as zero

pub mod access_gate;
pub mod aggregation;
pub mod analytics_panel;
pub mod analytics_service;
pub mod catalog;
pub mod commands;
pub mod errors;
pub mod session;
pub mod transaction_service;

pub use access_gate::AccessGate;
pub use aggregation::AggregationEngine;
pub use analytics_panel::{AnalyticsPanel, AnalyticsRefresh};
pub use analytics_service::AnalyticsService;
pub use catalog::CategoryCatalog;
pub use commands::{parse_amount, TransactionDraft};
pub use errors::{FinanceError, FinanceResult, ValidationError};
pub use session::{AuthorizedSession, DashboardState, SessionController, SessionEvent, SessionState};
pub use transaction_service::TransactionService;
