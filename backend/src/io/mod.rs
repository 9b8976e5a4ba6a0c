//! # IO Module
//!
//! The edges of the application: where identities come from and how computed
//! views are turned into text.
//!
//! - **identity**: the `IdentityProvider` trait and a static provider used by
//!   the command line and tests
//! - **presentation**: currency/date formatting and plain-text renderers for
//!   the dashboard, analytics and category listings

pub mod identity;
pub mod presentation;

pub use identity::{IdentityProvider, StaticIdentityProvider};
pub use presentation::{format_currency, format_date, Presenter};
