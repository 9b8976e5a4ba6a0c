//! Transaction write path: validate a draft, canonicalize it, hand it to the store.

use chrono::{DateTime, Utc};
use shared::{NewTransaction, Period, TransactionType};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::catalog::CategoryCatalog;
use super::commands::{parse_amount, TransactionDraft};
use super::errors::{FinanceError, FinanceResult, ValidationError};
use crate::storage::{Connection, TransactionStore};

#[derive(Clone)]
pub struct TransactionService<C: Connection> {
    transaction_repository: C::TransactionRepository,
    catalog: CategoryCatalog,
    catalog_start_year: i32,
    currency_symbol: String,
}

impl<C: Connection> TransactionService<C> {
    pub fn new(
        connection: Arc<C>,
        catalog: CategoryCatalog,
        catalog_start_year: i32,
        currency_symbol: impl Into<String>,
    ) -> Self {
        let transaction_repository = connection.create_transaction_repository();
        Self {
            transaction_repository,
            catalog,
            catalog_start_year,
            currency_symbol: currency_symbol.into(),
        }
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    /// Check every field of `draft` and build the record it describes.
    ///
    /// All failing fields are reported together.
    pub fn validate(
        &self,
        draft: &TransactionDraft,
        period: Period,
        timestamp: DateTime<Utc>,
    ) -> Result<NewTransaction, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let name = draft.name.trim().to_lowercase();
        if name.is_empty() {
            errors.push(ValidationError::EmptyName);
        }

        let transaction_type = match draft.transaction_type.parse::<TransactionType>() {
            Ok(transaction_type) => Some(transaction_type),
            Err(shared::TransactionTypeError::Empty) => {
                errors.push(ValidationError::EmptyType);
                None
            }
            Err(shared::TransactionTypeError::Unknown(value)) => {
                errors.push(ValidationError::UnknownType(value));
                None
            }
        };

        let category = draft.category.trim().to_string();
        if category.is_empty() {
            errors.push(ValidationError::EmptyCategory);
        } else if let Some(transaction_type) = transaction_type {
            if !self.catalog.contains(transaction_type, &category) {
                errors.push(ValidationError::UnknownCategory {
                    category: category.clone(),
                    transaction_type: transaction_type.to_string(),
                });
            }
        }

        let magnitude = match parse_amount(&draft.amount, &self.currency_symbol) {
            Ok(amount) if !amount.is_finite() => {
                errors.push(ValidationError::AmountNotFinite);
                None
            }
            Ok(amount) if amount <= 0.0 => {
                errors.push(ValidationError::AmountNotPositive);
                None
            }
            Ok(amount) => Some(amount),
            Err(err) => {
                errors.push(err);
                None
            }
        };

        if period.year() < self.catalog_start_year {
            errors.push(ValidationError::PeriodBeforeCatalogStart {
                year: period.year(),
                start_year: self.catalog_start_year,
            });
        }

        match (transaction_type, magnitude) {
            (Some(transaction_type), Some(magnitude)) if errors.is_empty() => Ok(NewTransaction {
                name,
                transaction_type,
                kind: category,
                amount: transaction_type.signed_amount(magnitude),
                month: period.month(),
                year: period.year(),
                timestamp,
            }),
            _ => Err(errors),
        }
    }

    /// Validate `draft`, stamp it with `period` and the current time, and store it
    pub async fn record_transaction(
        &self,
        draft: TransactionDraft,
        period: Period,
    ) -> FinanceResult<String> {
        info!(
            "Recording {} transaction for {} in {}",
            draft.transaction_type,
            draft.name.trim(),
            period
        );

        let transaction = self.validate(&draft, period, Utc::now()).map_err(|errors| {
            warn!("Rejected transaction draft: {} validation errors", errors.len());
            FinanceError::Validation(errors)
        })?;

        let id = self
            .transaction_repository
            .insert(transaction)
            .await
            .map_err(|e| {
                error!("Failed to store transaction: {:#}", e);
                FinanceError::persistence(e)
            })?;

        info!("Transaction added: {}", id);
        Ok(id)
    }
}
