use shared::PeriodError;
use thiserror::Error;

/// A single failed precondition of the transaction form
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("name is required")]
    EmptyName,
    #[error("transaction type is required")]
    EmptyType,
    #[error("unknown transaction type '{0}' (expected Expense or Income)")]
    UnknownType(String),
    #[error("category is required")]
    EmptyCategory,
    #[error("'{category}' is not a {transaction_type} category")]
    UnknownCategory {
        category: String,
        transaction_type: String,
    },
    #[error("amount must be a finite number")]
    AmountNotFinite,
    #[error("amount must be greater than zero")]
    AmountNotPositive,
    #[error("'{0}' is not a valid amount")]
    InvalidAmountFormat(String),
    #[error("{year} is before the first tracked year {start_year}")]
    PeriodBeforeCatalogStart { year: i32, start_year: i32 },
}

/// Errors surfaced to the person using the app
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FinanceError {
    #[error("Sign-in failed: {0}")]
    AuthFailure(String),

    #[error("Access denied: your account is not authorized for this application.")]
    AccessDenied { email: Option<String> },

    #[error("Please fill out all fields correctly: {}", join_validation(.0))]
    Validation(Vec<ValidationError>),

    #[error("Failed to add transaction: {0}")]
    Persistence(String),

    #[error("Failed to load transactions: {0}")]
    DataFetch(String),

    #[error(transparent)]
    InvalidPeriod(#[from] PeriodError),

    #[error("Not signed in")]
    NotSignedIn,
}

fn join_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl FinanceError {
    /// Wrap a store write failure, keeping its full cause chain
    pub fn persistence(err: anyhow::Error) -> Self {
        FinanceError::Persistence(format!("{:#}", err))
    }

    /// Wrap a store read failure, keeping its full cause chain
    pub fn data_fetch(err: anyhow::Error) -> Self {
        FinanceError::DataFetch(format!("{:#}", err))
    }

    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            FinanceError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

pub type FinanceResult<T> = Result<T, FinanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_every_field() {
        let err = FinanceError::Validation(vec![
            ValidationError::EmptyName,
            ValidationError::AmountNotPositive,
        ]);
        assert_eq!(
            err.to_string(),
            "Please fill out all fields correctly: \
             name is required; amount must be greater than zero"
        );
        assert_eq!(err.validation_errors().len(), 2);
    }

    #[test]
    fn test_store_errors_keep_their_cause() {
        let cause = anyhow::anyhow!("disk full").context("write transactions.csv");
        let err = FinanceError::persistence(cause);
        assert_eq!(
            err.to_string(),
            "Failed to add transaction: write transactions.csv: disk full"
        );
    }

    #[test]
    fn test_invalid_period_is_transparent() {
        let err: FinanceError = PeriodError::InvalidMonth(13).into();
        assert_eq!(err.to_string(), "Invalid month 13 (expected 1-12)");
    }
}
