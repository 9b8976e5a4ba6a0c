//! Domain-level command types.
//!
//! A `TransactionDraft` is the raw content of the "add transaction" form:
//! strings as typed, nothing validated yet. The transaction service turns it
//! into a stored record or a list of validation errors.

use shared::TransactionType;

use super::errors::ValidationError;

/// Input for recording a new transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub name: String,
    pub transaction_type: String,
    pub category: String,
    /// Magnitude as typed; may carry the currency symbol and thousands separators
    pub amount: String,
}

impl TransactionDraft {
    pub fn new(
        name: impl Into<String>,
        transaction_type: TransactionType,
        category: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            name: name.into(),
            transaction_type: transaction_type.as_str().to_string(),
            category: category.into(),
            amount: amount.to_string(),
        }
    }
}

/// Clean and parse an amount typed by the user
pub fn parse_amount(input: &str, currency_symbol: &str) -> Result<f64, ValidationError> {
    let mut cleaned = input.trim().replace(',', "").replace(' ', "");
    if !currency_symbol.is_empty() {
        cleaned = cleaned.replace(currency_symbol, "");
    }

    if cleaned.is_empty() {
        return Err(ValidationError::InvalidAmountFormat(input.trim().to_string()));
    }

    cleaned
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidAmountFormat(input.trim().to_string()))
}
