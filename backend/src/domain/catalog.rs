//! Fixed category catalogs, one per transaction type.

use shared::TransactionType;

pub const DEFAULT_EXPENSE_CATEGORIES: [&str; 10] = [
    "Groceries",
    "Cloth",
    "Bills Pay",
    "Mortgage Pay",
    "Restaurant",
    "Food Orders",
    "Waste",
    "Home Equipment",
    "Sports",
    "One-Time Expenses",
];

pub const DEFAULT_INCOME_CATEGORIES: [&str; 3] = ["Salary", "Debt", "Other Income"];

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCatalog {
    expense: Vec<String>,
    income: Vec<String>,
}

impl CategoryCatalog {
    pub fn new(expense: Vec<String>, income: Vec<String>) -> Self {
        Self { expense, income }
    }

    /// Categories of one type, in display order
    pub fn categories_for(&self, transaction_type: TransactionType) -> &[String] {
        match transaction_type {
            TransactionType::Expense => &self.expense,
            TransactionType::Income => &self.income,
        }
    }

    /// Exact-match lookup within one type's catalog
    pub fn contains(&self, transaction_type: TransactionType, category: &str) -> bool {
        self.categories_for(transaction_type)
            .iter()
            .any(|c| c == category)
    }

    /// Categories listed in both catalogs
    pub fn overlapping(&self) -> Vec<&str> {
        self.expense
            .iter()
            .filter(|c| self.income.contains(c))
            .map(String::as_str)
            .collect()
    }
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self::new(
            DEFAULT_EXPENSE_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            DEFAULT_INCOME_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalogs_are_disjoint() {
        let catalog = CategoryCatalog::default();
        assert!(catalog.overlapping().is_empty());
        assert_eq!(catalog.categories_for(TransactionType::Expense).len(), 10);
        assert_eq!(catalog.categories_for(TransactionType::Income)[0], "Salary");
    }

    #[test]
    fn test_contains_is_per_type() {
        let catalog = CategoryCatalog::default();
        assert!(catalog.contains(TransactionType::Expense, "Sports"));
        assert!(catalog.contains(TransactionType::Income, "Debt"));
        assert!(!catalog.contains(TransactionType::Expense, "Lottery"));
        assert!(!catalog.contains(TransactionType::Income, "Groceries"));
    }
}
