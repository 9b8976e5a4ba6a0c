//! # Aggregation Engine
//!
//! Pure reductions from raw transaction records to the views the dashboard
//! and analytics panel show. Nothing here touches a store or keeps state
//! between calls; the same records always produce the same output.
//!
//! ## Sign handling
//!
//! Expenses are stored negative, but every total reported here is a
//! magnitude: expense contributions use `|amount|`. Income contributions use
//! the stored amount as-is.
//!
//! ## Missing data
//!
//! - Configured household members appear in every per-user map, at zero if
//!   they logged nothing.
//! - Every catalog expense category appears in a category breakdown, at zero
//!   if unused.
//! - Users and categories found in the data but not configured are added as
//!   they are met.

use shared::{
    CategoryTotals, MonthlyOverview, MonthlyTotals, Period, PeriodComparison, Transaction,
    TransactionRow, TransactionType, UserTotals,
};
use std::collections::BTreeSet;
use tracing::debug;

/// Reduces transaction records into totals, rows and category breakdowns
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationEngine {
    members: Vec<String>,
    expense_categories: Vec<String>,
    large_expense_threshold: f64,
}

impl AggregationEngine {
    pub fn new(
        members: Vec<String>,
        expense_categories: Vec<String>,
        large_expense_threshold: f64,
    ) -> Self {
        Self {
            members,
            expense_categories,
            large_expense_threshold,
        }
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Per-user expense and income totals of `period`.
    ///
    /// Records from other periods are ignored.
    pub fn monthly_totals(&self, period: Period, records: &[Transaction]) -> MonthlyTotals {
        let mut expenses = UserTotals::seeded(self.members.iter().cloned());
        let mut incomes = UserTotals::seeded(self.members.iter().cloned());

        for record in records {
            if !record.belongs_to(period) {
                debug!("Skipping {} outside {}", record.id, period);
                continue;
            }
            match record.transaction_type {
                TransactionType::Expense => expenses.add(&record.name, record.magnitude()),
                TransactionType::Income => incomes.add(&record.name, record.amount),
            }
        }

        MonthlyTotals {
            period,
            expenses,
            incomes,
        }
    }

    /// Table rows, newest first
    pub fn transaction_rows(&self, records: &[Transaction]) -> Vec<TransactionRow> {
        let mut rows: Vec<TransactionRow> = records
            .iter()
            .map(|record| TransactionRow {
                id: record.id.clone(),
                timestamp: record.timestamp,
                user: record.name.clone(),
                transaction_type: record.transaction_type,
                category: record.kind.clone(),
                amount: record.amount,
                large_expense: record.transaction_type == TransactionType::Expense
                    && record.magnitude() > self.large_expense_threshold,
            })
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows
    }

    pub fn monthly_overview(&self, period: Period, records: &[Transaction]) -> MonthlyOverview {
        let in_period: Vec<Transaction> = records
            .iter()
            .filter(|r| r.belongs_to(period))
            .cloned()
            .collect();
        MonthlyOverview {
            totals: self.monthly_totals(period, &in_period),
            rows: self.transaction_rows(&in_period),
        }
    }

    /// Expense magnitude per category and user, accumulated over every
    /// record given.
    ///
    /// Income records are ignored. Every row ends up holding every user seen
    /// in the window plus the configured members.
    pub fn category_breakdown<'a, I>(&self, records: I) -> CategoryTotals
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut totals = CategoryTotals::default();
        for category in &self.expense_categories {
            totals.entry_mut(category);
        }

        let mut users: BTreeSet<String> = self.members.iter().cloned().collect();
        for record in records {
            if record.transaction_type != TransactionType::Expense {
                continue;
            }
            users.insert(record.name.clone());
            *totals
                .entry_mut(&record.kind)
                .entry(record.name.clone())
                .or_insert(0.0) += record.magnitude();
        }

        for row in &mut totals.categories {
            for user in &users {
                row.by_user.entry(user.clone()).or_insert(0.0);
            }
        }
        totals
    }

    /// Income, expenses and net of one period
    pub fn comparison(&self, period: Period, records: &[Transaction]) -> PeriodComparison {
        let totals = self.monthly_totals(period, records);
        PeriodComparison {
            period,
            label: period.label(),
            total_income: totals.incomes.total,
            total_expenses: totals.expenses.total,
            net: totals.net(),
        }
    }
}
