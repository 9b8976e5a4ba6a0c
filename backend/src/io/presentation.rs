//! Plain-text rendering of dashboard, analytics and catalog views.
//!
//! Everything here is formatting only: the numbers come fully computed from
//! the aggregation engine.

use chrono::{DateTime, TimeZone};
use shared::{AnalyticsView, MonthlyOverview, TransactionType, UserTotals};
use std::fmt::{Display, Write};

use crate::domain::catalog::CategoryCatalog;

/// Text renderer with a fixed currency symbol
#[derive(Debug, Clone)]
pub struct Presenter {
    currency_symbol: String,
}

impl Presenter {
    pub fn new(currency_symbol: impl Into<String>) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
        }
    }

    pub fn format_currency(&self, amount: f64) -> String {
        format_currency(amount, &self.currency_symbol)
    }

    /// Per-user totals, transaction table and net of one period
    pub fn render_overview(&self, overview: &MonthlyOverview) -> String {
        let mut out = String::new();
        let totals = &overview.totals;

        let _ = writeln!(out, "{}", totals.period.label());
        let _ = writeln!(out);
        self.write_user_totals(&mut out, "Expenses", &totals.expenses);
        self.write_user_totals(&mut out, "Incomes", &totals.incomes);
        let _ = writeln!(out, "Net: {}", self.format_currency(totals.net()));
        let _ = writeln!(out);

        if overview.rows.is_empty() {
            let _ = writeln!(out, "No transactions");
            return out;
        }

        let _ = writeln!(
            out,
            "  {:<10}  {:<10}  {:<8}  {:<18}  {:>14}",
            "Date", "User", "Type", "Category", "Amount"
        );
        for row in &overview.rows {
            let marker = if row.large_expense { '*' } else { ' ' };
            let _ = writeln!(
                out,
                "{} {:<10}  {:<10}  {:<8}  {:<18}  {:>14}",
                marker,
                format_date(&row.timestamp),
                row.user,
                row.transaction_type,
                row.category,
                self.format_currency(row.amount),
            );
        }
        if overview.rows.iter().any(|r| r.large_expense) {
            let _ = writeln!(out, "* large expense");
        }
        out
    }

    fn write_user_totals(&self, out: &mut String, title: &str, totals: &UserTotals) {
        let _ = writeln!(out, "{}: {}", title, self.format_currency(totals.total));
        for (user, amount) in &totals.by_user {
            let _ = writeln!(out, "  {:<12} {:>14}", user, self.format_currency(*amount));
        }
    }

    /// Comparison cards followed by the category trend table
    pub fn render_analytics(&self, view: &AnalyticsView) -> String {
        let mut out = String::new();

        for card in &view.comparisons {
            let _ = writeln!(out, "{}", card.label);
            let _ = writeln!(out, "  Income:   {:>14}", self.format_currency(card.total_income));
            let _ = writeln!(out, "  Expenses: {:>14}", self.format_currency(card.total_expenses));
            let _ = writeln!(out, "  Net:      {:>14}", self.format_currency(card.net));
        }

        let users: Vec<&String> = view
            .categories
            .categories
            .first()
            .map(|c| c.by_user.keys().collect())
            .unwrap_or_default();

        let _ = writeln!(out);
        let _ = write!(out, "{:<18}", "Category");
        for user in &users {
            let _ = write!(out, "  {:>12}", user);
        }
        let _ = writeln!(out);
        for row in &view.categories.categories {
            let _ = write!(out, "{:<18}", row.category);
            for user in &users {
                let amount = row.by_user.get(*user).copied().unwrap_or(0.0);
                let _ = write!(out, "  {:>12}", self.format_currency(amount));
            }
            let _ = writeln!(out);
        }
        out
    }

    /// Catalog listing, optionally restricted to one type
    pub fn render_categories(
        &self,
        catalog: &CategoryCatalog,
        transaction_type: Option<TransactionType>,
    ) -> String {
        let mut out = String::new();
        let types: Vec<TransactionType> = match transaction_type {
            Some(ty) => vec![ty],
            None => TransactionType::ALL.to_vec(),
        };
        for ty in types {
            let _ = writeln!(out, "{}:", ty);
            for category in catalog.categories_for(ty) {
                let _ = writeln!(out, "  {}", category);
            }
        }
        out
    }
}

/// Two decimals with thousands separators; the sign goes before the symbol
pub fn format_currency(amount: f64, symbol: &str) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{}{}.{:02}", sign, symbol, grouped, cents % 100)
}

/// Day-first date, e.g. "05.01.2025"
pub fn format_date<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    timestamp.format("%d.%m.%Y").to_string()
}
