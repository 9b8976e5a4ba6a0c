use chrono::{DateTime, Datelike, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A single logged expense or income.
///
/// Transaction ID in format: "transaction::<expense|income>::epoch_millis"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// Household member who logged it, canonical lower-case key
    pub name: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Category label from the catalog of `transaction_type`
    pub kind: String,
    /// Signed amount (negative for expense, positive for income)
    pub amount: f64,
    /// Accounting month (1-12), stamped from the selected period
    pub month: u32,
    /// Accounting year, stamped from the selected period
    pub year: i32,
    /// Creation instant, used for ordering only
    pub timestamp: DateTime<Utc>,
}

/// Type of transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransactionType {
    Expense,
    Income,
}

impl TransactionType {
    pub const ALL: [TransactionType; 2] = [TransactionType::Expense, TransactionType::Income];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Expense => "Expense",
            TransactionType::Income => "Income",
        }
    }

    /// Tag used inside transaction IDs
    fn id_tag(&self) -> &'static str {
        match self {
            TransactionType::Expense => "expense",
            TransactionType::Income => "income",
        }
    }

    /// Apply this type's sign convention to a positive magnitude
    pub fn signed_amount(&self, magnitude: f64) -> f64 {
        match self {
            TransactionType::Expense => -magnitude.abs(),
            TransactionType::Income => magnitude.abs(),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = TransactionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "expense" => Ok(TransactionType::Expense),
            "income" => Ok(TransactionType::Income),
            "" => Err(TransactionTypeError::Empty),
            _ => Err(TransactionTypeError::Unknown(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransactionTypeError {
    Empty,
    Unknown(String),
}

impl fmt::Display for TransactionTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionTypeError::Empty => write!(f, "Transaction type is required"),
            TransactionTypeError::Unknown(value) => {
                write!(f, "Unknown transaction type '{}' (expected Expense or Income)", value)
            }
        }
    }
}

impl std::error::Error for TransactionTypeError {}

impl Transaction {
    /// Generate transaction ID from type and timestamp
    pub fn generate_id(transaction_type: TransactionType, epoch_millis: i64) -> String {
        format!("transaction::{}::{}", transaction_type.id_tag(), epoch_millis)
    }

    /// Parse transaction ID to extract components
    pub fn parse_id(id: &str) -> Result<(TransactionType, i64), TransactionIdError> {
        let parts: Vec<&str> = id.split("::").collect();
        if parts.len() != 3 || parts[0] != "transaction" {
            return Err(TransactionIdError::InvalidFormat);
        }

        let transaction_type = match parts[1] {
            "expense" => TransactionType::Expense,
            "income" => TransactionType::Income,
            _ => return Err(TransactionIdError::InvalidType),
        };

        let epoch_millis = parts[2]
            .parse::<i64>()
            .map_err(|_| TransactionIdError::InvalidTimestamp)?;

        Ok((transaction_type, epoch_millis))
    }

    /// Absolute value of the amount, whatever sign convention the writer used
    pub fn magnitude(&self) -> f64 {
        self.amount.abs()
    }

    pub fn belongs_to(&self, period: Period) -> bool {
        self.month == period.month() && self.year == period.year()
    }

    pub fn period(&self) -> Result<Period, PeriodError> {
        Period::new(self.month, self.year)
    }
}

/// A validated transaction waiting for the store to assign its ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub name: String,
    pub transaction_type: TransactionType,
    pub kind: String,
    pub amount: f64,
    pub month: u32,
    pub year: i32,
    pub timestamp: DateTime<Utc>,
}

impl NewTransaction {
    pub fn with_id(self, id: String) -> Transaction {
        Transaction {
            id,
            name: self.name,
            transaction_type: self.transaction_type,
            kind: self.kind,
            amount: self.amount,
            month: self.month,
            year: self.year,
            timestamp: self.timestamp,
        }
    }

    pub fn period(&self) -> Result<Period, PeriodError> {
        Period::new(self.month, self.year)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransactionIdError {
    InvalidFormat,
    InvalidType,
    InvalidTimestamp,
}

impl fmt::Display for TransactionIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionIdError::InvalidFormat => write!(f, "Invalid transaction ID format"),
            TransactionIdError::InvalidType => write!(f, "Invalid transaction type"),
            TransactionIdError::InvalidTimestamp => {
                write!(f, "Invalid timestamp in transaction ID")
            }
        }
    }
}

impl std::error::Error for TransactionIdError {}

/// An accounting period: one calendar month of one year.
///
/// Fields are ordered year-first so the derived ordering is chronological.
/// A `Period` is immutable; selecting another month produces a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct Period {
    year: i32,
    month: u32,
}

#[derive(Deserialize)]
struct RawPeriod {
    year: i32,
    month: u32,
}

impl TryFrom<RawPeriod> for Period {
    type Error = PeriodError;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        Period::new(raw.month, raw.year)
    }
}

impl Period {
    pub const MIN_YEAR: i32 = 1;
    pub const MAX_YEAR: i32 = 9999;

    pub fn new(month: u32, year: i32) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodError::InvalidMonth(month));
        }
        if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year) {
            return Err(PeriodError::YearOutOfRange(year));
        }
        Ok(Self { year, month })
    }

    /// The period containing the host clock's current date
    pub fn current() -> Self {
        Self::containing(Local::now())
    }

    pub fn containing<D: Datelike>(date: D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// The month immediately before this one, wrapping into the previous
    /// year. `None` for January of [`Period::MIN_YEAR`].
    pub fn previous(&self) -> Option<Self> {
        if self.month > 1 {
            return Some(Self {
                year: self.year,
                month: self.month - 1,
            });
        }
        let year = self.year.checked_sub(1).filter(|y| *y >= Self::MIN_YEAR)?;
        Some(Self { year, month: 12 })
    }

    /// Human-readable label, e.g. "January 2025"
    pub fn label(&self) -> String {
        format!("{} {}", month_name(self.month), self.year)
    }
}

impl Default for Period {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PeriodError {
    InvalidMonth(u32),
    YearOutOfRange(i32),
}

impl fmt::Display for PeriodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodError::InvalidMonth(month) => {
                write!(f, "Invalid month {} (expected 1-12)", month)
            }
            PeriodError::YearOutOfRange(year) => write!(
                f,
                "Invalid year {} (expected {}-{})",
                year,
                Period::MIN_YEAR,
                Period::MAX_YEAR
            ),
        }
    }
}

impl std::error::Error for PeriodError {}

/// Walk backward from `base` (inclusive), producing `count` periods in
/// descending chronological order. Stops early only at the first
/// representable month.
pub fn derive_prior_periods(base: Period, count: usize) -> Vec<Period> {
    let mut periods = Vec::with_capacity(count);
    let mut cursor = Some(base);
    while periods.len() < count {
        match cursor {
            Some(period) => {
                periods.push(period);
                cursor = period.previous();
            }
            None => break,
        }
    }
    periods
}

/// Get the English name for a month number
pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Invalid Month",
    }
}

/// Years offered by a period selector, most recent first
pub fn selectable_years(start_year: i32, current_year: i32) -> Vec<i32> {
    (start_year..=current_year).rev().collect()
}

/// Per-user magnitudes for one transaction type, plus their sum
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserTotals {
    pub by_user: BTreeMap<String, f64>,
    pub total: f64,
}

impl UserTotals {
    /// Totals with every given user present at zero
    pub fn seeded<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            by_user: users.into_iter().map(|u| (u.into(), 0.0)).collect(),
            total: 0.0,
        }
    }

    pub fn add(&mut self, user: &str, amount: f64) {
        *self.by_user.entry(user.to_string()).or_insert(0.0) += amount;
        self.total += amount;
    }

    /// Total for a user; users never seen count as zero
    pub fn get(&self, user: &str) -> f64 {
        self.by_user.get(user).copied().unwrap_or(0.0)
    }
}

/// Expense and income totals of a single period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    pub period: Period,
    pub expenses: UserTotals,
    pub incomes: UserTotals,
}

impl MonthlyTotals {
    pub fn net(&self) -> f64 {
        self.incomes.total - self.expenses.total
    }
}

/// One category with its per-user expense magnitudes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub by_user: BTreeMap<String, f64>,
}

impl CategoryTotal {
    pub fn total(&self) -> f64 {
        self.by_user.values().sum()
    }
}

/// Category breakdown in display order: catalog categories first, then any
/// category discovered in the data, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub categories: Vec<CategoryTotal>,
}

impl CategoryTotals {
    pub fn get(&self, category: &str) -> Option<&BTreeMap<String, f64>> {
        self.categories
            .iter()
            .find(|c| c.category == category)
            .map(|c| &c.by_user)
    }

    /// Per-user map for a category, inserting an empty row if it is new
    pub fn entry_mut(&mut self, category: &str) -> &mut BTreeMap<String, f64> {
        let index = match self.categories.iter().position(|c| c.category == category) {
            Some(index) => index,
            None => {
                self.categories.push(CategoryTotal {
                    category: category.to_string(),
                    by_user: BTreeMap::new(),
                });
                self.categories.len() - 1
            }
        };
        &mut self.categories[index].by_user
    }
}

/// Income, expenses and net of one period, as shown on a comparison card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub period: Period,
    pub label: String,
    pub total_income: f64,
    pub total_expenses: f64,
    pub net: f64,
}

/// A transaction prepared for a table row; formatting is left to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub transaction_type: TransactionType,
    pub category: String,
    pub amount: f64,
    /// Expense above the configured threshold, rendered with emphasis
    pub large_expense: bool,
}

/// Everything the dashboard shows for the selected period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyOverview {
    pub totals: MonthlyTotals,
    pub rows: Vec<TransactionRow>,
}

/// Three-month comparison cards and category trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsView {
    pub base: Period,
    pub comparisons: Vec<PeriodComparison>,
    pub categories: CategoryTotals,
}

/// Signed-in identity returned by an identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl Identity {
    /// Name to greet the user with: display name, falling back to email
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("")
    }
}
