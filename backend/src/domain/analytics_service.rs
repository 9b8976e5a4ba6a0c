//! Store-backed reads feeding the aggregation engine.
//!
//! One query per period; a failed query fails the whole read so partial
//! windows are never reported as complete.

use futures::future::try_join_all;
use shared::{
    derive_prior_periods, AnalyticsView, MonthlyOverview, Period, PeriodComparison, Transaction,
    TransactionType,
};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::aggregation::AggregationEngine;
use super::errors::{FinanceError, FinanceResult};
use crate::storage::{Connection, TransactionStore};

#[derive(Clone)]
pub struct AnalyticsService<C: Connection> {
    transaction_repository: C::TransactionRepository,
    engine: AggregationEngine,
    window_size: usize,
}

impl<C: Connection> AnalyticsService<C> {
    pub fn new(connection: Arc<C>, engine: AggregationEngine, window_size: usize) -> Self {
        let transaction_repository = connection.create_transaction_repository();
        Self {
            transaction_repository,
            engine,
            window_size,
        }
    }

    pub fn engine(&self) -> &AggregationEngine {
        &self.engine
    }

    /// Periods covered by an analytics view ending at `base`, newest first
    pub fn window(&self, base: Period) -> Vec<Period> {
        derive_prior_periods(base, self.window_size)
    }

    async fn query(
        &self,
        period: Period,
        transaction_type: Option<TransactionType>,
    ) -> FinanceResult<Vec<Transaction>> {
        self.transaction_repository
            .query_by_period_and_type(period, transaction_type)
            .await
            .map_err(|e| {
                error!("Query for {} failed: {:#}", period, e);
                FinanceError::data_fetch(e)
            })
    }

    /// Totals and table rows of one period, read once from the store
    pub async fn monthly_overview(&self, period: Period) -> FinanceResult<MonthlyOverview> {
        let records = self.query(period, None).await?;
        debug!("Loaded {} records for {}", records.len(), period);
        Ok(self.engine.monthly_overview(period, &records))
    }

    /// Expense breakdown by category and user over the window ending at `base`
    pub async fn category_trend(&self, base: Period) -> FinanceResult<shared::CategoryTotals> {
        let periods = self.window(base);
        let per_period = try_join_all(
            periods
                .iter()
                .map(|period| self.query(*period, Some(TransactionType::Expense))),
        )
        .await?;
        Ok(self.engine.category_breakdown(per_period.iter().flatten()))
    }

    /// Comparison card of each period in the window ending at `base`
    pub async fn comparisons(&self, base: Period) -> FinanceResult<Vec<PeriodComparison>> {
        let periods = self.window(base);
        let per_period =
            try_join_all(periods.iter().map(|period| self.query(*period, None))).await?;
        Ok(periods
            .iter()
            .zip(per_period.iter())
            .map(|(period, records)| self.engine.comparison(*period, records))
            .collect())
    }

    /// Comparison cards and category trend for the window ending at `base`
    pub async fn analytics(&self, base: Period) -> FinanceResult<AnalyticsView> {
        info!("Computing analytics for {} periods ending {}", self.window_size, base);
        let (comparisons, categories) =
            futures::try_join!(self.comparisons(base), self.category_trend(base))?;
        Ok(AnalyticsView {
            base,
            comparisons,
            categories,
        })
    }
}
