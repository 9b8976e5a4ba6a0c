//! Analytics view holder that only ever shows the newest refresh.
//!
//! Each refresh takes a generation number before its queries start. When the
//! queries finish, the result is committed only if no later refresh has
//! started in the meantime.

use shared::{AnalyticsView, Period};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::analytics_service::AnalyticsService;
use super::errors::FinanceResult;
use crate::storage::Connection;

/// Outcome of [`AnalyticsPanel::refresh`]
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsRefresh {
    Committed(AnalyticsView),
    /// A later refresh started before this one finished; its result was dropped
    Superseded { generation: u64 },
}

pub struct AnalyticsPanel<C: Connection> {
    service: AnalyticsService<C>,
    generation: AtomicU64,
    latest: Mutex<Option<AnalyticsView>>,
}

impl<C: Connection> AnalyticsPanel<C> {
    pub fn new(service: AnalyticsService<C>) -> Self {
        Self {
            service,
            generation: AtomicU64::new(0),
            latest: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<AnalyticsView>> {
        self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Last committed view
    pub fn current(&self) -> Option<AnalyticsView> {
        self.lock().clone()
    }

    /// Drop the committed view and invalidate in-flight refreshes
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.lock() = None;
    }

    pub async fn refresh(&self, base: Period) -> FinanceResult<AnalyticsRefresh> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Analytics refresh {} for {}", generation, base);

        let result = self.service.analytics(base).await;

        let mut latest = self.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            info!("Analytics refresh {} for {} superseded", generation, base);
            return Ok(AnalyticsRefresh::Superseded { generation });
        }

        let view = result?;
        *latest = Some(view.clone());
        Ok(AnalyticsRefresh::Committed(view))
    }
}
