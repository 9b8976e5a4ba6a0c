//! # Session Controller
//!
//! Owns everything that lives for one signed-in session: who is signed in,
//! which period is selected, and the one live subscription feeding the
//! dashboard.
//!
//! ```text
//!            sign_in                 authorized
//! SignedOut ─────────▶ Authorizing ─────────────▶ Authorized ──┐
//!     ▲                    │ denied / failed          │        │ select_period
//!     └────────────────────┘                          │ ◀──────┘
//!     ▲                        sign_out               │
//!     └───────────────────────────────────────────────┘
//! ```
//!
//! Entering `Authorized` subscribes to the selected period. Selecting another
//! period drops the old subscription before the new one is created, and
//! leaving `Authorized` drops it for good. The access gate runs before any
//! store call is made for a new identity.

use shared::{Identity, MonthlyOverview, Period, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

use super::access_gate::AccessGate;
use super::aggregation::AggregationEngine;
use super::analytics_panel::{AnalyticsPanel, AnalyticsRefresh};
use super::analytics_service::AnalyticsService;
use super::commands::TransactionDraft;
use super::errors::{FinanceError, FinanceResult};
use super::transaction_service::TransactionService;
use crate::io::identity::IdentityProvider;
use crate::storage::{ChangeListener, Connection, Subscription, TransactionStore};

/// What the dashboard currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardState {
    Idle,
    Loading { period: Period },
    Ready(MonthlyOverview),
    Failed { period: Period, message: String },
}

/// Session data that only exists while authorized
#[derive(Debug)]
pub struct AuthorizedSession {
    pub identity: Identity,
    pub period: Period,
    subscription: Option<Subscription>,
}

#[derive(Debug)]
pub enum SessionState {
    SignedOut,
    Authorizing,
    Authorized(AuthorizedSession),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::SignedOut => "SignedOut",
            SessionState::Authorizing => "Authorizing",
            SessionState::Authorized(_) => "Authorized",
        }
    }
}

/// Inputs that drive the session state machine
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignIn,
    SignOut,
    SelectPeriod(Period),
}

pub struct SessionController<C: Connection, P: IdentityProvider> {
    provider: P,
    gate: AccessGate,
    transaction_repository: C::TransactionRepository,
    transactions: TransactionService<C>,
    analytics: AnalyticsPanel<C>,
    engine: AggregationEngine,
    start_period: Option<Period>,
    state: SessionState,
    dashboard: Arc<Mutex<DashboardState>>,
}

impl<C: Connection, P: IdentityProvider> SessionController<C, P> {
    pub fn new(
        connection: Arc<C>,
        provider: P,
        gate: AccessGate,
        transactions: TransactionService<C>,
        analytics: AnalyticsService<C>,
    ) -> Self {
        let transaction_repository = connection.create_transaction_repository();
        let engine = analytics.engine().clone();
        Self {
            provider,
            gate,
            transaction_repository,
            transactions,
            analytics: AnalyticsPanel::new(analytics),
            engine,
            start_period: None,
            state: SessionState::SignedOut,
            dashboard: Arc::new(Mutex::new(DashboardState::Idle)),
        }
    }

    /// Period selected on sign-in instead of the current month
    pub fn with_start_period(mut self, period: Period) -> Self {
        self.start_period = Some(period);
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.state {
            SessionState::Authorized(session) => Some(&session.identity),
            _ => None,
        }
    }

    pub fn period(&self) -> Option<Period> {
        match &self.state {
            SessionState::Authorized(session) => Some(session.period),
            _ => None,
        }
    }

    pub fn dashboard(&self) -> DashboardState {
        lock_dashboard(&self.dashboard).clone()
    }

    pub async fn handle(&mut self, event: SessionEvent) -> FinanceResult<()> {
        match event {
            SessionEvent::SignIn => self.sign_in().await.map(|_| ()),
            SessionEvent::SignOut => {
                self.sign_out().await;
                Ok(())
            }
            SessionEvent::SelectPeriod(period) => self.select_period(period).await,
        }
    }

    /// Run the provider flow, check the allow-list, and open the dashboard.
    ///
    /// An identity outside the allow-list is signed out of the provider again
    /// and never reaches the store. If the first subscription fails the
    /// session stays authorized and the dashboard shows the failure.
    pub async fn sign_in(&mut self) -> FinanceResult<Identity> {
        if let SessionState::Authorized(session) = &self.state {
            return Ok(session.identity.clone());
        }

        self.state = SessionState::Authorizing;
        let identity = match self.provider.sign_in().await {
            Ok(identity) => identity,
            Err(e) => {
                error!("Sign-in failed: {:#}", e);
                self.state = SessionState::SignedOut;
                return Err(FinanceError::AuthFailure(format!("{:#}", e)));
            }
        };

        if let Err(denied) = self.gate.authorize(&identity) {
            if let Err(e) = self.provider.sign_out().await {
                warn!("Forced sign-out failed: {:#}", e);
            }
            self.state = SessionState::SignedOut;
            return Err(denied);
        }

        let period = self.start_period.unwrap_or_else(Period::current);
        info!("Session authorized for {}, period {}", identity.greeting_name(), period);
        self.state = SessionState::Authorized(AuthorizedSession {
            identity: identity.clone(),
            period,
            subscription: None,
        });

        self.open_period(period).await?;
        Ok(identity)
    }

    /// Leave the session: drop the subscription, sign out of the provider, clear views
    pub async fn sign_out(&mut self) {
        let previous = std::mem::replace(&mut self.state, SessionState::SignedOut);
        if let SessionState::Authorized(mut session) = previous {
            if let Some(subscription) = session.subscription.take() {
                subscription.unsubscribe();
            }
            if let Err(e) = self.provider.sign_out().await {
                warn!("Provider sign-out failed: {:#}", e);
            }
            info!("Signed out {}", session.identity.greeting_name());
        }
        self.analytics.clear();
        *lock_dashboard(&self.dashboard) = DashboardState::Idle;
    }

    /// Switch the dashboard to `period`
    pub async fn select_period(&mut self, period: Period) -> FinanceResult<()> {
        match &mut self.state {
            SessionState::Authorized(session) => {
                if let Some(previous) = session.subscription.take() {
                    info!("Leaving {} for {}", previous.period(), period);
                    previous.unsubscribe();
                }
                session.period = period;
            }
            _ => return Err(FinanceError::NotSignedIn),
        }
        self.open_period(period).await
    }

    async fn open_period(&mut self, period: Period) -> FinanceResult<()> {
        *lock_dashboard(&self.dashboard) = DashboardState::Loading { period };

        let dashboard = self.dashboard.clone();
        let engine = self.engine.clone();
        let listener: ChangeListener = Arc::new(move |records: &[Transaction]| {
            let overview = engine.monthly_overview(period, records);
            *lock_dashboard(&dashboard) = DashboardState::Ready(overview);
        });

        match self.transaction_repository.subscribe(period, listener).await {
            Ok(subscription) => {
                if let SessionState::Authorized(session) = &mut self.state {
                    session.subscription = Some(subscription);
                }
                Ok(())
            }
            Err(e) => {
                let err = FinanceError::data_fetch(e);
                error!("Subscription to {} failed: {}", period, err);
                *lock_dashboard(&self.dashboard) = DashboardState::Failed {
                    period,
                    message: err.to_string(),
                };
                Err(err)
            }
        }
    }

    /// Record a transaction in the selected period
    pub async fn record_transaction(&self, draft: TransactionDraft) -> FinanceResult<String> {
        let period = self.period().ok_or(FinanceError::NotSignedIn)?;
        self.transactions.record_transaction(draft, period).await
    }

    /// Recompute comparison cards and category trend for the selected period
    pub async fn refresh_analytics(&self) -> FinanceResult<AnalyticsRefresh> {
        let period = self.period().ok_or(FinanceError::NotSignedIn)?;
        self.refresh_analytics_for(period).await
    }

    /// Recompute analytics for a window ending at `base`, independent of the
    /// dashboard period. Only the most recently requested base is committed.
    pub async fn refresh_analytics_for(&self, base: Period) -> FinanceResult<AnalyticsRefresh> {
        if self.period().is_none() {
            return Err(FinanceError::NotSignedIn);
        }
        self.analytics.refresh(base).await
    }

    pub fn analytics(&self) -> Option<shared::AnalyticsView> {
        self.analytics.current()
    }
}

fn lock_dashboard(dashboard: &Mutex<DashboardState>) -> MutexGuard<'_, DashboardState> {
    dashboard.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
