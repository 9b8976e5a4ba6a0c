use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use shared::{selectable_years, Period, TransactionType};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use family_expenses::config::AppConfig;
use family_expenses::domain::{AnalyticsRefresh, DashboardState, TransactionDraft};
use family_expenses::initialize_backend;
use family_expenses::io::{Presenter, StaticIdentityProvider};

#[derive(Parser)]
#[command(name = "family-expenses", version, about = "Household expenses and incomes by month")]
struct Cli {
    /// Email to sign in with; must be on the allow-list
    #[arg(long, global = true)]
    email: Option<String>,

    /// Display name shown in the greeting
    #[arg(long, global = true)]
    name: Option<String>,

    /// Config file (defaults to $FAMILY_EXPENSES_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct PeriodArgs {
    /// Month 1-12 (defaults to the current month)
    #[arg(long)]
    month: Option<u32>,

    /// Year between the catalog start year and now (defaults to the current year)
    #[arg(long)]
    year: Option<i32>,
}

impl PeriodArgs {
    fn resolve(&self, start_year: i32) -> Result<Option<Period>> {
        if self.month.is_none() && self.year.is_none() {
            return Ok(None);
        }
        let current = Period::current();
        let year = self.year.unwrap_or(current.year());
        let years = selectable_years(start_year, current.year());
        if !years.contains(&year) {
            bail!(
                "Year {} is not selectable; choose one of {}",
                year,
                years.iter().map(i32::to_string).collect::<Vec<_>>().join(", ")
            );
        }
        let period = Period::new(self.month.unwrap_or(current.month()), year)?;
        Ok(Some(period))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Per-user totals and transactions of one month
    Summary {
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Record an expense or income
    Add {
        /// Household member who spent or earned it
        #[arg(long)]
        user: String,
        /// Expense or Income
        #[arg(long = "type")]
        transaction_type: String,
        #[arg(long)]
        category: String,
        /// Positive amount; the sign follows from the type
        #[arg(long)]
        amount: String,
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Comparison cards and category trend over the window ending at the given month
    Analytics {
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// List the category catalogs
    Categories {
        /// Only this type's categories
        #[arg(long = "type")]
        transaction_type: Option<String>,
    },
}

#[derive(Serialize)]
struct AddedTransaction<'a> {
    id: &'a str,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let presenter = Presenter::new(config.currency_symbol.clone());

    if let Command::Categories { transaction_type } = &cli.command {
        let transaction_type = transaction_type
            .as_deref()
            .map(str::parse::<TransactionType>)
            .transpose()?;
        let catalog = config.catalog();
        if cli.json {
            let listing: Vec<(TransactionType, &[String])> = match transaction_type {
                Some(ty) => vec![(ty, catalog.categories_for(ty))],
                None => TransactionType::ALL
                    .iter()
                    .map(|ty| (*ty, catalog.categories_for(*ty)))
                    .collect(),
            };
            print_json(&listing)?;
        } else {
            print!("{}", presenter.render_categories(&catalog, transaction_type));
        }
        return Ok(());
    }

    let start_year = config.catalog_start_year;
    let (dashboard_period, analysis_base) = match &cli.command {
        Command::Summary { period } | Command::Add { period, .. } => {
            (period.resolve(start_year)?, None)
        }
        Command::Analytics { period } => (None, period.resolve(start_year)?),
        Command::Categories { .. } => (None, None),
    };

    let provider = StaticIdentityProvider::new(cli.email.clone(), cli.name.clone());
    let mut session = initialize_backend(&config, provider)?;
    if let Some(period) = dashboard_period {
        session = session.with_start_period(period);
    }

    let identity = session.sign_in().await?;
    info!("Welcome, {}", identity.greeting_name());

    match cli.command {
        Command::Summary { .. } => match session.dashboard() {
            DashboardState::Ready(overview) => {
                if cli.json {
                    print_json(&overview)?;
                } else {
                    print!("{}", presenter.render_overview(&overview));
                }
            }
            DashboardState::Failed { message, .. } => bail!(message),
            other => bail!("Dashboard not ready: {:?}", other),
        },
        Command::Add {
            user,
            transaction_type,
            category,
            amount,
            ..
        } => {
            let draft = TransactionDraft {
                name: user,
                transaction_type,
                category,
                amount,
            };
            let id = session.record_transaction(draft).await?;
            if cli.json {
                print_json(&AddedTransaction { id: &id })?;
            } else {
                println!("Transaction added! ({})", id);
            }
        }
        Command::Analytics { .. } => {
            let refresh = match analysis_base {
                Some(base) => session.refresh_analytics_for(base).await?,
                None => session.refresh_analytics().await?,
            };
            match refresh {
                AnalyticsRefresh::Committed(view) => {
                    if cli.json {
                        print_json(&view)?;
                    } else {
                        print!("{}", presenter.render_analytics(&view));
                    }
                }
                AnalyticsRefresh::Superseded { generation } => {
                    bail!("Analytics refresh {} was superseded", generation)
                }
            }
        }
        Command::Categories { .. } => {}
    }

    session.sign_out().await;
    Ok(())
}
