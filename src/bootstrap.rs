use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{sync::Arc, time::Duration};
use tracing::info;

use crate::{
    api::handler::AppState,
    config::Config,
    contracts::{scheduler::ExpirationSweep, ContractRepository, LeaseTracker},
    error::AppResult,
    ledger::CreditLedger,
    parameters::ParameterRepository,
    settlement::{SettlementCalculator, SettlementRepository},
};

pub async fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("initializing application components");

    let pool = initialize_database(&config.database_url).await?;

    let parameters = Arc::new(ParameterRepository::new(pool.clone()));
    info!("parameter store initialized");

    let credit_ledger = Arc::new(CreditLedger::new(pool.clone()));
    info!("balance ledger initialized");

    let contracts = Arc::new(ContractRepository::new(pool.clone()));
    let tracker = Arc::new(LeaseTracker::new(contracts.clone(), parameters.clone()));
    info!("lease tracker initialized");

    let settlements = Arc::new(SettlementRepository::new(pool.clone()));
    let calculator = Arc::new(SettlementCalculator::new(
        settlements.clone(),
        contracts.clone(),
        parameters.clone(),
        credit_ledger.clone(),
    ));
    info!("settlement calculator initialized");

    // Daily sweep so overdue contracts surface without anyone opening the UI
    ExpirationSweep::new(tracker.clone(), config.alert_sweep_hour).start();
    info!("expiration sweep scheduled (daily at {:02}:00 UTC)", config.alert_sweep_hour);

    Ok(AppState {
        parameters,
        credit_ledger,
        contracts,
        tracker,
        settlements,
        calculator,
    })
}

async fn initialize_database(database_url: &str) -> AppResult<PgPool> {
    info!("connecting to database");

    let pool = PgPoolOptions::new()
        .max_connections(50)
        .min_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    info!("running database migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("database initialized");
    Ok(pool)
}
