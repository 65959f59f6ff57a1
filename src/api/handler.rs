use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::contracts::{ContractRepository, LeaseTracker};
use crate::ledger::CreditLedger;
use crate::parameters::ParameterRepository;
use crate::settlement::{SettlementCalculator, SettlementRepository};

#[derive(Clone)]
pub struct AppState {
    pub parameters: Arc<ParameterRepository>,
    pub credit_ledger: Arc<CreditLedger>,
    pub contracts: Arc<ContractRepository>,
    pub tracker: Arc<LeaseTracker>,
    pub settlements: Arc<SettlementRepository>,
    pub calculator: Arc<SettlementCalculator>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "arriendo-backend",
    })
}
