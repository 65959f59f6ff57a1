use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::models::{Contract, ContractType, ExpirationAlert};
use crate::api::handler::AppState;
use crate::error::{AppError, AppResult};

#[derive(Deserialize, Validate)]
pub struct CreateContractRequest {
    pub contract_type: String,
    pub property_id: Uuid,
    pub party_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(range(min = 1, message = "canon must be positive"))]
    pub canon: i64,
    pub commission_pct: Option<Decimal>,
}

#[derive(Deserialize, Validate)]
pub struct TerminateContractRequest {
    #[validate(length(min = 1, message = "reason must not be blank"))]
    pub reason: String,
    #[validate(length(min = 1, message = "actor must not be blank"))]
    pub actor: String,
}

#[derive(Deserialize, Validate)]
pub struct IpcIncreaseRequest {
    #[validate(length(min = 1, message = "actor must not be blank"))]
    pub actor: String,
}

#[derive(Deserialize)]
pub struct ExpirationsQuery {
    pub window_days: Option<i64>,
}

#[derive(Serialize)]
pub struct ContractResponse {
    pub id: Uuid,
    pub contract_type: String,
    pub property_id: Uuid,
    pub party_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub canon: i64,
    pub commission_pct: Option<Decimal>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Contract> for ContractResponse {
    fn from(c: Contract) -> Self {
        Self {
            id: c.id,
            contract_type: c.contract_type.to_string(),
            property_id: c.property_id,
            party_id: c.party_id,
            start_date: c.start_date,
            end_date: c.end_date,
            canon: c.canon,
            commission_pct: c.commission_pct,
            status: c.status.to_string(),
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct ExpirationsResponse {
    pub window_days: Option<i64>,
    pub alerts: Vec<ExpirationAlert>,
}

/// POST /contracts
pub async fn create_contract(
    State(state): State<AppState>,
    Json(request): Json<CreateContractRequest>,
) -> AppResult<(StatusCode, Json<ContractResponse>)> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    let contract_type = ContractType::from_str(&request.contract_type)
        .map_err(AppError::InvalidInput)?;

    info!(%contract_type, property_id = %request.property_id, "creating contract");
    let contract = state
        .contracts
        .create(
            contract_type,
            request.property_id,
            request.party_id,
            request.start_date,
            request.end_date,
            request.canon,
            request.commission_pct,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(contract.into())))
}

/// GET /contracts/:id
pub async fn get_contract(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ContractResponse>> {
    let contract = state.contracts.get(id).await?;
    Ok(Json(contract.into()))
}

/// GET /contracts
pub async fn list_contracts(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ContractResponse>>> {
    let contracts = state.contracts.list_active().await?;
    Ok(Json(contracts.into_iter().map(Into::into).collect()))
}

/// POST /contracts/:id/terminate
pub async fn terminate_contract(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TerminateContractRequest>,
) -> AppResult<Json<ContractResponse>> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    let contract = state
        .tracker
        .terminate(id, &request.reason, &request.actor)
        .await?;
    Ok(Json(contract.into()))
}

/// POST /contracts/:id/ipc-increase
pub async fn apply_ipc_increase(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<IpcIncreaseRequest>,
) -> AppResult<Json<ContractResponse>> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    let contract = state.tracker.apply_ipc_increase(id, &request.actor).await?;
    Ok(Json(contract.into()))
}

/// GET /contracts/expirations
pub async fn upcoming_expirations(
    State(state): State<AppState>,
    Query(query): Query<ExpirationsQuery>,
) -> AppResult<Json<ExpirationsResponse>> {
    let alerts = state.tracker.upcoming_expirations(query.window_days).await?;
    Ok(Json(ExpirationsResponse {
        window_days: query.window_days,
        alerts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipc_request_rejects_blank_actor() {
        assert!(IpcIncreaseRequest { actor: "".to_string() }.validate().is_err());
        assert!(IpcIncreaseRequest { actor: "admin".to_string() }.validate().is_ok());
    }
}
