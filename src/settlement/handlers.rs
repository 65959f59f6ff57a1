use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::calculator::BulkSettlementReport;
use super::models::{Adjustment, AdjustmentKind, Period, Settlement};
use crate::api::handler::AppState;
use crate::error::{AppError, AppResult};

#[derive(Deserialize, Validate)]
pub struct ComputeSettlementRequest {
    pub contract_id: Uuid,
    pub period: Period,
    #[validate(length(min = 1, message = "actor must not be blank"))]
    pub actor: String,
}

#[derive(Deserialize, Validate)]
pub struct BulkSettlementRequest {
    pub party_id: Uuid,
    pub period: Period,
    #[validate(length(min = 1, message = "actor must not be blank"))]
    pub actor: String,
}

#[derive(Deserialize, Validate)]
pub struct ActorRequest {
    #[validate(length(min = 1, message = "actor must not be blank"))]
    pub actor: String,
}

#[derive(Deserialize, Validate)]
pub struct CancelSettlementRequest {
    #[validate(length(min = 1, message = "reason must not be blank"))]
    pub reason: String,
    #[validate(length(min = 1, message = "actor must not be blank"))]
    pub actor: String,
}

#[derive(Deserialize, Validate)]
pub struct RegisterAdjustmentRequest {
    pub contract_id: Uuid,
    pub period: Period,
    pub kind: String,
    #[validate(length(min = 1, message = "concept must not be blank"))]
    pub concept: String,
    #[validate(range(min = 1, message = "amount must be positive"))]
    pub amount: i64,
    #[validate(length(min = 1, message = "actor must not be blank"))]
    pub actor: String,
}

#[derive(Deserialize)]
pub struct AdjustmentsQuery {
    pub contract_id: Uuid,
    pub period: Period,
}

#[derive(Serialize)]
pub struct SettlementResponse {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub period: String,
    pub gross_canon: i64,
    pub commission_pct: Decimal,
    pub commission_amount: i64,
    pub deductions_total: i64,
    pub bonuses_total: i64,
    pub net_payable: i64,
    pub status: String,
    pub cancel_reason: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Settlement> for SettlementResponse {
    fn from(s: Settlement) -> Self {
        Self {
            id: s.id,
            contract_id: s.contract_id,
            period: s.period.to_string(),
            gross_canon: s.gross_canon,
            commission_pct: s.commission_pct,
            commission_amount: s.commission_amount,
            deductions_total: s.deductions_total,
            bonuses_total: s.bonuses_total,
            net_payable: s.net_payable,
            status: s.status.to_string(),
            cancel_reason: s.cancel_reason,
            created_by: s.created_by,
            created_at: s.created_at.to_rfc3339(),
            updated_at: s.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct AdjustmentResponse {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub period: String,
    pub kind: String,
    pub concept: String,
    pub amount: i64,
    pub created_by: String,
    pub created_at: String,
}

impl From<Adjustment> for AdjustmentResponse {
    fn from(a: Adjustment) -> Self {
        Self {
            id: a.id,
            contract_id: a.contract_id,
            period: a.period.to_string(),
            kind: a.kind.to_string(),
            concept: a.concept,
            amount: a.amount,
            created_by: a.created_by,
            created_at: a.created_at.to_rfc3339(),
        }
    }
}

/// POST /settlements
pub async fn compute_settlement(
    State(state): State<AppState>,
    Json(request): Json<ComputeSettlementRequest>,
) -> AppResult<(StatusCode, Json<SettlementResponse>)> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    info!(contract_id = %request.contract_id, period = %request.period, "computing settlement");
    let settlement = state
        .calculator
        .compute(request.contract_id, request.period, &request.actor)
        .await?;
    Ok((StatusCode::CREATED, Json(settlement.into())))
}

/// POST /settlements/bulk
pub async fn settle_owner(
    State(state): State<AppState>,
    Json(request): Json<BulkSettlementRequest>,
) -> AppResult<Json<BulkSettlementReport>> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let report = state
        .calculator
        .settle_owner(request.party_id, request.period, &request.actor)
        .await?;
    Ok(Json(report))
}

/// GET /settlements/:id
pub async fn get_settlement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SettlementResponse>> {
    let settlement = state.settlements.get(id).await?;
    Ok(Json(settlement.into()))
}

/// GET /settlements/contract/:contract_id
pub async fn list_contract_settlements(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
) -> AppResult<Json<Vec<SettlementResponse>>> {
    let settlements = state.settlements.list_for_contract(contract_id).await?;
    Ok(Json(settlements.into_iter().map(Into::into).collect()))
}

/// POST /settlements/:id/approve
pub async fn approve_settlement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActorRequest>,
) -> AppResult<Json<SettlementResponse>> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    let settlement = state.calculator.approve(id, &request.actor).await?;
    Ok(Json(settlement.into()))
}

/// POST /settlements/:id/pay
pub async fn pay_settlement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActorRequest>,
) -> AppResult<Json<SettlementResponse>> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    let settlement = state.calculator.mark_paid(id, &request.actor).await?;
    Ok(Json(settlement.into()))
}

/// POST /settlements/:id/cancel
pub async fn cancel_settlement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelSettlementRequest>,
) -> AppResult<Json<SettlementResponse>> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    let settlement = state
        .calculator
        .cancel(id, &request.reason, &request.actor)
        .await?;
    Ok(Json(settlement.into()))
}

/// POST /adjustments
pub async fn register_adjustment(
    State(state): State<AppState>,
    Json(request): Json<RegisterAdjustmentRequest>,
) -> AppResult<(StatusCode, Json<AdjustmentResponse>)> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    let kind = AdjustmentKind::from_str(&request.kind).map_err(AppError::InvalidInput)?;

    let adjustment = state
        .settlements
        .register_adjustment(
            request.contract_id,
            &request.period,
            kind,
            &request.concept,
            request.amount,
            &request.actor,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(adjustment.into())))
}

/// GET /adjustments
pub async fn list_adjustments(
    State(state): State<AppState>,
    Query(query): Query<AdjustmentsQuery>,
) -> AppResult<Json<Vec<AdjustmentResponse>>> {
    let adjustments = state
        .settlements
        .list_adjustments(query.contract_id, &query.period)
        .await?;
    Ok(Json(adjustments.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_request_rejects_blank_actor() {
        assert!(ActorRequest { actor: "".to_string() }.validate().is_err());
        assert!(ActorRequest { actor: "admin".to_string() }.validate().is_ok());
    }
}
