use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::models::{BalanceCredit, Beneficiary};
use crate::api::handler::AppState;
use crate::error::{AppError, AppResult};

#[derive(Deserialize, Validate)]
pub struct RegisterCreditRequest {
    pub beneficiary_type: String,
    pub beneficiary_id: Uuid,
    #[validate(range(min = 1, message = "amount must be positive"))]
    pub amount: i64,
    #[validate(length(min = 1, message = "reason must not be blank"))]
    pub reason: String,
    #[validate(length(min = 1, message = "actor must not be blank"))]
    pub actor: String,
}

#[derive(Deserialize, Validate)]
pub struct ResolveCreditRequest {
    pub note: Option<String>,
    #[validate(length(min = 1, message = "actor must not be blank"))]
    pub actor: String,
}

#[derive(Deserialize)]
pub struct BeneficiaryQuery {
    pub beneficiary_type: String,
    pub beneficiary_id: Uuid,
}

#[derive(Deserialize)]
pub struct DeleteCreditQuery {
    pub actor: String,
}

#[derive(Serialize)]
pub struct CreditResponse {
    pub id: Uuid,
    pub beneficiary_type: String,
    pub beneficiary_id: Uuid,
    pub amount: i64,
    pub reason: String,
    pub status: String,
    pub resolved_date: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: String,
}

impl From<BalanceCredit> for CreditResponse {
    fn from(credit: BalanceCredit) -> Self {
        Self {
            id: credit.id,
            beneficiary_type: credit.beneficiary.kind().to_string(),
            beneficiary_id: credit.beneficiary.id(),
            amount: credit.amount,
            reason: credit.reason,
            status: credit.status.to_string(),
            resolved_date: credit.resolved_date.map(|d| d.to_string()),
            notes: credit.notes,
            created_by: credit.created_by,
            created_at: credit.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct PendingTotalResponse {
    pub beneficiary_type: String,
    pub beneficiary_id: Uuid,
    pub pending_total: i64,
}

fn parse_beneficiary(kind: &str, id: Uuid) -> AppResult<Beneficiary> {
    Beneficiary::from_parts(kind, id).map_err(Into::into)
}

/// POST /credits
pub async fn register_credit(
    State(state): State<AppState>,
    Json(request): Json<RegisterCreditRequest>,
) -> AppResult<(StatusCode, Json<CreditResponse>)> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let beneficiary = parse_beneficiary(&request.beneficiary_type, request.beneficiary_id)?;
    info!(%beneficiary, amount = request.amount, "registering credit");

    let credit = state
        .credit_ledger
        .register(beneficiary, request.amount, &request.reason, &request.actor)
        .await?;
    Ok((StatusCode::CREATED, Json(credit.into())))
}

/// GET /credits/:id
pub async fn get_credit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CreditResponse>> {
    let credit = state.credit_ledger.get(id).await?;
    Ok(Json(credit.into()))
}

/// GET /credits
pub async fn list_credits(
    State(state): State<AppState>,
    Query(query): Query<BeneficiaryQuery>,
) -> AppResult<Json<Vec<CreditResponse>>> {
    let beneficiary = parse_beneficiary(&query.beneficiary_type, query.beneficiary_id)?;
    let credits = state.credit_ledger.list_for_beneficiary(beneficiary).await?;
    Ok(Json(credits.into_iter().map(Into::into).collect()))
}

/// POST /credits/:id/apply
pub async fn apply_credit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ResolveCreditRequest>,
) -> AppResult<Json<CreditResponse>> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    let credit = state
        .credit_ledger
        .apply(id, request.note.as_deref(), &request.actor)
        .await?;
    Ok(Json(credit.into()))
}

/// POST /credits/:id/return
pub async fn return_credit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ResolveCreditRequest>,
) -> AppResult<Json<CreditResponse>> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    let credit = state
        .credit_ledger
        .return_credit(id, request.note.as_deref(), &request.actor)
        .await?;
    Ok(Json(credit.into()))
}

/// GET /credits/pending-total
pub async fn pending_total(
    State(state): State<AppState>,
    Query(query): Query<BeneficiaryQuery>,
) -> AppResult<Json<PendingTotalResponse>> {
    let beneficiary = parse_beneficiary(&query.beneficiary_type, query.beneficiary_id)?;
    let total = state.credit_ledger.pending_total(beneficiary).await?;
    Ok(Json(PendingTotalResponse {
        beneficiary_type: beneficiary.kind().to_string(),
        beneficiary_id: beneficiary.id(),
        pending_total: total,
    }))
}

/// DELETE /credits/:id
pub async fn delete_credit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteCreditQuery>,
) -> AppResult<StatusCode> {
    let deleted = state.credit_ledger.delete(id, &query.actor).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_request_rejects_blank_actor() {
        let blank = ResolveCreditRequest {
            note: None,
            actor: "".to_string(),
        };
        assert!(blank.validate().is_err());

        let ok = ResolveCreditRequest {
            note: Some("aplicado".to_string()),
            actor: "admin".to_string(),
        };
        assert!(ok.validate().is_ok());
    }
}
