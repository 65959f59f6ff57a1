use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::migrate::MigrateError;
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    #[error("Balance ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),

    #[error("Contract error: {0}")]
    Contract(#[from] ContractError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Parameter store errors
#[derive(Error, Debug)]
pub enum ParameterError {
    #[error("Parameter not found: {0}")]
    NotFound(String),

    #[error("Type mismatch for {name}: declared {declared}, requested {requested}")]
    TypeMismatch {
        name: String,
        declared: String,
        requested: String,
    },

    #[error("Parameter {0} is not editable")]
    NotEditable(String),

    #[error("Value {value:?} does not parse as {expected} for parameter {name}")]
    InvalidValue {
        name: String,
        value: String,
        expected: String,
    },
}

/// Balance ledger (saldo a favor) errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Credit not found: {0}")]
    NotFound(String),

    #[error("Credit {id} already resolved as {status}")]
    AlreadyResolved { id: String, status: String },

    #[error("Invalid credit: {0}")]
    InvalidCredit(String),

    #[error("Beneficiary reference is inconsistent for credit {0}")]
    InconsistentBeneficiary(String),
}

/// Settlement (liquidación) errors
#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("Settlement not found: {0}")]
    NotFound(String),

    #[error("Settlement already exists for contract {contract_id} in period {period}")]
    Duplicate { contract_id: String, period: String },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Settlement in state {current}, expected {expected}")]
    InvalidState { current: String, expected: String },

    #[error("Cancellation requires a non-blank reason")]
    MissingCancelReason,

    #[error("Invalid adjustment: {0}")]
    InvalidAdjustment(String),

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),
}

/// Contract / lease tracker errors
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("Contract not found: {0}")]
    NotFound(String),

    #[error("Contract {id} is not active (status: {status})")]
    NotActive { id: String, status: String },

    #[error("Invalid contract data: {0}")]
    InvalidContract(String),
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match &self {
            AppError::Parameter(ParameterError::NotFound(name)) => (
                StatusCode::NOT_FOUND,
                "PARAMETER_NOT_FOUND",
                self.to_string(),
                Some(serde_json::json!({ "parameter": name })),
            ),
            AppError::Parameter(ParameterError::TypeMismatch { name, declared, requested }) => (
                StatusCode::BAD_REQUEST,
                "PARAMETER_TYPE_MISMATCH",
                self.to_string(),
                Some(serde_json::json!({
                    "parameter": name,
                    "declared": declared,
                    "requested": requested,
                })),
            ),
            AppError::Parameter(ParameterError::NotEditable(name)) => (
                StatusCode::FORBIDDEN,
                "PARAMETER_NOT_EDITABLE",
                self.to_string(),
                Some(serde_json::json!({ "parameter": name })),
            ),
            AppError::Parameter(ParameterError::InvalidValue { .. }) => (
                StatusCode::BAD_REQUEST,
                "PARAMETER_INVALID_VALUE",
                self.to_string(),
                None,
            ),
            AppError::Ledger(LedgerError::NotFound(_)) => (
                StatusCode::NOT_FOUND,
                "CREDIT_NOT_FOUND",
                self.to_string(),
                None,
            ),
            AppError::Ledger(LedgerError::AlreadyResolved { id, status }) => (
                StatusCode::CONFLICT,
                "CREDIT_ALREADY_RESOLVED",
                self.to_string(),
                Some(serde_json::json!({ "credit_id": id, "status": status })),
            ),
            AppError::Ledger(LedgerError::InvalidCredit(_)) => (
                StatusCode::BAD_REQUEST,
                "INVALID_CREDIT",
                self.to_string(),
                None,
            ),
            AppError::Settlement(SettlementError::NotFound(_)) => (
                StatusCode::NOT_FOUND,
                "SETTLEMENT_NOT_FOUND",
                self.to_string(),
                None,
            ),
            AppError::Settlement(SettlementError::Duplicate { contract_id, period }) => (
                StatusCode::CONFLICT,
                "DUPLICATE_SETTLEMENT",
                self.to_string(),
                Some(serde_json::json!({
                    "contract_id": contract_id,
                    "period": period,
                })),
            ),
            AppError::Settlement(SettlementError::InvalidTransition { from, to }) => (
                StatusCode::CONFLICT,
                "INVALID_TRANSITION",
                self.to_string(),
                Some(serde_json::json!({ "from": from, "to": to })),
            ),
            AppError::Settlement(SettlementError::InvalidState { .. }) => (
                StatusCode::CONFLICT,
                "INVALID_STATE",
                self.to_string(),
                None,
            ),
            AppError::Settlement(SettlementError::MissingCancelReason)
            | AppError::Settlement(SettlementError::InvalidAdjustment(_))
            | AppError::Settlement(SettlementError::InvalidPeriod(_)) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                self.to_string(),
                None,
            ),
            AppError::Contract(ContractError::NotFound(_)) => (
                StatusCode::NOT_FOUND,
                "CONTRACT_NOT_FOUND",
                self.to_string(),
                None,
            ),
            AppError::Contract(ContractError::NotActive { id, status }) => (
                StatusCode::CONFLICT,
                "CONTRACT_NOT_ACTIVE",
                self.to_string(),
                Some(serde_json::json!({ "contract_id": id, "status": status })),
            ),
            AppError::Contract(ContractError::InvalidContract(_)) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                self.to_string(),
                None,
            ),
            AppError::InvalidInput(_) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                self.to_string(),
                None,
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
                None,
            ),
            AppError::Ledger(LedgerError::InconsistentBeneficiary(_))
            | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(format!("Error converting: {:?}", error))
    }
}

impl From<rust_decimal::Error> for AppError {
    fn from(error: rust_decimal::Error) -> Self {
        AppError::InvalidInput(format!("Decimal conversion error: {:?}", error))
    }
}

impl From<MigrateError> for AppError {
    fn from(error: MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {:?}", error))
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
