use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::models::Parameter;
use crate::api::handler::AppState;
use crate::error::{AppError, AppResult};

#[derive(Deserialize)]
pub struct ListParametersQuery {
    pub category: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct UpdateParameterRequest {
    #[validate(length(min = 1, message = "value must not be blank"))]
    pub value: String,
    #[validate(length(min = 1, message = "actor must not be blank"))]
    pub actor: String,
}

#[derive(Serialize)]
pub struct ParameterResponse {
    pub name: String,
    pub value: String,
    pub data_type: String,
    pub category: String,
    pub editable: bool,
    pub updated_by: Option<String>,
    pub updated_at: String,
}

impl From<Parameter> for ParameterResponse {
    fn from(p: Parameter) -> Self {
        Self {
            name: p.name,
            value: p.value,
            data_type: p.data_type.to_string(),
            category: p.category,
            editable: p.editable,
            updated_by: p.updated_by,
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

/// GET /parameters
pub async fn list_parameters(
    State(state): State<AppState>,
    Query(query): Query<ListParametersQuery>,
) -> AppResult<Json<Vec<ParameterResponse>>> {
    let parameters = state.parameters.list(query.category.as_deref()).await?;
    Ok(Json(parameters.into_iter().map(Into::into).collect()))
}

/// GET /parameters/:name
pub async fn get_parameter(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<ParameterResponse>> {
    let parameter = state.parameters.get(&name).await?;
    Ok(Json(parameter.into()))
}

/// PUT /parameters/:name
pub async fn update_parameter(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<UpdateParameterRequest>,
) -> AppResult<(StatusCode, Json<ParameterResponse>)> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    info!(parameter = %name, actor = %request.actor, "updating parameter");
    let parameter = state
        .parameters
        .update(&name, &request.value, &request.actor)
        .await?;
    Ok((StatusCode::OK, Json(parameter.into())))
}
