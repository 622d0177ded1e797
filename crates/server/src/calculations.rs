//! Calculation API endpoints

use api_types::calculation::{CalculationCreate, CalculationResponse, CalculationUpdate};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use engine::{StoredCalculation, User};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn to_response(calculation: StoredCalculation) -> CalculationResponse {
    CalculationResponse {
        id: calculation.id,
        user_id: calculation.user_id,
        kind: calculation.operation.as_str().to_string(),
        inputs: calculation.inputs,
        result: calculation.result,
        created_at: calculation.created_at,
        updated_at: calculation.updated_at,
    }
}

fn parse_id(raw: &str) -> Result<Uuid, ServerError> {
    Uuid::parse_str(raw).map_err(|_| ServerError::Generic("Invalid calculation id format.".to_string()))
}

/// Handle requests for creating a calculation
pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): WithRejection<Json<CalculationCreate>, ServerError>,
) -> Result<(StatusCode, Json<CalculationResponse>), ServerError> {
    payload.validate()?;

    let calculation = state
        .engine
        .new_calculation(user.id, &payload.kind, payload.inputs)
        .await?;

    Ok((StatusCode::CREATED, Json(to_response(calculation))))
}

/// Handle requests for listing the user's calculations
pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<CalculationResponse>>, ServerError> {
    let calculations = state.engine.list_calculations(user.id).await?;

    Ok(Json(calculations.into_iter().map(to_response).collect()))
}

/// Handle requests for reading one calculation
pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<CalculationResponse>, ServerError> {
    let id = parse_id(&id)?;
    let calculation = state.engine.calculation(id, user.id).await?;

    Ok(Json(to_response(calculation)))
}

/// Handle requests for editing a calculation
pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<CalculationUpdate>, ServerError>,
) -> Result<Json<CalculationResponse>, ServerError> {
    let id = parse_id(&id)?;
    payload.validate()?;

    let calculation = state
        .engine
        .update_calculation(id, user.id, payload.kind.as_deref(), payload.inputs)
        .await?;

    Ok(Json(to_response(calculation)))
}

/// Handle requests for deleting a calculation
pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    let id = parse_id(&id)?;
    state.engine.delete_calculation(id, user.id).await?;

    Ok(StatusCode::NO_CONTENT)
}
