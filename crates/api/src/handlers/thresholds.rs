//! Handlers for threshold administration.
//!
//! Definitions are validated here, before they can reach the evaluator.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use servwatch_alerting::resolver::resolve_applicable;
use servwatch_core::error::CoreError;
use servwatch_core::threshold::ThresholdDefinition;
use servwatch_core::types::DbId;
use servwatch_db::models::threshold::AlertThreshold;
use servwatch_db::repositories::ThresholdRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "threshold",
        id,
    })
}

/// GET /thresholds
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<AlertThreshold>>>> {
    let thresholds = ThresholdRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: thresholds }))
}

/// GET /thresholds/{id}
pub async fn get(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<AlertThreshold>>> {
    let threshold = ThresholdRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: threshold }))
}

/// POST /thresholds
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<ThresholdDefinition>,
) -> AppResult<(StatusCode, Json<DataResponse<AlertThreshold>>)> {
    input.validate_definition()?;
    let threshold = ThresholdRepo::create(&state.pool, &input, Some(admin.user_id)).await?;
    tracing::info!(
        threshold_id = threshold.id,
        user_id = admin.user_id,
        metric = %threshold.metric_type,
        "Threshold created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: threshold })))
}

/// PUT /thresholds/{id}
///
/// Replaces the definition. `last_triggered_at` is left alone.
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<ThresholdDefinition>,
) -> AppResult<Json<DataResponse<AlertThreshold>>> {
    input.validate_definition()?;
    let threshold = ThresholdRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(threshold_id = id, user_id = admin.user_id, "Threshold updated");
    Ok(Json(DataResponse { data: threshold }))
}

/// DELETE /thresholds/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !ThresholdRepo::soft_delete(&state.pool, id).await? {
        return Err(not_found(id));
    }
    tracing::info!(threshold_id = id, user_id = admin.user_id, "Threshold deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /servers/{id}/thresholds
///
/// Every enabled threshold that applies to the server: its own, global ones
/// and those inherited from the groups it belongs to.
pub async fn applicable(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(server_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<AlertThreshold>>>> {
    let thresholds = resolve_applicable(state.engine.store().as_ref(), server_id).await?;
    Ok(Json(DataResponse { data: thresholds }))
}
