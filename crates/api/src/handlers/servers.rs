//! Handlers for servers and server groups.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use servwatch_core::error::CoreError;
use servwatch_core::types::DbId;
use servwatch_db::models::server::{CreateServer, CreateServerGroup, Server, ServerGroup};
use servwatch_db::repositories::{ServerGroupRepo, ServerRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

fn require_non_empty(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Servers
// ---------------------------------------------------------------------------

/// GET /servers
pub async fn list_servers(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Server>>>> {
    let servers = ServerRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: servers }))
}

/// GET /servers/{id}
pub async fn get_server(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Server>>> {
    let server = ServerRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "server", id }))?;
    Ok(Json(DataResponse { data: server }))
}

/// POST /servers
pub async fn create_server(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<CreateServer>,
) -> AppResult<(StatusCode, Json<DataResponse<Server>>)> {
    require_non_empty("hostname", &input.hostname)?;
    let server = ServerRepo::create(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: server })))
}

/// DELETE /servers/{id}
pub async fn delete_server(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !ServerRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "server", id }));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// GET /groups
pub async fn list_groups(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<ServerGroup>>>> {
    let groups = ServerGroupRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: groups }))
}

/// POST /groups
pub async fn create_group(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<CreateServerGroup>,
) -> AppResult<(StatusCode, Json<DataResponse<ServerGroup>>)> {
    require_non_empty("name", &input.name)?;
    let group = ServerGroupRepo::create(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: group })))
}

/// PUT /groups/{id}/servers/{server_id}
///
/// Idempotent.
pub async fn add_member(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path((group_id, server_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    if ServerGroupRepo::find_by_id(&state.pool, group_id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "server_group",
            id: group_id,
        }));
    }
    if ServerRepo::find_by_id(&state.pool, server_id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "server",
            id: server_id,
        }));
    }
    ServerGroupRepo::add_server(&state.pool, group_id, server_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /groups/{id}/servers/{server_id}
pub async fn remove_member(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path((group_id, server_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    if !ServerGroupRepo::remove_server(&state.pool, group_id, server_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "server_group_member",
            id: server_id,
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}
