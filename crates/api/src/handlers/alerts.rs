//! Handlers for alert queries and manual lifecycle actions.

use axum::extract::{Path, Query, State};
use axum::Json;
use servwatch_core::alert::AlertStatus;
use servwatch_core::error::CoreError;
use servwatch_core::threshold::Severity;
use servwatch_core::types::DbId;
use servwatch_db::models::alert::{Alert, AlertActionInput, AlertFilter};
use servwatch_db::repositories::AlertRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireOperator;
use crate::query::MAX_LIMIT;
use crate::response::DataResponse;
use crate::state::AppState;

fn validate_filter(filter: &mut AlertFilter) -> Result<(), CoreError> {
    if let Some(status) = &filter.status {
        status.parse::<AlertStatus>()?;
    }
    if let Some(severity) = &filter.severity {
        severity.parse::<Severity>()?;
    }
    if let (Some(start), Some(end)) = (filter.start_time, filter.end_time) {
        if start > end {
            return Err(CoreError::Validation(
                "start_time must not be after end_time".into(),
            ));
        }
    }
    filter.limit = filter.limit.map(|l| l.clamp(1, MAX_LIMIT));
    filter.offset = filter.offset.map(|o| o.max(0));
    Ok(())
}

/// GET /alerts?server_id=&status=&severity=&start_time=&end_time=&limit=&offset=
///
/// Newest first. Times are RFC 3339.
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(mut filter): Query<AlertFilter>,
) -> AppResult<Json<DataResponse<Vec<Alert>>>> {
    validate_filter(&mut filter)?;
    let alerts = AlertRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: alerts }))
}

/// GET /alerts/active
pub async fn active(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Alert>>>> {
    let alerts = AlertRepo::list_active(&state.pool).await?;
    Ok(Json(DataResponse { data: alerts }))
}

/// GET /alerts/{id}
pub async fn get(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let alert = AlertRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "alert", id }))?;
    Ok(Json(DataResponse { data: alert }))
}

/// POST /alerts/{id}/acknowledge
///
/// Only legal while the alert is `active`; 409 otherwise.
pub async fn acknowledge(
    State(state): State<AppState>,
    RequireOperator(user): RequireOperator,
    Path(id): Path<DbId>,
    Json(input): Json<AlertActionInput>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let alert = state
        .engine
        .acknowledge(id, Some(user.user_id), input.notes.as_deref())
        .await?;
    Ok(Json(DataResponse { data: alert }))
}

/// POST /alerts/{id}/resolve
///
/// Legal from `active` or `acknowledged`; 409 otherwise.
pub async fn resolve(
    State(state): State<AppState>,
    RequireOperator(user): RequireOperator,
    Path(id): Path<DbId>,
    Json(input): Json<AlertActionInput>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let alert = state
        .engine
        .resolve(id, Some(user.user_id), input.notes.as_deref())
        .await?;
    Ok(Json(DataResponse { data: alert }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};

    #[test]
    fn unknown_status_is_rejected() {
        let mut filter = AlertFilter {
            status: Some("snoozed".into()),
            ..Default::default()
        };
        assert_matches!(validate_filter(&mut filter), Err(CoreError::Validation(_)));
    }

    #[test]
    fn inverted_time_range_is_rejected() {
        let now = Utc::now();
        let mut filter = AlertFilter {
            start_time: Some(now),
            end_time: Some(now - Duration::hours(1)),
            ..Default::default()
        };
        assert_matches!(validate_filter(&mut filter), Err(CoreError::Validation(_)));
    }

    #[test]
    fn paging_is_clamped() {
        let mut filter = AlertFilter {
            status: Some("acknowledged".into()),
            severity: Some("critical".into()),
            limit: Some(1_000_000),
            offset: Some(-5),
            ..Default::default()
        };
        validate_filter(&mut filter).unwrap();
        assert_eq!(filter.limit, Some(MAX_LIMIT));
        assert_eq!(filter.offset, Some(0));
    }
}
