//! Handlers for metric ingestion and reads.
//!
//! Ingestion persists the sample and publishes `metric.persisted`; alert
//! evaluation happens in the alerting subscriber and can never fail the
//! request.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use servwatch_core::error::CoreError;
use servwatch_core::types::DbId;
use servwatch_db::models::metric::{CreateMetric, Metric};
use servwatch_db::repositories::{MetricRepo, ServerRepo};
use servwatch_events::{PlatformEvent, EVENT_METRIC_PERSISTED};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

fn validate_metric(input: &CreateMetric) -> Result<(), CoreError> {
    if !input.cpu_usage.is_finite() || input.cpu_usage < 0.0 {
        return Err(CoreError::Validation(
            "cpu_usage must be a non-negative number".into(),
        ));
    }
    let counters = [
        ("memory_total", input.memory_total),
        ("memory_used", input.memory_used),
        ("memory_free", input.memory_free),
        ("disk_total", input.disk_total),
        ("disk_used", input.disk_used),
        ("disk_free", input.disk_free),
        ("net_upload", input.net_upload),
        ("net_download", input.net_download),
    ];
    if let Some((name, _)) = counters.iter().find(|(_, v)| *v < 0) {
        return Err(CoreError::Validation(format!("{name} must not be negative")));
    }
    Ok(())
}

/// POST /metrics
///
/// Accept a sample pushed by a host agent. Unauthenticated.
pub async fn ingest(
    State(state): State<AppState>,
    Json(input): Json<CreateMetric>,
) -> AppResult<(StatusCode, Json<DataResponse<Metric>>)> {
    validate_metric(&input)?;

    if ServerRepo::find_by_id(&state.pool, input.server_id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "server",
            id: input.server_id,
        }));
    }

    let metric = MetricRepo::insert(&state.pool, &input).await?;
    tracing::debug!(metric_id = metric.id, server_id = metric.server_id, "Metric stored");

    match serde_json::to_value(metric.to_sample()) {
        Ok(payload) => state.event_bus.publish(
            PlatformEvent::new(EVENT_METRIC_PERSISTED)
                .with_source("server", metric.server_id)
                .with_payload(payload),
        ),
        Err(e) => tracing::error!(metric_id = metric.id, error = %e, "Failed to encode metric event"),
    }

    Ok((StatusCode::CREATED, Json(DataResponse { data: metric })))
}

/// GET /servers/{id}/metrics/latest
pub async fn latest(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(server_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Metric>>> {
    let metric = MetricRepo::latest_for_server(&state.pool, server_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "metric",
            id: server_id,
        }))?;
    Ok(Json(DataResponse { data: metric }))
}

/// GET /servers/{id}/metrics?limit=&offset=
pub async fn recent(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(server_id): Path<DbId>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Metric>>>> {
    let metrics =
        MetricRepo::list_for_server(&state.pool, server_id, page.limit(), page.offset()).await?;
    Ok(Json(DataResponse { data: metrics }))
}
