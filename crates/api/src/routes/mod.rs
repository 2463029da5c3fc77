pub mod alerts;
pub mod health;
pub mod metrics;
pub mod servers;
pub mod thresholds;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /metrics                                  ingest (POST, agent push)
///
/// /servers                                  list, create
/// /servers/{id}                             get, delete
/// /servers/{id}/metrics                     recent samples
/// /servers/{id}/metrics/latest              latest sample
/// /servers/{id}/thresholds                  applicable thresholds
///
/// /groups                                   list, create
/// /groups/{id}/servers/{server_id}          add (PUT), remove (DELETE)
///
/// /thresholds                               list, create (admin)
/// /thresholds/{id}                          get, update, delete (admin)
///
/// /alerts                                   filtered list
/// /alerts/active                            active alerts
/// /alerts/{id}                              get
/// /alerts/{id}/acknowledge                  acknowledge (POST)
/// /alerts/{id}/resolve                      resolve (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/metrics", metrics::router())
        .merge(servers::router())
        .nest("/thresholds", thresholds::router())
        .nest("/alerts", alerts::router())
}
