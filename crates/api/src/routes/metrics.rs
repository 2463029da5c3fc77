use axum::routing::post;
use axum::Router;

use crate::handlers::metrics;
use crate::state::AppState;

/// Routes mounted at `/metrics`.
///
/// ```text
/// POST /    -> ingest
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(metrics::ingest))
}
