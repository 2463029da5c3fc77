use axum::routing::{get, post};
use axum::Router;

use crate::handlers::alerts;
use crate::state::AppState;

/// Routes mounted at `/alerts`.
///
/// ```text
/// GET   /                    -> list
/// GET   /active              -> active
/// GET   /{id}                -> get
/// POST  /{id}/acknowledge    -> acknowledge
/// POST  /{id}/resolve        -> resolve
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(alerts::list))
        .route("/active", get(alerts::active))
        .route("/{id}", get(alerts::get))
        .route("/{id}/acknowledge", post(alerts::acknowledge))
        .route("/{id}/resolve", post(alerts::resolve))
}
