use axum::routing::get;
use axum::Router;

use crate::handlers::thresholds;
use crate::state::AppState;

/// Routes mounted at `/thresholds`.
///
/// Writes require the `admin` role (enforced by handler extractors).
///
/// ```text
/// GET, POST          /        -> list, create
/// GET, PUT, DELETE   /{id}    -> get, update, delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(thresholds::list).post(thresholds::create))
        .route(
            "/{id}",
            get(thresholds::get)
                .put(thresholds::update)
                .delete(thresholds::delete),
        )
}
