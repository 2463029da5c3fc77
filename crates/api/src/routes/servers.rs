use axum::routing::{get, put};
use axum::Router;

use crate::handlers::{metrics, servers, thresholds};
use crate::state::AppState;

/// Server and group routes, merged at the `/api/v1` root.
///
/// ```text
/// GET, POST    /servers                           -> list_servers, create_server
/// GET, DELETE  /servers/{id}                      -> get_server, delete_server
/// GET          /servers/{id}/metrics              -> metrics::recent
/// GET          /servers/{id}/metrics/latest       -> metrics::latest
/// GET          /servers/{id}/thresholds           -> thresholds::applicable
/// GET, POST    /groups                            -> list_groups, create_group
/// PUT, DELETE  /groups/{id}/servers/{server_id}   -> add_member, remove_member
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/servers",
            get(servers::list_servers).post(servers::create_server),
        )
        .route(
            "/servers/{id}",
            get(servers::get_server).delete(servers::delete_server),
        )
        .route("/servers/{id}/metrics", get(metrics::recent))
        .route("/servers/{id}/metrics/latest", get(metrics::latest))
        .route("/servers/{id}/thresholds", get(thresholds::applicable))
        .route(
            "/groups",
            get(servers::list_groups).post(servers::create_group),
        )
        .route(
            "/groups/{id}/servers/{server_id}",
            put(servers::add_member).delete(servers::remove_member),
        )
}
