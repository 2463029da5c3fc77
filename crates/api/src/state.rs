use std::sync::Arc;

use servwatch_alerting::AlertEngine;
use servwatch_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything heavy is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: servwatch_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Ingestion publishes `metric.persisted` here; the alert subscriber consumes it.
    pub event_bus: Arc<EventBus>,
    /// Manual acknowledge / resolve go through the engine so resolution
    /// notices are sent.
    pub engine: Arc<AlertEngine>,
}
