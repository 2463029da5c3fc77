use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use servwatch_alerting::{subscriber, AlertEngine, PgAlertStore};
use servwatch_api::background::metrics_retention;
use servwatch_api::config::ServerConfig;
use servwatch_api::router::build_app_router;
use servwatch_api::state::AppState;
use servwatch_events::{EventBus, NotificationConfig, NotificationDispatcher};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = servwatch_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    servwatch_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    servwatch_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Notifications ---
    let notify_config = NotificationConfig::from_env();
    let dispatcher = NotificationDispatcher::from_config(&notify_config)
        .expect("Failed to build notification channels");
    tracing::info!(channels = ?dispatcher.channels(), "Notification channels configured");

    // --- Alert engine ---
    let engine = Arc::new(AlertEngine::new(
        Arc::new(PgAlertStore::new(pool.clone())),
        Arc::new(dispatcher),
    ));

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::new(config.event_bus_capacity));
    let evaluator_handle = tokio::spawn(subscriber::run(Arc::clone(&engine), event_bus.subscribe()));
    tracing::info!("Alert evaluator subscribed to metric events");

    // --- Background jobs ---
    let retention_cancel = CancellationToken::new();
    let retention_handle = tokio::spawn(metrics_retention::run(
        pool.clone(),
        config.metrics_retention_days,
        retention_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
        engine,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    retention_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), retention_handle).await;

    // The router (and with it the state's bus handle) is gone; dropping the
    // last sender closes the channel and stops the evaluator.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), evaluator_handle).await;
    tracing::info!("Graceful shutdown complete");
}

/// Install the global subscriber. `LOG_FORMAT=json` selects JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "servwatch_api=debug,servwatch_alerting=debug,servwatch_events=info,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
