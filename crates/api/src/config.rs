use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except the JWT
/// secret.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long metric rows are kept (default: `30` days).
    pub metrics_retention_days: i64,
    /// Event bus buffer (default: `1024`). Metric events published while the
    /// alert evaluator is this far behind are dropped from evaluation.
    pub event_bus_capacity: usize,
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `HOST`                   | `0.0.0.0`               |
    /// | `PORT`                   | `8080`                  |
    /// | `CORS_ORIGINS`           | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                    |
    /// | `METRICS_RETENTION_DAYS` | `30`                    |
    /// | `EVENT_BUS_CAPACITY`     | `1024`                  |
    ///
    /// See [`JwtConfig::from_env`] for the token settings.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let metrics_retention_days: i64 = std::env::var("METRICS_RETENTION_DAYS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("METRICS_RETENTION_DAYS must be a valid i64");
        assert!(metrics_retention_days > 0, "METRICS_RETENTION_DAYS must be positive");

        let event_bus_capacity: usize = std::env::var("EVENT_BUS_CAPACITY")
            .unwrap_or_else(|_| "1024".into())
            .parse()
            .expect("EVENT_BUS_CAPACITY must be a valid usize");
        assert!(event_bus_capacity > 0, "EVENT_BUS_CAPACITY must be positive");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            metrics_retention_days,
            event_bus_capacity,
            jwt: JwtConfig::from_env(),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
