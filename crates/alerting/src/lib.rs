//! Alert evaluation engine.
//!
//! - [`resolver::resolve_applicable`]: which thresholds
//!   apply to a server (direct, global, and one level of group membership).
//! - [`AlertEngine`]: evaluates a metric sample against those thresholds,
//!   opens and auto-resolves alerts, and drives notification.
//! - [`AlertStore`]: the persistence seam, with a PostgreSQL implementation
//!   and an in-memory one for tests.
//! - [`subscriber::run`]: consumes `metric.persisted` events from the bus.

pub mod engine;
pub mod error;
pub mod memory;
pub mod pg;
pub mod resolver;
pub mod store;
pub mod subscriber;

pub use engine::{AlertEngine, EvaluationReport};
pub use error::StoreError;
pub use memory::InMemoryAlertStore;
pub use pg::PgAlertStore;
pub use store::AlertStore;
