//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod alert_repo;
pub mod metric_repo;
pub mod server_group_repo;
pub mod server_repo;
pub mod threshold_repo;

pub use alert_repo::AlertRepo;
pub use metric_repo::MetricRepo;
pub use server_group_repo::ServerGroupRepo;
pub use server_repo::ServerRepo;
pub use threshold_repo::ThresholdRepo;
