pub mod alerts;
pub mod metrics;
pub mod servers;
pub mod thresholds;
