//! Event bus and alert notification infrastructure.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the event envelope carried on the bus.
//! - [`delivery`]: the [`Notifier`] capability and its Discord, webhook
//!   and email implementations, aggregated by [`NotificationDispatcher`].

pub mod bus;
pub mod delivery;

pub use bus::{EventBus, PlatformEvent, EVENT_METRIC_PERSISTED};
pub use delivery::{
    AlertNotice, NotificationConfig, NotificationDispatcher, Notifier, NotifyError,
};
