//! Well-known notification channel name constants.
//!
//! These are the values recorded in `alerts.notify_channels` and the names
//! notifiers register under in the dispatcher.

use serde::{Deserialize, Serialize};

/// Discord chat webhook.
pub const CHANNEL_DISCORD: &str = "discord";

/// Email notification delivered via SMTP.
pub const CHANNEL_EMAIL: &str = "email";

/// Generic JSON webhook delivered to an external HTTP endpoint.
pub const CHANNEL_WEBHOOK: &str = "webhook";

/// Per-threshold channel flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSet {
    pub discord: bool,
    pub email: bool,
    pub webhook: bool,
}

impl ChannelSet {
    /// Channel names enabled by this set, in dispatch order.
    pub fn enabled(&self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(3);
        if self.discord {
            names.push(CHANNEL_DISCORD);
        }
        if self.email {
            names.push(CHANNEL_EMAIL);
        }
        if self.webhook {
            names.push(CHANNEL_WEBHOOK);
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        !(self.discord || self.email || self.webhook)
    }
}
