//! Alert notification channels.
//!
//! Every channel implements [`Notifier`]. The [`NotificationDispatcher`]
//! fans a notice out to the enabled channels concurrently, bounds each call
//! with a timeout, and reports which channels accepted it. Failures are
//! logged here and never returned to the caller.

pub mod discord;
pub mod email;
pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use servwatch_core::types::DbId;
use servwatch_db::models::alert::Alert;

use self::discord::{DiscordConfig, DiscordNotifier};
use self::email::{EmailConfig, EmailError, EmailNotifier};
use self::webhook::{WebhookConfig, WebhookNotifier};

/// Default bound on a single notifier call.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The underlying HTTP request failed (network, DNS, TLS).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote endpoint returned a non-2xx status code.
    #[error("Endpoint returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Notification timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error("Payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The channel is enabled on the threshold but has no usable configuration.
    #[error("Channel {0} is not configured")]
    NotConfigured(&'static str),
}

// ---------------------------------------------------------------------------
// Notice + Notifier
// ---------------------------------------------------------------------------

/// Everything a channel needs to render an alert or resolution message.
#[derive(Debug, Clone)]
pub struct AlertNotice {
    pub alert: Alert,
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    /// Per-threshold webhook target; overrides the configured default.
    pub webhook_url: Option<String>,
}

impl AlertNotice {
    pub fn new(alert: Alert) -> Self {
        Self {
            alert,
            hostname: None,
            ip_address: None,
            webhook_url: None,
        }
    }

    /// `hostname (ip)` when known, otherwise `Server #id`.
    pub fn server_label(&self) -> String {
        match (&self.hostname, &self.ip_address) {
            (Some(host), Some(ip)) if !ip.is_empty() => format!("{host} ({ip})"),
            (Some(host), _) => host.clone(),
            _ => format!("Server #{}", self.alert.server_id),
        }
    }

    pub fn alert_id(&self) -> DbId {
        self.alert.id
    }
}

/// One outbound notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name recorded in `alerts.notify_channels`.
    fn channel(&self) -> &'static str;

    async fn send_alert(&self, notice: &AlertNotice) -> Result<(), NotifyError>;

    async fn send_resolved(&self, notice: &AlertNotice) -> Result<(), NotifyError>;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Channel configuration. A channel is `None` when disabled or incomplete.
#[derive(Debug, Clone, Default)]
pub struct NotificationConfig {
    pub discord: Option<DiscordConfig>,
    pub webhook: Option<WebhookConfig>,
    pub email: Option<EmailConfig>,
    pub timeout: Option<Duration>,
}

impl NotificationConfig {
    /// Load every channel from the environment.
    ///
    /// | Env Var               | Default |
    /// |-----------------------|---------|
    /// | `NOTIFY_TIMEOUT_SECS` | `10`    |
    ///
    /// See [`DiscordConfig::from_env`], [`WebhookConfig::from_env`] and
    /// [`EmailConfig::from_env`] for the per-channel variables.
    pub fn from_env() -> Self {
        let timeout = std::env::var("NOTIFY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        Self {
            discord: DiscordConfig::from_env(),
            webhook: WebhookConfig::from_env(),
            email: EmailConfig::from_env(),
            timeout,
        }
    }
}

/// Read a boolean flag such as `DISCORD_ENABLED`.
pub(crate) fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Read a variable, treating an empty value as unset.
pub(crate) fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoticeKind {
    Alert,
    Resolved,
}

/// Fans notices out to registered notifiers.
pub struct NotificationDispatcher {
    notifiers: Vec<Arc<dyn Notifier>>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            notifiers: Vec::new(),
            timeout,
        }
    }

    /// Build a dispatcher with one notifier per configured channel.
    pub fn from_config(config: &NotificationConfig) -> Result<Self, NotifyError> {
        let timeout = config.timeout.unwrap_or(DEFAULT_NOTIFY_TIMEOUT);
        let mut dispatcher = Self::new(timeout);
        if let Some(discord) = &config.discord {
            dispatcher.register(Arc::new(DiscordNotifier::new(discord.clone(), timeout)?));
        }
        if let Some(email) = &config.email {
            dispatcher.register(Arc::new(EmailNotifier::new(email.clone())));
        }
        if let Some(webhook) = &config.webhook {
            dispatcher.register(Arc::new(WebhookNotifier::new(webhook.clone(), timeout)?));
        }
        tracing::info!(channels = ?dispatcher.channels(), "Notification channels registered");
        Ok(dispatcher)
    }

    /// Register a notifier, replacing any existing one for the same channel.
    pub fn register(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifiers.retain(|n| n.channel() != notifier.channel());
        self.notifiers.push(notifier);
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.register(notifier);
        self
    }

    /// Names of the registered channels.
    pub fn channels(&self) -> Vec<&'static str> {
        self.notifiers.iter().map(|n| n.channel()).collect()
    }

    /// Send an alert notice on `channels`. Returns the channels that
    /// succeeded, in the order given.
    pub async fn dispatch_alert<S: AsRef<str>>(
        &self,
        notice: &AlertNotice,
        channels: &[S],
    ) -> Vec<String> {
        self.dispatch(NoticeKind::Alert, notice, channels).await
    }

    /// Send a resolution notice on `channels`.
    pub async fn dispatch_resolved<S: AsRef<str>>(
        &self,
        notice: &AlertNotice,
        channels: &[S],
    ) -> Vec<String> {
        self.dispatch(NoticeKind::Resolved, notice, channels).await
    }

    async fn dispatch<S: AsRef<str>>(
        &self,
        kind: NoticeKind,
        notice: &AlertNotice,
        channels: &[S],
    ) -> Vec<String> {
        let sends = channels.iter().map(|channel| {
            let channel = channel.as_ref();
            async move {
                let result = self.send_one(kind, channel, notice).await;
                (channel, result)
            }
        });

        let mut succeeded = Vec::with_capacity(channels.len());
        for (channel, result) in join_all(sends).await {
            match result {
                Ok(()) => {
                    tracing::debug!(alert_id = notice.alert.id, channel, ?kind, "Notification sent");
                    succeeded.push(channel.to_string());
                }
                Err(NotifyError::NotConfigured(_)) => {
                    tracing::warn!(
                        alert_id = notice.alert.id,
                        channel,
                        "Channel enabled on threshold but not configured, skipping"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        alert_id = notice.alert.id,
                        channel,
                        ?kind,
                        error = %e,
                        "Notification delivery failed"
                    );
                }
            }
        }
        succeeded
    }

    async fn send_one(
        &self,
        kind: NoticeKind,
        channel: &str,
        notice: &AlertNotice,
    ) -> Result<(), NotifyError> {
        let notifier = self
            .notifiers
            .iter()
            .find(|n| n.channel() == channel)
            .ok_or(NotifyError::NotConfigured(static_channel(channel)))?;

        let call = async {
            match kind {
                NoticeKind::Alert => notifier.send_alert(notice).await,
                NoticeKind::Resolved => notifier.send_resolved(notice).await,
            }
        };

        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout(self.timeout)),
        }
    }
}

/// Map a channel name onto its static constant for error reporting.
fn static_channel(channel: &str) -> &'static str {
    use servwatch_core::channels::{CHANNEL_DISCORD, CHANNEL_EMAIL, CHANNEL_WEBHOOK};
    match channel {
        CHANNEL_DISCORD => CHANNEL_DISCORD,
        CHANNEL_EMAIL => CHANNEL_EMAIL,
        CHANNEL_WEBHOOK => CHANNEL_WEBHOOK,
        _ => "unknown",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
