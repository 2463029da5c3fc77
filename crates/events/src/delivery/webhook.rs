//! Generic JSON webhook notifier.
//!
//! Posts `{ "event": ..., "alert": ... }` to the threshold's webhook URL, or
//! the configured default. When a secret is configured the body is signed
//! with HMAC-SHA256 and the hex digest sent in `X-Signature-256`.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde_json::json;
use servwatch_core::channels::CHANNEL_WEBHOOK;
use sha2::Sha256;

use super::{env_flag, env_non_empty, AlertNotice, Notifier, NotifyError};

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "X-Signature-256";

pub const EVENT_ALERT_TRIGGERED: &str = "alert.triggered";
pub const EVENT_ALERT_RESOLVED: &str = "alert.resolved";

#[derive(Debug, Clone, Default)]
pub struct WebhookConfig {
    /// Fallback URL for thresholds without their own `webhook_url`.
    pub default_url: Option<String>,
    pub secret: Option<String>,
}

impl WebhookConfig {
    /// Load from the environment. `None` unless `WEBHOOK_ENABLED` is set.
    ///
    /// | Env Var           | Required | Default |
    /// |-------------------|----------|---------|
    /// | `WEBHOOK_ENABLED` | yes      | `false` |
    /// | `WEBHOOK_URL`     | no       | --      |
    /// | `WEBHOOK_SECRET`  | no       | --      |
    pub fn from_env() -> Option<Self> {
        if !env_flag("WEBHOOK_ENABLED") {
            return None;
        }
        Some(Self {
            default_url: env_non_empty("WEBHOOK_URL"),
            secret: env_non_empty("WEBHOOK_SECRET"),
        })
    }
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

type HmacSha256 = Hmac<Sha256>;

/// Header value `sha256=<hex>` for `payload` under `secret`.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    format!("sha256={}", hex_encode(&mac.finalize().into_bytes()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// WebhookNotifier
// ---------------------------------------------------------------------------

pub struct WebhookNotifier {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn target<'a>(&'a self, notice: &'a AlertNotice) -> Option<&'a str> {
        notice
            .webhook_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .or(self.config.default_url.as_deref())
    }

    async fn deliver(&self, event: &str, notice: &AlertNotice) -> Result<(), NotifyError> {
        let url = self
            .target(notice)
            .ok_or(NotifyError::NotConfigured(CHANNEL_WEBHOOK))?;

        let body = serde_json::to_vec(&json!({
            "event": event,
            "alert": notice.alert,
            "server": notice.hostname,
        }))?;

        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(secret) = &self.config.secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(secret, &body));
        }

        let response = request.body(body).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn channel(&self) -> &'static str {
        CHANNEL_WEBHOOK
    }

    async fn send_alert(&self, notice: &AlertNotice) -> Result<(), NotifyError> {
        self.deliver(EVENT_ALERT_TRIGGERED, notice).await
    }

    async fn send_resolved(&self, notice: &AlertNotice) -> Result<(), NotifyError> {
        self.deliver(EVENT_ALERT_RESOLVED, notice).await
    }
}
