//! Discord webhook notifier.
//!
//! Posts one embed per notice. Alert embeds are coloured by severity;
//! resolution embeds are green and carry the incident duration.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use servwatch_core::alert::format_duration;
use servwatch_core::channels::CHANNEL_DISCORD;

use super::{env_flag, env_non_empty, AlertNotice, Notifier, NotifyError};

/// Username shown on posted messages when `DISCORD_BOT_NAME` is unset.
const DEFAULT_BOT_NAME: &str = "Server Monitor";

const COLOR_CRITICAL: u32 = 15_158_332;
const COLOR_WARNING: u32 = 16_776_960;
const COLOR_INFO: u32 = 3_447_003;
const COLOR_DEFAULT: u32 = 10_197_915;
const COLOR_RESOLVED: u32 = 3_066_993;

#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub webhook_url: String,
    pub bot_name: String,
    pub avatar_url: Option<String>,
}

impl DiscordConfig {
    /// Load from the environment. `None` unless enabled and a URL is set.
    ///
    /// | Env Var               | Required | Default          |
    /// |-----------------------|----------|------------------|
    /// | `DISCORD_ENABLED`     | yes      | `false`          |
    /// | `DISCORD_WEBHOOK_URL` | yes      | --               |
    /// | `DISCORD_BOT_NAME`    | no       | `Server Monitor` |
    /// | `DISCORD_AVATAR_URL`  | no       | --               |
    pub fn from_env() -> Option<Self> {
        if !env_flag("DISCORD_ENABLED") {
            return None;
        }
        let Some(webhook_url) = env_non_empty("DISCORD_WEBHOOK_URL") else {
            tracing::warn!("DISCORD_ENABLED is set but DISCORD_WEBHOOK_URL is missing");
            return None;
        };
        Some(Self {
            webhook_url,
            bot_name: env_non_empty("DISCORD_BOT_NAME")
                .unwrap_or_else(|| DEFAULT_BOT_NAME.to_string()),
            avatar_url: env_non_empty("DISCORD_AVATAR_URL"),
        })
    }
}

fn severity_color(severity: &str) -> u32 {
    match severity {
        "critical" => COLOR_CRITICAL,
        "warning" => COLOR_WARNING,
        "info" => COLOR_INFO,
        _ => COLOR_DEFAULT,
    }
}

pub struct DiscordNotifier {
    client: reqwest::Client,
    config: DiscordConfig,
}

impl DiscordNotifier {
    pub fn new(config: DiscordConfig, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn envelope(&self, embed: Value) -> Value {
        let mut body = json!({
            "username": self.config.bot_name,
            "embeds": [embed],
        });
        if let Some(avatar) = &self.config.avatar_url {
            body["avatar_url"] = json!(avatar);
        }
        body
    }

    async fn post(&self, body: &Value) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(NotifyError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Embed for a newly opened alert.
pub fn alert_embed(notice: &AlertNotice, footer: &str) -> Value {
    let alert = &notice.alert;
    json!({
        "title": alert.title,
        "description": alert.message,
        "color": severity_color(&alert.severity),
        "fields": [
            { "name": "Server", "value": notice.server_label(), "inline": true },
            { "name": "Metric", "value": alert.metric_type, "inline": true },
            { "name": "Value", "value": format!("{:.2}", alert.metric_value), "inline": true },
            {
                "name": "Threshold",
                "value": format!("{} {:.2}", alert.operator, alert.threshold_value),
                "inline": true
            },
            { "name": "Severity", "value": alert.severity.to_uppercase(), "inline": true },
        ],
        "timestamp": alert.triggered_at.to_rfc3339(),
        "footer": { "text": footer },
    })
}

/// Embed for a resolved alert.
pub fn resolved_embed(notice: &AlertNotice, footer: &str) -> Value {
    let alert = &notice.alert;
    let resolved_at = alert.resolved_at.unwrap_or_else(Utc::now);
    json!({
        "title": format!("RESOLVED: {}", alert.title),
        "description": format!("The alert condition on {} has cleared.", notice.server_label()),
        "color": COLOR_RESOLVED,
        "fields": [
            { "name": "Server", "value": notice.server_label(), "inline": true },
            { "name": "Metric", "value": alert.metric_type, "inline": true },
            {
                "name": "Duration",
                "value": format_duration(resolved_at - alert.triggered_at),
                "inline": true
            },
        ],
        "timestamp": resolved_at.to_rfc3339(),
        "footer": { "text": footer },
    })
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn channel(&self) -> &'static str {
        CHANNEL_DISCORD
    }

    async fn send_alert(&self, notice: &AlertNotice) -> Result<(), NotifyError> {
        let body = self.envelope(alert_embed(notice, &self.config.bot_name));
        self.post(&body).await
    }

    async fn send_resolved(&self, notice: &AlertNotice) -> Result<(), NotifyError> {
        let body = self.envelope(resolved_embed(notice, &self.config.bot_name));
        self.post(&body).await
    }
}
