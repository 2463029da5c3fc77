//! Email notifier via SMTP.
//!
//! Wraps the `lettre` async SMTP transport to send plain-text alert and
//! resolution messages to a fixed recipient list.

use async_trait::async_trait;
use chrono::Utc;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use servwatch_core::alert::format_duration;
use servwatch_core::channels::CHANNEL_EMAIL;

use super::{env_non_empty, AlertNotice, Notifier, NotifyError};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "alerts@servwatch.local";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    /// Recipients, parsed from a comma separated list.
    pub recipients: Vec<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` unless both `SMTP_HOST` and `ALERT_EMAIL_TO` are set.
    ///
    /// | Variable         | Required | Default                  |
    /// |------------------|----------|--------------------------|
    /// | `SMTP_HOST`      | yes      | --                       |
    /// | `ALERT_EMAIL_TO` | yes      | --                       |
    /// | `SMTP_PORT`      | no       | `587`                    |
    /// | `SMTP_FROM`      | no       | `alerts@servwatch.local` |
    /// | `SMTP_USER`      | no       | --                       |
    /// | `SMTP_PASSWORD`  | no       | --                       |
    pub fn from_env() -> Option<Self> {
        let smtp_host = env_non_empty("SMTP_HOST")?;
        let recipients = parse_recipients(&env_non_empty("ALERT_EMAIL_TO")?);
        if recipients.is_empty() {
            return None;
        }
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: env_non_empty("SMTP_FROM")
                .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: env_non_empty("SMTP_USER"),
            smtp_password: env_non_empty("SMTP_PASSWORD"),
            recipients,
        })
    }
}

fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Message bodies
// ---------------------------------------------------------------------------

fn alert_body(notice: &AlertNotice) -> (String, String) {
    let alert = &notice.alert;
    let subject = format!("[{}] {}", alert.severity.to_uppercase(), alert.title);
    let body = format!(
        "{}\n\nServer: {}\nMetric: {}\nValue: {:.2}\nThreshold: {} {:.2}\nSeverity: {}\nTriggered: {}\n",
        alert.message,
        notice.server_label(),
        alert.metric_type,
        alert.metric_value,
        alert.operator,
        alert.threshold_value,
        alert.severity,
        alert.triggered_at.to_rfc3339(),
    );
    (subject, body)
}

fn resolved_body(notice: &AlertNotice) -> (String, String) {
    let alert = &notice.alert;
    let resolved_at = alert.resolved_at.unwrap_or_else(Utc::now);
    let subject = format!("[RESOLVED] {}", alert.title);
    let body = format!(
        "The alert condition has cleared.\n\nServer: {}\nMetric: {}\nTriggered: {}\nResolved: {}\nDuration: {}\n",
        notice.server_label(),
        alert.metric_type,
        alert.triggered_at.to_rfc3339(),
        resolved_at.to_rfc3339(),
        format_duration(resolved_at - alert.triggered_at),
    );
    (subject, body)
}

// ---------------------------------------------------------------------------
// EmailNotifier
// ---------------------------------------------------------------------------

pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    async fn send(&self, subject: String, body: String) -> Result<(), EmailError> {
        let mut builder = Message::builder()
            .from(self.config.from_address.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for to in &self.config.recipients {
            builder = builder.to(to.parse()?);
        }
        let email = builder
            .body(body)
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn channel(&self) -> &'static str {
        CHANNEL_EMAIL
    }

    async fn send_alert(&self, notice: &AlertNotice) -> Result<(), NotifyError> {
        let (subject, body) = alert_body(notice);
        self.send(subject, body).await?;
        tracing::info!(alert_id = notice.alert.id, "Alert email sent");
        Ok(())
    }

    async fn send_resolved(&self, notice: &AlertNotice) -> Result<(), NotifyError> {
        let (subject, body) = resolved_body(notice);
        self.send(subject, body).await?;
        tracing::info!(alert_id = notice.alert.id, "Resolution email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
