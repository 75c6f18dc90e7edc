//! Operational Alerts
//!
//! `NotificationSink` is the outbound alert port used by the gateway's memory
//! monitor and by the CLI on fatal job failures. Delivery is best effort:
//! callers log a failed alert and carry on.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::NotifyConfig;
use crate::constants::network::WEBHOOK_TIMEOUT_SECS;
use crate::types::{ForgeError, Result};

const APP_NAME: &str = "cardforge";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Warn,
    Error,
}

impl AlertLevel {
    /// Attachment color for Slack-style webhooks
    fn color(&self) -> &'static str {
        match self {
            AlertLevel::Info => "#22C55E",
            AlertLevel::Warn => "#F59E0B",
            AlertLevel::Error => "#EF4444",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Info => write!(f, "info"),
            AlertLevel::Warn => write!(f, "warn"),
            AlertLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub level: AlertLevel,
    pub title: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl Alert {
    pub fn new(level: AlertLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.fields.push((name.into(), value.to_string()));
        self
    }
}

/// Outbound alert channel
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn alert(&self, alert: &Alert) -> Result<()>;
}

pub type SharedNotifier = Arc<dyn NotificationSink>;

/// Deliver an alert, logging instead of propagating failures
pub async fn notify_best_effort(sink: &dyn NotificationSink, alert: &Alert) {
    if let Err(e) = sink.alert(alert).await {
        warn!("Failed to deliver alert '{}': {}", alert.title, e);
    }
}

/// Webhook notifier when a URL is configured, log-only otherwise
pub fn notifier_from_config(config: &NotifyConfig) -> Result<SharedNotifier> {
    match &config.webhook_url {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(url, &config.environment)?)),
        None => Ok(Arc::new(TracingNotifier)),
    }
}

// =============================================================================
// Tracing Notifier
// =============================================================================

/// Writes alerts to the log
pub struct TracingNotifier;

#[async_trait]
impl NotificationSink for TracingNotifier {
    async fn alert(&self, alert: &Alert) -> Result<()> {
        let fields = alert
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");

        match alert.level {
            AlertLevel::Info => info!("[alert] {}: {} {}", alert.title, alert.message, fields),
            AlertLevel::Warn => warn!("[alert] {}: {} {}", alert.title, alert.message, fields),
            AlertLevel::Error => error!("[alert] {}: {} {}", alert.title, alert.message, fields),
        }
        Ok(())
    }
}

// =============================================================================
// Webhook Notifier
// =============================================================================

/// Posts Slack-style attachments to an incoming webhook
pub struct WebhookNotifier {
    /// Webhook URLs embed a credential; kept out of logs and debug output
    url: SecretString,
    environment: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: &str, environment: &str) -> Result<Self> {
        url::Url::parse(url)
            .map_err(|e| ForgeError::Config(format!("Invalid webhook URL: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            url: SecretString::from(url.to_string()),
            environment: environment.to_string(),
            client,
        })
    }

    fn payload(&self, alert: &Alert) -> Value {
        let fields: Vec<Value> = alert
            .fields
            .iter()
            .map(|(name, value)| json!({"title": name, "value": value, "short": true}))
            .collect();

        json!({
            "attachments": [{
                "color": alert.level.color(),
                "title": format!("[{}] {}", APP_NAME, alert.title),
                "text": alert.message,
                "fields": fields,
                "footer": format!("{} | {}", APP_NAME, self.environment),
                "ts": chrono::Utc::now().timestamp(),
            }]
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn alert(&self, alert: &Alert) -> Result<()> {
        self.client
            .post(self.url.expose_secret())
            .json(&self.payload(alert))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
