//! Delivery of rendered result sets by email.
//!
//! Rendering lives in [`render`]; transport goes through the [`Mailer`]
//! trait. [`HttpMailer`] posts messages to a JSON mail relay.

pub mod render;

pub use render::{EmailDocument, format_for_email};

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("email delivery is disabled")]
    Disabled,

    #[error("failed to render email: {0}")]
    Render(String),

    #[error("mail relay request failed: {0}")]
    Transport(String),

    #[error("mail relay rejected message with status {status}")]
    Rejected { status: u16 },
}

/// Checks the basic shape of an address: `local@domain.tld`, no whitespace.
pub fn validate_address(address: &str) -> Result<&str, EmailError> {
    let address = address.trim();
    let invalid = || EmailError::InvalidAddress(address.to_string());

    if address.is_empty() || address.len() > 254 || address.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = address.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let labels_ok = domain.split('.').count() >= 2 && domain.split('.').all(|l| !l.is_empty());
    if !labels_ok {
        return Err(invalid());
    }

    Ok(address)
}

/// A message addressed to one recipient.
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl EmailMessage {
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>, document: EmailDocument) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            subject: document.subject,
            html: document.html,
            text: document.text,
        }
    }
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    /// Address used in the `from` field of outgoing messages.
    fn sender(&self) -> &str;

    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Sends messages to an HTTP mail relay as JSON.
pub struct HttpMailer {
    client: Client,
    config: EmailConfig,
}

impl HttpMailer {
    pub fn new(config: EmailConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build mail relay HTTP client: {e}"))?;

        Ok(Self { client, config })
    }
}

#[async_trait::async_trait]
impl Mailer for HttpMailer {
    fn sender(&self) -> &str {
        &self.config.from_address
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if !self.config.enabled {
            return Err(EmailError::Disabled);
        }

        let mut request = self.client.post(&self.config.relay_url).json(message);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        debug!(to = %message.to, relay = %self.config.relay_url, "Sending email");

        let response = request
            .send()
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmailError::Rejected {
                status: status.as_u16(),
            });
        }

        info!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}
