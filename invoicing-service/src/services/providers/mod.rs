pub mod email;

use async_trait::async_trait;
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use email::{MockEmailProvider, SmtpProvider};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Send error: {0}")]
    SendFailed(String),

    #[error("Timed out: {0}")]
    Timeout(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub provider_id: Option<String>,
    pub success: bool,
    pub message: Option<String>,
}

impl ProviderResponse {
    pub fn success(provider_id: Option<String>) -> Self {
        Self {
            provider_id,
            success: true,
            message: None,
        }
    }
}

/// Login used for one send. Resolved per run, since the stored settings may change.
#[derive(Debug, Clone)]
pub struct SmtpCredentials {
    pub user: String,
    pub password: Secret<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body_text: String,
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(
        &self,
        credentials: &SmtpCredentials,
        email: &EmailMessage,
    ) -> Result<ProviderResponse, ProviderError>;
}
