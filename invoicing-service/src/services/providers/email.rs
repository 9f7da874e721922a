use super::{EmailMessage, EmailProvider, ProviderError, ProviderResponse, SmtpCredentials};
use crate::config::SmtpConfig;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub struct SmtpProvider {
    config: SmtpConfig,
}

impl SmtpProvider {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn transport(
        &self,
        credentials: &SmtpCredentials,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, ProviderError> {
        let creds = Credentials::new(
            credentials.user.clone(),
            credentials.password.expose_secret().clone(),
        );

        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)
                .map_err(|e| {
                    ProviderError::Configuration(format!("Failed to create SMTP relay: {}", e))
                })?
                .port(self.config.port)
                .timeout(Some(Duration::from_secs(self.config.timeout_secs)))
                .credentials(creds)
                .build(),
        )
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(
        &self,
        credentials: &SmtpCredentials,
        email: &EmailMessage,
    ) -> Result<ProviderResponse, ProviderError> {
        let transport = self.transport(credentials)?;

        let from_mailbox: Mailbox = email
            .from
            .parse()
            .map_err(|e| ProviderError::Configuration(format!("Invalid from address: {}", e)))?;

        let to_mailbox: Mailbox = email
            .to
            .parse()
            .map_err(|e| ProviderError::InvalidRecipient(format!("Invalid recipient: {}", e)))?;

        let message = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(&email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body_text.clone())
            .map_err(|e| ProviderError::SendFailed(format!("Failed to build message: {}", e)))?;

        // The transport timeout covers each SMTP command; this bounds the whole exchange.
        let deadline = Duration::from_secs(self.config.timeout_secs);
        let response = tokio::time::timeout(deadline, transport.send(message))
            .await
            .map_err(|_| {
                ProviderError::Timeout(format!("No SMTP response within {:?}", deadline))
            })?
            .map_err(|e| ProviderError::SendFailed(format!("Failed to send email: {}", e)))?;

        let provider_id = response.message().next().map(|s| s.to_string());

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "Email sent successfully"
        );

        Ok(ProviderResponse::success(provider_id))
    }
}

/// Mock email provider for testing. Records every delivered message and can be told to
/// fail for particular subjects.
#[derive(Default)]
pub struct MockEmailProvider {
    attempts: AtomicU64,
    sent: Mutex<Vec<EmailMessage>>,
    failing_subjects: Mutex<Vec<String>>,
}

impl MockEmailProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send whose subject contains `fragment` fail.
    pub fn fail_when_subject_contains(&self, fragment: impl Into<String>) {
        if let Ok(mut failing) = self.failing_subjects.lock() {
            failing.push(fragment.into());
        }
    }

    /// Sends attempted, including failed ones.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Messages delivered successfully.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmailProvider for MockEmailProvider {
    async fn send(
        &self,
        _credentials: &SmtpCredentials,
        email: &EmailMessage,
    ) -> Result<ProviderResponse, ProviderError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        let should_fail = self
            .failing_subjects
            .lock()
            .map(|f| f.iter().any(|fragment| email.subject.contains(fragment.as_str())))
            .unwrap_or(false);
        if should_fail {
            return Err(ProviderError::SendFailed(format!(
                "Mock failure for '{}'",
                email.subject
            )));
        }

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "[MOCK] Email would be sent"
        );

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }

        Ok(ProviderResponse::success(Some(format!(
            "mock-email-{}",
            attempt
        ))))
    }
}
