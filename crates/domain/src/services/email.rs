//! Email transport interface.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while handing a message to a transport.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

/// A fully composed email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    /// HTML body.
    pub body: String,
}

/// Outbound email transport.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError>;
}

/// Provider that keeps messages in memory instead of delivering them.
///
/// Useful for local development and for asserting on outgoing mail in tests.
#[derive(Debug, Default)]
pub struct RecordingEmailProvider {
    sent: Mutex<Vec<EmailMessage>>,
    simulate_failure: bool,
}

impl RecordingEmailProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every send fails.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            simulate_failure: true,
        }
    }

    /// Messages accepted so far, in send order.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl EmailProvider for RecordingEmailProvider {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.simulate_failure {
            tracing::warn!(to = %message.to, "Recording email provider simulating failure");
            return Err(EmailError::SendFailed("Simulated failure".to_string()));
        }

        tracing::debug!(
            to = %message.to,
            subject = %message.subject,
            "Recorded outgoing email"
        );
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            from: "noreply@example.com".to_string(),
            to: "user@example.com".to_string(),
            subject: "Hello".to_string(),
            body: "<p>Hi</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_recording_provider_keeps_messages() {
        let provider = RecordingEmailProvider::new();
        provider.send(message()).await.unwrap();
        provider.send(message()).await.unwrap();
        assert_eq!(provider.sent().len(), 2);
        assert_eq!(provider.sent()[0], message());
    }

    #[tokio::test]
    async fn test_failing_provider() {
        let provider = RecordingEmailProvider::failing();
        assert!(matches!(
            provider.send(message()).await,
            Err(EmailError::SendFailed(_))
        ));
        assert!(provider.sent().is_empty());
    }
}
