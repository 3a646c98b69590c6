//! Outbound email transports selected by configuration.
//!
//! Supported providers:
//! - `console`: logs the message (development)
//! - `smtp`: sends through an SMTP relay with lettre
//! - `sendgrid`: posts to the SendGrid v3 API

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde_json::json;
use tracing::{debug, error, info};

use domain::services::{EmailError, EmailMessage, EmailProvider};

use crate::config::EmailConfig;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

enum Transport {
    Console,
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    SendGrid { client: reqwest::Client, api_key: String },
}

/// Email provider built from [`EmailConfig`].
pub struct ConfiguredEmailProvider {
    enabled: bool,
    transport: Transport,
}

impl ConfiguredEmailProvider {
    pub fn from_config(config: &EmailConfig) -> Result<Self, EmailError> {
        let transport = match config.provider.as_str() {
            "console" => Transport::Console,
            "smtp" => Transport::Smtp(smtp_transport(config)?),
            "sendgrid" => {
                if config.sendgrid_api_key.is_empty() {
                    return Err(EmailError::NotConfigured(
                        "email.sendgrid_api_key is required for the sendgrid provider".to_string(),
                    ));
                }
                Transport::SendGrid {
                    client: reqwest::Client::new(),
                    api_key: config.sendgrid_api_key.clone(),
                }
            }
            other => {
                return Err(EmailError::NotConfigured(format!(
                    "Unknown email provider '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            enabled: config.enabled,
            transport,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn provider_name(&self) -> &'static str {
        match self.transport {
            Transport::Console => "console",
            Transport::Smtp(_) => "smtp",
            Transport::SendGrid { .. } => "sendgrid",
        }
    }

    async fn send_smtp(
        mailer: &AsyncSmtpTransport<Tokio1Executor>,
        message: EmailMessage,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(parse_mailbox(&message.from)?)
            .to(parse_mailbox(&message.to)?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(message.body)
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        mailer
            .send(email)
            .await
            .map_err(|e| EmailError::SendFailed(format!("SMTP send failed: {}", e)))?;

        info!(to = %message.to, subject = %message.subject, "Email sent via SMTP");
        Ok(())
    }

    async fn send_sendgrid(
        client: &reqwest::Client,
        api_key: &str,
        message: EmailMessage,
    ) -> Result<(), EmailError> {
        let body = json!({
            "personalizations": [{
                "to": [{"email": message.to}]
            }],
            "from": {"email": message.from},
            "subject": message.subject,
            "content": [{
                "type": "text/html",
                "value": message.body
            }]
        });

        let response = client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        if response.status().is_success() {
            info!(to = %message.to, subject = %message.subject, "Email sent via SendGrid");
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_body, "SendGrid API error");
            Err(EmailError::Provider(format!(
                "SendGrid returned {}: {}",
                status, error_body
            )))
        }
    }
}

fn smtp_transport(config: &EmailConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
    if config.smtp_host.is_empty() {
        return Err(EmailError::NotConfigured(
            "email.smtp_host is required for the smtp provider".to_string(),
        ));
    }

    let mut builder = if config.smtp_use_tls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| EmailError::NotConfigured(e.to_string()))?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
    }
    .port(config.smtp_port);

    if !config.smtp_username.is_empty() {
        builder = builder.credentials(Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.clone(),
        ));
    }

    Ok(builder.build())
}

fn parse_mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address
        .parse()
        .map_err(|_| EmailError::InvalidAddress(address.to_string()))
}

#[async_trait]
impl EmailProvider for ConfiguredEmailProvider {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if !self.enabled {
            debug!(
                to = %message.to,
                subject = %message.subject,
                "Email sending disabled, dropping message"
            );
            return Ok(());
        }

        match &self.transport {
            Transport::Console => {
                info!(
                    from = %message.from,
                    to = %message.to,
                    subject = %message.subject,
                    body_len = message.body.len(),
                    "Email (console provider)"
                );
                Ok(())
            }
            Transport::Smtp(mailer) => Self::send_smtp(mailer, message).await,
            Transport::SendGrid { client, api_key } => {
                Self::send_sendgrid(client, api_key, message).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> EmailConfig {
        EmailConfig {
            enabled: true,
            provider: provider.to_string(),
            ..EmailConfig::default()
        }
    }

    fn message() -> EmailMessage {
        EmailMessage {
            from: "noreply@example.com".to_string(),
            to: "user@example.com".to_string(),
            subject: "Test".to_string(),
            body: "<p>Test</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_console_provider_sends() {
        let provider = ConfiguredEmailProvider::from_config(&config("console")).unwrap();
        assert_eq!(provider.provider_name(), "console");
        tokio_test::assert_ok!(provider.send(message()).await);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_console_provider_does_not_log_body() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let provider = ConfiguredEmailProvider::from_config(&config("console")).unwrap();
        let mut message = message();
        message.body = "<a href=\"https://app.example.com/reset-password/0123456789abcdef\">Reset</a>"
            .to_string();
        provider.send(message).await.unwrap();

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Email (console provider)"));
        assert!(!output.contains("0123456789abcdef"));
    }

    #[tokio::test]
    async fn test_disabled_provider_silently_succeeds() {
        let mut cfg = config("sendgrid");
        cfg.enabled = false;
        cfg.sendgrid_api_key = "key".to_string();
        let provider = ConfiguredEmailProvider::from_config(&cfg).unwrap();

        assert!(!provider.is_enabled());
        tokio_test::assert_ok!(provider.send(message()).await);
    }

    #[test]
    fn test_sendgrid_requires_api_key() {
        assert!(matches!(
            ConfiguredEmailProvider::from_config(&config("sendgrid")),
            Err(EmailError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_smtp_requires_host() {
        assert!(matches!(
            ConfiguredEmailProvider::from_config(&config("smtp")),
            Err(EmailError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_smtp_transport_builds() {
        let mut cfg = config("smtp");
        cfg.smtp_host = "smtp.example.com".to_string();
        cfg.smtp_username = "user".to_string();
        cfg.smtp_password = "secret".to_string();

        let provider = ConfiguredEmailProvider::from_config(&cfg).unwrap();
        assert_eq!(provider.provider_name(), "smtp");
    }

    #[test]
    fn test_unknown_provider() {
        assert!(ConfiguredEmailProvider::from_config(&config("ses")).is_err());
    }

    #[test]
    fn test_parse_mailbox() {
        assert!(parse_mailbox("user@example.com").is_ok());
        assert!(matches!(
            parse_mailbox("not an address"),
            Err(EmailError::InvalidAddress(_))
        ));
    }
}
