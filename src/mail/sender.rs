//! SMTP sender
//!
//! Wraps an async lettre transport. Every send verifies connectivity first so
//! that a broken relay surfaces as a clear error rather than a half-sent mail.

use std::time::Duration;

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, error, info};

use crate::config::SmtpConfig;
use crate::error::{GatewayError, Result, SmtpError};
use crate::mail::template::{render_html, render_text};

/// Relay used when `SMTP_HOST` is not configured
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Port on which the relay expects implicit TLS
const IMPLICIT_TLS_PORT: u16 = 465;

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of a successful send
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// Message-ID header of the sent message
    pub message_id: String,

    /// Final SMTP response text
    pub response: String,
}

/// SMTP mail sender
pub struct MailSender {
    config: SmtpConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl MailSender {
    /// Create a new sender; no connection is made until first use
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let host = config.host.as_deref().unwrap_or(DEFAULT_SMTP_HOST);

        let builder = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| {
            GatewayError::Smtp(SmtpError::InvalidHost {
                host: host.to_string(),
                message: e.to_string(),
            })
        })?;

        let mut builder = builder.port(config.port).timeout(Some(SMTP_TIMEOUT));

        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        info!(host, port = config.port, "Email transporter initialized");

        Ok(Self {
            config: config.clone(),
            transport: builder.build(),
        })
    }

    /// Verify that the relay accepts a connection
    pub async fn test_connection(&self) -> Result<()> {
        info!("Testing SMTP connection");

        match self.transport.test_connection().await {
            Ok(true) => {
                info!("SMTP connection verified successfully");
                Ok(())
            }
            Ok(false) => {
                error!("SMTP server rejected the connection test");
                Err(GatewayError::Smtp(SmtpError::ConnectionRejected))
            }
            Err(e) => {
                error!(error = %e, "SMTP connection failed");
                Err(GatewayError::Smtp(SmtpError::Transport(e)))
            }
        }
    }

    /// Send `body` to `to` using the standard template
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<SendReceipt> {
        info!(to, subject, "Starting email send process");

        if !self.config.is_complete() {
            error!("SMTP configuration incomplete");
            return Err(GatewayError::Smtp(SmtpError::IncompleteConfig));
        }

        let (message, message_id) = self.build_message(to, subject, body)?;

        self.test_connection().await?;

        debug!("Sending email");
        let response = self.transport.send(message).await.map_err(|e| {
            error!(error = %e, "Error sending email");
            GatewayError::Smtp(SmtpError::SendFailed {
                message: e.to_string(),
            })
        })?;

        let response = response.message().collect::<Vec<_>>().join(" ");
        info!(message_id = %message_id, response = %response, "Email sent successfully");

        Ok(SendReceipt {
            message_id,
            response,
        })
    }

    /// Build the multipart message and its Message-ID
    fn build_message(&self, to: &str, subject: &str, body: &str) -> Result<(Message, String)> {
        let user = self
            .config
            .user
            .as_deref()
            .ok_or(GatewayError::Smtp(SmtpError::IncompleteConfig))?;

        let from_address: Address = user.parse().map_err(|e: lettre::address::AddressError| {
            GatewayError::Smtp(SmtpError::MessageBuild {
                message: format!("invalid sender address {}: {}", user, e),
            })
        })?;
        let to_mailbox: Mailbox = to.parse().map_err(|e: lettre::address::AddressError| {
            GatewayError::Smtp(SmtpError::MessageBuild {
                message: format!("invalid recipient {}: {}", to, e),
            })
        })?;

        let message_id = format!("<{}@{}>", uuid::Uuid::new_v4(), from_address.domain());
        let from = Mailbox::new(Some(self.config.from_name.clone()), from_address);

        let message = Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject)
            .message_id(Some(message_id.clone()))
            .multipart(MultiPart::alternative_plain_html(
                render_text(body, &self.config.from_name),
                render_html(body, &self.config.from_name),
            ))
            .map_err(|e| {
                GatewayError::Smtp(SmtpError::MessageBuild {
                    message: e.to_string(),
                })
            })?;

        Ok((message, message_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_config() -> SmtpConfig {
        SmtpConfig {
            host: Some("smtp.example.com".to_string()),
            port: 465,
            user: Some("sender@example.com".to_string()),
            password: Some("secret".to_string()),
            from_name: "Ana".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_rejects_incomplete_config() {
        let config = SmtpConfig {
            password: None,
            ..complete_config()
        };
        let sender = MailSender::new(&config).unwrap();

        let err = sender
            .send("to@example.com", "Hi", "Body")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Smtp(SmtpError::IncompleteConfig)));
    }

    #[tokio::test]
    async fn test_build_message_headers() {
        let sender = MailSender::new(&complete_config()).unwrap();
        let (message, message_id) = sender
            .build_message("to@example.com", "Greetings", "Hello\nthere")
            .unwrap();

        assert!(message_id.starts_with('<'));
        assert!(message_id.ends_with("@example.com>"));

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Greetings"));
        assert!(raw.contains("To: to@example.com"));
        assert!(raw.contains("sender@example.com"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains(&message_id));
    }

    #[tokio::test]
    async fn test_starttls_port_builds() {
        let config = SmtpConfig {
            port: 587,
            ..complete_config()
        };
        assert!(MailSender::new(&config).is_ok());
    }
}
