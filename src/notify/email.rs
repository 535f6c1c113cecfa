//! SMTP email gateway.

use super::EmailGateway;
use crate::{
    config::settings::{EmailConfig, Secrets},
    errors::{Error, Result},
};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::{info, instrument, warn};

/// Email gateway over an authenticated STARTTLS relay.
pub struct SmtpEmailGateway {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl std::fmt::Debug for SmtpEmailGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpEmailGateway")
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

impl SmtpEmailGateway {
    /// Builds the relay transport. Credentials are attached only when both the
    /// username and password secrets are set.
    pub fn new(config: &EmailConfig, secrets: &Secrets) -> Result<Self> {
        let from: Mailbox = config.from.parse().map_err(|e| Error::Config {
            message: format!("Invalid email sender '{}': {e}", config.from),
        })?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| Error::Gateway {
                message: format!("failed to configure SMTP relay: {e}"),
            })?
            .port(config.smtp_port);

        match (&secrets.smtp_username, &secrets.smtp_password) {
            (Some(username), Some(password)) => {
                builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
            }
            _ => warn!("SMTP credentials not set, connecting to relay unauthenticated"),
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, to: &str, subject: &str, body: &str) -> Option<Message> {
        let recipient: Mailbox = match to.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                warn!(error = %e, "Invalid email recipient");
                return None;
            }
        };

        Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| warn!(error = %e, "Failed to build email message"))
            .ok()
    }
}

#[async_trait]
impl EmailGateway for SmtpEmailGateway {
    #[instrument(skip(self, to, body))]
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool {
        let Some(message) = self.build_message(to, subject, body) else {
            return false;
        };

        match self.transport.send(message).await {
            Ok(_) => {
                info!("Email sent");
                true
            }
            Err(e) => {
                warn!(error = %e, "SMTP relay rejected email");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::sync::{Arc, Mutex};

    fn email_config(from: &str) -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            from: from.to_string(),
        }
    }

    #[test]
    fn test_new_rejects_invalid_sender() {
        let result = SmtpEmailGateway::new(&email_config("not an address"), &Secrets::default());
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_build_message() {
        let gateway = SmtpEmailGateway::new(
            &email_config("Ventas <ventas@example.com>"),
            &Secrets::default(),
        )
        .unwrap();

        let message = gateway
            .build_message("ana@example.com", "Seguimiento", "Hola Ana")
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: ana@example.com"));
        assert!(raw.contains("Subject: Seguimiento"));

        assert!(gateway.build_message("ana", "Seguimiento", "Hola").is_none());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

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
    async fn test_send_span_omits_recipient() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let gateway = SmtpEmailGateway::new(
            &email_config("ventas@example.com"),
            &Secrets::default(),
        )
        .unwrap();
        assert!(!gateway.send("ana.example.com", "Asunto", "Cuerpo").await);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Invalid email recipient"));
        assert!(!output.contains("ana.example.com"));
    }

    #[tokio::test]
    async fn test_send_to_invalid_recipient_is_false() {
        let gateway = SmtpEmailGateway::new(
            &email_config("ventas@example.com"),
            &Secrets::default(),
        )
        .unwrap();
        assert!(!gateway.send("no-at-sign", "Asunto", "Cuerpo").await);
    }
}
