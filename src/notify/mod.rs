//! Outbound message gateways.
//!
//! The sweep only sees the [`WhatsAppGateway`] and [`EmailGateway`] traits;
//! [`Dispatcher`] bundles the configured implementations. Both traits report
//! delivery as a plain `bool` and log the failure cause themselves, so a
//! failed send leaves the follow-up pending without aborting the sweep.

pub mod email;
pub mod whatsapp;

use crate::{
    config::settings::{AppConfig, Secrets},
    errors::Result,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub use email::SmtpEmailGateway;
pub use whatsapp::HttpWhatsAppGateway;

/// Sends WhatsApp text messages.
#[async_trait]
pub trait WhatsAppGateway: Send + Sync {
    /// Sends `text` to a digits-only phone number. Returns whether the
    /// gateway accepted the message.
    async fn send_text(&self, phone: &str, text: &str) -> bool;
}

/// Sends plain-text emails.
#[async_trait]
pub trait EmailGateway: Send + Sync {
    /// Sends a message to `to`. Returns whether the relay accepted it.
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool;
}

/// The gateways available to a sweep.
#[derive(Clone)]
pub struct Dispatcher {
    /// WhatsApp channel
    pub whatsapp: Arc<dyn WhatsAppGateway>,
    /// Email channel; `None` when no SMTP relay is configured
    pub email: Option<Arc<dyn EmailGateway>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("email_configured", &self.email.is_some())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Bundles already-built gateways.
    #[must_use]
    pub fn new(
        whatsapp: Arc<dyn WhatsAppGateway>,
        email: Option<Arc<dyn EmailGateway>>,
    ) -> Self {
        Self { whatsapp, email }
    }

    /// Builds the HTTP and SMTP gateways from settings and secrets.
    pub fn from_config(config: &AppConfig, secrets: &Secrets) -> Result<Self> {
        if secrets.whatsapp_api_key.is_none() {
            warn!("WHATSAPP_API_KEY not set, gateway requests will be unauthenticated");
        }
        let whatsapp = HttpWhatsAppGateway::new(
            config.whatsapp.base_url.clone(),
            secrets.whatsapp_api_key.clone(),
            config.whatsapp.timeout_secs,
        )?;

        let email: Option<Arc<dyn EmailGateway>> = match &config.email {
            Some(email_config) => {
                let gateway = SmtpEmailGateway::new(email_config, secrets)?;
                info!(host = %email_config.smtp_host, "Email channel enabled");
                Some(Arc::new(gateway))
            }
            None => {
                warn!("No [email] section configured, email follow-ups will not be dispatched");
                None
            }
        };

        Ok(Self::new(Arc::new(whatsapp), email))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::config::settings::parse_config;

    #[test]
    fn test_from_config_without_email_section() {
        let config = AppConfig::default();
        let dispatcher = Dispatcher::from_config(&config, &Secrets::default()).unwrap();
        assert!(dispatcher.email.is_none());
    }

    #[test]
    fn test_from_config_with_email_section() {
        let config = parse_config(
            r#"
            [email]
            smtp_host = "smtp.example.com"
            from = "Ventas <ventas@example.com>"
            "#,
        )
        .unwrap();
        let secrets = Secrets {
            smtp_username: Some("ventas".to_string()),
            smtp_password: Some("hunter2".to_string()),
            ..Secrets::default()
        };

        let dispatcher = Dispatcher::from_config(&config, &secrets).unwrap();
        assert!(dispatcher.email.is_some());
        assert!(format!("{dispatcher:?}").contains("email_configured: true"));
    }
}
