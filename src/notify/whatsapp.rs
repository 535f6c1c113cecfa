//! HTTP client for the WhatsApp messaging gateway.

use super::WhatsAppGateway;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

const SEND_TEXT_PATH: &str = "/messages/text";

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    to: &'a str,
    body: &'a str,
}

/// WhatsApp gateway reached over its REST API.
#[derive(Clone)]
pub struct HttpWhatsAppGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for HttpWhatsAppGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpWhatsAppGateway")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .finish_non_exhaustive()
    }
}

impl HttpWhatsAppGateway {
    /// Creates a gateway client for `base_url`.
    pub fn new(base_url: String, api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Gateway {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}{SEND_TEXT_PATH}", self.base_url)
    }
}

#[async_trait]
impl WhatsAppGateway for HttpWhatsAppGateway {
    async fn send_text(&self, phone: &str, text: &str) -> bool {
        let mut request = self
            .client
            .post(self.endpoint())
            .json(&TextMessage { to: phone, body: text });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!(status = %response.status(), "WhatsApp message accepted");
                true
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "WhatsApp gateway rejected message");
                false
            }
            Err(e) => {
                warn!(error = %e, "WhatsApp gateway request failed");
                false
            }
        }
    }
}
