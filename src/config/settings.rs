//! Application settings loading from config.toml and the environment
//!
//! Non-secret settings (bind address, gateway endpoints, SMTP relay) live in a
//! TOML file. Secrets are read from environment variables only, so the file can
//! be committed:
//! - `CRON_SECRET` - bearer token expected by the sweep endpoint
//! - `WHATSAPP_API_KEY` - API key for the WhatsApp gateway
//! - `SMTP_USERNAME` / `SMTP_PASSWORD` - SMTP relay credentials

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "QUOTE_FOLLOWUPS_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// WhatsApp gateway settings
    pub whatsapp: WhatsAppConfig,
    /// SMTP relay settings; the email channel is not dispatched without it
    pub email: Option<EmailConfig>,
}

/// HTTP listener settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// WhatsApp gateway settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// Base URL of the messaging gateway REST API
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gate.whapi.cloud".to_string(),
            timeout_secs: 15,
        }
    }
}

/// SMTP relay settings
#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    /// Relay hostname
    pub smtp_host: String,
    /// Relay port (submission port by default)
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Sender mailbox, e.g. `"Ventas <ventas@example.com>"`
    pub from: String,
}

const fn default_smtp_port() -> u16 {
    587
}

/// Secrets read from the environment.
#[derive(Clone, Default)]
pub struct Secrets {
    /// Bearer token for the sweep endpoint
    pub cron_secret: Option<String>,
    /// WhatsApp gateway API key
    pub whatsapp_api_key: Option<String>,
    /// SMTP username
    pub smtp_username: Option<String>,
    /// SMTP password
    pub smtp_password: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[redacted]");
        f.debug_struct("Secrets")
            .field("cron_secret", &redact(&self.cron_secret))
            .field("whatsapp_api_key", &redact(&self.whatsapp_api_key))
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &redact(&self.smtp_password))
            .finish()
    }
}

impl Secrets {
    /// Reads all secrets from the process environment. Empty values count as unset.
    #[must_use]
    pub fn from_env() -> Self {
        let read = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            cron_secret: read("CRON_SECRET"),
            whatsapp_api_key: read("WHATSAPP_API_KEY"),
            smtp_username: read("SMTP_USERNAME"),
            smtp_password: read("SMTP_PASSWORD"),
        }
    }
}

/// Parses settings from a TOML string
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;
    parse_config(&contents)
}

/// Loads settings from `$QUOTE_FOLLOWUPS_CONFIG` or ./config.toml.
///
/// A missing file is not an error: every setting has a default.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if Path::new(&path).exists() {
        debug!("Loading configuration from {path}");
        load_config(&path)
    } else {
        info!("No config file at {path}, using defaults");
        Ok(AppConfig::default())
    }
}
