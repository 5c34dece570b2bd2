//! Application configuration structs
//!
//! Loads configuration from environment variables.

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: GatewayConfig,
    pub reconnect: ReconnectConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Push gateway connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Endpoint URL, `ws://` or `wss://`
    pub url: String,
    /// Bearer token sent in the connection URL and message envelopes
    pub auth_token: String,
    /// User id carried in hello frames
    pub user_id: String,
    /// Workspace to join after connecting, if any
    #[serde(default)]
    pub workspace_id: Option<String>,
    /// Member id used for room presence frames
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl GatewayConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Reconnection policy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    /// `None` means retry without bound
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default = "default_reconnect_delay_secs")]
    pub delay_secs: u64,
}

impl ReconnectConfig {
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

// Default value functions
fn default_app_name() -> String {
    "trickle".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_reconnect_delay_secs() -> u64 {
    1
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            gateway: GatewayConfig {
                url: env::var("TRICKLE_GATEWAY_URL")
                    .map_err(|_| ConfigError::MissingVar("TRICKLE_GATEWAY_URL"))?,
                auth_token: env::var("TRICKLE_AUTH_TOKEN")
                    .map_err(|_| ConfigError::MissingVar("TRICKLE_AUTH_TOKEN"))?,
                user_id: env::var("TRICKLE_USER_ID")
                    .map_err(|_| ConfigError::MissingVar("TRICKLE_USER_ID"))?,
                workspace_id: env::var("TRICKLE_WORKSPACE_ID").ok(),
                member_id: env::var("TRICKLE_MEMBER_ID").ok(),
                connect_timeout_secs: env::var("TRICKLE_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_connect_timeout_secs),
            },
            reconnect: ReconnectConfig {
                max_attempts: match env::var("TRICKLE_RECONNECT_MAX_ATTEMPTS") {
                    Ok(s) => Some(s.parse().map_err(|_| {
                        ConfigError::InvalidValue("TRICKLE_RECONNECT_MAX_ATTEMPTS", s)
                    })?),
                    Err(_) => None,
                },
                delay_secs: env::var("TRICKLE_RECONNECT_DELAY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_reconnect_delay_secs),
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
