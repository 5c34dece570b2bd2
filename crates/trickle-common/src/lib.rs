//! # trickle-common
//!
//! Shared utilities including configuration, telemetry, token claim
//! introspection, and the credential storage boundary.

pub mod auth;
pub mod config;
pub mod secrets;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{decode_claims, TokenClaims, TokenError};
pub use config::{
    AppConfig, AppSettings, ConfigError, Environment, GatewayConfig, ReconnectConfig,
};
pub use secrets::{Credentials, MemorySecretStore, SecretStore, SecretStoreError};
pub use telemetry::{try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError};
