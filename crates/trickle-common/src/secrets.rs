//! Credential storage boundary
//!
//! The application keeps its gateway credentials in a platform secret
//! store keyed by service and account. This module defines that seam;
//! only an in-memory implementation ships here, used by tests and the
//! demo binary.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Result type for secret store operations
pub type SecretResult<T> = Result<T, SecretStoreError>;

/// Credential material for one gateway account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub token: String,
    pub user_id: String,
}

impl Credentials {
    #[must_use]
    pub fn new(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user_id: user_id.into(),
        }
    }
}

/// Secret store errors
#[derive(Debug, thiserror::Error)]
pub enum SecretStoreError {
    #[error("No credentials stored for {service}/{account}")]
    NotFound { service: String, account: String },

    #[error("Credential backend unavailable: {0}")]
    Backend(String),
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the credentials stored for an account
    async fn get(&self, service: &str, account: &str) -> SecretResult<Credentials>;

    /// Store or replace the credentials for an account
    async fn put(&self, service: &str, account: &str, credentials: Credentials)
        -> SecretResult<()>;

    /// Remove the credentials for an account
    async fn delete(&self, service: &str, account: &str) -> SecretResult<()>;
}

/// In-memory secret store
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: RwLock<HashMap<(String, String), Credentials>>,
}

impl MemorySecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, service: &str, account: &str) -> SecretResult<Credentials> {
        let entries = self.entries.read();
        entries
            .get(&(service.to_string(), account.to_string()))
            .cloned()
            .ok_or_else(|| {
                tracing::debug!(service = %service, account = %account, "No stored credentials");
                SecretStoreError::NotFound {
                    service: service.to_string(),
                    account: account.to_string(),
                }
            })
    }

    async fn put(
        &self,
        service: &str,
        account: &str,
        credentials: Credentials,
    ) -> SecretResult<()> {
        let mut entries = self.entries.write();
        entries.insert((service.to_string(), account.to_string()), credentials);
        Ok(())
    }

    async fn delete(&self, service: &str, account: &str) -> SecretResult<()> {
        let mut entries = self.entries.write();
        entries.remove(&(service.to_string(), account.to_string()));
        Ok(())
    }
}
