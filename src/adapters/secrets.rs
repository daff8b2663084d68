//! Secret store adapters for credential-reference resolution.
//!
//! The endpoint carries an opaque credential reference; resolution to a
//! username/password pair happens at execution time, fresh on every
//! invocation. Nothing here caches.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::SecretStore;
use crate::domain::Credentials;

/// HTTP secret store client.
///
/// Resolves `GET {base_url}/secrets/{reference}` to a JSON
/// `{"username": ..., "password": ...}` payload.
pub struct HttpSecretStore {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SecretPayload {
    username: String,
    password: String,
}

impl HttpSecretStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn secret_url(&self, reference: &str) -> String {
        format!("{}/secrets/{}", self.base_url, reference)
    }
}

#[async_trait]
impl SecretStore for HttpSecretStore {
    async fn resolve(&self, reference: &str) -> Result<Credentials> {
        let url = self.secret_url(reference);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach secret store for '{}'", reference))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Secret store returned {} for '{}'",
                response.status(),
                reference
            );
        }

        let payload: SecretPayload = response
            .json()
            .await
            .with_context(|| format!("Failed to parse secret payload for '{}'", reference))?;

        Ok(Credentials {
            username: payload.username,
            password: payload.password,
        })
    }
}

/// Environment-variable secret store, for operator-driven CLI runs outside
/// the provisioning framework.
///
/// Ignores the reference and reads `MOORING_DB_USER` / `MOORING_DB_PASSWORD`
/// at resolve time.
pub struct EnvSecretStore;

/// Environment variable holding the database username
pub const ENV_DB_USER: &str = "MOORING_DB_USER";

/// Environment variable holding the database password
pub const ENV_DB_PASSWORD: &str = "MOORING_DB_PASSWORD";

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn resolve(&self, _reference: &str) -> Result<Credentials> {
        let username = std::env::var(ENV_DB_USER)
            .with_context(|| format!("{} is not set", ENV_DB_USER))?;
        let password = std::env::var(ENV_DB_PASSWORD)
            .with_context(|| format!("{} is not set", ENV_DB_PASSWORD))?;

        Ok(Credentials { username, password })
    }
}
