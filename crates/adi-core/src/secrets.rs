//! Resolution of database credentials from named secrets.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::CredentialRefs;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret '{0}' not found")]
    NotFound(String),

    #[error("secret '{0}' has no value")]
    Empty(String),

    #[error("failed to read secret '{name}': {message}")]
    Service { name: String, message: String },
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, name: &str) -> Result<String, SecretError>;
}

/// Plaintext database credentials resolved for one run.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub db_name: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("db_name", &self.db_name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Looks up the database name, username and password, in that order.
pub async fn resolve_credentials(
    store: &dyn SecretStore,
    refs: &CredentialRefs,
) -> Result<Credentials, SecretError> {
    let db_name = store.get_secret(&refs.db_name).await?;
    let username = store.get_secret(&refs.username).await?;
    let password = store.get_secret(&refs.password).await?;

    Ok(Credentials {
        db_name,
        username,
        password,
    })
}

/// Fixed name → value map, for tests and runs without a parameter store.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    values: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get_secret(&self, name: &str) -> Result<String, SecretError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(name.to_string()))
    }
}

#[cfg(feature = "runtime")]
pub use ssm::SsmSecretStore;

#[cfg(feature = "runtime")]
mod ssm {
    use async_trait::async_trait;
    use aws_config::BehaviorVersion;
    use aws_sdk_ssm::error::{DisplayErrorContext, SdkError};
    use aws_sdk_ssm::Client;

    use super::{SecretError, SecretStore};

    /// Reads SecureString parameters from AWS Systems Manager.
    #[derive(Clone)]
    pub struct SsmSecretStore {
        client: Client,
    }

    impl SsmSecretStore {
        /// Builds a client from the default AWS provider chain.
        pub async fn from_env() -> Self {
            let shared_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
            Self {
                client: Client::new(&shared_config),
            }
        }

        pub fn from_client(client: Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl SecretStore for SsmSecretStore {
        async fn get_secret(&self, name: &str) -> Result<String, SecretError> {
            let output = self
                .client
                .get_parameter()
                .name(name)
                .with_decryption(true)
                .send()
                .await
                .map_err(|err| match err {
                    SdkError::ServiceError(service_err)
                        if service_err.err().is_parameter_not_found() =>
                    {
                        SecretError::NotFound(name.to_string())
                    }
                    other => SecretError::Service {
                        name: name.to_string(),
                        message: DisplayErrorContext(other).to_string(),
                    },
                })?;

            output
                .parameter()
                .and_then(|parameter| parameter.value())
                .map(str::to_string)
                .ok_or_else(|| SecretError::Empty(name.to_string()))
        }
    }
}
