use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, CredentialConfig};
use crate::types::error::{CredentialSourceError, ProviderFailures, StorageError};
use crate::types::{CredentialSource, Credentials};

pub mod instance_metadata;
pub mod static_keys;
pub mod web_identity;

/// Type alias for a boxed credential provider.
pub type Provider = Box<dyn CredentialProvider + Send + Sync>;

/// One link of the credential resolution chain.
///
/// A provider either produces a full credential set or explains why it
/// could not. Returning [`CredentialSourceError::skipped`] means the provider
/// was not configured and made no external call.
#[async_trait]
pub trait CredentialProvider {
    fn source(&self) -> CredentialSource;

    async fn provide(&self) -> Result<Credentials, CredentialSourceError>;
}

/// Resolves credentials by trying each provider in priority order.
///
/// Providers run strictly one after another; the first success wins and the
/// remaining providers are never called. Each provider gets a single attempt
/// per resolution.
pub struct CredentialResolver {
    providers: Vec<Provider>,
}

impl CredentialResolver {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    /// The production chain: web identity, then static keys, then the
    /// instance metadata service.
    pub fn from_config(credential_config: &CredentialConfig, client_config: &ClientConfig) -> Self {
        Self::new(default_providers(credential_config, client_config))
    }

    pub fn provider_sources(&self) -> Vec<CredentialSource> {
        self.providers.iter().map(|p| p.source()).collect()
    }

    pub async fn resolve(&self) -> Result<Credentials, StorageError> {
        let mut failures = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            match provider.provide().await {
                Ok(credentials) => {
                    info!(
                        provider = credentials.source().provider_name(),
                        temporary = credentials.expiration().is_some(),
                        "Credentials resolved."
                    );
                    return Ok(credentials);
                }
                Err(e) if e.skipped => {
                    debug!(
                        provider = e.provider.provider_name(),
                        reason = %e.reason,
                        "Credential provider skipped."
                    );
                    failures.push(e);
                }
                Err(e) => {
                    warn!(
                        provider = e.provider.provider_name(),
                        reason = %e.reason,
                        "Credential provider failed."
                    );
                    failures.push(e);
                }
            }
        }

        Err(StorageError::NoCredentials {
            failures: ProviderFailures(failures),
        })
    }
}

pub fn default_providers(
    credential_config: &CredentialConfig,
    client_config: &ClientConfig,
) -> Vec<Provider> {
    vec![
        Box::new(web_identity::WebIdentityProvider::from_config(
            credential_config,
            client_config,
        )),
        Box::new(static_keys::StaticKeysProvider::from_config(credential_config)),
        Box::new(instance_metadata::InstanceMetadataProvider::from_config(
            credential_config,
        )),
    ]
}
