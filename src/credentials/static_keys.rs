use async_trait::async_trait;

use crate::config::CredentialConfig;
use crate::credentials::CredentialProvider;
use crate::types::error::CredentialSourceError;
use crate::types::{AccessKeys, CredentialSource, Credentials};

/// Access key and secret supplied through configuration.
///
/// Long-lived: the produced credentials carry no expiration.
pub struct StaticKeysProvider {
    access_key: Option<String>,
    secret_access_key: Option<String>,
    session_token: Option<String>,
}

impl StaticKeysProvider {
    pub fn from_config(config: &CredentialConfig) -> Self {
        Self {
            access_key: config.access_key.clone(),
            secret_access_key: config.secret_access_key.clone(),
            session_token: config.session_token.clone(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticKeysProvider {
    fn source(&self) -> CredentialSource {
        CredentialSource::Static
    }

    async fn provide(&self) -> Result<Credentials, CredentialSourceError> {
        let (Some(access_key), Some(secret_access_key)) =
            (&self.access_key, &self.secret_access_key)
        else {
            return Err(CredentialSourceError::skipped(
                CredentialSource::Static,
                "access key or secret access key not configured",
            ));
        };

        Ok(Credentials::new(
            AccessKeys {
                access_key: access_key.clone(),
                secret_access_key: secret_access_key.clone(),
                session_token: self.session_token.clone(),
            },
            None,
            CredentialSource::Static,
        ))
    }
}
