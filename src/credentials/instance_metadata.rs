use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::imds::client::error::ImdsError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::config::CredentialConfig;
use crate::credentials::CredentialProvider;
use crate::types::error::CredentialSourceError;
use crate::types::{AccessKeys, CredentialSource, Credentials};

const SECURITY_CREDENTIALS_PATH: &str = "/latest/meta-data/iam/security-credentials/";
const METADATA_TIMEOUT: Duration = Duration::from_secs(1);
const HTTP_NOT_FOUND: u16 = 404;

/// Read access to the link-local instance metadata service.
///
/// `Ok(None)` means the service answered but has nothing at `path`; `Err`
/// means it could not be reached or answered with another error.
#[async_trait]
pub trait MetadataService {
    async fn get(&self, path: &str) -> Result<Option<String>>;
}

/// [`MetadataService`] backed by the AWS SDK IMDSv2 client (session token
/// handshake included). A single attempt with short timeouts, so hosts
/// without a metadata service fail fast.
pub struct ImdsMetadataService {
    client: aws_config::imds::Client,
}

impl ImdsMetadataService {
    pub fn new() -> Self {
        let client = aws_config::imds::Client::builder()
            .max_attempts(1)
            .connect_timeout(METADATA_TIMEOUT)
            .read_timeout(METADATA_TIMEOUT)
            .build();

        Self { client }
    }
}

impl Default for ImdsMetadataService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataService for ImdsMetadataService {
    async fn get(&self, path: &str) -> Result<Option<String>> {
        match self.client.get(path).await {
            Ok(value) => Ok(Some(value.as_ref().to_string())),
            Err(ImdsError::ErrorResponse(response))
                if response.response().status().as_u16() == HTTP_NOT_FOUND =>
            {
                Ok(None)
            }
            Err(e) => {
                Err(e).with_context(|| format!("aws_config::imds::Client::get({path}) failed."))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SecurityCredentialsDocument {
    code: Option<String>,
    access_key_id: String,
    secret_access_key: String,
    token: Option<String>,
    expiration: Option<DateTime<Utc>>,
}

/// Temporary credentials of the role attached to the instance.
pub struct InstanceMetadataProvider {
    enabled: bool,
    service: Arc<dyn MetadataService + Send + Sync>,
}

impl InstanceMetadataProvider {
    pub fn new(enabled: bool, service: Arc<dyn MetadataService + Send + Sync>) -> Self {
        Self { enabled, service }
    }

    pub fn from_config(credential_config: &CredentialConfig) -> Self {
        Self::new(
            credential_config.instance_metadata_enabled,
            Arc::new(ImdsMetadataService::new()),
        )
    }

    fn failed(reason: impl Into<String>) -> CredentialSourceError {
        CredentialSourceError::failed(CredentialSource::InstanceMetadata, reason)
    }
}

#[async_trait]
impl CredentialProvider for InstanceMetadataProvider {
    fn source(&self) -> CredentialSource {
        CredentialSource::InstanceMetadata
    }

    async fn provide(&self) -> Result<Credentials, CredentialSourceError> {
        if !self.enabled {
            return Err(CredentialSourceError::skipped(
                CredentialSource::InstanceMetadata,
                "instance metadata lookup disabled",
            ));
        }

        // An unreachable service usually means we are not on a cloud instance.
        let roles = self
            .service
            .get(SECURITY_CREDENTIALS_PATH)
            .await
            .map_err(|e| {
                CredentialSourceError::skipped(
                    CredentialSource::InstanceMetadata,
                    format!("metadata service unreachable: {e:#}"),
                )
            })?
            .unwrap_or_default();

        let role = roles
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| Self::failed("no IAM role attached to the instance"))?;

        debug!(role = role, "Fetching instance role credentials.");

        let document = self
            .service
            .get(&format!("{SECURITY_CREDENTIALS_PATH}{role}"))
            .await
            .map_err(|e| Self::failed(format!("cannot fetch credentials of role {role}: {e:#}")))?
            .ok_or_else(|| Self::failed(format!("no credentials published for role {role}")))?;

        let document: SecurityCredentialsDocument = serde_json::from_str(&document)
            .map_err(|e| Self::failed(format!("malformed credentials of role {role}: {e}")))?;

        match document.code.as_deref() {
            Some("Success") | None => {}
            Some(code) => {
                return Err(Self::failed(format!(
                    "metadata service returned {code} for role {role}"
                )));
            }
        }

        Ok(Credentials::new(
            AccessKeys {
                access_key: document.access_key_id.clone(),
                secret_access_key: document.secret_access_key.clone(),
                session_token: document.token.clone(),
            },
            document.expiration,
            CredentialSource::InstanceMetadata,
        ))
    }
}
