use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_smithy_types_convert::date_time::DateTimeExt;
use tracing::debug;

use crate::config::{ClientConfig, CredentialConfig};
use crate::credentials::CredentialProvider;
use crate::types::error::CredentialSourceError;
use crate::types::{AccessKeys, CredentialSource, Credentials};

/// Exchanges a web identity token for temporary credentials.
#[async_trait]
pub trait IdentityBroker {
    async fn assume_role_with_web_identity(
        &self,
        role_arn: &str,
        role_session_name: &str,
        web_identity_token: &str,
    ) -> Result<Credentials>;
}

/// [`IdentityBroker`] backed by AWS STS `AssumeRoleWithWebIdentity`.
///
/// The call is unsigned, so the STS client is built without credentials.
pub struct StsIdentityBroker {
    region: Option<String>,
    endpoint_url: Option<String>,
}

impl StsIdentityBroker {
    pub fn new(client_config: &ClientConfig) -> Self {
        Self {
            region: client_config.region.clone(),
            endpoint_url: client_config.endpoint_url.clone(),
        }
    }

    async fn create_client(&self) -> aws_sdk_sts::Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).no_credentials();
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        aws_sdk_sts::Client::new(&loader.load().await)
    }
}

#[async_trait]
impl IdentityBroker for StsIdentityBroker {
    async fn assume_role_with_web_identity(
        &self,
        role_arn: &str,
        role_session_name: &str,
        web_identity_token: &str,
    ) -> Result<Credentials> {
        let output = self
            .create_client()
            .await
            .assume_role_with_web_identity()
            .role_arn(role_arn)
            .role_session_name(role_session_name)
            .web_identity_token(web_identity_token)
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!(e)
                    .context("aws_sdk_sts::client::assume_role_with_web_identity() failed.")
            })?;

        let credentials = output
            .credentials()
            .context("AssumeRoleWithWebIdentity returned no credentials.")?;

        Ok(Credentials::new(
            AccessKeys {
                access_key: credentials.access_key_id().to_string(),
                secret_access_key: credentials.secret_access_key().to_string(),
                session_token: Some(credentials.session_token().to_string()),
            },
            credentials.expiration().to_chrono_utc().ok(),
            CredentialSource::WebIdentity,
        ))
    }
}

/// Workload identity federation: a role ARN plus a token file mounted by the
/// platform (e.g. a Kubernetes service account token).
pub struct WebIdentityProvider {
    role_arn: Option<String>,
    web_identity_token_file: Option<PathBuf>,
    role_session_name: String,
    broker: Arc<dyn IdentityBroker + Send + Sync>,
}

impl WebIdentityProvider {
    pub fn new(
        role_arn: Option<String>,
        web_identity_token_file: Option<PathBuf>,
        role_session_name: String,
        broker: Arc<dyn IdentityBroker + Send + Sync>,
    ) -> Self {
        Self {
            role_arn,
            web_identity_token_file,
            role_session_name,
            broker,
        }
    }

    pub fn from_config(credential_config: &CredentialConfig, client_config: &ClientConfig) -> Self {
        Self::new(
            credential_config.role_arn.clone(),
            credential_config.web_identity_token_file.clone(),
            credential_config.role_session_name.clone(),
            Arc::new(StsIdentityBroker::new(client_config)),
        )
    }
}

#[async_trait]
impl CredentialProvider for WebIdentityProvider {
    fn source(&self) -> CredentialSource {
        CredentialSource::WebIdentity
    }

    async fn provide(&self) -> Result<Credentials, CredentialSourceError> {
        let (Some(role_arn), Some(token_file)) = (&self.role_arn, &self.web_identity_token_file)
        else {
            return Err(CredentialSourceError::skipped(
                CredentialSource::WebIdentity,
                "role ARN or web identity token file not configured",
            ));
        };

        let token = tokio::fs::read_to_string(token_file).await.map_err(|e| {
            CredentialSourceError::failed(
                CredentialSource::WebIdentity,
                format!(
                    "cannot read web identity token file {}: {e}",
                    token_file.display()
                ),
            )
        })?;
        let token = token.trim();
        if token.is_empty() {
            return Err(CredentialSourceError::failed(
                CredentialSource::WebIdentity,
                format!("web identity token file {} is empty", token_file.display()),
            ));
        }

        debug!(role_arn = role_arn, "Exchanging web identity token.");

        self.broker
            .assume_role_with_web_identity(role_arn, &self.role_session_name, token)
            .await
            .map_err(|e| {
                CredentialSourceError::failed(
                    CredentialSource::WebIdentity,
                    format!("identity exchange for {role_arn} failed: {e:#}"),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_dummy_tracing_subscriber;
    use chrono::{Duration, Utc};
    use std::io::Write;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct MockBroker {
        fail: bool,
        calls: AtomicU32,
        seen: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl IdentityBroker for MockBroker {
        async fn assume_role_with_web_identity(
            &self,
            role_arn: &str,
            role_session_name: &str,
            web_identity_token: &str,
        ) -> Result<Credentials> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((
                role_arn.to_string(),
                role_session_name.to_string(),
                web_identity_token.to_string(),
            ));
            if self.fail {
                return Err(anyhow::anyhow!("InvalidIdentityToken"));
            }

            Ok(Credentials::new(
                AccessKeys {
                    access_key: "ASIATEMP".to_string(),
                    secret_access_key: "temp-secret".to_string(),
                    session_token: Some("temp-token".to_string()),
                },
                Some(Utc::now() + Duration::hours(1)),
                CredentialSource::WebIdentity,
            ))
        }
    }

    fn write_token_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn make_provider(
        role_arn: Option<&str>,
        token_file: Option<PathBuf>,
        broker: Arc<MockBroker>,
    ) -> WebIdentityProvider {
        WebIdentityProvider::new(
            role_arn.map(str::to_string),
            token_file,
            "s3browse".to_string(),
            broker,
        )
    }

    #[tokio::test]
    async fn exchanges_trimmed_token() {
        init_dummy_tracing_subscriber();

        let token_file = write_token_file("eyJhbGciOi.token\n");
        let broker = Arc::new(MockBroker::default());
        let provider = make_provider(
            Some("arn:aws:iam::123456789012:role/browse"),
            Some(token_file.path().to_path_buf()),
            broker.clone(),
        );

        let credentials = provider.provide().await.unwrap();

        assert_eq!(credentials.source(), CredentialSource::WebIdentity);
        assert_eq!(credentials.access_keys().access_key, "ASIATEMP");
        assert!(credentials.expiration().is_some());
        assert_eq!(broker.calls.load(Ordering::SeqCst), 1);
        let seen = broker.seen.lock().unwrap();
        assert_eq!(
            seen[0],
            (
                "arn:aws:iam::123456789012:role/browse".to_string(),
                "s3browse".to_string(),
                "eyJhbGciOi.token".to_string()
            )
        );
    }

    #[tokio::test]
    async fn skipped_without_role_arn() {
        let token_file = write_token_file("token");
        let broker = Arc::new(MockBroker::default());
        let provider = make_provider(None, Some(token_file.path().to_path_buf()), broker.clone());

        let error = provider.provide().await.unwrap_err();

        assert!(error.skipped);
        assert_eq!(broker.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn skipped_without_token_file() {
        let broker = Arc::new(MockBroker::default());
        let provider = make_provider(Some("arn:aws:iam::1:role/r"), None, broker.clone());

        let error = provider.provide().await.unwrap_err();

        assert!(error.skipped);
        assert_eq!(broker.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreadable_token_file_fails() {
        let broker = Arc::new(MockBroker::default());
        let provider = make_provider(
            Some("arn:aws:iam::1:role/r"),
            Some(PathBuf::from("/nonexistent/s3browse/token")),
            broker.clone(),
        );

        let error = provider.provide().await.unwrap_err();

        assert!(!error.skipped);
        assert!(error.reason.contains("cannot read web identity token file"));
        assert_eq!(broker.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_token_file_fails() {
        let token_file = write_token_file("  \n");
        let broker = Arc::new(MockBroker::default());
        let provider = make_provider(
            Some("arn:aws:iam::1:role/r"),
            Some(token_file.path().to_path_buf()),
            broker.clone(),
        );

        let error = provider.provide().await.unwrap_err();

        assert!(!error.skipped);
        assert!(error.reason.contains("is empty"));
    }

    #[tokio::test]
    async fn failed_exchange_fails() {
        let token_file = write_token_file("token");
        let broker = Arc::new(MockBroker {
            fail: true,
            ..Default::default()
        });
        let provider = make_provider(
            Some("arn:aws:iam::1:role/r"),
            Some(token_file.path().to_path_buf()),
            broker,
        );

        let error = provider.provide().await.unwrap_err();

        assert!(!error.skipped);
        assert_eq!(error.provider, CredentialSource::WebIdentity);
        assert!(error.reason.contains("InvalidIdentityToken"));
    }
}
