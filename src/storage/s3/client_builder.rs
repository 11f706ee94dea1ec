use std::time::{Duration, SystemTime};

use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{Builder, StalledStreamProtectionConfig};

use crate::config::{CLITimeoutConfig, ClientConfig};
use crate::types::Credentials;

const DEFAULT_REGION: &str = "us-east-1";
const CREDENTIALS_PROVIDER_NAME: &str = "s3browse";

impl ClientConfig {
    /// Build an S3 client that signs with the given resolved credentials.
    ///
    /// The region comes from the configuration, then the SDK's default
    /// region chain (environment, profile), then `us-east-1`.
    pub async fn create_client(&self, credentials: &Credentials) -> Client {
        let region = RegionProviderChain::first_try(self.region.clone().map(Region::new))
            .or_default_provider()
            .or_else(DEFAULT_REGION)
            .region()
            .await
            .unwrap_or_else(|| Region::new(DEFAULT_REGION));

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(region)
            .credentials_provider(build_sdk_credentials(credentials))
            .force_path_style(self.force_path_style)
            .retry_config(self.build_retry_config())
            .timeout_config(build_timeout_config(&self.cli_timeout_config));

        if let Some(endpoint_url) = &self.endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        if self.disable_stalled_stream_protection {
            builder = builder.stalled_stream_protection(StalledStreamProtectionConfig::disabled());
        }

        Client::from_conf(builder.build())
    }

    fn build_retry_config(&self) -> RetryConfig {
        RetryConfig::standard()
            .with_max_attempts(self.retry_config.aws_max_attempts)
            .with_initial_backoff(Duration::from_millis(
                self.retry_config.initial_backoff_milliseconds,
            ))
    }
}

fn build_sdk_credentials(credentials: &Credentials) -> aws_sdk_s3::config::Credentials {
    let access_keys = credentials.access_keys();
    aws_sdk_s3::config::Credentials::new(
        access_keys.access_key.clone(),
        access_keys.secret_access_key.clone(),
        access_keys.session_token.clone(),
        credentials.expiration().map(SystemTime::from),
        CREDENTIALS_PROVIDER_NAME,
    )
}

fn build_timeout_config(timeout_config: &CLITimeoutConfig) -> TimeoutConfig {
    let mut builder = TimeoutConfig::builder();

    if let Some(ms) = timeout_config.operation_timeout_milliseconds {
        builder = builder.operation_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = timeout_config.operation_attempt_timeout_milliseconds {
        builder = builder.operation_attempt_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = timeout_config.connect_timeout_milliseconds {
        builder = builder.connect_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = timeout_config.read_timeout_milliseconds {
        builder = builder.read_timeout(Duration::from_millis(ms));
    }

    builder.build()
}
