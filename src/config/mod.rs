pub mod args;

use std::fmt;
use std::path::PathBuf;

use crate::types::{DEFAULT_DELIMITER, DEFAULT_MAX_KEYS, StoragePath};

pub const DEFAULT_PRESIGN_TTL_SECONDS: u64 = crate::signer::DEFAULT_TTL_SECONDS;
pub const DEFAULT_MAX_CONCURRENT_HEAD_REQUESTS: u16 = 64;
pub const DEFAULT_CREDENTIAL_REFRESH_MARGIN_SECONDS: u64 = 300;
pub const DEFAULT_ROLE_SESSION_NAME: &str = "s3browse";
pub const DEFAULT_AWS_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_INITIAL_BACKOFF_MILLISECONDS: u64 = 100;

/// Main configuration for the storage access layer.
///
/// Holds the target bucket/prefix, the operation the CLI runs, the
/// credential chain inputs, client tuning and enrichment limits.
///
/// # Quick Start
///
/// Use [`Config::for_target`] for a minimal configuration with sensible defaults:
///
/// ```
/// use s3browse_rs::Config;
///
/// let config = Config::for_target("my-bucket", "photos/");
/// assert_eq!(config.max_keys, 1000);
/// assert_eq!(config.presign_ttl_seconds, 3600);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub target: StoragePath,
    pub operation: Operation,
    pub delimiter: Option<String>,
    pub max_keys: i32,
    pub continuation_token: Option<String>,
    pub presign_ttl_seconds: u64,
    pub target_client_config: ClientConfig,
    pub credential_config: CredentialConfig,
    pub enrichment_config: EnrichmentConfig,
    pub credential_refresh_margin_seconds: u64,
    pub tracing_config: Option<TracingConfig>,
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

impl Config {
    /// Create a `Config` with sensible defaults for the given S3 bucket and prefix.
    pub fn for_target(bucket: &str, prefix: &str) -> Self {
        Config {
            target: StoragePath::S3 {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
            },
            ..Config::default()
        }
    }

    pub fn bucket(&self) -> &str {
        let StoragePath::S3 { bucket, .. } = &self.target;
        bucket
    }

    pub fn prefix(&self) -> &str {
        let StoragePath::S3 { prefix, .. } = &self.target;
        prefix
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target: StoragePath::S3 {
                bucket: String::new(),
                prefix: String::new(),
            },
            operation: Operation::List,
            delimiter: Some(DEFAULT_DELIMITER.to_string()),
            max_keys: DEFAULT_MAX_KEYS,
            continuation_token: None,
            presign_ttl_seconds: DEFAULT_PRESIGN_TTL_SECONDS,
            target_client_config: ClientConfig::default(),
            credential_config: CredentialConfig::default(),
            enrichment_config: EnrichmentConfig::default(),
            credential_refresh_margin_seconds: DEFAULT_CREDENTIAL_REFRESH_MARGIN_SECONDS,
            tracing_config: None,
            auto_complete_shell: None,
        }
    }
}

/// What the CLI does with the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// One page of the folder view under the target prefix.
    List,
    /// Keys of one page containing `query` (case-insensitive).
    Search { query: String },
    /// A time-limited download URL for `key`.
    Presign { key: String },
}

/// AWS S3 client configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub retry_config: RetryConfig,
    pub cli_timeout_config: CLITimeoutConfig,
    pub disable_stalled_stream_protection: bool,
}

/// Retry configuration for AWS SDK operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub aws_max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            aws_max_attempts: DEFAULT_AWS_MAX_ATTEMPTS,
            initial_backoff_milliseconds: DEFAULT_INITIAL_BACKOFF_MILLISECONDS,
        }
    }
}

/// Timeout configuration for AWS SDK operations.
#[derive(Debug, Clone, Default)]
pub struct CLITimeoutConfig {
    pub operation_timeout_milliseconds: Option<u64>,
    pub operation_attempt_timeout_milliseconds: Option<u64>,
    pub connect_timeout_milliseconds: Option<u64>,
    pub read_timeout_milliseconds: Option<u64>,
}

/// Inputs of the credential resolution chain.
///
/// Every field is optional; a provider whose inputs are incomplete is
/// skipped rather than failed.
#[derive(Clone)]
pub struct CredentialConfig {
    pub role_arn: Option<String>,
    pub web_identity_token_file: Option<PathBuf>,
    pub role_session_name: String,
    pub access_key: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub instance_metadata_enabled: bool,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        CredentialConfig {
            role_arn: None,
            web_identity_token_file: None,
            role_session_name: DEFAULT_ROLE_SESSION_NAME.to_string(),
            access_key: None,
            secret_access_key: None,
            session_token: None,
            instance_metadata_enabled: true,
        }
    }
}

impl fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "** redacted **");
        f.debug_struct("CredentialConfig")
            .field("role_arn", &self.role_arn)
            .field("web_identity_token_file", &self.web_identity_token_file)
            .field("role_session_name", &self.role_session_name)
            .field("access_key", &self.access_key)
            .field("secret_access_key", &redacted(&self.secret_access_key))
            .field("session_token", &redacted(&self.session_token))
            .field("instance_metadata_enabled", &self.instance_metadata_enabled)
            .finish()
    }
}

/// Limits for the per-object HeadObject fan-out.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub max_concurrent_head_requests: u16,
    /// Deadline for the whole enrichment of one page.
    pub timeout_milliseconds: Option<u64>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        EnrichmentConfig {
            enabled: true,
            max_concurrent_head_requests: DEFAULT_MAX_CONCURRENT_HEAD_REQUESTS,
            timeout_milliseconds: None,
        }
    }
}

/// Tracing (logging) configuration.
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub aws_sdk_tracing: bool,
    pub span_events_tracing: bool,
    pub disable_color_tracing: bool,
}
