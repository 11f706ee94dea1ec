use crate::config::{
    CLITimeoutConfig, ClientConfig, Config, CredentialConfig, DEFAULT_AWS_MAX_ATTEMPTS,
    DEFAULT_CREDENTIAL_REFRESH_MARGIN_SECONDS, DEFAULT_INITIAL_BACKOFF_MILLISECONDS,
    DEFAULT_MAX_CONCURRENT_HEAD_REQUESTS, DEFAULT_PRESIGN_TTL_SECONDS, DEFAULT_ROLE_SESSION_NAME,
    EnrichmentConfig, Operation, RetryConfig, TracingConfig,
};
use crate::signer::MAX_TTL_SECONDS;
use crate::types::{DEFAULT_DELIMITER, DEFAULT_MAX_KEYS, MAX_KEYS_LIMIT, StoragePath};
use clap::Parser;
use clap::builder::NonEmptyStringValueParser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::ffi::OsString;
use std::path::PathBuf;

pub mod value_parser;


// ---------------------------------------------------------------------------
// Default constants
// ---------------------------------------------------------------------------

const DEFAULT_NO_DELIMITER: bool = false;
const DEFAULT_DISABLE_ENRICHMENT: bool = false;
const DEFAULT_DISABLE_INSTANCE_METADATA: bool = false;
const DEFAULT_JSON_TRACING: bool = false;
const DEFAULT_AWS_SDK_TRACING: bool = false;
const DEFAULT_SPAN_EVENTS_TRACING: bool = false;
const DEFAULT_DISABLE_COLOR_TRACING: bool = false;
const DEFAULT_FORCE_PATH_STYLE: bool = false;
const DEFAULT_DISABLE_STALLED_STREAM_PROTECTION: bool = false;

// ---------------------------------------------------------------------------
// Error messages
// ---------------------------------------------------------------------------

const ERROR_MESSAGE_INVALID_TARGET: &str =
    "Target must be an S3 path starting with 's3://' (e.g., s3://bucket/prefix).";
const ERROR_MESSAGE_MAX_KEYS_OUT_OF_RANGE: &str = "Max keys must be between 1 and 1000.";
const ERROR_MESSAGE_MAX_CONCURRENT_HEAD_REQUESTS_ZERO: &str =
    "Max concurrent head requests must be at least 1.";
const ERROR_MESSAGE_PRESIGN_TTL_OUT_OF_RANGE: &str =
    "Presign TTL must be between 1 and 604800 seconds (7 days).";

// ---------------------------------------------------------------------------
// Value parser helpers
// ---------------------------------------------------------------------------

fn check_s3_target(s: &str) -> Result<String, String> {
    if s.starts_with("s3://") && s.len() > 5 {
        Ok(s.to_string())
    } else {
        Err(ERROR_MESSAGE_INVALID_TARGET.to_string())
    }
}

// ---------------------------------------------------------------------------
// CLIArgs (clap-derived argument struct)
// ---------------------------------------------------------------------------

/// s3browse - Browse, search and download objects in Amazon S3.
///
/// Lists one level of a bucket like a folder view, searches keys of a page
/// by substring, or issues a time-limited download URL.
///
/// Example:
///   s3browse s3://my-bucket/photos/
///   s3browse s3://my-bucket/reports/ --query jan
///   s3browse s3://my-bucket/ --presign-key reports/jan.csv --presign-ttl-seconds 600
#[derive(Parser, Clone, Debug)]
#[command(name = "s3browse", version, about, long_about = None)]
pub struct CLIArgs {
    /// S3 target path: s3://<BUCKET_NAME>[/prefix]
    #[arg(
        env,
        help = "s3://<BUCKET_NAME>[/prefix]",
        value_parser = check_s3_target,
        default_value_if("auto_complete_shell", clap::builder::ArgPredicate::IsPresent, "s3://ignored"),
        required = false,
    )]
    pub target: String,

    // -----------------------------------------------------------------------
    // Browse options
    // -----------------------------------------------------------------------
    /// Search the keys of one page under the target prefix (case-insensitive substring).
    #[arg(
        long,
        env,
        help_heading = "Browse",
        long_help = r#"Return only objects whose key contains the given text (case-insensitive).
Keys are listed without a delimiter, so nested keys are candidates too.
Only one page (--max-keys) is searched; use --continuation-token to search the next one.
An empty query matches every object of the page."#
    )]
    pub query: Option<String>,

    /// Issue a signed download URL for this key instead of listing.
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), conflicts_with = "query", help_heading = "Browse")]
    pub presign_key: Option<String>,

    /// Lifetime of the signed URL in seconds. Default: 3600.
    #[arg(long, env, default_value_t = DEFAULT_PRESIGN_TTL_SECONDS, help_heading = "Browse")]
    pub presign_ttl_seconds: u64,

    /// Continuation token returned by a previous truncated page.
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "Browse")]
    pub continuation_token: Option<String>,

    /// Delimiter used to group keys into folders. Default: "/".
    #[arg(long, env, default_value = DEFAULT_DELIMITER, value_parser = NonEmptyStringValueParser::new(), help_heading = "Browse")]
    pub delimiter: String,

    /// List every key under the prefix without grouping into folders.
    #[arg(long, env, default_value_t = DEFAULT_NO_DELIMITER, help_heading = "Browse")]
    pub no_delimiter: bool,

    /// Max keys per listing request (1-1000). Default: 1000.
    #[arg(long, env, default_value_t = DEFAULT_MAX_KEYS, help_heading = "Browse")]
    pub max_keys: i32,

    // -----------------------------------------------------------------------
    // Enrichment options
    // -----------------------------------------------------------------------
    /// Do not fetch the content type of listed objects.
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_ENRICHMENT, help_heading = "Enrichment")]
    pub disable_enrichment: bool,

    /// Number of concurrent HeadObject requests per page. Default: 64.
    #[arg(long, env, default_value_t = DEFAULT_MAX_CONCURRENT_HEAD_REQUESTS, help_heading = "Enrichment")]
    pub max_concurrent_head_requests: u16,

    /// Deadline in milliseconds for enriching one page.
    #[arg(
        long,
        env,
        help_heading = "Enrichment",
        long_help = r#"Deadline in milliseconds for fetching the content types of one page.
Lookups that have not finished by then are aborted and their objects
are shown without a content type."#
    )]
    pub enrichment_timeout_milliseconds: Option<u64>,

    // -----------------------------------------------------------------------
    // Credential options
    // -----------------------------------------------------------------------
    /// IAM role ARN assumed with the web identity token (workload identity federation).
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "Credentials")]
    pub target_role_arn: Option<String>,

    /// Path to the web identity token file exchanged for temporary credentials.
    #[arg(long, env, help_heading = "Credentials")]
    pub target_web_identity_token_file: Option<PathBuf>,

    /// Session name used when assuming the role.
    #[arg(long, env, default_value = DEFAULT_ROLE_SESSION_NAME, value_parser = NonEmptyStringValueParser::new(), help_heading = "Credentials")]
    pub target_role_session_name: String,

    /// AWS access key ID for the target.
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "Credentials")]
    pub target_access_key: Option<String>,

    /// AWS secret access key for the target.
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "Credentials")]
    pub target_secret_access_key: Option<String>,

    /// AWS session token for the target.
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "Credentials")]
    pub target_session_token: Option<String>,

    /// Do not query the instance metadata service for credentials.
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_INSTANCE_METADATA, help_heading = "Credentials")]
    pub disable_instance_metadata: bool,

    /// Re-resolve temporary credentials this many seconds before they expire. Default: 300.
    #[arg(long, env, default_value_t = DEFAULT_CREDENTIAL_REFRESH_MARGIN_SECONDS, help_heading = "Credentials")]
    pub credential_refresh_margin_seconds: u64,

    // -----------------------------------------------------------------------
    // AWS configuration
    // -----------------------------------------------------------------------
    /// AWS region for the target.
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub target_region: Option<String>,

    /// Custom S3-compatible endpoint URL (e.g. MinIO, Wasabi).
    #[arg(long, env, value_parser = value_parser::url::check_scheme, help_heading = "AWS")]
    pub target_endpoint_url: Option<String>,

    /// Force path-style access (required for some S3-compatible services).
    #[arg(long, env, default_value_t = DEFAULT_FORCE_PATH_STYLE, help_heading = "AWS")]
    pub target_force_path_style: bool,

    /// Disable stalled stream protection.
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_STALLED_STREAM_PROTECTION, help_heading = "AWS")]
    pub disable_stalled_stream_protection: bool,

    // -----------------------------------------------------------------------
    // Logging options
    // -----------------------------------------------------------------------
    /// Verbosity level. -q (quiet), default (normal), -v, -vv, -vvv.
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Output logs in JSON format.
    #[arg(long, env, default_value_t = DEFAULT_JSON_TRACING, help_heading = "Logging")]
    pub json_tracing: bool,

    /// Enable AWS SDK tracing.
    #[arg(long, env, default_value_t = DEFAULT_AWS_SDK_TRACING, help_heading = "Logging")]
    pub aws_sdk_tracing: bool,

    /// Enable tracing span events.
    #[arg(long, env, default_value_t = DEFAULT_SPAN_EVENTS_TRACING, help_heading = "Logging")]
    pub span_events_tracing: bool,

    /// Disable colored output in logs.
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_COLOR_TRACING, help_heading = "Logging")]
    pub disable_color_tracing: bool,

    // -----------------------------------------------------------------------
    // Retry options
    // -----------------------------------------------------------------------
    /// Maximum retry attempts for AWS SDK operations. Default: 10.
    #[arg(long, env, default_value_t = DEFAULT_AWS_MAX_ATTEMPTS, help_heading = "Retry")]
    pub aws_max_attempts: u32,

    /// Initial backoff in milliseconds for retries. Default: 100.
    #[arg(long, env, default_value_t = DEFAULT_INITIAL_BACKOFF_MILLISECONDS, help_heading = "Retry")]
    pub initial_backoff_milliseconds: u64,

    // -----------------------------------------------------------------------
    // Timeout options
    // -----------------------------------------------------------------------
    /// Overall operation timeout in milliseconds.
    #[arg(long, env, help_heading = "Timeout")]
    pub operation_timeout_milliseconds: Option<u64>,

    /// Per-attempt operation timeout in milliseconds.
    #[arg(long, env, help_heading = "Timeout")]
    pub operation_attempt_timeout_milliseconds: Option<u64>,

    /// Connection timeout in milliseconds.
    #[arg(long, env, help_heading = "Timeout")]
    pub connect_timeout_milliseconds: Option<u64>,

    /// Read timeout in milliseconds.
    #[arg(long, env, help_heading = "Timeout")]
    pub read_timeout_milliseconds: Option<u64>,

    // -----------------------------------------------------------------------
    // Advanced options
    // -----------------------------------------------------------------------
    /// Generate shell completions.
    #[arg(long, env, help_heading = "Advanced")]
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

// ---------------------------------------------------------------------------
// parse_from_args (public API)
// ---------------------------------------------------------------------------

/// Parse command-line arguments into a `CLIArgs` struct.
///
/// # Example
///
/// ```
/// use s3browse_rs::config::args::parse_from_args;
///
/// let args = vec!["s3browse", "s3://my-bucket/photos/", "--max-keys", "100"];
/// let cli_args = parse_from_args(args).unwrap();
/// assert_eq!(cli_args.max_keys, 100);
/// ```
pub fn parse_from_args<I, T>(args: I) -> Result<CLIArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CLIArgs::try_parse_from(args)
}

/// Parse arguments and build a Config in one step.
pub fn build_config_from_args<I, T>(args: I) -> Result<Config, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli_args = CLIArgs::try_parse_from(args).map_err(|e| e.to_string())?;
    Config::try_from(cli_args)
}

// ---------------------------------------------------------------------------
// Validation and Config conversion
// ---------------------------------------------------------------------------

impl CLIArgs {
    fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_KEYS_LIMIT).contains(&self.max_keys) {
            return Err(ERROR_MESSAGE_MAX_KEYS_OUT_OF_RANGE.to_string());
        }
        if self.max_concurrent_head_requests == 0 {
            return Err(ERROR_MESSAGE_MAX_CONCURRENT_HEAD_REQUESTS_ZERO.to_string());
        }
        if !(1..=MAX_TTL_SECONDS).contains(&self.presign_ttl_seconds) {
            return Err(ERROR_MESSAGE_PRESIGN_TTL_OUT_OF_RANGE.to_string());
        }
        Ok(())
    }

    fn build_operation(&self) -> Operation {
        if let Some(ref key) = self.presign_key {
            Operation::Presign { key: key.clone() }
        } else if let Some(ref query) = self.query {
            Operation::Search {
                query: query.clone(),
            }
        } else {
            Operation::List
        }
    }

    fn build_client_config(&self) -> ClientConfig {
        ClientConfig {
            region: self.target_region.clone(),
            endpoint_url: self.target_endpoint_url.clone(),
            force_path_style: self.target_force_path_style,
            retry_config: RetryConfig {
                aws_max_attempts: self.aws_max_attempts,
                initial_backoff_milliseconds: self.initial_backoff_milliseconds,
            },
            cli_timeout_config: CLITimeoutConfig {
                operation_timeout_milliseconds: self.operation_timeout_milliseconds,
                operation_attempt_timeout_milliseconds: self.operation_attempt_timeout_milliseconds,
                connect_timeout_milliseconds: self.connect_timeout_milliseconds,
                read_timeout_milliseconds: self.read_timeout_milliseconds,
            },
            disable_stalled_stream_protection: self.disable_stalled_stream_protection,
        }
    }

    fn build_credential_config(&self) -> CredentialConfig {
        CredentialConfig {
            role_arn: self.target_role_arn.clone(),
            web_identity_token_file: self.target_web_identity_token_file.clone(),
            role_session_name: self.target_role_session_name.clone(),
            access_key: self.target_access_key.clone(),
            secret_access_key: self.target_secret_access_key.clone(),
            session_token: self.target_session_token.clone(),
            instance_metadata_enabled: !self.disable_instance_metadata,
        }
    }

    fn build_enrichment_config(&self) -> EnrichmentConfig {
        EnrichmentConfig {
            enabled: !self.disable_enrichment,
            max_concurrent_head_requests: self.max_concurrent_head_requests,
            timeout_milliseconds: self.enrichment_timeout_milliseconds,
        }
    }

    fn build_tracing_config(&self) -> Option<TracingConfig> {
        let log_level = self.verbosity.log_level()?;

        Some(TracingConfig {
            tracing_level: log_level,
            json_tracing: self.json_tracing,
            aws_sdk_tracing: self.aws_sdk_tracing,
            span_events_tracing: self.span_events_tracing,
            disable_color_tracing: self.disable_color_tracing,
        })
    }

    fn parse_target(&self) -> Result<StoragePath, String> {
        let uri = &self.target;
        // Remove "s3://" prefix
        let without_scheme = &uri[5..];

        let (bucket, prefix) = match without_scheme.find('/') {
            Some(idx) => {
                let bucket = &without_scheme[..idx];
                let prefix = &without_scheme[idx + 1..];
                (bucket.to_string(), prefix.to_string())
            }
            None => (without_scheme.to_string(), String::new()),
        };

        if bucket.is_empty() {
            return Err(ERROR_MESSAGE_INVALID_TARGET.to_string());
        }

        Ok(StoragePath::S3 { bucket, prefix })
    }
}

impl TryFrom<CLIArgs> for Config {
    type Error = String;

    fn try_from(args: CLIArgs) -> Result<Self, Self::Error> {
        args.validate()?;

        let target = args.parse_target()?;
        let operation = args.build_operation();
        let delimiter = if args.no_delimiter {
            None
        } else {
            Some(args.delimiter.clone())
        };

        Ok(Config {
            target,
            operation,
            delimiter,
            max_keys: args.max_keys,
            continuation_token: args.continuation_token.clone(),
            presign_ttl_seconds: args.presign_ttl_seconds,
            target_client_config: args.build_client_config(),
            credential_config: args.build_credential_config(),
            enrichment_config: args.build_enrichment_config(),
            credential_refresh_margin_seconds: args.credential_refresh_margin_seconds,
            tracing_config: args.build_tracing_config(),
            auto_complete_shell: args.auto_complete_shell,
        })
    }
}
