use std::fmt;

use anyhow::Error;
use thiserror::Error;

use crate::types::CredentialSource;

/// One credential provider's failed (or skipped) attempt.
///
/// Never fatal on its own: the resolver collects these and only fails
/// when every provider produced one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{provider}: {reason}")]
pub struct CredentialSourceError {
    pub provider: CredentialSource,
    pub reason: String,
    /// True when the provider was not configured and did not attempt anything.
    pub skipped: bool,
}

impl CredentialSourceError {
    pub fn failed(provider: CredentialSource, reason: impl Into<String>) -> Self {
        Self {
            provider,
            reason: reason.into(),
            skipped: false,
        }
    }

    pub fn skipped(provider: CredentialSource, reason: impl Into<String>) -> Self {
        Self {
            provider,
            reason: reason.into(),
            skipped: true,
        }
    }
}

/// Reasons collected from every provider of the chain, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderFailures(pub Vec<CredentialSourceError>);

impl ProviderFailures {
    pub fn reasons(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for ProviderFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reasons().join("; "))
    }
}

/// Errors surfaced by the storage access layer.
///
/// Per-object metadata failures are absent: enrichment is best
/// effort and never reports an error.
///
/// ## Exit Codes
///
/// Each variant maps to an exit code (via `exit_code()`):
/// - 0: Cancelled
/// - 1: Listing and signing failures
/// - 2: Configuration errors and unresolvable credentials
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("no credentials could be resolved ({failures})")]
    NoCredentials { failures: ProviderFailures },

    #[error("failed to list objects in s3://{bucket}/{prefix}: {cause:#}")]
    Listing {
        bucket: String,
        prefix: String,
        cause: Error,
    },

    #[error("failed to issue a signed URL for s3://{bucket}/{key}: {reason}")]
    Signing {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The request token fired before the store answered.
    #[error("Operation cancelled by user")]
    Cancelled,
}

impl StorageError {
    pub fn exit_code(&self) -> i32 {
        match self {
            StorageError::Cancelled => 0,
            StorageError::InvalidConfig(_) | StorageError::NoCredentials { .. } => 2,
            _ => 1,
        }
    }

    /// Listing failures may succeed when retried with the same query.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Listing { .. })
    }

    /// The underlying cause of a listing failure, kept for logging.
    pub fn cause(&self) -> Option<&Error> {
        match self {
            StorageError::Listing { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Check if an anyhow::Error wraps a cancellation error.
pub fn is_cancelled_error(e: &Error) -> bool {
    matches!(e.downcast_ref::<StorageError>(), Some(StorageError::Cancelled))
}

/// Extract the exit code from an anyhow::Error, defaulting to 1.
pub fn exit_code_from_error(e: &Error) -> i32 {
    if let Some(err) = e.downcast_ref::<StorageError>() {
        return err.exit_code();
    }
    1
}
