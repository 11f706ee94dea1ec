use std::time::Duration;

use tracing::{debug, error};

use crate::storage::Transport;
use crate::types::error::StorageError;

/// Default lifetime of a signed URL.
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Longest lifetime SigV4 query signing accepts (7 days).
pub const MAX_TTL_SECONDS: u64 = 604_800;

/// Issues time-limited GET URLs for single keys.
///
/// Signing happens locally with the transport's credentials. Whether the key
/// exists is only known when the URL is used.
#[derive(Clone)]
pub struct SignedUrlIssuer {
    transport: Transport,
}

impl SignedUrlIssuer {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub async fn sign(&self, key: &str, ttl_seconds: u64) -> Result<String, StorageError> {
        if key.is_empty() {
            return Err(self.signing_error(key, "key must not be empty"));
        }
        if !(1..=MAX_TTL_SECONDS).contains(&ttl_seconds) {
            return Err(self.signing_error(
                key,
                format!("ttl must be between 1 and {MAX_TTL_SECONDS} seconds, got {ttl_seconds}"),
            ));
        }

        let url = self
            .transport
            .presign_get_object(key, Duration::from_secs(ttl_seconds))
            .await
            .map_err(|e| {
                error!(
                    bucket = self.transport.bucket(),
                    key = key,
                    "signed URL issuance failed: {e:#}"
                );
                self.signing_error(key, format!("{e:#}"))
            })?;

        debug!(
            bucket = self.transport.bucket(),
            key = key,
            ttl_seconds = ttl_seconds,
            "signed URL issued."
        );

        Ok(url)
    }

    fn signing_error(&self, key: &str, reason: impl Into<String>) -> StorageError {
        StorageError::Signing {
            bucket: self.transport.bucket().to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
