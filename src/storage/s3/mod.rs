pub mod client_builder;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::head_object::HeadObjectOutput;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;

use crate::config::ClientConfig;
use crate::storage::{ObjectStoreTransport, Transport, TransportFactory};
use crate::types::{Credentials, ListQuery};

/// Extracts the S3 error code and message from an AWS SDK error.
///
/// Service errors carry the S3 error code (e.g. "AccessDenied",
/// "NoSuchBucket") and message from the response. Anything else (network,
/// timeout, construction failure) yields "N/A" and the error description.
fn extract_sdk_error_details<E: std::fmt::Display + ProvideErrorMetadata>(
    e: &SdkError<E>,
) -> (String, String) {
    if let Some(service_err) = e.as_service_error() {
        (
            service_err.code().unwrap_or("unknown").to_string(),
            service_err.message().unwrap_or("no message").to_string(),
        )
    } else {
        ("N/A".to_string(), e.to_string())
    }
}

/// Factory for S3 transports built on `aws-sdk-s3`.
pub struct S3TransportFactory;

#[async_trait]
impl TransportFactory for S3TransportFactory {
    async fn create(
        &self,
        bucket: &str,
        credentials: &Credentials,
        client_config: &ClientConfig,
    ) -> Result<Transport> {
        let client = client_config.create_client(credentials).await;

        Ok(Box::new(S3Transport {
            bucket: bucket.to_string(),
            client: Arc::new(client),
        }))
    }
}

#[derive(Clone)]
struct S3Transport {
    bucket: String,
    client: Arc<Client>,
}

#[async_trait]
impl ObjectStoreTransport for S3Transport {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_objects_v2(&self, query: &ListQuery) -> Result<ListObjectsV2Output> {
        self.client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&query.prefix)
            .set_delimiter(query.delimiter.clone())
            .max_keys(query.max_keys)
            .set_continuation_token(query.continuation_token.clone())
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = self.bucket,
                    prefix = query.prefix,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 ListObjectsV2 API call failed for s3://{}/{}: {} ({}).",
                    self.bucket,
                    query.prefix,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow::anyhow!(e).context("aws_sdk_s3::client::list_objects_v2() failed.")
            })
    }

    async fn head_object(&self, key: &str) -> Result<HeadObjectOutput> {
        self.client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                // Enrichment is best effort, so this is not an error for the caller.
                tracing::debug!(
                    bucket = self.bucket,
                    key = key,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 HeadObject API call failed for s3://{}/{}: {} ({}).",
                    self.bucket,
                    key,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow::anyhow!(e).context("aws_sdk_s3::client::head_object() failed.")
            })
    }

    async fn presign_get_object(&self, key: &str, expires_in: Duration) -> Result<String> {
        let presigning_config = PresigningConfig::expires_in(expires_in)
            .context("aws_sdk_s3::presigning::PresigningConfig::expires_in() failed.")?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| {
                anyhow::anyhow!(e).context("aws_sdk_s3::client::get_object().presigned() failed.")
            })?;

        Ok(request.uri().to_string())
    }
}
