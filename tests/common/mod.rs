//! Shared scenario test infrastructure for s3browse-rs.
//!
//! Provides an in-memory bucket that implements the public transport traits,
//! plus canned credential providers, so scenarios drive [`StorageClient`]
//! exactly as the CLI does without network access.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::operation::head_object::HeadObjectOutput;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::primitives::DateTime;
use aws_sdk_s3::types::{CommonPrefix, Object};

use s3browse_rs::config::ClientConfig;
use s3browse_rs::credentials::Provider;
use s3browse_rs::storage::Transport;
use s3browse_rs::{
    AccessKeys, Config, CredentialProvider, CredentialResolver, CredentialSource,
    CredentialSourceError, Credentials, ListQuery, ObjectStoreTransport, StorageClient,
    TransportFactory,
};

pub const BUCKET: &str = "test-bucket";

/// One canned ListObjectsV2 answer plus the content types HeadObject knows.
#[derive(Clone, Default)]
pub struct InMemoryBucket {
    pub objects: Vec<(String, i64, String)>,
    pub prefixes: Vec<String>,
    pub truncated: bool,
    pub next_continuation_token: Option<String>,
    pub content_types: HashMap<String, String>,
    pub list_calls: Arc<AtomicU32>,
    pub head_calls: Arc<AtomicU32>,
    pub queries: Arc<Mutex<Vec<ListQuery>>>,
}

impl InMemoryBucket {
    pub fn with_object(mut self, key: &str, size: i64, etag: &str) -> Self {
        self.objects
            .push((key.to_string(), size, etag.to_string()));
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefixes.push(prefix.to_string());
        self
    }

    pub fn with_content_type(mut self, key: &str, content_type: &str) -> Self {
        self.content_types
            .insert(key.to_string(), content_type.to_string());
        self
    }

    pub fn truncated_with(mut self, token: &str) -> Self {
        self.truncated = true;
        self.next_continuation_token = Some(token.to_string());
        self
    }

    pub fn last_query(&self) -> Option<ListQuery> {
        self.queries.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ObjectStoreTransport for InMemoryBucket {
    fn bucket(&self) -> &str {
        BUCKET
    }

    async fn list_objects_v2(&self, query: &ListQuery) -> Result<ListObjectsV2Output> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());

        let contents = self
            .objects
            .iter()
            .map(|(key, size, etag)| {
                Object::builder()
                    .key(key)
                    .size(*size)
                    .e_tag(etag)
                    .last_modified(DateTime::from_secs(1_700_000_000))
                    .build()
            })
            .collect();
        let common_prefixes = self
            .prefixes
            .iter()
            .map(|prefix| CommonPrefix::builder().prefix(prefix).build())
            .collect();

        Ok(ListObjectsV2Output::builder()
            .set_contents(Some(contents))
            .set_common_prefixes(Some(common_prefixes))
            .is_truncated(self.truncated)
            .set_next_continuation_token(self.next_continuation_token.clone())
            .build())
    }

    async fn head_object(&self, key: &str) -> Result<HeadObjectOutput> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        match self.content_types.get(key) {
            Some(content_type) => Ok(HeadObjectOutput::builder()
                .content_type(content_type)
                .build()),
            None => Err(anyhow::anyhow!("AccessDenied: {key}")),
        }
    }

    async fn presign_get_object(&self, key: &str, expires_in: Duration) -> Result<String> {
        Ok(format!(
            "https://{BUCKET}.s3.us-east-1.amazonaws.com/{key}?X-Amz-Expires={}",
            expires_in.as_secs()
        ))
    }
}

/// Binds every credential set to the same in-memory bucket.
pub struct InMemoryTransportFactory {
    pub bucket: InMemoryBucket,
    pub bound_access_keys: Arc<Mutex<Vec<String>>>,
}

impl InMemoryTransportFactory {
    pub fn new(bucket: InMemoryBucket) -> Self {
        Self {
            bucket,
            bound_access_keys: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl TransportFactory for InMemoryTransportFactory {
    async fn create(
        &self,
        _bucket: &str,
        credentials: &Credentials,
        _client_config: &ClientConfig,
    ) -> Result<Transport> {
        self.bound_access_keys
            .lock()
            .unwrap()
            .push(credentials.access_keys().access_key.clone());
        Ok(Box::new(self.bucket.clone()))
    }
}

/// A provider with a fixed answer that counts how often it was asked.
pub struct CannedProvider {
    source: CredentialSource,
    outcome: std::result::Result<&'static str, (&'static str, bool)>,
    pub calls: Arc<AtomicU32>,
}

impl CannedProvider {
    pub fn succeeding(source: CredentialSource, access_key: &'static str) -> Self {
        Self::with_outcome(source, Ok(access_key))
    }

    pub fn failing(source: CredentialSource, reason: &'static str) -> Self {
        Self::with_outcome(source, Err((reason, false)))
    }

    pub fn skipping(source: CredentialSource, reason: &'static str) -> Self {
        Self::with_outcome(source, Err((reason, true)))
    }

    fn with_outcome(
        source: CredentialSource,
        outcome: std::result::Result<&'static str, (&'static str, bool)>,
    ) -> Self {
        Self {
            source,
            outcome,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn boxed(self) -> (Provider, Arc<AtomicU32>) {
        let calls = self.calls.clone();
        (Box::new(self), calls)
    }
}

#[async_trait]
impl CredentialProvider for CannedProvider {
    fn source(&self) -> CredentialSource {
        self.source
    }

    async fn provide(&self) -> std::result::Result<Credentials, CredentialSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcome {
            Ok(access_key) => Ok(Credentials::new(
                AccessKeys {
                    access_key: access_key.to_string(),
                    secret_access_key: "secret".to_string(),
                    session_token: None,
                },
                None,
                self.source,
            )),
            Err((reason, true)) => Err(CredentialSourceError::skipped(self.source, reason)),
            Err((reason, false)) => Err(CredentialSourceError::failed(self.source, reason)),
        }
    }
}

pub fn make_client(
    prefix: &str,
    providers: Vec<Provider>,
    factory: InMemoryTransportFactory,
) -> StorageClient {
    StorageClient::with_components(
        Config::for_target(BUCKET, prefix),
        CredentialResolver::new(providers),
        Arc::new(factory),
    )
}

pub fn static_provider() -> Provider {
    CannedProvider::succeeding(CredentialSource::Static, "AKIASTATIC").boxed().0
}
