//! Shared test utilities for the s3browse library crate.
//!
//! A scriptable in-memory [`MockTransport`] plus builders for SDK listing
//! output, so the lister, enricher, signer and client tests describe the
//! store's answer instead of talking to S3.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::operation::head_object::HeadObjectOutput;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::primitives::DateTime;
use aws_sdk_s3::types::{CommonPrefix, Object};
use chrono::{TimeZone, Utc};

use crate::config::ClientConfig;
use crate::storage::{ObjectStoreTransport, Transport, TransportFactory};
use crate::types::token::RequestCancellationToken;
use crate::types::{Credentials, ListQuery, StorageObject};

/// Initialise a dummy tracing subscriber for tests.
///
/// Uses `try_init` so that only the first call in a process actually
/// installs the subscriber; subsequent calls are silently ignored.
pub(crate) fn init_dummy_tracing_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("dummy=trace")
        .try_init();
}

/// A raw listing entry as the store would return it.
pub(crate) fn make_s3_object(key: &str, size: i64, etag: &str) -> Object {
    Object::builder()
        .key(key)
        .size(size)
        .e_tag(etag)
        .last_modified(DateTime::from_secs(1_700_000_000))
        .build()
}

pub(crate) fn make_list_output(
    objects: Vec<Object>,
    prefixes: &[&str],
    truncated: bool,
    next_continuation_token: Option<&str>,
) -> ListObjectsV2Output {
    ListObjectsV2Output::builder()
        .set_contents(Some(objects))
        .set_common_prefixes(Some(
            prefixes
                .iter()
                .map(|p| CommonPrefix::builder().prefix(*p).build())
                .collect(),
        ))
        .is_truncated(truncated)
        .set_next_continuation_token(next_continuation_token.map(str::to_string))
        .build()
}

pub(crate) fn make_storage_object(key: &str) -> StorageObject {
    StorageObject {
        key: key.to_string(),
        size: 1,
        last_modified: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        etag: "etag".to_string(),
        content_type: None,
    }
}

/// In-memory transport with call counters.
///
/// HeadObject answers from `content_types`; keys without an entry fail.
/// `head_delays` holds a per-key latency so tests can control completion order.
#[derive(Clone)]
pub(crate) struct MockTransport {
    bucket: String,
    list_result: std::result::Result<ListObjectsV2Output, String>,
    content_types: Arc<HashMap<String, String>>,
    head_delays: Arc<HashMap<String, Duration>>,
    list_delay: Option<Duration>,
    cancel_on_head: Option<(String, RequestCancellationToken)>,
    pub list_calls: Arc<AtomicU32>,
    pub head_calls: Arc<AtomicU32>,
    pub presign_calls: Arc<AtomicU32>,
    pub last_query: Arc<Mutex<Option<ListQuery>>>,
    pub completed_heads: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
}

impl MockTransport {
    pub(crate) fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            list_result: Ok(make_list_output(vec![], &[], false, None)),
            content_types: Arc::new(HashMap::new()),
            head_delays: Arc::new(HashMap::new()),
            list_delay: None,
            cancel_on_head: None,
            list_calls: Arc::new(AtomicU32::new(0)),
            head_calls: Arc::new(AtomicU32::new(0)),
            presign_calls: Arc::new(AtomicU32::new(0)),
            last_query: Arc::new(Mutex::new(None)),
            completed_heads: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn with_list_output(mut self, output: ListObjectsV2Output) -> Self {
        self.list_result = Ok(output);
        self
    }

    pub(crate) fn with_list_error(mut self, message: &str) -> Self {
        self.list_result = Err(message.to_string());
        self
    }

    pub(crate) fn with_content_type(mut self, key: &str, content_type: &str) -> Self {
        Arc::make_mut(&mut self.content_types).insert(key.to_string(), content_type.to_string());
        self
    }

    pub(crate) fn with_head_delay(mut self, key: &str, delay: Duration) -> Self {
        Arc::make_mut(&mut self.head_delays).insert(key.to_string(), delay);
        self
    }

    pub(crate) fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    /// HeadObject for `key` cancels `token` just before answering.
    pub(crate) fn with_cancel_on_head(mut self, key: &str, token: RequestCancellationToken) -> Self {
        self.cancel_on_head = Some((key.to_string(), token));
        self
    }

    pub(crate) fn boxed(&self) -> Transport {
        Box::new(self.clone())
    }
}

#[async_trait]
impl ObjectStoreTransport for MockTransport {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_objects_v2(&self, query: &ListQuery) -> Result<ListObjectsV2Output> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        self.list_result
            .clone()
            .map_err(|message| anyhow::anyhow!(message).context("list_objects_v2() failed."))
    }

    async fn head_object(&self, key: &str) -> Result<HeadObjectOutput> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if let Some(delay) = self.head_delays.get(key) {
            tokio::time::sleep(*delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed_heads.lock().unwrap().push(key.to_string());

        if let Some((_, token)) = self.cancel_on_head.as_ref().filter(|(k, _)| k == key) {
            token.cancel();
        }

        match self.content_types.get(key) {
            Some(content_type) => Ok(HeadObjectOutput::builder()
                .content_type(content_type)
                .build()),
            None => Err(anyhow::anyhow!("NotFound: {key}")),
        }
    }

    async fn presign_get_object(&self, key: &str, expires_in: Duration) -> Result<String> {
        self.presign_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "https://{}.s3.amazonaws.com/{key}?X-Amz-Expires={}",
            self.bucket,
            expires_in.as_secs()
        ))
    }
}

/// Hands out clones of one [`MockTransport`] and records every credential
/// set it was asked to bind.
#[derive(Clone)]
pub(crate) struct MockTransportFactory {
    transport: MockTransport,
    pub create_calls: Arc<AtomicU32>,
    pub access_keys_seen: Arc<Mutex<Vec<String>>>,
}

impl MockTransportFactory {
    pub(crate) fn new(transport: MockTransport) -> Self {
        Self {
            transport,
            create_calls: Arc::new(AtomicU32::new(0)),
            access_keys_seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn create(
        &self,
        _bucket: &str,
        credentials: &Credentials,
        _client_config: &ClientConfig,
    ) -> Result<Transport> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.access_keys_seen
            .lock()
            .unwrap()
            .push(credentials.access_keys().access_key.clone());
        Ok(self.transport.boxed())
    }
}
