use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::operation::head_object::HeadObjectOutput;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use dyn_clone::DynClone;

use crate::config::ClientConfig;
use crate::types::{Credentials, ListQuery};

pub mod s3;

/// Type alias for a boxed transport trait object.
pub type Transport = Box<dyn ObjectStoreTransport + Send + Sync>;

/// Creates a transport bound to one bucket with one credential set.
///
/// Called by the client whenever credentials are (re-)resolved.
#[async_trait]
pub trait TransportFactory {
    async fn create(
        &self,
        bucket: &str,
        credentials: &Credentials,
        client_config: &ClientConfig,
    ) -> Result<Transport>;
}

/// Thin boundary to the object store.
///
/// Methods return the raw SDK output; shaping into the domain model is the
/// job of the lister and the enricher. Failures are returned with the
/// attempted call as context and are never retried here beyond the SDK's
/// own retry policy.
#[async_trait]
pub trait ObjectStoreTransport: DynClone {
    fn bucket(&self) -> &str;

    /// One ListObjectsV2 call with the query's prefix, delimiter, page size
    /// and continuation token.
    async fn list_objects_v2(&self, query: &ListQuery) -> Result<ListObjectsV2Output>;

    /// HeadObject for a full object key.
    async fn head_object(&self, key: &str) -> Result<HeadObjectOutput>;

    /// Presigned GetObject URL. Signing is local; no request is sent.
    async fn presign_get_object(&self, key: &str, expires_in: Duration) -> Result<String>;
}

dyn_clone::clone_trait_object!(ObjectStoreTransport);
