use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::credentials::CredentialResolver;
use crate::enricher::MetadataEnricher;
use crate::filters::SearchFilter;
use crate::lister::ListingEngine;
use crate::signer::SignedUrlIssuer;
use crate::storage::TransportFactory;
use crate::storage::s3::S3TransportFactory;
use crate::types::error::StorageError;
use crate::types::token::{RequestCancellationToken, create_request_cancellation_token};
use crate::types::{Credentials, ListQuery, ListingPage, SearchPage, SearchQuery, StorageObject};

/// Everything an operation needs once credentials are resolved.
pub struct ReadyHandle {
    credentials: Credentials,
    lister: ListingEngine,
    enricher: Option<MetadataEnricher>,
    search: SearchFilter,
    signer: SignedUrlIssuer,
}

impl ReadyHandle {
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

enum ClientState {
    Uninitialized,
    Ready(Arc<ReadyHandle>),
}

/// Entry point of the storage access layer.
///
/// Starts uninitialized. The first operation resolves credentials, builds the
/// transport and moves the client to ready; later operations reuse that state.
/// Concurrent first calls wait on the same resolution instead of racing.
/// Temporary credentials are resolved again once they come within
/// `credential_refresh_margin_seconds` of their expiration.
///
/// # Example
///
/// ```no_run
/// use s3browse_rs::{Config, ListQuery, StorageClient};
///
/// # async fn run() -> Result<(), s3browse_rs::StorageError> {
/// let client = StorageClient::new(Config::for_target("my-bucket", "photos/"));
///
/// let page = client.list(&ListQuery::new("photos/")).await?;
/// for prefix in &page.prefixes {
///     println!("PRE {prefix}");
/// }
///
/// let url = client.sign("photos/readme.txt", 600).await?;
/// println!("{url}");
/// # Ok(())
/// # }
/// ```
pub struct StorageClient {
    config: Config,
    resolver: CredentialResolver,
    transport_factory: Arc<dyn TransportFactory + Send + Sync>,
    cancellation_token: RequestCancellationToken,
    state: Mutex<ClientState>,
}

impl StorageClient {
    /// A client for S3 using the production credential chain.
    pub fn new(config: Config) -> Self {
        let resolver = CredentialResolver::from_config(
            &config.credential_config,
            &config.target_client_config,
        );
        Self::with_components(config, resolver, Arc::new(S3TransportFactory))
    }

    pub fn with_components(
        config: Config,
        resolver: CredentialResolver,
        transport_factory: Arc<dyn TransportFactory + Send + Sync>,
    ) -> Self {
        Self {
            config,
            resolver,
            transport_factory,
            cancellation_token: create_request_cancellation_token(),
            state: Mutex::new(ClientState::Uninitialized),
        }
    }

    /// Every request gets a child of this token; cancelling it aborts
    /// in-flight enrichment of all requests.
    pub fn with_cancellation_token(mut self, cancellation_token: RequestCancellationToken) -> Self {
        self.cancellation_token = cancellation_token;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves credentials and builds the transport if that has not happened
    /// yet, or if the cached credentials are about to expire.
    ///
    /// When a refresh fails but the cached credentials have not actually
    /// expired, the cached state is kept.
    pub async fn ensure_ready(&self) -> Result<Arc<ReadyHandle>, StorageError> {
        let mut state = self.state.lock().await;

        let previous = match &*state {
            ClientState::Ready(handle) => {
                if !handle
                    .credentials
                    .expires_within(self.refresh_margin(), Utc::now())
                {
                    return Ok(handle.clone());
                }
                info!(
                    provider = handle.credentials.source().provider_name(),
                    "Credentials expire soon, resolving again."
                );
                Some(handle.clone())
            }
            ClientState::Uninitialized => None,
        };

        match self.build_ready_handle().await {
            Ok(handle) => {
                *state = ClientState::Ready(handle.clone());
                Ok(handle)
            }
            Err(e) => match previous {
                Some(handle)
                    if !handle
                        .credentials
                        .expires_within(TimeDelta::zero(), Utc::now()) =>
                {
                    warn!("Credential refresh failed, keeping current credentials: {e}");
                    Ok(handle)
                }
                _ => Err(e),
            },
        }
    }

    /// One page of the folder view, enriched with content types.
    ///
    /// Cancellation before the listing answers fails with
    /// [`StorageError::Cancelled`]; once the page is in, it only cuts the
    /// enrichment short.
    pub async fn list(&self, query: &ListQuery) -> Result<ListingPage, StorageError> {
        let handle = self.until_cancelled(self.ensure_ready()).await?;
        let mut page = self.until_cancelled(handle.lister.list(query)).await?;

        if let Some(enricher) = &handle.enricher {
            let objects = std::mem::take(&mut page.objects);
            page.objects = enricher
                .enrich(objects, &self.cancellation_token.child_token())
                .await;
        }

        Ok(page)
    }

    /// Objects of one page whose key contains the query (case-insensitive).
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<StorageObject>, StorageError> {
        let handle = self.until_cancelled(self.ensure_ready()).await?;
        handle
            .search
            .filter(query, &self.cancellation_token.child_token())
            .await
    }

    /// Like [`search`](Self::search), keeping the page's truncation flag and
    /// continuation token.
    pub async fn search_page(&self, query: &SearchQuery) -> Result<SearchPage, StorageError> {
        let handle = self.until_cancelled(self.ensure_ready()).await?;
        handle
            .search
            .filter_page(query, &self.cancellation_token.child_token())
            .await
    }

    /// A GET URL for `key` valid for `ttl_seconds`.
    pub async fn sign(&self, key: &str, ttl_seconds: u64) -> Result<String, StorageError> {
        let handle = self
            .until_cancelled(self.ensure_ready())
            .await
            .map_err(|e| match e {
                StorageError::Cancelled => e,
                e => StorageError::Signing {
                    bucket: self.config.bucket().to_string(),
                    key: key.to_string(),
                    reason: e.to_string(),
                },
            })?;

        self.until_cancelled(handle.signer.sign(key, ttl_seconds))
            .await
    }

    async fn until_cancelled<T>(
        &self,
        operation: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, StorageError> {
        tokio::select! {
            biased;

            _ = self.cancellation_token.cancelled() => Err(StorageError::Cancelled),
            result = operation => result,
        }
    }

    fn refresh_margin(&self) -> TimeDelta {
        i64::try_from(self.config.credential_refresh_margin_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    async fn build_ready_handle(&self) -> Result<Arc<ReadyHandle>, StorageError> {
        let credentials = self.resolver.resolve().await?;

        let transport = self
            .transport_factory
            .create(
                self.config.bucket(),
                &credentials,
                &self.config.target_client_config,
            )
            .await
            .map_err(|e| {
                StorageError::InvalidConfig(format!("cannot create object store client: {e:#}"))
            })?;

        let lister = ListingEngine::new(transport.clone());
        let enricher = self
            .config
            .enrichment_config
            .enabled
            .then(|| MetadataEnricher::new(transport.clone(), &self.config.enrichment_config));

        Ok(Arc::new(ReadyHandle {
            credentials,
            search: SearchFilter::new(lister.clone(), enricher.clone()),
            lister,
            enricher,
            signer: SignedUrlIssuer::new(transport),
        }))
    }
}
