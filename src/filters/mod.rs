//! Narrowing listing pages down to the objects a caller asked for.
//!
//! [`ObjectFilter`] is the predicate seam; [`SearchFilter`] runs one listing
//! call through a filter and optionally enriches the survivors.

use crate::enricher::MetadataEnricher;
use crate::lister::ListingEngine;
use crate::types::error::StorageError;
use crate::types::token::RequestCancellationToken;
use crate::types::{SearchPage, SearchQuery, StorageObject};

pub mod key_substring;

pub use key_substring::KeySubstringFilter;

/// Predicate over one listed object.
pub trait ObjectFilter {
    fn is_match(&self, object: &StorageObject) -> bool;
}

/// Keeps the objects accepted by `filter`, in their original order.
pub fn apply_filter<F: ObjectFilter + ?Sized>(
    filter: &F,
    objects: Vec<StorageObject>,
) -> Vec<StorageObject> {
    objects
        .into_iter()
        .filter(|object| filter.is_match(object))
        .collect()
}

/// Search over a single listing page.
///
/// Only the fetched page is examined; this is a quick filter of what one
/// listing call returns, not a walk of the whole tree. Matching happens before
/// enrichment, so HeadObject is only sent for objects that are returned.
#[derive(Clone)]
pub struct SearchFilter {
    lister: ListingEngine,
    enricher: Option<MetadataEnricher>,
}

impl SearchFilter {
    pub fn new(lister: ListingEngine, enricher: Option<MetadataEnricher>) -> Self {
        Self { lister, enricher }
    }

    /// Matching objects only; prefixes and paging information are dropped.
    pub async fn filter(
        &self,
        query: &SearchQuery,
        cancellation_token: &RequestCancellationToken,
    ) -> Result<Vec<StorageObject>, StorageError> {
        Ok(self.filter_page(query, cancellation_token).await?.objects)
    }

    /// Matching objects plus the page's truncation flag and continuation
    /// token, so the search can go on with the next page.
    ///
    /// Fails with [`StorageError::Cancelled`] if the token fires before the
    /// listing answers.
    pub async fn filter_page(
        &self,
        query: &SearchQuery,
        cancellation_token: &RequestCancellationToken,
    ) -> Result<SearchPage, StorageError> {
        let page = tokio::select! {
            biased;

            _ = cancellation_token.cancelled() => return Err(StorageError::Cancelled),
            page = self.lister.list(&query.list) => page?,
        };
        let listed = page.objects.len();

        let objects = apply_filter(&KeySubstringFilter::new(&query.query), page.objects);
        tracing::debug!(
            query = query.query,
            listed = listed,
            matched = objects.len(),
            "search filter applied."
        );

        let objects = match &self.enricher {
            Some(enricher) => enricher.enrich(objects, cancellation_token).await,
            None => objects,
        };

        Ok(SearchPage {
            objects,
            truncated: page.truncated,
            next_continuation_token: page.next_continuation_token,
        })
    }
}
