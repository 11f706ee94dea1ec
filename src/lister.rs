use std::collections::HashSet;

use anyhow::anyhow;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::types::Object;
use aws_smithy_types_convert::date_time::DateTimeExt;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::storage::Transport;
use crate::types::error::StorageError;
use crate::types::{ListQuery, ListingPage, MAX_KEYS_LIMIT, StorageObject};

/// Fetches one page of a hierarchical listing and shapes it into a
/// [`ListingPage`].
///
/// Exactly one ListObjectsV2 call per [`list`](Self::list). With the `/`
/// delimiter that is one level of the folder tree; deeper levels are listed
/// by calling again with one of the returned prefixes. The engine never
/// recurses and never follows continuation tokens on its own.
///
/// Either the whole page is returned or a [`StorageError::Listing`]; a failed
/// call never turns into an empty page.
#[derive(Clone)]
pub struct ListingEngine {
    transport: Transport,
}

impl ListingEngine {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn bucket(&self) -> &str {
        self.transport.bucket()
    }

    pub async fn list(&self, query: &ListQuery) -> Result<ListingPage, StorageError> {
        validate_query(query).map_err(|cause| self.listing_error(query, cause))?;

        debug!(
            bucket = self.bucket(),
            prefix = query.prefix,
            delimiter = query.delimiter.as_deref().unwrap_or(""),
            max_keys = query.max_keys,
            continued = query.continuation_token.is_some(),
            "list objects has started."
        );

        let output = self
            .transport
            .list_objects_v2(query)
            .await
            .map_err(|cause| self.listing_error(query, cause))?;

        let page = shape_page(&output, &query.prefix, Utc::now())
            .map_err(|cause| self.listing_error(query, cause))?;

        debug!(
            bucket = self.bucket(),
            prefix = query.prefix,
            objects = page.objects.len(),
            prefixes = page.prefixes.len(),
            truncated = page.truncated,
            "list objects has been completed."
        );

        Ok(page)
    }

    fn listing_error(&self, query: &ListQuery, cause: anyhow::Error) -> StorageError {
        StorageError::Listing {
            bucket: self.bucket().to_string(),
            prefix: query.prefix.clone(),
            cause,
        }
    }
}

fn validate_query(query: &ListQuery) -> anyhow::Result<()> {
    if !(1..=MAX_KEYS_LIMIT).contains(&query.max_keys) {
        return Err(anyhow!(
            "max keys must be between 1 and {MAX_KEYS_LIMIT}, got {}",
            query.max_keys
        ));
    }
    if query.delimiter.as_deref() == Some("") {
        return Err(anyhow!("delimiter must not be empty"));
    }
    if query.continuation_token.as_deref() == Some("") {
        return Err(anyhow!("continuation token must not be empty"));
    }
    Ok(())
}

fn shape_page(
    output: &ListObjectsV2Output,
    prefix: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<ListingPage> {
    let prefixes: Vec<String> = output
        .common_prefixes()
        .iter()
        .filter_map(|p| p.prefix())
        .map(str::to_string)
        .collect();

    let prefix_set: HashSet<&str> = prefixes.iter().map(String::as_str).collect();
    let objects = output
        .contents()
        .iter()
        .map(|object| to_storage_object(object, now))
        .filter(|object| {
            let in_scope = !object.key.is_empty()
                && object.key.starts_with(prefix)
                && !prefix_set.contains(object.key.as_str());
            if !in_scope {
                debug!(key = object.key, prefix = prefix, "object outside the listed level dropped.");
            }
            in_scope
        })
        .collect();

    let truncated = output.is_truncated().unwrap_or(false);
    let next_continuation_token = output
        .next_continuation_token()
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    let next_continuation_token = match (truncated, next_continuation_token) {
        (true, None) => {
            return Err(anyhow!(
                "store reported a truncated page without a continuation token"
            ));
        }
        (false, Some(_)) => {
            debug!(prefix = prefix, "continuation token on a complete page dropped.");
            None
        }
        (_, token) => token,
    };

    Ok(ListingPage {
        objects,
        prefixes,
        truncated,
        next_continuation_token,
    })
}

fn to_storage_object(object: &Object, now: DateTime<Utc>) -> StorageObject {
    StorageObject {
        key: object.key().unwrap_or_default().to_string(),
        size: object
            .size()
            .and_then(|size| u64::try_from(size).ok())
            .unwrap_or(0),
        last_modified: object
            .last_modified()
            .and_then(|t| t.to_chrono_utc().ok())
            .unwrap_or(now),
        etag: strip_etag_quotes(object.e_tag().unwrap_or_default()).to_string(),
        content_type: None,
    }
}

/// Removes one leading and one trailing `"` from an entity tag.
pub fn strip_etag_quotes(etag: &str) -> &str {
    let etag = etag.strip_prefix('"').unwrap_or(etag);
    etag.strip_suffix('"').unwrap_or(etag)
}
