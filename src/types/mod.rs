use std::fmt;
use std::fmt::{Debug, Formatter};

use chrono::{DateTime, Duration, Utc};
use zeroize_derive::{Zeroize, ZeroizeOnDrop};

pub mod error;
pub mod token;

/// Path separator used for folder-style listings.
pub const DEFAULT_DELIMITER: &str = "/";

/// Page size used when the caller does not ask for one.
pub const DEFAULT_MAX_KEYS: i32 = 1000;

/// Upper bound accepted by ListObjectsV2 for `max-keys`.
pub const MAX_KEYS_LIMIT: i32 = 1000;

/// One leaf object of a listing page.
///
/// Built from a single ListObjectsV2 entry. `content_type` is filled in
/// afterwards by the [`MetadataEnricher`](crate::enricher::MetadataEnricher)
/// and stays `None` whenever the HeadObject lookup did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageObject {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    /// Entity tag with the surrounding quotes removed.
    pub etag: String,
    pub content_type: Option<String>,
}

/// One page of a hierarchical listing.
///
/// `prefixes` holds the common prefixes one level below the requested
/// prefix (each one ends with the delimiter). `objects` only holds leaf keys.
/// A truncated page always carries a continuation token; a complete page
/// never does.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingPage {
    pub objects: Vec<StorageObject>,
    pub prefixes: Vec<String>,
    pub truncated: bool,
    pub next_continuation_token: Option<String>,
}

/// Parameters of one ListObjectsV2 call.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub prefix: String,
    pub delimiter: Option<String>,
    pub max_keys: i32,
    /// Must be a token returned by a previous page for the same
    /// prefix and delimiter.
    pub continuation_token: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            delimiter: Some(DEFAULT_DELIMITER.to_string()),
            max_keys: DEFAULT_MAX_KEYS,
            continuation_token: None,
        }
    }
}

impl ListQuery {
    /// Folder-style query (`/` delimiter, 1000 keys) under `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Flat listing: every key under the prefix, no common prefixes.
    pub fn without_delimiter(mut self) -> Self {
        self.delimiter = None;
        self
    }

    pub fn with_max_keys(mut self, max_keys: i32) -> Self {
        self.max_keys = max_keys;
        self
    }

    pub fn with_continuation_token(mut self, token: impl Into<String>) -> Self {
        self.continuation_token = Some(token.into());
        self
    }
}

/// A listing query plus the search term used to narrow the fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub list: ListQuery,
    pub query: String,
}

impl SearchQuery {
    /// Searches the keys under `prefix` without a delimiter, so nested keys
    /// are candidates too. Only the first page is examined.
    pub fn new(prefix: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            list: ListQuery::new(prefix).without_delimiter(),
            query: query.into(),
        }
    }

    pub fn with_list_query(mut self, list: ListQuery) -> Self {
        self.list = list;
        self
    }
}

/// Search result that keeps the paging information of the underlying page,
/// so the search can be continued with `next_continuation_token`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPage {
    pub objects: Vec<StorageObject>,
    pub truncated: bool,
    pub next_continuation_token: Option<String>,
}

/// S3 storage path specification.
#[derive(Debug, Clone, PartialEq)]
pub enum StoragePath {
    S3 { bucket: String, prefix: String },
}

/// AWS access key pair with secure zeroization.
///
/// The secret_access_key and session_token are securely cleared from memory
/// when this struct is dropped, using the zeroize crate.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccessKeys {
    pub access_key: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Debug for AccessKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut keys = f.debug_struct("AccessKeys");
        let session_token = self
            .session_token
            .as_ref()
            .map_or("None", |_| "** redacted **");
        keys.field("access_key", &self.access_key)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &session_token);
        keys.finish()
    }
}

/// Which provider of the resolution chain produced a credential set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    WebIdentity,
    Static,
    InstanceMetadata,
}

impl CredentialSource {
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::WebIdentity => "web-identity",
            Self::Static => "static",
            Self::InstanceMetadata => "instance-metadata",
        }
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.provider_name())
    }
}

/// A resolved credential set. Read-only once built.
#[derive(Debug, Clone)]
pub struct Credentials {
    access_keys: AccessKeys,
    expiration: Option<DateTime<Utc>>,
    source: CredentialSource,
}

impl Credentials {
    pub fn new(
        access_keys: AccessKeys,
        expiration: Option<DateTime<Utc>>,
        source: CredentialSource,
    ) -> Self {
        Self {
            access_keys,
            expiration,
            source,
        }
    }

    pub fn access_keys(&self) -> &AccessKeys {
        &self.access_keys
    }

    /// `None` for long-lived keys.
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// True when the credentials expire before `now + margin`.
    pub fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|expiration| {
            now.checked_add_signed(margin)
                .is_none_or(|limit| expiration <= limit)
        })
    }
}
