/*!
# Overview
s3browse-rs is the storage access layer of an S3 object browser.
It lists a bucket like a folder tree, searches keys, and issues
time-limited download URLs.

## Features
- **Credential chain**: web identity federation, then static keys, then the
  instance metadata service; the first provider that succeeds wins
- **Folder view**: one ListObjectsV2 call per page, with common prefixes as
  sub-folders and continuation tokens for paging
- **Best-effort enrichment**: content types fetched with concurrent
  HeadObject calls, bounded by a configurable cap and an optional deadline
- **Search**: case-insensitive key substring filter over one page
- **Signed URLs**: presigned GET URLs valid from 1 second to 7 days
- **Library-First**: the `s3browse` CLI is a thin wrapper over this library

## As a Library

```toml
[dependencies]
s3browse-rs = "0.1"
tokio = { version = "1", features = ["full"] }
```

```no_run
use s3browse_rs::config::args::parse_from_args;
use s3browse_rs::{Config, ListQuery, SearchQuery, StorageClient};

#[tokio::main]
async fn main() {
    let args = vec!["s3browse", "s3://my-bucket/photos/"];

    let parsed_args = parse_from_args(args).unwrap();
    let config = Config::try_from(parsed_args).unwrap();
    let client = StorageClient::new(config);

    match client.list(&ListQuery::new("photos/")).await {
        Ok(page) => {
            for prefix in &page.prefixes {
                println!("PRE {prefix}");
            }
            for object in &page.objects {
                println!("{} {}", object.size, object.key);
            }
        }
        Err(e) => eprintln!("{e}"),
    }

    let matches = client
        .search(&SearchQuery::new("photos/", "2024"))
        .await
        .unwrap_or_default();
    println!("{} matching objects", matches.len());
}
```
*/

pub mod client;
pub mod config;
pub mod credentials;
pub mod enricher;
pub mod filters;
pub mod lister;
pub mod signer;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use client::StorageClient;
pub use config::Config;
pub use config::args::{CLIArgs, build_config_from_args, parse_from_args};
pub use credentials::{CredentialProvider, CredentialResolver};
pub use enricher::MetadataEnricher;
pub use filters::SearchFilter;
pub use lister::ListingEngine;
pub use signer::SignedUrlIssuer;
pub use storage::{ObjectStoreTransport, TransportFactory};
pub use types::error::{
    CredentialSourceError, ProviderFailures, StorageError, exit_code_from_error,
    is_cancelled_error,
};
pub use types::token::{RequestCancellationToken, create_request_cancellation_token};
pub use types::{
    AccessKeys, CredentialSource, Credentials, ListQuery, ListingPage, SearchPage, SearchQuery,
    StorageObject, StoragePath,
};
