use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::EnrichmentConfig;
use crate::storage::Transport;
use crate::types::StorageObject;
use crate::types::token::RequestCancellationToken;

/// Fills in `content_type` for the objects of one page with one HeadObject
/// call per object.
///
/// Lookups run concurrently, at most `max_concurrent_head_requests` at a
/// time. A failed lookup only leaves its own object without a content type.
/// The result keeps the input order whatever order the lookups finish in.
///
/// The optional deadline and the request cancellation token stop the
/// enrichment early: finished lookups are kept and the rest are aborted.
#[derive(Clone)]
pub struct MetadataEnricher {
    transport: Transport,
    max_concurrent_head_requests: usize,
    timeout: Option<Duration>,
}

impl MetadataEnricher {
    pub fn new(transport: Transport, config: &EnrichmentConfig) -> Self {
        Self {
            transport,
            max_concurrent_head_requests: usize::from(config.max_concurrent_head_requests).max(1),
            timeout: config.timeout_milliseconds.map(Duration::from_millis),
        }
    }

    pub async fn enrich(
        &self,
        objects: Vec<StorageObject>,
        cancellation_token: &RequestCancellationToken,
    ) -> Vec<StorageObject> {
        if objects.is_empty() {
            return objects;
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_head_requests));
        let mut join_set = JoinSet::new();

        for (index, object) in objects.iter().enumerate() {
            let transport = self.transport.clone();
            let semaphore = semaphore.clone();
            let key = object.key.clone();

            join_set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, None);
                };

                match transport.head_object(&key).await {
                    Ok(output) => (index, output.content_type().map(str::to_string)),
                    Err(e) => {
                        debug!(key = key, error = format!("{e:#}"), "content type lookup failed.");
                        (index, None)
                    }
                }
            });
        }

        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let mut content_types: Vec<Option<String>> = vec![None; objects.len()];
        let mut settled = 0;

        loop {
            let joined = tokio::select! {
                biased;

                _ = cancellation_token.cancelled() => {
                    debug!(settled = settled, total = objects.len(), "enrichment cancelled.");
                    break;
                }
                _ = wait_until(deadline) => {
                    warn!(settled = settled, total = objects.len(), "enrichment deadline exceeded.");
                    break;
                }
                joined = join_set.join_next() => joined,
            };

            match joined {
                Some(joined) => {
                    record_lookup(joined, &mut content_types);
                    settled += 1;
                }
                None => break,
            }
        }

        // Lookups that finished while the cancellation or deadline branch won.
        while let Some(joined) = join_set.try_join_next() {
            record_lookup(joined, &mut content_types);
        }
        join_set.abort_all();

        objects
            .into_iter()
            .zip(content_types)
            .map(|(mut object, content_type)| {
                if content_type.is_some() {
                    object.content_type = content_type;
                }
                object
            })
            .collect()
    }
}

fn record_lookup(
    joined: Result<(usize, Option<String>), JoinError>,
    content_types: &mut [Option<String>],
) {
    match joined {
        Ok((index, content_type)) => content_types[index] = content_type,
        Err(e) if e.is_cancelled() => {}
        Err(e) => debug!(error = e.to_string(), "content type lookup task failed."),
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
