//! Caching strategies.
//!
//! Each strategy is a function from (request, partition handles, network)
//! to a response plus optional background work:
//!
//! - [`refresh_behind`]: serve cached, refresh in the background
//! - [`cache_first`]: serve cached, fetch and populate on a miss
//! - [`network_first`]: fetch, fall back to any cached copy when offline

pub mod cache_first;
pub mod network_first;
pub mod refresh_behind;

use serde::Serialize;
use swcache_core::{CacheStore, Partition, Request, Response, cache};

use crate::tasks::BackgroundTask;

/// Where a response came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "from", rename_all = "lowercase")]
pub enum Source {
    Cache { partition: String },
    Network,
}

/// What a strategy produced for one request.
#[derive(Debug)]
pub struct Handled {
    pub response: Response,
    pub source: Source,
    pub background: Option<BackgroundTask>,
}

impl Handled {
    fn network(response: Response) -> Self {
        Self { response, source: Source::Network, background: None }
    }

    fn cached(response: Response, partition: &str) -> Self {
        Self { response, source: Source::Cache { partition: partition.to_string() }, background: None }
    }

    fn with_background(mut self, task: BackgroundTask) -> Self {
        self.background = Some(task);
        self
    }
}

/// Look up `request` in one partition. A failing store read counts as a miss.
async fn lookup_in(partition: &Partition, request: &Request) -> Option<Response> {
    match partition.lookup(request).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(url = %request.url, partition = partition.name(), error = %e, "cache read failed");
            None
        }
    }
}

/// Look up `request` across all partitions. A failing store read counts as a miss.
async fn lookup_anywhere(store: &dyn CacheStore, request: &Request) -> Option<(String, Response)> {
    match cache::lookup_any(store, request).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "cache read failed");
            None
        }
    }
}

/// Write a copy of `response`; failures are logged and never reach the page.
async fn store_copy(partition: &Partition, request: &Request, response: &Response) {
    if !request.is_get() {
        tracing::debug!(url = %request.url, method = %request.method, "not caching non-GET request");
        return;
    }
    match partition.put(request, response.clone()).await {
        Ok(()) => tracing::debug!(url = %request.url, partition = partition.name(), "cached response"),
        Err(e) => tracing::warn!(url = %request.url, partition = partition.name(), error = %e, "cache write failed"),
    }
}
