//! The Cache Partition Store capability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use url::Url;

use super::hash::request_key;
use crate::Error;
use crate::http::{Request, Response};

/// A snapshot of a response as written into a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    /// Request identity (see [`super::hash::compute_request_key`]).
    pub key: String,
    pub method: String,
    pub request_url: Url,
    pub response: Response,
    pub stored_at: DateTime<Utc>,
}

impl StoredResponse {
    pub fn new(request: &Request, response: Response) -> Self {
        Self {
            key: request_key(request),
            method: request.method.clone(),
            request_url: request.url.clone(),
            response,
            stored_at: Utc::now(),
        }
    }
}

/// Named partitions mapping request identity to stored responses.
///
/// Implementations must tolerate concurrent use from many handlers; each
/// single-key write is atomic and no operation spans multiple keys.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the partition if it does not exist.
    async fn open(&self, name: &str) -> Result<(), Error>;

    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// Partition names in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a partition and every entry in it. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    async fn lookup(&self, name: &str, key: &str) -> Result<Option<StoredResponse>, Error>;

    /// First entry for `key` across all partitions, searched in creation order.
    async fn lookup_any(&self, key: &str) -> Result<Option<(String, StoredResponse)>, Error>;

    /// Insert or overwrite the entry for `entry.key`, creating the partition if needed.
    async fn put(&self, name: &str, entry: StoredResponse) -> Result<(), Error>;

    /// Remove one entry. Returns whether it existed.
    async fn remove(&self, name: &str, key: &str) -> Result<bool, Error>;

    /// Every entry of a partition; empty when the partition does not exist.
    async fn entries(&self, name: &str) -> Result<Vec<StoredResponse>, Error>;
}
