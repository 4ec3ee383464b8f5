//! Named partition handles over a shared [`CacheStore`].

use std::sync::Arc;

use super::hash::request_key;
use super::store::{CacheStore, StoredResponse};
use crate::Error;
use crate::http::{Request, Response};

/// A handle to one named partition.
///
/// Cheap to clone; clones share the underlying store and may be moved into
/// background tasks.
#[derive(Clone)]
pub struct Partition {
    store: Arc<dyn CacheStore>,
    name: String,
}

impl std::fmt::Debug for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partition").field("name", &self.name).finish()
    }
}

impl Partition {
    /// A handle without touching the store; the first `put` creates the partition.
    pub fn new(store: Arc<dyn CacheStore>, name: &str) -> Self {
        Self { store, name: name.to_string() }
    }

    /// Open (creating if needed) the partition called `name`.
    pub async fn open(store: Arc<dyn CacheStore>, name: &str) -> Result<Self, Error> {
        store.open(name).await?;
        Ok(Self::new(store, name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn lookup(&self, request: &Request) -> Result<Option<Response>, Error> {
        let entry = self.store.lookup(&self.name, &request_key(request)).await?;
        Ok(entry.map(|e| e.response))
    }

    /// Store `response` for `request`, replacing any previous entry.
    ///
    /// Only `GET` requests can be cached.
    pub async fn put(&self, request: &Request, response: Response) -> Result<(), Error> {
        if !request.is_get() {
            return Err(Error::InvalidInput(format!("cannot cache {} request for {}", request.method, request.url)));
        }
        self.store.put(&self.name, StoredResponse::new(request, response)).await
    }

    pub async fn remove(&self, request: &Request) -> Result<bool, Error> {
        self.store.remove(&self.name, &request_key(request)).await
    }

    /// Stored request URLs, in no particular order.
    pub async fn requests(&self) -> Result<Vec<url::Url>, Error> {
        let entries = self.store.entries(&self.name).await?;
        Ok(entries.into_iter().map(|e| e.request_url).collect())
    }
}

/// Look `request` up across every partition, oldest partition first.
///
/// Returns the matching partition's name alongside the response.
pub async fn lookup_any(store: &dyn CacheStore, request: &Request) -> Result<Option<(String, Response)>, Error> {
    let found = store.lookup_any(&request_key(request)).await?;
    Ok(found.map(|(name, entry)| (name, entry.response)))
}
