//! Setup and activation transitions.
//!
//! Setup fills the static partition from the Static Asset List, all or
//! nothing, then asks the host for an eager takeover. Activation deletes
//! every partition the registry does not name and claims open pages.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use swcache_core::cache::request_key;
use swcache_core::location;
use swcache_core::{CacheStore, Error, Network, Partition, PartitionRegistry, Request, Response, ResponseOutcome};
use tokio::task::JoinSet;
use url::Url;

use crate::host::Host;

/// What a successful setup wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub partition: String,
    pub cached: Vec<Url>,
}

/// What activation removed and kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub kept: Vec<String>,
    pub claimed: usize,
}

/// Drives the setup and activation transitions against injected capabilities.
pub struct Lifecycle {
    registry: Arc<PartitionRegistry>,
    origin: Url,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    host: Arc<dyn Host>,
}

impl Lifecycle {
    pub fn new(
        registry: Arc<PartitionRegistry>, origin: Url, store: Arc<dyn CacheStore>, network: Arc<dyn Network>,
        host: Arc<dyn Host>,
    ) -> Self {
        Self { registry, origin, store, network, host }
    }

    /// Requests for the Static Asset List, resolved against the origin, duplicates dropped.
    fn asset_requests(&self) -> Result<Vec<Request>, Error> {
        let mut seen = HashSet::new();
        let mut requests = Vec::with_capacity(self.registry.static_assets.len());

        for asset in &self.registry.static_assets {
            let url = location::resolve(asset, &self.origin)
                .map_err(|e| Error::InstallFailed { url: asset.clone(), reason: e.to_string() })?;
            let request = Request::get(url);
            if seen.insert(request_key(&request)) {
                requests.push(request);
            }
        }

        Ok(requests)
    }

    /// Populate the static partition.
    ///
    /// Every asset is fetched before anything is written. A failed fetch or a
    /// non-OK response fails setup with nothing stored. A failed write removes
    /// the entries this run added; entries left by an earlier setup stay, with
    /// the copies this run fetched.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let name = self.registry.partitions.static_assets.as_str();
        tracing::info!(partition = name, assets = self.registry.static_assets.len(), "installing");

        let requests = self.asset_requests()?;
        let responses = self.fetch_all(&requests).await?;
        let partition = Partition::open(self.store.clone(), name).await?;

        let mut added: Vec<&Request> = Vec::new();
        for (request, response) in requests.iter().zip(responses) {
            // An unreadable entry counts as present so rollback never deletes it.
            let absent = matches!(partition.lookup(request).await, Ok(None));
            if let Err(e) = partition.put(request, response).await {
                tracing::warn!(url = %request.url, error = %e, "static asset write failed, rolling back");
                rollback(&partition, &added).await;
                return Err(Error::InstallFailed { url: request.url.to_string(), reason: e.to_string() });
            }
            if absent {
                added.push(request);
            }
        }

        self.host.skip_waiting().await;
        tracing::info!(partition = name, cached = requests.len(), added = added.len(), "installed");

        Ok(InstallReport { partition: name.to_string(), cached: requests.into_iter().map(|r| r.url).collect() })
    }

    /// Fetch every request concurrently; the first failure cancels the rest.
    async fn fetch_all(&self, requests: &[Request]) -> Result<Vec<Response>, Error> {
        let mut join_set = JoinSet::new();
        for (index, request) in requests.iter().cloned().enumerate() {
            let network = self.network.clone();
            join_set.spawn(async move {
                let result = network.fetch(&request).await;
                (index, request, result)
            });
        }

        let mut responses: Vec<Option<Response>> = vec![None; requests.len()];
        while let Some(joined) = join_set.join_next().await {
            let (index, request, result) =
                joined.map_err(|e| Error::InstallFailed { url: "static assets".into(), reason: e.to_string() })?;

            let failure = match result {
                Ok(response) => match response.outcome() {
                    ResponseOutcome::Success { .. } => {
                        responses[index] = Some(response);
                        continue;
                    }
                    ResponseOutcome::Failure(cause) => cause.to_string(),
                },
                Err(e) => e.to_string(),
            };

            join_set.shutdown().await;
            tracing::warn!(url = %request.url, reason = %failure, "static asset fetch failed");
            return Err(Error::InstallFailed { url: request.url.to_string(), reason: failure });
        }

        responses
            .into_iter()
            .zip(requests)
            .map(|(response, request)| {
                response.ok_or_else(|| Error::InstallFailed {
                    url: request.url.to_string(),
                    reason: "fetch did not complete".into(),
                })
            })
            .collect()
    }

    /// Delete stale partitions, then claim open pages.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let names = self.store.keys().await?;
        let mut deleted = Vec::new();
        let mut kept = Vec::new();

        for name in names {
            if self.registry.partitions.is_live(&name) {
                kept.push(name);
                continue;
            }
            if self.store.delete(&name).await? {
                tracing::info!(partition = %name, "deleted stale partition");
            }
            deleted.push(name);
        }

        let claimed = self.host.claim_clients().await?;
        tracing::info!(deleted = deleted.len(), kept = kept.len(), claimed, "activated");

        Ok(ActivateReport { deleted, kept, claimed })
    }
}

async fn rollback(partition: &Partition, added: &[&Request]) {
    for request in added {
        if let Err(e) = partition.remove(request).await {
            tracing::warn!(url = %request.url, error = %e, "rollback failed to remove entry");
        }
    }
}
