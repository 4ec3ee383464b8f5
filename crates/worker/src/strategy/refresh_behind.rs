//! Refresh-behind for data files.
//!
//! A hit is returned at once and a background fetch replaces the entry for
//! the next request. A miss waits for the network; a network failure on a
//! miss reaches the page.

use std::sync::Arc;

use swcache_core::{Error, Network, Partition, Request, ResponseOutcome};

use super::{Handled, lookup_in, store_copy};
use crate::tasks::{BackgroundTask, TaskOutcome};

pub async fn handle(request: &Request, data: &Partition, network: &Arc<dyn Network>) -> Result<Handled, Error> {
    if let Some(cached) = lookup_in(data, request).await {
        tracing::debug!(url = %request.url, partition = data.name(), "data hit, refreshing behind");
        let task = refresh(request.clone(), data.clone(), network.clone());
        return Ok(Handled::cached(cached, data.name()).with_background(task));
    }

    tracing::debug!(url = %request.url, partition = data.name(), "data miss");
    let response = network.fetch(request).await?;
    if response.is_ok() {
        store_copy(data, request, &response).await;
    }

    Ok(Handled::network(response))
}

/// Fetch `request` again and overwrite its entry if the fetch succeeds.
///
/// Every failure becomes a [`TaskOutcome`]; nothing propagates.
pub fn refresh(request: Request, data: Partition, network: Arc<dyn Network>) -> BackgroundTask {
    let label = request.url.to_string();
    let task = label.clone();

    BackgroundTask::new(label, async move {
        let fresh = match network.fetch(&request).await {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "background refresh failed");
                return TaskOutcome::Failed { task, reason: e.to_string() };
            }
        };

        match fresh.outcome() {
            ResponseOutcome::Success { .. } => match data.put(&request, fresh).await {
                Ok(()) => {
                    tracing::debug!(url = %request.url, partition = data.name(), "background refresh stored");
                    TaskOutcome::Refreshed { task }
                }
                Err(e) => {
                    tracing::debug!(url = %request.url, error = %e, "background refresh not stored");
                    TaskOutcome::Failed { task, reason: e.to_string() }
                }
            },
            ResponseOutcome::Failure(cause) => {
                tracing::debug!(url = %request.url, %cause, "background refresh skipped");
                TaskOutcome::Skipped { task, reason: cause.to_string() }
            }
        }
    })
}
