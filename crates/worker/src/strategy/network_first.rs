//! Network-first for document navigations.

use std::sync::Arc;

use swcache_core::{CacheStore, Error, Network, Partition, Request};

use super::{Handled, lookup_anywhere, store_copy};

/// Fetch and keep successful documents in `target`; when the fetch fails,
/// fall back to a copy from any partition.
///
/// Only a failed fetch triggers the fallback. An error status is a response
/// and is returned as is.
pub async fn handle(
    request: &Request, store: &dyn CacheStore, target: &Partition, network: &Arc<dyn Network>,
) -> Result<Handled, Error> {
    match network.fetch(request).await {
        Ok(response) => {
            if response.is_ok() {
                store_copy(target, request, &response).await;
            }
            Ok(Handled::network(response))
        }
        Err(e) => match lookup_anywhere(store, request).await {
            Some((partition, cached)) => {
                tracing::info!(url = %request.url, partition = %partition, error = %e, "offline, serving cached copy");
                Ok(Handled::cached(cached, &partition))
            }
            None => {
                tracing::debug!(url = %request.url, error = %e, "offline with no cached copy");
                Err(e)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Source;
    use crate::testing::{StubNetwork, memory_store, text, url};
    use swcache_core::{Response, ResponseKind};

    const GENERIC: &str = "market-dashboard-v1";
    const STATIC: &str = "market-static-v1";

    #[tokio::test]
    async fn test_success_is_stored_and_returned() {
        let stub = Arc::new(StubNetwork::new());
        let network: Arc<dyn Network> = stub.clone();
        let store = memory_store();
        let target = Partition::new(store.clone(), GENERIC);
        let request = Request::navigate(url("/reports"));
        stub.respond(&request.url, 200, "fresh");

        let handled = handle(&request, store.as_ref(), &target, &network).await.unwrap();
        assert_eq!(handled.source, Source::Network);
        assert_eq!(text(&target.lookup(&request).await.unwrap().unwrap()), "fresh");
    }

    #[tokio::test]
    async fn test_always_asks_network_even_when_cached() {
        let stub = Arc::new(StubNetwork::new());
        let network: Arc<dyn Network> = stub.clone();
        let store = memory_store();
        let target = Partition::new(store.clone(), GENERIC);
        let request = Request::navigate(url("/reports"));
        let stale = Response::new(request.url.clone(), 200, "stale", ResponseKind::Basic);
        target.put(&request, stale).await.unwrap();
        stub.respond(&request.url, 200, "fresh");

        let handled = handle(&request, store.as_ref(), &target, &network).await.unwrap();
        assert_eq!(text(&handled.response), "fresh");
        assert_eq!(stub.calls_for(&request.url), 1);
        assert_eq!(text(&target.lookup(&request).await.unwrap().unwrap()), "fresh");
    }

    #[tokio::test]
    async fn test_offline_falls_back_to_any_partition() {
        let stub = Arc::new(StubNetwork::new());
        let network: Arc<dyn Network> = stub.clone();
        let store = memory_store();
        let target = Partition::new(store.clone(), GENERIC);
        let statics = Partition::new(store.clone(), STATIC);
        let request = Request::navigate(url("/market.html"));
        let shell = Response::new(request.url.clone(), 200, "<shell>", ResponseKind::Basic);
        statics.put(&request, shell).await.unwrap();
        stub.fail(&request.url);

        let handled = handle(&request, store.as_ref(), &target, &network).await.unwrap();
        assert_eq!(handled.source, Source::Cache { partition: STATIC.into() });
        assert_eq!(text(&handled.response), "<shell>");
    }

    #[tokio::test]
    async fn test_offline_without_copy_fails() {
        let stub = Arc::new(StubNetwork::new());
        let network: Arc<dyn Network> = stub.clone();
        let store = memory_store();
        let target = Partition::new(store.clone(), GENERIC);
        let request = Request::navigate(url("/"));
        stub.fail(&request.url);

        let result = handle(&request, store.as_ref(), &target, &network).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_error_status_is_returned_without_fallback() {
        let stub = Arc::new(StubNetwork::new());
        let network: Arc<dyn Network> = stub.clone();
        let store = memory_store();
        let target = Partition::new(store.clone(), GENERIC);
        let request = Request::navigate(url("/reports"));
        let cached = Response::new(request.url.clone(), 200, "cached", ResponseKind::Basic);
        target.put(&request, cached).await.unwrap();
        stub.respond(&request.url, 503, "maintenance");

        let handled = handle(&request, store.as_ref(), &target, &network).await.unwrap();
        assert_eq!(handled.response.status, 503);
        assert_eq!(handled.source, Source::Network);
        assert_eq!(text(&target.lookup(&request).await.unwrap().unwrap()), "cached");
    }
}
