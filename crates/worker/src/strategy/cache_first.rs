//! Cache-first for static assets and everything unclassified.

use std::sync::Arc;

use swcache_core::{CacheStore, Error, Network, Partition, Request};

use super::{Handled, lookup_anywhere, store_copy};

/// Serve any cached copy; otherwise fetch and keep same-origin successes in `target`.
///
/// The lookup spans every partition. Network failures propagate.
pub async fn handle(
    request: &Request, store: &dyn CacheStore, target: &Partition, network: &Arc<dyn Network>,
) -> Result<Handled, Error> {
    if let Some((partition, cached)) = lookup_anywhere(store, request).await {
        tracing::debug!(url = %request.url, partition = %partition, "cache hit");
        return Ok(Handled::cached(cached, &partition));
    }

    let response = network.fetch(request).await?;
    let outcome = response.outcome();
    if outcome.is_basic_success() {
        store_copy(target, request, &response).await;
    } else {
        tracing::debug!(url = %request.url, ?outcome, "response not cached");
    }

    Ok(Handled::network(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Source;
    use crate::testing::{StubNetwork, memory_store, text, url};
    use swcache_core::{Destination, RequestMode, Response, ResponseKind};

    const STATIC: &str = "market-static-v1";
    const GENERIC: &str = "market-dashboard-v1";

    #[tokio::test]
    async fn test_miss_fetches_and_stores_then_hit_skips_network() {
        let stub = Arc::new(StubNetwork::new());
        let network: Arc<dyn Network> = stub.clone();
        let store = memory_store();
        let target = Partition::new(store.clone(), STATIC);
        let request = Request::navigate(url("/market.html"));
        stub.respond(&request.url, 200, "<html>");

        let first = handle(&request, store.as_ref(), &target, &network).await.unwrap();
        assert_eq!(first.source, Source::Network);
        assert_eq!(text(&first.response), "<html>");
        assert!(target.lookup(&request).await.unwrap().is_some());

        let second = handle(&request, store.as_ref(), &target, &network).await.unwrap();
        assert_eq!(second.source, Source::Cache { partition: STATIC.into() });
        assert_eq!(stub.calls_for(&request.url), 1);
    }

    #[tokio::test]
    async fn test_hit_in_other_partition_is_served() {
        let stub = Arc::new(StubNetwork::new());
        let network: Arc<dyn Network> = stub.clone();
        let store = memory_store();
        let target = Partition::new(store.clone(), STATIC);
        let generic = Partition::new(store.clone(), GENERIC);
        let request = Request::get(url("/styles.css"));
        let seeded = Response::new(request.url.clone(), 200, "body {}", ResponseKind::Basic);
        generic.put(&request, seeded).await.unwrap();

        let handled = handle(&request, store.as_ref(), &target, &network).await.unwrap();
        assert_eq!(handled.source, Source::Cache { partition: GENERIC.into() });
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_opaque_response_returned_not_stored() {
        let stub = Arc::new(StubNetwork::new());
        let network: Arc<dyn Network> = stub.clone();
        let store = memory_store();
        let target = Partition::new(store.clone(), STATIC);
        let cdn = url("https://cdn.jsdelivr.net/npm/chart.js");
        let request = Request::new("GET", cdn, Destination::Script, RequestMode::NoCors);
        stub.respond(&request.url, 200, "chart");

        let handled = handle(&request, store.as_ref(), &target, &network).await.unwrap();
        assert_eq!(handled.response.kind, ResponseKind::Opaque);
        assert!(target.lookup(&request).await.unwrap().is_none());

        handle(&request, store.as_ref(), &target, &network).await.unwrap();
        assert_eq!(stub.calls_for(&request.url), 2);
    }

    #[tokio::test]
    async fn test_cors_success_not_stored() {
        let stub = Arc::new(StubNetwork::new());
        let network: Arc<dyn Network> = stub.clone();
        let store = memory_store();
        let target = Partition::new(store.clone(), GENERIC);
        let request = Request::get(url("https://api.example.com/quote"));
        stub.respond(&request.url, 200, "{}");

        let handled = handle(&request, store.as_ref(), &target, &network).await.unwrap();
        assert_eq!(handled.response.kind, ResponseKind::Cors);
        assert!(target.lookup(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_error_status_returned_not_stored() {
        let stub = Arc::new(StubNetwork::new());
        let network: Arc<dyn Network> = stub.clone();
        let store = memory_store();
        let target = Partition::new(store.clone(), GENERIC);
        let request = Request::get(url("/favicon.ico"));
        stub.respond(&request.url, 404, "");

        let handled = handle(&request, store.as_ref(), &target, &network).await.unwrap();
        assert_eq!(handled.response.status, 404);
        assert!(target.lookup(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_network_failure_propagates() {
        let stub = Arc::new(StubNetwork::new());
        let network: Arc<dyn Network> = stub.clone();
        let store = memory_store();
        let target = Partition::new(store.clone(), STATIC);
        let request = Request::get(url("/app.js"));

        let result = handle(&request, store.as_ref(), &target, &network).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_non_get_response_returned_not_stored() {
        let stub = Arc::new(StubNetwork::new());
        let network: Arc<dyn Network> = stub.clone();
        let store = memory_store();
        let target = Partition::new(store.clone(), GENERIC);
        let request = Request::get(url("/api/submit")).with_method("POST");
        stub.respond(&request.url, 200, "ok");

        let handled = handle(&request, store.as_ref(), &target, &network).await.unwrap();
        assert_eq!(text(&handled.response), "ok");
        assert!(target.requests().await.unwrap().is_empty());
    }
}
