//! Newline-delimited JSON protocol spoken by the `market-sw` harness.
//!
//! Each input line is one [`HostEvent`]; each produces exactly one
//! [`EventReply`] line.

use serde::{Deserialize, Serialize};
use swcache_core::location;
use swcache_core::{Destination, Error, Request, RequestMode, ResponseKind};
use url::Url;

use crate::lifecycle::{ActivateReport, InstallReport};
use crate::router::RequestClass;
use crate::strategy::Source;
use crate::tasks::TaskOutcome;
use crate::worker::{PartitionSummary, ServiceWorker};

/// An event delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum HostEvent {
    Install,
    Activate,
    Fetch(FetchParams),
    Partitions,
}

/// Input parameters for a `fetch` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FetchParams {
    /// Absolute URL, or a path resolved against the dashboard origin.
    pub url: String,

    /// Request destination (default: "empty").
    #[serde(default)]
    pub destination: Destination,

    /// Request mode; derived from the destination when absent.
    #[serde(default)]
    pub mode: Option<RequestMode>,

    /// HTTP method (default: "GET").
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Navigations use `navigate`, `fetch()` calls `cors`, subresources `no-cors`.
fn default_mode(destination: Destination) -> RequestMode {
    match destination {
        Destination::Document => RequestMode::Navigate,
        Destination::Empty => RequestMode::Cors,
        _ => RequestMode::NoCors,
    }
}

impl FetchParams {
    /// The request this event describes, resolved against `origin`.
    pub fn to_request(&self, origin: &Url) -> Result<Request, Error> {
        let url = location::resolve(&self.url, origin)?;
        let mode = self.mode.unwrap_or_else(|| default_mode(self.destination));
        Ok(Request::new(&self.method, url, self.destination, mode))
    }
}

/// The reply written for one event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reply", rename_all = "lowercase")]
pub enum EventReply {
    Installed(InstallReport),
    Activated(ActivateReport),
    Response {
        url: Url,
        class: RequestClass,
        source: Source,
        status: u16,
        kind: ResponseKind,
        bytes: usize,
    },
    Partitions {
        partitions: Vec<PartitionSummary>,
    },
    Idle {
        outcomes: Vec<TaskOutcome>,
    },
    Error {
        code: &'static str,
        message: String,
    },
}

impl From<Error> for EventReply {
    fn from(err: Error) -> Self {
        EventReply::Error { code: err.code(), message: err.to_string() }
    }
}

/// Parse one input line.
pub fn parse(line: &str) -> Result<HostEvent, Error> {
    serde_json::from_str(line).map_err(|e| Error::InvalidInput(format!("bad event: {e}")))
}

/// Run `event` against `worker`. Failures become [`EventReply::Error`].
pub async fn dispatch(worker: &ServiceWorker, event: HostEvent) -> EventReply {
    let result = match event {
        HostEvent::Install => worker.install().await.map(EventReply::Installed),
        HostEvent::Activate => worker.activate().await.map(EventReply::Activated),
        HostEvent::Partitions => worker.partitions().await.map(|partitions| EventReply::Partitions { partitions }),
        HostEvent::Fetch(params) => fetch(worker, &params).await,
    };
    result.unwrap_or_else(EventReply::from)
}

async fn fetch(worker: &ServiceWorker, params: &FetchParams) -> Result<EventReply, Error> {
    let request = params.to_request(worker.origin())?;
    let served = worker.intercept(&request).await?;

    Ok(EventReply::Response {
        url: request.url,
        class: served.class,
        source: served.source,
        status: served.response.status,
        kind: served.response.kind,
        bytes: served.response.body.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::LocalHost;
    use crate::testing::{StubNetwork, memory_store, origin, url};
    use serde_json::json;
    use std::sync::Arc;
    use swcache_core::PartitionRegistry;

    #[test]
    fn test_parse_events() {
        assert_eq!(parse(r#"{"event":"install"}"#).unwrap(), HostEvent::Install);
        assert_eq!(parse(r#"{"event":"partitions"}"#).unwrap(), HostEvent::Partitions);

        let HostEvent::Fetch(params) = parse(r#"{"event":"fetch","url":"/data/q1.csv"}"#).unwrap() else {
            panic!("expected fetch");
        };
        assert_eq!(params.method, "GET");
        assert_eq!(params.destination, Destination::Empty);
        assert_eq!(params.mode, None);
    }

    #[test]
    fn test_parse_rejects_unknown_event() {
        let err = parse(r#"{"event":"sync"}"#).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert!(parse("not json").is_err());
    }

    #[test]
    fn test_fetch_params_default_modes() {
        let params = |destination| FetchParams {
            url: "/market.html".into(),
            destination,
            mode: None,
            method: "GET".into(),
        };

        let navigation = params(Destination::Document).to_request(&origin()).unwrap();
        assert_eq!(navigation.mode, RequestMode::Navigate);
        assert_eq!(navigation.url, url("/market.html"));

        assert_eq!(params(Destination::Empty).to_request(&origin()).unwrap().mode, RequestMode::Cors);
        assert_eq!(params(Destination::Script).to_request(&origin()).unwrap().mode, RequestMode::NoCors);
    }

    #[test]
    fn test_fetch_params_explicit_mode_and_absolute_url() {
        let params = FetchParams {
            url: "https://cdn.jsdelivr.net/npm/chart.js#v4".into(),
            destination: Destination::Script,
            mode: Some(RequestMode::Cors),
            method: "get".into(),
        };
        let request = params.to_request(&origin()).unwrap();
        assert_eq!(request.url.as_str(), "https://cdn.jsdelivr.net/npm/chart.js");
        assert_eq!(request.mode, RequestMode::Cors);
        assert_eq!(request.method, "GET");
    }

    #[test]
    fn test_error_reply_shape() {
        let reply = EventReply::from(Error::Network("offline".into()));
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value, json!({"reply": "error", "code": "NETWORK_ERROR", "message": "NETWORK_ERROR: offline"}));
    }

    #[tokio::test]
    async fn test_dispatch_fetch_reports_source() {
        let stub = Arc::new(StubNetwork::new());
        stub.respond(&url("/market.html"), 200, "<html>");
        let worker =
            ServiceWorker::new(PartitionRegistry::default(), origin(), memory_store(), stub, Arc::new(LocalHost::new()));

        let event = parse(r#"{"event":"fetch","url":"/market.html","destination":"document"}"#).unwrap();
        let reply = serde_json::to_value(dispatch(&worker, event.clone()).await).unwrap();
        assert_eq!(reply["reply"], "response");
        assert_eq!(reply["class"], "static-asset");
        assert_eq!(reply["source"], json!({"from": "network"}));
        assert_eq!(reply["status"], 200);
        assert_eq!(reply["kind"], "basic");
        assert_eq!(reply["bytes"], 6);

        let again = serde_json::to_value(dispatch(&worker, event).await).unwrap();
        assert_eq!(again["source"], json!({"from": "cache", "partition": "market-static-v1.1.0"}));
    }

    #[tokio::test]
    async fn test_dispatch_failure_becomes_error_reply() {
        let stub = Arc::new(StubNetwork::new());
        let worker =
            ServiceWorker::new(PartitionRegistry::default(), origin(), memory_store(), stub, Arc::new(LocalHost::new()));

        let reply = dispatch(&worker, HostEvent::Activate).await;
        assert!(matches!(reply, EventReply::Error { code: "INVALID_INPUT", .. }));

        let event = parse(r#"{"event":"fetch","url":"/reports","destination":"document"}"#).unwrap();
        let reply = dispatch(&worker, event).await;
        assert!(matches!(reply, EventReply::Error { code: "NETWORK_ERROR", .. }));
    }
}
