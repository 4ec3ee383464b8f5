//! Request and response value types shared by the store, the network, and the policy.
//!
//! Response bodies are [`Bytes`]: cloning a [`Response`] yields an independent
//! handle to the same immutable data, so one copy can be handed to the page
//! while another is written to a partition.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// What the request is for, as reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// `fetch()`/XHR and anything without a more specific destination.
    #[default]
    Empty,
    /// Top-level HTML navigation.
    Document,
    Iframe,
    Script,
    Style,
    Image,
    Font,
    Manifest,
    Worker,
    #[serde(other)]
    Other,
}

/// Request mode; decides how a cross-origin response is exposed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    #[default]
    Cors,
    NoCors,
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Absolute URL with the fragment removed.
    pub url: Url,
    pub destination: Destination,
    pub mode: RequestMode,
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// A plain `GET` as issued by `fetch()` from the page.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url, Destination::Empty, RequestMode::Cors)
    }

    /// A top-level document navigation.
    pub fn navigate(url: Url) -> Self {
        Self::new("GET", url, Destination::Document, RequestMode::Navigate)
    }

    /// A subresource load (script, stylesheet, image...) issued in no-cors mode.
    pub fn subresource(url: Url, destination: Destination) -> Self {
        Self::new("GET", url, destination, RequestMode::NoCors)
    }

    pub fn new(method: &str, mut url: Url, destination: Destination, mode: RequestMode) -> Self {
        url.set_fragment(None);
        Self { method: method.to_ascii_uppercase(), url, destination, mode, headers: Vec::new() }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_ascii_uppercase();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Whether the request targets the same origin as `origin`.
    pub fn is_same_origin(&self, origin: &Url) -> bool {
        self.url.origin() == origin.origin()
    }
}

/// How much of a response the caching layer may inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same-origin; status and body are inspectable.
    Basic,
    /// Cross-origin fetched in CORS mode; inspectable.
    Cors,
    /// Cross-origin fetched in no-cors mode; status is hidden.
    Opaque,
}

impl ResponseKind {
    /// The kind a response to `request` takes when the page lives at `origin`.
    pub fn for_request(request: &Request, origin: &Url) -> Self {
        Self::for_response(request, &request.url, origin)
    }

    /// The kind of a response to `request` that was finally served from `final_url`.
    ///
    /// A response is `Basic` only when neither the request nor any redirect
    /// target left `origin`.
    pub fn for_response(request: &Request, final_url: &Url, origin: &Url) -> Self {
        if request.is_same_origin(origin) && final_url.origin() == origin.origin() {
            ResponseKind::Basic
        } else if request.mode == RequestMode::NoCors {
            ResponseKind::Opaque
        } else {
            ResponseKind::Cors
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Cors => "cors",
            ResponseKind::Opaque => "opaque",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(ResponseKind::Basic),
            "cors" => Some(ResponseKind::Cors),
            "opaque" => Some(ResponseKind::Opaque),
            _ => None,
        }
    }
}

/// Why a received response does not count as a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// Non-2xx status.
    Status(u16),
    /// Opaque responses never expose their status.
    Opaque,
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureCause::Status(status) => write!(f, "status {status}"),
            FailureCause::Opaque => f.write_str("opaque response"),
        }
    }
}

/// Explicit classification of a received response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    Success { status: u16, kind: ResponseKind },
    Failure(FailureCause),
}

impl ResponseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseOutcome::Success { .. })
    }

    /// Success on a same-origin ("basic") response.
    pub fn is_basic_success(&self) -> bool {
        matches!(self, ResponseOutcome::Success { kind: ResponseKind::Basic, .. })
    }
}

/// A network response or a snapshot of one read back from a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: Url,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub kind: ResponseKind,
}

impl Response {
    pub fn new(url: Url, status: u16, body: impl Into<Bytes>, kind: ResponseKind) -> Self {
        Self { url, status, headers: Vec::new(), body: body.into(), kind }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup; first value wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn outcome(&self) -> ResponseOutcome {
        match self.kind {
            ResponseKind::Opaque => ResponseOutcome::Failure(FailureCause::Opaque),
            kind if (200..300).contains(&self.status) => ResponseOutcome::Success { status: self.status, kind },
            _ => ResponseOutcome::Failure(FailureCause::Status(self.status)),
        }
    }

    /// 2xx and inspectable.
    pub fn is_ok(&self) -> bool {
        self.outcome().is_success()
    }
}
