//! HTTP fetch pipeline implementing the network capability.
//!
//! ### Response handling
//! - Any status the server returns is a response, including 4xx/5xx; the
//!   caching strategies decide what to do with it
//! - Only transport failures (connect, DNS, timeout, body read) are errors
//! - Max redirects: 5
//! - Max body bytes: 10MB (configurable)
//!
//! ### Response kind
//! Decided on the final URL after redirects.
//! - Same origin as the dashboard: `basic`
//! - Cross-origin in no-cors mode: `opaque`
//! - Any other cross-origin request: `cors`

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method};
use url::Url;

use swcache_core::{AppConfig, Error, Network, Request, Response, ResponseKind};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Origin the dashboard is served from
    pub origin: Url,

    /// User agent string (default: "market-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl FetchConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            user_agent: "market-sw/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }

    /// Build from the loaded application configuration.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Self::new(origin)
        })
    }
}

/// HTTP client behind the [`Network`] capability.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn too_large(&self, len: usize) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Network(format!("timeout fetching {}: {}", request.url, e))
            } else {
                Error::Network(format!("network error fetching {}: {}", request.url, e))
            }
        })?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(self.too_large(bytes.len()));
        }

        let kind = ResponseKind::for_response(request, &final_url, &self.config.origin);
        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            url = %request.url,
            final_url = %final_url,
            status = status.as_u16(),
            kind = kind.as_str(),
            bytes = bytes.len(),
            fetch_ms,
            "fetched"
        );

        let mut out = Response::new(final_url, status.as_u16(), bytes, kind);
        out.headers = headers;
        Ok(out)
    }
}
