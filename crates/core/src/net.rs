//! The network capability used by the caching strategies.

use async_trait::async_trait;

use crate::Error;
use crate::http::{Request, Response};

/// Issues a request over the network.
///
/// Resolves with any response the server produced, including non-2xx ones;
/// `Err` means no response arrived at all (offline, DNS, connect, timeout).
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}
