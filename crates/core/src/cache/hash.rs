//! Request identity: the lookup key of an entry within a partition.

use sha2::{Digest, Sha256};
use url::Url;

use crate::http::Request;

/// Compute the request identity for a method and fragment-free URL.
pub fn compute_request_key(method: &str, url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// Request identity of an intercepted request.
pub fn request_key(request: &Request) -> String {
    compute_request_key(&request.method, &request.url)
}
