//! URL resolution against the dashboard origin.
//!
//! The Static Asset List mixes root-relative paths with absolute CDN URLs;
//! both are turned into absolute, fragment-free URLs before use as requests.

use url::{ParseError, Url};

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for crate::Error {
    fn from(err: UrlError) -> Self {
        crate::Error::InvalidUrl(err.to_string())
    }
}

/// Parse an origin setting such as `http://localhost:8000`.
pub fn parse_origin(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    check_scheme(&parsed)?;
    if parsed.host_str().is_none() {
        return Err(UrlError::InvalidUrl(format!("origin has no host: {trimmed}")));
    }

    Ok(parsed)
}

/// Resolve `input` against `origin`.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Absolute URLs are kept; relative references are joined onto the origin
/// 3. Host is lowercased by the parser
/// 4. Fragment (#...) is removed
/// 5. Query string is kept intact
pub fn resolve(input: &str, origin: &Url) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = match Url::parse(trimmed) {
        Err(ParseError::RelativeUrlWithoutBase) => origin.join(trimmed),
        parsed => parsed,
    }
    .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    check_scheme(&parsed)?;
    parsed.set_fragment(None);

    Ok(parsed)
}

fn check_scheme(url: &Url) -> Result<(), UrlError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
}
