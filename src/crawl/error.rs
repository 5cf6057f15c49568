//! Error types for the crawl module.
//!
//! Every variant carries the URL being fetched so a degraded result can be
//! logged with enough context to trace it back to one page or attachment.

use thiserror::Error;

/// Errors from one HTTP fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// Non-2xx response.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    /// The URL is malformed or not absolute.
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// The body exceeds the configured size cap.
    #[error("{url} exceeds the {limit_bytes} byte cap (declared or received {actual_bytes} bytes)")]
    TooLarge {
        url: String,
        limit_bytes: u64,
        actual_bytes: u64,
    },

    /// Reading the response body failed.
    #[error("error reading body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Build {
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Classifies a reqwest error as a timeout or a network error.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Classifies a body read error, keeping timeouts distinct.
    pub fn body(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Body {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a size cap error.
    pub fn too_large(url: impl Into<String>, limit_bytes: u64, actual_bytes: u64) -> Self {
        Self::TooLarge {
            url: url.into(),
            limit_bytes,
            actual_bytes,
        }
    }
}

/// Failure signal for one detail page.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The page could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A configured CSS selector does not parse.
    #[error("invalid CSS selector '{selector}'")]
    Selector { selector: String },
}

impl CrawlError {
    /// Creates an invalid selector error.
    pub fn selector(selector: impl Into<String>) -> Self {
        Self::Selector {
            selector: selector.into(),
        }
    }
}
