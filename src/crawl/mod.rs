//! Website crawling: listing pages, detail pages and their attachments.
//!
//! HTML parsing is synchronous and always completes before the next await
//! point (`scraper::Html` is not `Send`), so every parser here is a pure
//! function over a string and the async methods on [`Crawler`] only
//! orchestrate fetches around them.

pub mod attachments;
pub mod detail;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod listing;
pub mod pacing;

use std::sync::Arc;

use scraper::Selector;

pub use attachments::discover_attachments;
pub use detail::{ParsedDetail, parse_detail};
pub use error::{CrawlError, FetchError};
pub use fetcher::fetch_attachment;
pub use http::HttpClient;
pub use listing::{canonicalize_url, parse_listing};
pub use pacing::Pacer;

use crate::config::HarvestConfig;

/// Fetches and parses pages of one site for one run.
///
/// Cheap to clone; clones share the HTTP connection pool and the pacer.
#[derive(Debug, Clone)]
pub struct Crawler {
    client: HttpClient,
    pacer: Arc<Pacer>,
    config: Arc<HarvestConfig>,
}

impl Crawler {
    /// Creates a crawler with its own HTTP client and pacer.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Build`] when the HTTP client cannot be built.
    pub fn new(config: Arc<HarvestConfig>) -> Result<Self, FetchError> {
        let client = HttpClient::new(config.http.clone())?;
        Ok(Self::with_client(client, Arc::new(Pacer::new()), config))
    }

    /// Creates a crawler over an existing client and pacer.
    #[must_use]
    pub fn with_client(client: HttpClient, pacer: Arc<Pacer>, config: Arc<HarvestConfig>) -> Self {
        Self {
            client,
            pacer,
            config,
        }
    }

    /// Run configuration.
    #[must_use]
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Shared HTTP client.
    #[must_use]
    pub fn client(&self) -> &HttpClient {
        &self.client
    }
}

/// Parses one configured CSS selector.
pub(crate) fn compile_selector(selector: &str) -> Result<Selector, CrawlError> {
    Selector::parse(selector).map_err(|_| CrawlError::selector(selector))
}

/// Parses a list of selectors, skipping (and logging) invalid entries.
pub(crate) fn compile_selectors(selectors: &[String]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|s| match compile_selector(s) {
            Ok(selector) => Some(selector),
            Err(error) => {
                tracing::warn!(error = %error, "ignoring selector");
                None
            }
        })
        .collect()
}
