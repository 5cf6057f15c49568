//! Listing pages: paginated indexes of posting links.

use std::collections::HashSet;

use scraper::Html;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{CrawlError, Crawler, compile_selector};
use crate::config::SiteProfile;

/// Query parameters that only track the click and never identify a page.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid"];

impl Crawler {
    /// Fetches one listing page (1-based) and returns the posting URLs on it.
    ///
    /// Waits the listing delay first. A fetch or parse failure yields an empty
    /// list so later pages are still crawled.
    #[instrument(skip(self), fields(section = %section))]
    pub async fn crawl_listing_page(&self, section: &str, page: u32) -> Vec<String> {
        let url = self.config.site.listing_url(section, page);
        self.pacer.wait(&url, self.config.pacing.listing_delay).await;

        let html = match self.client.fetch_page(&url).await {
            Ok(html) => html,
            Err(error) => {
                warn!(url = %url, error = %error, "listing page unavailable");
                return Vec::new();
            }
        };

        match parse_listing(&html, &url, &self.config.site) {
            Ok(urls) => {
                info!(url = %url, postings = urls.len(), "listing page parsed");
                urls
            }
            Err(error) => {
                warn!(url = %url, error = %error, "listing page not parsed");
                Vec::new()
            }
        }
    }
}

/// Extracts posting URLs from listing HTML, in page order.
///
/// Links are resolved against `page_url`, canonicalized and deduplicated.
/// Entries whose URL contains the profile's excluded fragment (events) are
/// dropped.
///
/// # Errors
///
/// Returns [`CrawlError::Selector`] when a configured selector is invalid.
pub fn parse_listing(
    html: &str,
    page_url: &str,
    profile: &SiteProfile,
) -> Result<Vec<String>, CrawlError> {
    let item_selector = compile_selector(&profile.listing_item_selector)?;
    let link_selector = compile_selector(&profile.listing_link_selector)?;
    let base = Url::parse(page_url).map_err(|_| super::FetchError::invalid_url(page_url))?;

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for item in document.select(&item_selector) {
        let Some(href) = item
            .select(&link_selector)
            .next()
            .and_then(|link| link.value().attr("href"))
        else {
            continue;
        };
        let Some(url) = canonicalize_url(&base, href) else {
            debug!(href, "unresolvable posting link");
            continue;
        };
        if url.contains(&profile.excluded_path_fragment) {
            continue;
        }
        if seen.insert(url.clone()) {
            urls.push(url);
        }
    }
    Ok(urls)
}

/// Resolves `href` against `base` and strips the fragment and tracking
/// parameters (`utm_*`, `fbclid`, `gclid`).
#[must_use]
pub fn canonicalize_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| {
                !key.starts_with("utm_") && !TRACKING_PARAMS.iter().any(|p| key == p)
            })
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }
    Some(url.into())
}
