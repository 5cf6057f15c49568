//! Immutable run configuration passed into every component.
//!
//! [`HarvestConfig`] is built once (defaults, then an optional config file,
//! then CLI overrides) and shared read-only by the HTTP client, the crawlers,
//! the attachment fetcher and the document extractors.

mod file;

pub use file::{FileConfig, LoadedConfig, load_config_file, parse_config_str, resolve_default_config_path};

use std::time::Duration;

use crate::posting::AttachmentKind;

/// Default base URL of the listings website.
pub const DEFAULT_BASE_URL: &str = "https://tanmia.ma";

/// Listing section for calls for tenders.
pub const SECTION_TENDERS: &str = "appels-doffres";

/// Listing section for job offers.
pub const SECTION_JOBS: &str = "offres-demploi";

/// Maximum number of listing pages a single run may request.
pub const MAX_PAGES: u32 = 50;

/// Default number of postings processed at once.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Upper bound for posting-level concurrency.
pub const MAX_CONCURRENCY: usize = 8;

/// Complete configuration for one harvesting run.
#[derive(Debug, Clone, Default)]
pub struct HarvestConfig {
    /// Site layout and selectors.
    pub site: SiteProfile,
    /// HTTP timeouts.
    pub http: HttpSettings,
    /// Size and length caps for downloads and extracted text.
    pub limits: ExtractionLimits,
    /// Politeness delays.
    pub pacing: PacingSettings,
    /// Number of postings processed concurrently (1 = strictly sequential).
    pub concurrency: usize,
}

impl HarvestConfig {
    /// Returns the configuration with an overridden concurrency, clamped to the supported range.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(DEFAULT_CONCURRENCY, MAX_CONCURRENCY);
        self
    }

    /// Effective concurrency (never zero).
    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(DEFAULT_CONCURRENCY, MAX_CONCURRENCY)
    }
}

/// Markup conventions of the listings website.
///
/// Every selector list is an ordered strategy list: the first selector that
/// yields a usable value wins.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    /// Scheme and host of the site, without trailing slash.
    pub base_url: String,
    /// Container of one posting on a listing page.
    pub listing_item_selector: String,
    /// Link to the detail page inside a listing item.
    pub listing_link_selector: String,
    /// Path fragment marking event entries, which are not postings.
    pub excluded_path_fragment: String,
    /// Candidate selectors for the posting title.
    pub title_selectors: Vec<String>,
    /// Candidate selectors for the publication date.
    pub date_selectors: Vec<String>,
    /// Candidate selectors for the main content zone.
    pub content_selectors: Vec<String>,
    /// Sub-elements removed from the content zone before text extraction.
    pub boilerplate_selectors: Vec<String>,
    /// Structural selectors for attachment links, tried before the extension selectors.
    pub attachment_selectors: Vec<String>,
    /// Recognized attachment kinds in classification priority order.
    pub attachment_kinds: Vec<AttachmentKind>,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            listing_item_selector: "article.elementor-post".to_string(),
            listing_link_selector: "h3.elementor-post__title a".to_string(),
            excluded_path_fragment: "/evenement/".to_string(),
            title_selectors: to_strings(&["h1.elementor-heading-title", "h1.entry-title", "h1"]),
            date_selectors: to_strings(&[
                "time",
                "span.elementor-post-info__item--type-date",
                ".elementor-post-date",
                ".entry-date",
            ]),
            content_selectors: to_strings(&[
                "div.elementor-widget-theme-post-content",
                "article.elementor-post",
                "div.entry-content",
                "main",
            ]),
            boilerplate_selectors: to_strings(&[
                "nav",
                "header",
                "footer",
                "aside",
                "script",
                "style",
                "iframe",
                "noscript",
                ".breadcrumbs",
                ".share-buttons",
                ".post-navigation",
                "ul.post-attachments",
                ".wp-block-file",
                ".elementor-widget-shortcode",
                ".elementor-social-icons-wrapper",
            ]),
            attachment_selectors: to_strings(&[
                "ul.post-attachments a",
                "ul.wp-block-file a",
                "div.wp-block-file a",
                "a.attachment-link",
                "a.wp-block-file__button",
                "div.elementor-widget-attachment a",
                "div.elementor-widget-icon-list a",
                "a.download-link",
                "a[download]",
            ]),
            attachment_kinds: AttachmentKind::KNOWN.to_vec(),
        }
    }
}

impl SiteProfile {
    /// Returns a profile pointing at another host (used for mirrors and tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Builds the URL of one listing page (1-based).
    ///
    /// Page 1 is the section root; later pages append the page number.
    #[must_use]
    pub fn listing_url(&self, section: &str, page: u32) -> String {
        let section = section.trim_matches('/');
        if page <= 1 {
            format!("{}/{section}/", self.base_url)
        } else {
            format!("{}/{section}/{page}/", self.base_url)
        }
    }
}

/// HTTP timeouts.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout for HTML pages.
    pub page_timeout: Duration,
    /// Whole-request timeout for attachment downloads.
    pub attachment_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            page_timeout: Duration::from_secs(30),
            attachment_timeout: Duration::from_secs(60),
        }
    }
}

/// Size and length caps.
#[derive(Debug, Clone)]
pub struct ExtractionLimits {
    /// Hard cap on attachment body size in bytes.
    pub max_attachment_bytes: u64,
    /// Cap on the inflated size of a DOCX main part.
    pub max_docx_xml_bytes: u64,
    /// Maximum number of PDF pages read.
    pub pdf_page_cap: usize,
    /// Cap on text kept per extracted document.
    pub document_text_cap: usize,
    /// Cap on detail page text.
    pub page_text_cap: usize,
    /// Cap on each attachment section in the merged payload.
    pub merged_attachment_cap: usize,
    /// Cap on the whole merged payload.
    pub merged_total_cap: usize,
    /// Length of the page excerpt used in fallback summaries.
    pub fallback_summary_chars: usize,
    /// External program converting legacy `.doc` files to text.
    pub legacy_converter: String,
    /// Time allowed for the legacy converter.
    pub converter_timeout: Duration,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self {
            max_attachment_bytes: 10 * 1024 * 1024,
            max_docx_xml_bytes: 8 * 10 * 1024 * 1024,
            pdf_page_cap: 20,
            document_text_cap: 5_000,
            page_text_cap: 12_000,
            merged_attachment_cap: 4_000,
            merged_total_cap: 12_000,
            fallback_summary_chars: 200,
            legacy_converter: "antiword".to_string(),
            converter_timeout: Duration::from_secs(30),
        }
    }
}

/// Inclusive range a random delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    /// Shortest delay.
    pub min: Duration,
    /// Longest delay.
    pub max: Duration,
}

impl DelayRange {
    /// Creates a range, swapping bounds given in the wrong order.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// A range that never waits.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Whether this range never waits.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.max.is_zero()
    }
}

/// Politeness delays applied before fetches.
#[derive(Debug, Clone, Copy)]
pub struct PacingSettings {
    /// Delay before each listing page fetch.
    pub listing_delay: DelayRange,
    /// Delay before each detail page fetch.
    pub detail_delay: DelayRange,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            listing_delay: DelayRange::new(Duration::from_secs(2), Duration::from_secs(4)),
            detail_delay: DelayRange::new(Duration::from_secs(1), Duration::from_secs(3)),
        }
    }
}

impl PacingSettings {
    /// Pacing without any delay.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            listing_delay: DelayRange::zero(),
            detail_delay: DelayRange::zero(),
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}
