//! Run driver: listing pages, then every discovered posting through detail
//! crawl, payload merge, model analysis and consolidation.
//!
//! Postings go through a bounded ordered stream. With the default
//! concurrency of 1 the run is strictly sequential in discovery order; higher
//! values overlap whole postings while the shared [`Pacer`](crate::crawl::Pacer)
//! keeps requests to one host spaced out. A posting's attachments are always
//! fetched before its emails are consolidated, and a failed posting never
//! affects its siblings.

use std::collections::HashSet;
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use crate::analysis::{AnalysisModel, consolidate, merge_content, request_analysis};
use crate::config::{HarvestConfig, MAX_PAGES};
use crate::crawl::{CrawlError, Crawler, FetchError};
use crate::posting::HarvestedPosting;
use crate::report::RunStats;

/// Share of the progress range spent on listing pages.
const LISTING_SHARE: f64 = 0.3;

/// Receives advisory progress. Never influences the run.
pub trait ProgressObserver: Send + Sync {
    /// `fraction` is in `0.0..=1.0`.
    fn on_progress(&self, fraction: f64, status: &str);
}

/// Observer that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _fraction: f64, _status: &str) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(f64, &str) + Send + Sync,
{
    fn on_progress(&self, fraction: f64, status: &str) {
        self(fraction, status);
    }
}

/// Cooperative run-level abort.
///
/// Once set, no new listing or detail fetch is issued. Work already in flight
/// finishes on its own timeouts.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What to harvest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub section: String,
    /// Listing pages to crawl, `1..=MAX_PAGES`.
    pub pages: u32,
    /// Download and extract attachments.
    pub parse_attachments: bool,
}

impl RunRequest {
    /// Creates a request, clamping `pages` to the supported range.
    #[must_use]
    pub fn new(section: impl Into<String>, pages: u32, parse_attachments: bool) -> Self {
        Self {
            section: section.into(),
            pages: pages.clamp(1, MAX_PAGES),
            parse_attachments,
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Harvested postings in discovery order.
    pub postings: Vec<HarvestedPosting>,
    pub stats: RunStats,
    /// The run stopped early on request.
    pub cancelled: bool,
}

enum PostingOutcome {
    Harvested(Box<HarvestedPosting>),
    Failed,
    NotStarted,
}

/// Drives harvesting runs for one configuration.
pub struct Harvester {
    crawler: Crawler,
    model: Option<Arc<dyn AnalysisModel>>,
    cancel: CancelHandle,
}

impl Harvester {
    /// Creates a harvester with its own HTTP client. No model is attached,
    /// so every posting gets the fallback analysis until one is set.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Build`] when the HTTP client cannot be built.
    pub fn new(config: HarvestConfig) -> Result<Self, FetchError> {
        Ok(Self::with_crawler(Crawler::new(Arc::new(config))?))
    }

    /// Creates a harvester over an existing crawler.
    #[must_use]
    pub fn with_crawler(crawler: Crawler) -> Self {
        Self {
            crawler,
            model: None,
            cancel: CancelHandle::default(),
        }
    }

    /// Attaches the analysis model.
    #[must_use]
    pub fn with_model(mut self, model: Arc<dyn AnalysisModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Handle that cancels runs of this harvester.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Runs listing discovery then the per-posting stages.
    #[instrument(skip(self, observer), fields(section = %request.section, pages = request.pages))]
    pub async fn run(&self, request: &RunRequest, observer: &dyn ProgressObserver) -> RunReport {
        let mut stats = RunStats {
            listing_pages: request.pages,
            ..RunStats::default()
        };

        let urls = self.discover(request, observer).await;
        stats.postings_discovered = urls.len();
        info!(postings = urls.len(), "listing discovery finished");

        if urls.is_empty() {
            observer.on_progress(1.0, "No postings found");
            return RunReport {
                postings: Vec::new(),
                stats,
                cancelled: self.cancel.is_cancelled(),
            };
        }

        let total = urls.len();
        let parse_attachments = request.parse_attachments;
        let mut outcomes = pin!(
            stream::iter(urls.iter())
                .map(|url| self.process(url, parse_attachments))
                .buffered(self.crawler.config().effective_concurrency())
        );

        let mut postings = Vec::with_capacity(total);
        let mut done = 0usize;
        while let Some(outcome) = outcomes.next().await {
            done += 1;
            match outcome {
                PostingOutcome::Harvested(posting) => {
                    stats.postings_attempted += 1;
                    stats.record_posting(&posting);
                    postings.push(*posting);
                }
                PostingOutcome::Failed => stats.postings_attempted += 1,
                PostingOutcome::NotStarted => {}
            }
            observer.on_progress(
                detail_fraction(done, total),
                &format!("Posting {done}/{total}"),
            );
        }

        let cancelled = self.cancel.is_cancelled();
        info!(%stats, cancelled, "run finished");
        observer.on_progress(1.0, "Done");
        RunReport {
            postings,
            stats,
            cancelled,
        }
    }

    /// Crawls every listing page and returns the unique posting URLs in
    /// first-seen order.
    async fn discover(&self, request: &RunRequest, observer: &dyn ProgressObserver) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut urls = Vec::new();

        for page in 1..=request.pages {
            if self.cancel.is_cancelled() {
                warn!(page, "cancelled before listing page");
                break;
            }
            let found = self.crawler.crawl_listing_page(&request.section, page).await;
            let new = found.len();
            for url in found {
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
            observer.on_progress(
                listing_fraction(page, request.pages),
                &format!("Listing page {page}/{}: {new} posting(s)", request.pages),
            );
        }
        urls
    }

    async fn process(&self, url: &str, parse_attachments: bool) -> PostingOutcome {
        if self.cancel.is_cancelled() {
            return PostingOutcome::NotStarted;
        }
        match self.harvest_posting(url, parse_attachments).await {
            Ok(posting) => PostingOutcome::Harvested(Box::new(posting)),
            Err(error) => {
                warn!(url = %url, error = %error, "posting skipped");
                PostingOutcome::Failed
            }
        }
    }

    /// Runs every per-posting stage for one URL.
    ///
    /// # Errors
    ///
    /// Returns the detail crawler's failure signal; later stages cannot fail.
    pub async fn harvest_posting(
        &self,
        url: &str,
        parse_attachments: bool,
    ) -> Result<HarvestedPosting, CrawlError> {
        let record = self.crawler.crawl_detail(url, parse_attachments).await?;
        let limits = &self.crawler.config().limits;
        let payload = merge_content(&record, limits);
        let outcome = request_analysis(self.model.as_deref(), &record, &payload).await;
        let (analysis, source) = consolidate(&record, outcome, limits);
        Ok(HarvestedPosting {
            record,
            analysis,
            source,
        })
    }
}

fn listing_fraction(page: u32, pages: u32) -> f64 {
    f64::from(page) / f64::from(pages.max(1)) * LISTING_SHARE
}

#[allow(clippy::cast_precision_loss)]
fn detail_fraction(done: usize, total: usize) -> f64 {
    LISTING_SHARE + done as f64 / total.max(1) as f64 * (1.0 - LISTING_SHARE)
}
