//! Detail pages: one posting, its text and its attachments.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

use super::{CrawlError, Crawler, FetchError, compile_selectors, discover_attachments, fetch_attachment};
use crate::config::SiteProfile;
use crate::posting::{Attachment, PostingRecord, UNDETERMINED, UNSPECIFIED};
use crate::text::{PAGE_TRUNCATED_MARKER, truncate_with_marker};

/// Dates longer than this are decorative text, not dates.
const MAX_DATE_CHARS: usize = 50;

#[allow(clippy::expect_used)]
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("blank line regex is valid")); // Static pattern, safe to panic

#[allow(clippy::expect_used)]
static SPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" +").expect("space run regex is valid")); // Static pattern, safe to panic

/// Fields parsed from detail HTML before any attachment is downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDetail {
    pub title: String,
    pub date: String,
    /// Visible main-content text, capped.
    pub page_text: String,
    /// Discovered attachments, metadata only.
    pub attachments: Vec<Attachment>,
}

impl Crawler {
    /// Fetches one posting page and builds its record.
    ///
    /// Waits the detail delay first. When `parse_attachments` is set every
    /// eligible attachment is downloaded and extracted, one after the other,
    /// before the record is returned. Attachment failures only empty that
    /// attachment.
    ///
    /// # Errors
    ///
    /// Returns the failure signal for this URL when the page cannot be fetched
    /// or parsed.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn crawl_detail(
        &self,
        url: &str,
        parse_attachments: bool,
    ) -> Result<PostingRecord, CrawlError> {
        self.pacer.wait(url, self.config.pacing.detail_delay).await;
        let html = self.client.fetch_page(url).await?;
        let parsed = parse_detail(&html, url, &self.config.site, self.config.limits.page_text_cap)?;

        let mut attachments = parsed.attachments;
        if parse_attachments {
            for attachment in &mut attachments {
                fetch_attachment(&self.client, attachment, &self.config.limits).await;
            }
        }

        let file_emails: BTreeSet<String> = attachments
            .iter()
            .flat_map(|a| a.emails.iter().cloned())
            .collect();

        info!(
            attachments = attachments.len(),
            parsed = attachments.iter().filter(|a| a.is_parsed()).count(),
            file_emails = file_emails.len(),
            "posting crawled"
        );

        Ok(PostingRecord {
            url: url.to_string(),
            title: parsed.title,
            organization: UNDETERMINED.to_string(),
            date: parsed.date,
            page_text: parsed.page_text,
            attachments,
            file_emails,
        })
    }
}

/// Parses a detail page.
///
/// Title and date come from the first matching selector of their strategy
/// lists, with [`UNSPECIFIED`] when none matches. The page text is taken from
/// the first matching content zone (or the whole document) with boilerplate
/// subtrees skipped, then whitespace-collapsed and capped at `text_cap`.
///
/// # Errors
///
/// Returns [`CrawlError`] when `page_url` is not an absolute URL.
pub fn parse_detail(
    html: &str,
    page_url: &str,
    profile: &SiteProfile,
    text_cap: usize,
) -> Result<ParsedDetail, CrawlError> {
    let base = Url::parse(page_url).map_err(|_| FetchError::invalid_url(page_url))?;
    let document = Html::parse_document(html);

    let title = first_text(&document, &compile_selectors(&profile.title_selectors), |_| true)
        .unwrap_or_else(|| UNSPECIFIED.to_string());
    let date = first_text(&document, &compile_selectors(&profile.date_selectors), |text| {
        text.chars().any(|c| c.is_ascii_digit()) && text.chars().count() < MAX_DATE_CHARS
    })
    .unwrap_or_else(|| UNSPECIFIED.to_string());

    let attachments = discover_attachments(&document, &base, profile);
    let page_text = visible_text(&document, profile, text_cap);
    debug!(
        title = %title,
        chars = page_text.chars().count(),
        attachments = attachments.len(),
        "detail page parsed"
    );

    Ok(ParsedDetail {
        title,
        date,
        page_text,
        attachments,
    })
}

/// Text of the first element of the first selector whose text passes `accept`.
fn first_text(
    document: &Html,
    selectors: &[Selector],
    accept: impl Fn(&str) -> bool,
) -> Option<String> {
    selectors.iter().find_map(|selector| {
        let element = document.select(selector).next()?;
        let text = element_text(element);
        (!text.is_empty() && accept(&text)).then_some(text)
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn visible_text(document: &Html, profile: &SiteProfile, text_cap: usize) -> String {
    let zone = compile_selectors(&profile.content_selectors)
        .iter()
        .find_map(|selector| document.select(selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut strip = compile_selectors(&profile.boilerplate_selectors);
    strip.extend(compile_selectors(&["head".to_string()]));

    let mut lines = Vec::new();
    collect_text(zone, &strip, &mut lines);

    let text = lines.join("\n");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    let text = SPACE_RUNS.replace_all(&text, " ");
    truncate_with_marker(text.trim(), text_cap, PAGE_TRUNCATED_MARKER)
}

fn collect_text(element: ElementRef<'_>, strip: &[Selector], lines: &mut Vec<String>) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if !strip.iter().any(|s| s.matches(&child_element)) {
                collect_text(child_element, strip, lines);
            }
        } else if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
    }
}
