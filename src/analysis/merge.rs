//! Bounded analysis payload built from a posting and its attachments.

use crate::config::ExtractionLimits;
use crate::posting::PostingRecord;
use crate::text::{TRUNCATED_MARKER, truncate_with_marker};

/// Header of the page text section.
pub const PAGE_HEADER: &str = "=== PAGE CONTENT ===";

/// Merges page text and attachment texts into one bounded block.
///
/// The page section comes first, then one section per attachment with
/// extracted text, in discovery order. Each attachment section is capped at
/// `merged_attachment_cap` and the whole block at `merged_total_cap`.
#[must_use]
pub fn merge_content(record: &PostingRecord, limits: &ExtractionLimits) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !record.page_text.is_empty() {
        parts.push(PAGE_HEADER.to_string());
        parts.push(record.page_text.clone());
    }

    for attachment in &record.attachments {
        let Some(text) = attachment.extracted_text.as_deref().filter(|t| !t.is_empty()) else {
            continue;
        };
        parts.push(format!("=== FILE: {} ===", attachment.name));
        parts.push(truncate_with_marker(
            text,
            limits.merged_attachment_cap,
            TRUNCATED_MARKER,
        ));
    }

    truncate_with_marker(&parts.join("\n\n"), limits.merged_total_cap, TRUNCATED_MARKER)
}
