//! Final analysis of a posting: model answer or deterministic fallback, with
//! one normalized email list in both cases.

use std::collections::BTreeSet;

use crate::config::ExtractionLimits;
use crate::email::{normalize_email, recognize_emails};
use crate::posting::{AnalysisResult, AnalysisSource, PostingRecord, UNDETERMINED, UNSPECIFIED};
use crate::text::take_chars;

use super::model::{ModelAnalysis, ModelOutcome};

/// Sector reported when nothing better is known.
pub const FALLBACK_SECTOR: &str = "Other";

/// Most keywords kept from a model answer.
pub const MAX_KEYWORDS: usize = 8;

/// Merges email candidates into one normalized, deduplicated, sorted list.
///
/// Each candidate is trimmed, lower-cased and filtered exactly like the email
/// recognizer, so feeding the output back in reproduces it.
#[must_use]
pub fn consolidate_emails<'a, I>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .filter_map(normalize_email)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Builds the final [`AnalysisResult`] for `record`.
///
/// The emails always include every address recognized in the page text and
/// every file email. A completed model answer contributes its fields and
/// emails; a failed or skipped call yields the fallback record.
#[must_use]
pub fn consolidate(
    record: &PostingRecord,
    outcome: ModelOutcome,
    limits: &ExtractionLimits,
) -> (AnalysisResult, AnalysisSource) {
    let page_emails = recognize_emails(&record.page_text);
    let known = page_emails
        .iter()
        .chain(record.file_emails.iter())
        .map(String::as_str);

    match outcome {
        ModelOutcome::Completed(analysis) => {
            let emails = consolidate_emails(known.chain(analysis.emails.iter().map(String::as_str)));
            (from_model(record, analysis, emails), AnalysisSource::Model)
        }
        ModelOutcome::Failed(_) | ModelOutcome::Skipped => {
            let emails = consolidate_emails(known);
            (fallback(record, emails, limits), AnalysisSource::Fallback)
        }
    }
}

fn from_model(record: &PostingRecord, analysis: ModelAnalysis, emails: Vec<String>) -> AnalysisResult {
    AnalysisResult {
        organization: non_empty_or(analysis.organization, &record.organization),
        emails,
        sector: non_empty_or(analysis.sector, FALLBACK_SECTOR),
        opportunity_type: non_empty_or(analysis.opportunity_type, UNDETERMINED),
        location: non_empty_or(analysis.location, UNSPECIFIED),
        summary: analysis.summary,
        keywords: analysis.keywords.into_iter().take(MAX_KEYWORDS).collect(),
    }
}

/// Deterministic result built from data already on the record.
#[must_use]
pub fn fallback(record: &PostingRecord, emails: Vec<String>, limits: &ExtractionLimits) -> AnalysisResult {
    AnalysisResult {
        organization: record.organization.clone(),
        emails,
        sector: FALLBACK_SECTOR.to_string(),
        opportunity_type: UNDETERMINED.to_string(),
        location: UNSPECIFIED.to_string(),
        summary: fallback_summary(record, limits.fallback_summary_chars),
        keywords: Vec::new(),
    }
}

/// Page excerpt followed by an attachment count annotation.
fn fallback_summary(record: &PostingRecord, max_chars: usize) -> String {
    let (excerpt, cut) = take_chars(&record.page_text, max_chars);
    let mut summary = excerpt.to_string();
    if cut {
        summary.push_str("...");
    }
    if !record.attachments.is_empty() {
        summary.push_str(&format!(
            " ({} file(s), {} parsed)",
            record.attachments.len(),
            record.parsed_attachment_count()
        ));
    }
    summary
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}
