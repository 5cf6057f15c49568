//! Run counters and aggregate statistics over harvested postings.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::posting::{AnalysisSource, HarvestedPosting};

/// How many entries the top-N tables keep.
pub const TOP_N: usize = 5;

/// Counters of one run, so swallowed failures stay visible in aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Listing pages requested.
    pub listing_pages: u32,
    /// Unique posting URLs found across all listing pages.
    pub postings_discovered: usize,
    /// Detail pages the run tried to fetch.
    pub postings_attempted: usize,
    /// Detail pages that produced a record.
    pub postings_succeeded: usize,
    /// Attachments found on successful postings.
    pub attachments_detected: usize,
    /// Attachments with extracted text.
    pub attachments_parsed: usize,
    /// Distinct emails recovered from attachments, summed per posting.
    pub file_emails: usize,
    /// Results produced by the model.
    pub model_analyses: usize,
    /// Results produced by the fallback.
    pub fallback_analyses: usize,
}

impl RunStats {
    /// Counts one successful posting.
    pub fn record_posting(&mut self, posting: &HarvestedPosting) {
        self.postings_succeeded += 1;
        self.attachments_detected += posting.record.attachments.len();
        self.attachments_parsed += posting.record.parsed_attachment_count();
        self.file_emails += posting.record.file_emails.len();
        match posting.source {
            AnalysisSource::Model => self.model_analyses += 1,
            AnalysisSource::Fallback => self.fallback_analyses += 1,
        }
    }

    /// Detail pages that failed.
    #[must_use]
    pub fn postings_failed(&self) -> usize {
        self.postings_attempted.saturating_sub(self.postings_succeeded)
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} postings harvested, {}/{} attachments parsed, {} file email(s), {} model / {} fallback analyses",
            self.postings_succeeded,
            self.postings_attempted,
            self.attachments_parsed,
            self.attachments_detected,
            self.file_emails,
            self.model_analyses,
            self.fallback_analyses,
        )
    }
}

/// Aggregate view over a list of harvested postings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HarvestStatistics {
    pub total: usize,
    pub with_email: usize,
    pub without_email: usize,
    /// Percentage with one decimal.
    pub email_rate: f64,
    pub unique_sectors: usize,
    pub top_sectors: Vec<(String, usize)>,
    pub top_organizations: Vec<(String, usize)>,
    pub with_attachments: usize,
    pub total_attachments: usize,
    pub attachment_rate: f64,
    pub parsed_attachments: usize,
    pub parse_rate: f64,
    pub with_file_emails: usize,
}

impl HarvestStatistics {
    /// Computes the statistics. Empty input yields all zeros.
    #[must_use]
    pub fn from_postings(postings: &[HarvestedPosting]) -> Self {
        let total = postings.len();
        if total == 0 {
            return Self::default();
        }

        let with_email = postings.iter().filter(|p| !p.analysis.emails.is_empty()).count();
        let with_attachments = postings
            .iter()
            .filter(|p| !p.record.attachments.is_empty())
            .count();
        let total_attachments: usize = postings.iter().map(|p| p.record.attachments.len()).sum();
        let parsed_attachments: usize = postings
            .iter()
            .map(|p| p.record.parsed_attachment_count())
            .sum();

        let sectors = count_by(postings.iter().map(|p| p.analysis.sector.as_str()));
        let organizations = count_by(postings.iter().map(|p| p.analysis.organization.as_str()));

        Self {
            total,
            with_email,
            without_email: total - with_email,
            email_rate: percentage(with_email, total),
            unique_sectors: sectors.len(),
            top_sectors: top(sectors),
            top_organizations: top(organizations),
            with_attachments,
            total_attachments,
            attachment_rate: percentage(with_attachments, total),
            parsed_attachments,
            parse_rate: percentage(parsed_attachments, total_attachments),
            with_file_emails: postings
                .iter()
                .filter(|p| !p.record.file_emails.is_empty())
                .count(),
        }
    }
}

impl fmt::Display for HarvestStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Postings:           {}", self.total)?;
        writeln!(
            f,
            "With email:         {} ({}%)",
            self.with_email, self.email_rate
        )?;
        writeln!(
            f,
            "With attachments:   {} ({}%), {} file(s)",
            self.with_attachments, self.attachment_rate, self.total_attachments
        )?;
        writeln!(
            f,
            "Parsed attachments: {} ({}%)",
            self.parsed_attachments, self.parse_rate
        )?;
        writeln!(f, "With file emails:   {}", self.with_file_emails)?;
        write_top(f, "Top sectors", &self.top_sectors)?;
        write_top(f, "Top organizations", &self.top_organizations)
    }
}

fn write_top(f: &mut fmt::Formatter<'_>, label: &str, entries: &[(String, usize)]) -> fmt::Result {
    if entries.is_empty() {
        return Ok(());
    }
    writeln!(f, "{label}:")?;
    for (name, count) in entries {
        writeln!(f, "  {count:>3}  {name}")?;
    }
    Ok(())
}

fn count_by<'a>(values: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for value in values.map(str::trim).filter(|v| !v.is_empty()) {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Highest counts first, ties by name.
fn top(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut entries: Vec<_> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(TOP_N);
    entries
}

#[allow(clippy::cast_precision_loss)]
fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::posting::{AnalysisResult, Attachment, AttachmentKind, PostingRecord};

    fn posting(sector: &str, organization: &str, emails: &[&str], attachments: usize, parsed: usize) -> HarvestedPosting {
        let attachments = (0..attachments)
            .map(|i| {
                let mut a = Attachment::new(format!("f{i}"), format!("https://x.ma/{i}.pdf"), AttachmentKind::Pdf);
                if i < parsed {
                    a.extracted_text = Some("texte".to_string());
                }
                a
            })
            .collect();
        HarvestedPosting {
            record: PostingRecord {
                url: "https://x.ma/p".to_string(),
                title: "T".to_string(),
                organization: organization.to_string(),
                date: "unspecified".to_string(),
                page_text: String::new(),
                attachments,
                file_emails: if parsed > 0 {
                    BTreeSet::from(["tdr@x.ma".to_string()])
                } else {
                    BTreeSet::new()
                },
            },
            analysis: AnalysisResult {
                organization: organization.to_string(),
                emails: emails.iter().map(|e| (*e).to_string()).collect(),
                sector: sector.to_string(),
                opportunity_type: "undetermined".to_string(),
                location: "unspecified".to_string(),
                summary: String::new(),
                keywords: Vec::new(),
            },
            source: if parsed > 0 { AnalysisSource::Model } else { AnalysisSource::Fallback },
        }
    }

    #[test]
    fn test_statistics_counts_and_rates() {
        let postings = vec![
            posting("Health", "ALCS", &["a@x.ma"], 2, 1),
            posting("Health", "ALCS", &[], 0, 0),
            posting("Education", "UNICEF", &["b@x.ma"], 1, 1),
        ];
        let stats = HarvestStatistics::from_postings(&postings);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.with_email, 2);
        assert_eq!(stats.without_email, 1);
        assert!((stats.email_rate - 66.7).abs() < f64::EPSILON);
        assert_eq!(stats.unique_sectors, 2);
        assert_eq!(stats.top_sectors[0], ("Health".to_string(), 2));
        assert_eq!(stats.top_organizations[1], ("UNICEF".to_string(), 1));
        assert_eq!(stats.total_attachments, 3);
        assert_eq!(stats.parsed_attachments, 2);
        assert!((stats.parse_rate - 66.7).abs() < f64::EPSILON);
        assert_eq!(stats.with_file_emails, 2);
    }

    #[test]
    fn test_empty_statistics() {
        assert_eq!(HarvestStatistics::from_postings(&[]), HarvestStatistics::default());
    }

    #[test]
    fn test_top_is_capped_and_tie_broken_by_name() {
        let postings: Vec<_> = ["F", "E", "D", "C", "B", "A"]
            .iter()
            .map(|s| posting(s, "Org", &[], 0, 0))
            .collect();
        let stats = HarvestStatistics::from_postings(&postings);
        let names: Vec<_> = stats.top_sectors.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_run_stats_record_posting() {
        let mut stats = RunStats {
            postings_attempted: 3,
            ..RunStats::default()
        };
        stats.record_posting(&posting("Health", "ALCS", &[], 2, 1));
        stats.record_posting(&posting("Health", "ALCS", &[], 0, 0));

        assert_eq!(stats.postings_succeeded, 2);
        assert_eq!(stats.postings_failed(), 1);
        assert_eq!(stats.attachments_detected, 2);
        assert_eq!(stats.attachments_parsed, 1);
        assert_eq!(stats.file_emails, 1);
        assert_eq!(stats.model_analyses, 1);
        assert_eq!(stats.fallback_analyses, 1);
    }
}
