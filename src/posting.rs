//! Records produced by a harvesting run.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder for fields the page did not provide.
pub const UNSPECIFIED: &str = "unspecified";

/// Placeholder for fields deferred to the analysis stage.
pub const UNDETERMINED: &str = "undetermined";

/// File type of an attachment, derived from its URL extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Pdf,
    Doc,
    Docx,
    Xls,
    Xlsx,
    Ppt,
    Pptx,
    Zip,
    Rar,
    Odt,
    Ods,
    Odp,
    Other,
}

impl AttachmentKind {
    /// Recognized kinds in classification priority order.
    ///
    /// Longer extensions precede their prefixes (`docx` before `doc`) so a
    /// substring match never misclassifies an OOXML file.
    pub const KNOWN: [Self; 12] = [
        Self::Pdf,
        Self::Docx,
        Self::Doc,
        Self::Xlsx,
        Self::Xls,
        Self::Pptx,
        Self::Ppt,
        Self::Zip,
        Self::Rar,
        Self::Odt,
        Self::Ods,
        Self::Odp,
    ];

    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
            Self::Xls => "xls",
            Self::Xlsx => "xlsx",
            Self::Ppt => "ppt",
            Self::Pptx => "pptx",
            Self::Zip => "zip",
            Self::Rar => "rar",
            Self::Odt => "odt",
            Self::Ods => "ods",
            Self::Odp => "odp",
            Self::Other => "other",
        }
    }

    /// Whether the document extractor can read this kind.
    #[must_use]
    pub fn is_parsable(self) -> bool {
        matches!(self, Self::Pdf | Self::Doc | Self::Docx)
    }

    /// Classifies a URL against `kinds`, case-insensitively.
    ///
    /// The extension of the last path segment is checked first; otherwise the
    /// first kind whose `.ext` occurs anywhere in the URL wins.
    #[must_use]
    pub fn classify(url: &str, kinds: &[Self]) -> Self {
        let lower = url.to_lowercase();
        let path = lower.split(['?', '#']).next().unwrap_or_default();
        let last_segment = path.rsplit('/').next().unwrap_or_default();
        if let Some((_, ext)) = last_segment.rsplit_once('.')
            && let Some(kind) = kinds.iter().find(|k| k.extension() == ext)
        {
            return *kind;
        }
        kinds
            .iter()
            .find(|k| lower.contains(&format!(".{}", k.extension())))
            .copied()
            .unwrap_or(Self::Other)
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A document linked from a posting's detail page.
///
/// Identity is the absolute `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Display name, at most 100 characters.
    pub name: String,
    /// Absolute URL.
    pub url: String,
    /// Kind derived from the URL extension.
    pub kind: AttachmentKind,
    /// Capped extracted text, when the document was downloaded and parsed.
    pub extracted_text: Option<String>,
    /// Emails recognized in the full (uncapped) document text.
    pub emails: BTreeSet<String>,
}

impl Attachment {
    /// Creates a metadata-only attachment.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>, kind: AttachmentKind) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kind,
            extracted_text: None,
            emails: BTreeSet::new(),
        }
    }

    /// Whether text was extracted from this attachment.
    #[must_use]
    pub fn is_parsed(&self) -> bool {
        self.extracted_text.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// One successfully fetched detail page with its attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingRecord {
    pub url: String,
    pub title: String,
    /// Best effort; usually [`UNDETERMINED`] until the analysis stage.
    pub organization: String,
    /// Free-text publication date.
    pub date: String,
    /// Visible page text, capped with a truncation marker.
    pub page_text: String,
    /// Attachments in discovery order, unique by URL.
    pub attachments: Vec<Attachment>,
    /// Union of all attachments' emails.
    pub file_emails: BTreeSet<String>,
}

impl PostingRecord {
    /// Number of attachments with extracted text.
    #[must_use]
    pub fn parsed_attachment_count(&self) -> usize {
        self.attachments.iter().filter(|a| a.is_parsed()).count()
    }
}

/// Structured summary of a posting, from the model or the fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub organization: String,
    /// Normalized, deduplicated, sorted.
    pub emails: Vec<String>,
    pub sector: String,
    pub opportunity_type: String,
    pub location: String,
    pub summary: String,
    pub keywords: Vec<String>,
}

/// Which path produced an [`AnalysisResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    Model,
    Fallback,
}

/// A posting together with its consolidated analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestedPosting {
    pub record: PostingRecord,
    pub analysis: AnalysisResult,
    pub source: AnalysisSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_docx_not_mistaken_for_doc() {
        let kind = AttachmentKind::classify(
            "https://x.ma/wp-content/uploads/TDR.DOCX",
            &AttachmentKind::KNOWN,
        );
        assert_eq!(kind, AttachmentKind::Docx);
    }

    #[test]
    fn test_classify_uses_path_extension_before_query() {
        let kind = AttachmentKind::classify(
            "https://x.ma/files/a.pdf?version=file.zip",
            &AttachmentKind::KNOWN,
        );
        assert_eq!(kind, AttachmentKind::Pdf);
    }

    #[test]
    fn test_classify_falls_back_to_substring() {
        let kind = AttachmentKind::classify(
            "https://x.ma/download.xlsx/get?id=4",
            &AttachmentKind::KNOWN,
        );
        assert_eq!(kind, AttachmentKind::Xlsx);
    }

    #[test]
    fn test_classify_unknown_is_other() {
        let kind = AttachmentKind::classify("https://x.ma/download?id=4", &AttachmentKind::KNOWN);
        assert_eq!(kind, AttachmentKind::Other);
    }

    #[test]
    fn test_parsable_kinds() {
        assert!(AttachmentKind::Pdf.is_parsable());
        assert!(AttachmentKind::Doc.is_parsable());
        assert!(AttachmentKind::Docx.is_parsable());
        assert!(!AttachmentKind::Xlsx.is_parsable());
        assert!(!AttachmentKind::Other.is_parsable());
    }

    #[test]
    fn test_attachment_is_parsed_requires_text() {
        let mut attachment = Attachment::new("TDR", "https://x.ma/a.pdf", AttachmentKind::Pdf);
        assert!(!attachment.is_parsed());
        attachment.extracted_text = Some(String::new());
        assert!(!attachment.is_parsed());
        attachment.extracted_text = Some("Termes de référence".to_string());
        assert!(attachment.is_parsed());
    }
}
