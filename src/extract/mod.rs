//! Text and email extraction from downloaded documents.
//!
//! Each supported format has one extractor sharing the contract
//! `bytes -> full text`. [`extract_document`] dispatches on [`DocumentKind`],
//! recognizes emails on the full text and only then caps it, so an address
//! past the cap offset is never lost. Every failure, including a panic inside
//! a third-party parser, degrades to an empty [`ExtractedDocument`].

mod docx;
mod error;
mod legacy;
mod pdf;

use std::cell::Cell;
use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind, set_hook, take_hook};
use std::sync::Once;

use tracing::{debug, warn};

pub use docx::extract_docx_text;
pub use error::ExtractError;
pub use legacy::extract_legacy_doc_text;
pub use pdf::extract_pdf_text;

use crate::config::ExtractionLimits;
use crate::email::recognize_emails;
use crate::posting::AttachmentKind;
use crate::text::{TRUNCATED_MARKER, truncate_with_marker};

/// Document formats with an extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    /// Binary Word 97-2003 document, converted by an external program.
    LegacyDoc,
}

impl DocumentKind {
    /// Maps an attachment kind to its extractor, if it has one.
    #[must_use]
    pub fn for_attachment(kind: AttachmentKind) -> Option<Self> {
        match kind {
            AttachmentKind::Pdf => Some(Self::Pdf),
            AttachmentKind::Docx => Some(Self::Docx),
            AttachmentKind::Doc => Some(Self::LegacyDoc),
            _ => None,
        }
    }
}

/// Capped text of one document and the emails found in its full text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub text: String,
    pub emails: BTreeSet<String>,
}

impl ExtractedDocument {
    /// Whether nothing was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.emails.is_empty()
    }
}

/// Extracts text and emails from `bytes`, never failing.
///
/// Blocking: PDF parsing is CPU-bound and the legacy path waits on a child
/// process. Async callers run this through `spawn_blocking`.
#[must_use]
pub fn extract_document(
    bytes: &[u8],
    kind: DocumentKind,
    limits: &ExtractionLimits,
) -> ExtractedDocument {
    let outcome = match kind {
        DocumentKind::Pdf => catch_parser_panic(|| extract_pdf_text(bytes, limits.pdf_page_cap))
            .unwrap_or_else(|_| Err(ExtractError::Panicked { kind })),
        DocumentKind::Docx => {
            catch_parser_panic(|| extract_docx_text(bytes, limits.max_docx_xml_bytes))
                .unwrap_or_else(|_| Err(ExtractError::Panicked { kind }))
        }
        DocumentKind::LegacyDoc => {
            extract_legacy_doc_text(bytes, &limits.legacy_converter, limits.converter_timeout)
        }
    };

    match outcome {
        Ok(full_text) => {
            let document = finish(&full_text, limits.document_text_cap);
            debug!(
                ?kind,
                chars = full_text.chars().count(),
                emails = document.emails.len(),
                "document extracted"
            );
            document
        }
        Err(ExtractError::ConverterMissing { .. }) => {
            // Already reported once by the legacy extractor.
            ExtractedDocument::default()
        }
        Err(error) => {
            warn!(?kind, error = %error, "document extraction failed");
            ExtractedDocument::default()
        }
    }
}

/// Recognizes emails on the full text, then caps the text.
#[must_use]
pub fn finish(full_text: &str, text_cap: usize) -> ExtractedDocument {
    let emails = recognize_emails(full_text);
    let text = truncate_with_marker(full_text.trim(), text_cap, TRUNCATED_MARKER);
    ExtractedDocument { text, emails }
}

thread_local! {
    static QUIET_PANICS: Cell<bool> = const { Cell::new(false) };
}

static INSTALL_QUIET_HOOK: Once = Once::new();

/// Runs an in-process parser, turning its panic into `Err`.
///
/// The panic message is suppressed only on the calling thread while the
/// parser runs; panics elsewhere still reach the previous hook.
fn catch_parser_panic<T>(parse: impl FnOnce() -> T) -> std::thread::Result<T> {
    INSTALL_QUIET_HOOK.call_once(|| {
        let previous = take_hook();
        set_hook(Box::new(move |info| {
            if !QUIET_PANICS.with(Cell::get) {
                previous(info);
            }
        }));
    });

    QUIET_PANICS.with(|quiet| quiet.set(true));
    let outcome = catch_unwind(AssertUnwindSafe(parse));
    QUIET_PANICS.with(|quiet| quiet.set(false));
    outcome
}
