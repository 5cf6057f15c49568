//! Error types for document extraction.

use thiserror::Error;

use super::DocumentKind;

/// Reasons a document yielded no text.
///
/// Never crosses [`super::extract_document`]; it is logged and replaced by an
/// empty document.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The PDF could not be loaded or read.
    #[error("PDF parse error: {source}")]
    Pdf {
        #[source]
        source: lopdf::Error,
    },

    /// The DOCX container is not a readable ZIP archive or lacks the main part.
    #[error("DOCX archive error: {source}")]
    Archive {
        #[source]
        source: zip::result::ZipError,
    },

    /// A DOCX part inflates past the configured cap.
    #[error("DOCX part '{part}' inflates past {limit_bytes} bytes")]
    PartTooLarge { part: String, limit_bytes: u64 },

    /// The DOCX main part is not well-formed XML.
    #[error("DOCX XML error: {source}")]
    Xml {
        #[source]
        source: quick_xml::Error,
    },

    /// The external legacy converter is not installed.
    #[error("legacy document converter '{program}' not found")]
    ConverterMissing { program: String },

    /// The external converter exited unsuccessfully or timed out.
    #[error("legacy document converter '{program}' failed: {reason}")]
    ConverterFailed { program: String, reason: String },

    /// Local I/O around the extraction failed.
    #[error("IO error during extraction: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },

    /// A parser panicked on the input bytes.
    #[error("{kind:?} parser panicked")]
    Panicked { kind: DocumentKind },
}

impl ExtractError {
    /// Creates a converter failure.
    #[must_use]
    pub fn converter_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConverterFailed {
            program: program.into(),
            reason: reason.into(),
        }
    }
}

impl From<lopdf::Error> for ExtractError {
    fn from(source: lopdf::Error) -> Self {
        Self::Pdf { source }
    }
}

impl From<zip::result::ZipError> for ExtractError {
    fn from(source: zip::result::ZipError) -> Self {
        Self::Archive { source }
    }
}

impl From<quick_xml::Error> for ExtractError {
    fn from(source: quick_xml::Error) -> Self {
        Self::Xml { source }
    }
}

impl From<std::io::Error> for ExtractError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source }
    }
}
