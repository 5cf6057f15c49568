//! Attachment download and extraction.

use tracing::{debug, instrument, warn};

use super::HttpClient;
use crate::config::ExtractionLimits;
use crate::extract::{DocumentKind, extract_document};
use crate::posting::Attachment;

/// Downloads one attachment and fills its text and emails in place.
///
/// Kinds without an extractor are left untouched. Every failure (network,
/// status, size cap, corrupt document) leaves the attachment empty and is
/// only logged.
#[instrument(skip(client, attachment, limits), fields(url = %attachment.url, kind = %attachment.kind))]
pub async fn fetch_attachment(
    client: &HttpClient,
    attachment: &mut Attachment,
    limits: &ExtractionLimits,
) {
    let Some(kind) = DocumentKind::for_attachment(attachment.kind) else {
        debug!("metadata-only attachment");
        return;
    };

    let bytes = match client
        .fetch_document(&attachment.url, limits.max_attachment_bytes)
        .await
    {
        Ok(bytes) => bytes,
        Err(error) => {
            warn!(error = %error, "attachment download failed");
            return;
        }
    };

    let task_limits = limits.clone();
    let document =
        match tokio::task::spawn_blocking(move || extract_document(&bytes, kind, &task_limits)).await {
            Ok(document) => document,
            Err(error) => {
                warn!(error = %error, "extraction task failed");
                return;
            }
        };

    debug!(
        chars = document.text.chars().count(),
        emails = document.emails.len(),
        "attachment extracted"
    );
    if !document.text.is_empty() {
        attachment.extracted_text = Some(document.text);
    }
    attachment.emails = document.emails;
}
