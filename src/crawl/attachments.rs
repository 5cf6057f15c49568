//! Attachment link discovery on detail pages.

use std::collections::HashSet;

use scraper::{ElementRef, Html};
use tracing::trace;
use url::Url;

use super::compile_selectors;
use crate::config::SiteProfile;
use crate::posting::{Attachment, AttachmentKind};

/// Longest display name kept for an attachment.
pub const MAX_NAME_CHARS: usize = 100;

/// Shortest link text accepted as a display name.
const MIN_LINK_TEXT_CHARS: usize = 3;

/// Finds attachment links on a parsed detail page.
///
/// Structural selectors are tried first, then one `a[href$=".ext"]` selector
/// per allowed extension (lower and upper case). Links are resolved against
/// `page_url` and deduplicated by absolute URL, first occurrence wins.
/// Returned attachments carry metadata only.
#[must_use]
pub fn discover_attachments(document: &Html, page_url: &Url, profile: &SiteProfile) -> Vec<Attachment> {
    let selectors = compile_selectors(&attachment_selector_list(profile));
    let extensions: Vec<String> = profile
        .attachment_kinds
        .iter()
        .map(|kind| format!(".{}", kind.extension()))
        .collect();

    let mut seen = HashSet::new();
    let mut attachments = Vec::new();

    for selector in &selectors {
        for link in document.select(selector) {
            let Some(href) = link.value().attr("href").map(str::trim) else {
                continue;
            };
            if is_skipped_target(href) {
                continue;
            }
            let lower = href.to_lowercase();
            if !extensions.iter().any(|ext| lower.contains(ext.as_str())) {
                continue;
            }
            let Ok(url) = page_url.join(href) else {
                trace!(href, "unresolvable attachment link");
                continue;
            };
            let url = String::from(url);
            if !seen.insert(url.clone()) {
                continue;
            }

            let kind = AttachmentKind::classify(&url, &profile.attachment_kinds);
            let name = display_name(link, &url);
            trace!(url = %url, %kind, "attachment discovered");
            attachments.push(Attachment::new(name, url, kind));
        }
    }
    attachments
}

/// Structural selectors followed by the per-extension selectors.
fn attachment_selector_list(profile: &SiteProfile) -> Vec<String> {
    let mut selectors = profile.attachment_selectors.clone();
    for kind in &profile.attachment_kinds {
        let ext = kind.extension();
        selectors.push(format!(r#"a[href$=".{ext}"]"#));
        selectors.push(format!(r#"a[href$=".{}"]"#, ext.to_uppercase()));
    }
    selectors
}

fn is_skipped_target(href: &str) -> bool {
    href.is_empty() || href.starts_with('#') || href.to_lowercase().starts_with("javascript:")
}

/// Link text when meaningful, else the decoded last path segment.
fn display_name(link: ElementRef<'_>, url: &str) -> String {
    let text = link
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    let name = if text.chars().count() >= MIN_LINK_TEXT_CHARS {
        text
    } else {
        file_name_from_url(url)
    };
    name.chars().take(MAX_NAME_CHARS).collect::<String>().trim().to_string()
}

fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    urlencoding::decode(segment).map_or_else(|_| segment.to_string(), |s| s.into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn discover(html: &str) -> Vec<Attachment> {
        let page = Url::parse("https://tanmia.ma/appel-a-consultation/").unwrap();
        discover_attachments(&Html::parse_document(html), &page, &SiteProfile::default())
    }

    #[test]
    fn test_same_url_from_two_selectors_is_kept_once() {
        let html = r#"
            <ul class="post-attachments"><li><a href="/files/a.pdf?x=1">Termes de référence</a></li></ul>
            <div class="wp-block-file"><a href="https://tanmia.ma/files/a.pdf?x=1">Télécharger</a></div>
        "#;
        let found = discover(html);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "https://tanmia.ma/files/a.pdf?x=1");
        assert_eq!(found[0].name, "Termes de référence");
        assert_eq!(found[0].kind, AttachmentKind::Pdf);
    }

    #[test]
    fn test_structural_selectors_come_before_extension_selectors() {
        let html = r#"
            <p><a href="/files/budget.xlsx">Budget prévisionnel</a></p>
            <a class="download-link" href="/files/TDR.DOCX">TDR</a>
        "#;
        let found = discover(html);
        let urls: Vec<_> = found.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://tanmia.ma/files/TDR.DOCX", "https://tanmia.ma/files/budget.xlsx"]
        );
        assert_eq!(found[0].kind, AttachmentKind::Docx);
        assert_eq!(found[1].kind, AttachmentKind::Xlsx);
    }

    #[test]
    fn test_short_link_text_falls_back_to_decoded_file_name() {
        let html = r#"<a href="/wp-content/uploads/Cahier%20des%20charges.pdf">ici</a>"#;
        let found = discover(html);
        assert_eq!(found[0].name, "Cahier des charges.pdf");
    }

    #[test]
    fn test_skips_fragments_scripts_and_non_documents() {
        let html = r##"
            <a download href="#top.pdf">haut</a>
            <a download href="javascript:open('x.pdf')">ouvrir</a>
            <a download href="/contact/">Contact</a>
        "##;
        assert!(discover(html).is_empty());
    }

    #[test]
    fn test_name_is_capped() {
        let long = "N".repeat(150);
        let html = format!(r#"<a href="/f/doc.pdf">{long}</a>"#);
        let found = discover(&html);
        assert_eq!(found[0].name.chars().count(), MAX_NAME_CHARS);
    }
}
