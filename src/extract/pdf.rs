//! PDF text extraction.

use lopdf::Document;
use tracing::trace;

use super::ExtractError;

/// Extracts text from at most `page_cap` pages, one page per line block.
///
/// A page whose content stream cannot be decoded is skipped; only a document
/// that cannot be loaded at all is an error.
pub fn extract_pdf_text(bytes: &[u8], page_cap: usize) -> Result<String, ExtractError> {
    let document = Document::load_mem(bytes)?;
    let pages: Vec<u32> = document.get_pages().keys().copied().take(page_cap).collect();

    let mut parts = Vec::with_capacity(pages.len());
    for page in pages {
        match document.extract_text(&[page]) {
            Ok(text) if !text.trim().is_empty() => parts.push(text),
            Ok(_) => {}
            Err(error) => trace!(page, error = %error, "skipping unreadable PDF page"),
        }
    }
    Ok(parts.join("\n"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(super) mod tests {
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    use super::*;

    /// Builds a PDF with one line of Courier text per page.
    pub(crate) fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let font_id = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = document.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                document.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = document.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = i64::try_from(kids.len()).unwrap();
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        document.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pages_are_read_in_order() {
        let bytes = pdf_with_pages(&["Termes de reference", "Contact: rh@ngo.ma"]);
        let text = extract_pdf_text(&bytes, 20).unwrap();

        let first = text.find("Termes de reference").unwrap();
        let second = text.find("rh@ngo.ma").unwrap();
        assert!(first < second, "{text}");
    }

    #[test]
    fn test_pages_past_the_cap_are_ignored() {
        let texts: Vec<String> = (1..=25)
            .map(|n| format!("Page {n} texte p{n}@ngo.ma"))
            .collect();
        let pages: Vec<&str> = texts.iter().map(String::as_str).collect();
        let bytes = pdf_with_pages(&pages);

        let text = extract_pdf_text(&bytes, 20).unwrap();

        assert!(text.contains("Page 1 texte"));
        assert!(text.contains("Page 20 texte"));
        assert!(!text.contains("Page 21 texte"));
        assert!(!text.contains("p22@ngo.ma"));
    }

    #[test]
    fn test_unloadable_document_is_error() {
        assert!(matches!(
            extract_pdf_text(b"%PDF-1.4 garbage", 20),
            Err(ExtractError::Pdf { .. })
        ));
    }
}
