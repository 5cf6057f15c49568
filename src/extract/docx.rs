//! DOCX (WordprocessingML) text extraction.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;

use super::ExtractError;

const MAIN_PART: &str = "word/document.xml";

/// Extracts body paragraphs in document order, followed by table cell text.
///
/// Paragraphs inside a cell are joined with newlines into one cell entry.
/// Blank paragraphs and cells are skipped. The main part is never inflated
/// past `max_xml_bytes`, whatever size its header declares.
pub fn extract_docx_text(bytes: &[u8], max_xml_bytes: u64) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let part = archive.by_name(MAIN_PART)?;
    let too_large = || ExtractError::PartTooLarge {
        part: MAIN_PART.to_string(),
        limit_bytes: max_xml_bytes,
    };
    if part.size() > max_xml_bytes {
        return Err(too_large());
    }

    let mut raw = Vec::new();
    part.take(max_xml_bytes.saturating_add(1)).read_to_end(&mut raw)?;
    if raw.len() as u64 > max_xml_bytes {
        return Err(too_large());
    }
    let xml = String::from_utf8(raw)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    parse_document_xml(&xml)
}

#[derive(Default)]
struct DocumentText {
    body: Vec<String>,
    cells: Vec<String>,
    table_depth: usize,
    paragraph_depth: usize,
    paragraph: String,
    cell_paragraphs: Vec<String>,
    in_text_run: bool,
}

impl DocumentText {
    fn start(&mut self, name: &[u8]) {
        match name {
            b"tbl" => self.table_depth += 1,
            b"tc" if self.table_depth == 1 => self.cell_paragraphs.clear(),
            b"p" => {
                if self.paragraph_depth == 0 {
                    self.paragraph.clear();
                }
                self.paragraph_depth += 1;
            }
            b"t" => self.in_text_run = true,
            _ => self.empty(name),
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"tbl" => self.table_depth = self.table_depth.saturating_sub(1),
            b"tc" if self.table_depth == 1 => {
                let cell = self.cell_paragraphs.join("\n");
                if !cell.trim().is_empty() {
                    self.cells.push(cell);
                }
                self.cell_paragraphs.clear();
            }
            b"p" => {
                self.paragraph_depth = self.paragraph_depth.saturating_sub(1);
                if self.paragraph_depth == 0 {
                    let paragraph = std::mem::take(&mut self.paragraph);
                    if self.table_depth == 0 {
                        if !paragraph.trim().is_empty() {
                            self.body.push(paragraph);
                        }
                    } else {
                        self.cell_paragraphs.push(paragraph);
                    }
                }
            }
            b"t" => self.in_text_run = false,
            _ => {}
        }
    }

    fn empty(&mut self, name: &[u8]) {
        if self.paragraph_depth == 0 {
            return;
        }
        match name {
            b"tab" => self.paragraph.push('\t'),
            b"br" | b"cr" => self.paragraph.push('\n'),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_text_run && self.paragraph_depth > 0 {
            self.paragraph.push_str(text);
        }
    }

    fn into_text(self) -> String {
        let mut parts = self.body;
        parts.extend(self.cells);
        parts.join("\n")
    }
}

fn parse_document_xml(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut state = DocumentText::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => state.start(e.local_name().as_ref()),
            Event::End(e) => state.end(e.local_name().as_ref()),
            Event::Empty(e) => state.empty(e.local_name().as_ref()),
            Event::Text(e) => state.text(&e.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(state.into_text())
}
