use crate::error::IngestError;
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    /// Returns one entry per page, numbered from 1 in document order.
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
        let document =
            Document::load_mem(bytes).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (index, (page_no, page_id)) in document.get_pages().into_iter().enumerate() {
            let fragments = page_fragments(&document, page_id).map_err(|error| {
                IngestError::PdfParse(format!("page {page_no}: {error}"))
            })?;

            pages.push(PageText {
                number: (index + 1) as u32,
                text: join_fragments(&fragments),
            });
        }

        Ok(pages)
    }
}

pub fn extract_page_texts(bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
    LopdfExtractor.extract_pages(bytes)
}

/// Collects every text-showing operand of a page as its own fragment, decoded
/// through the encoding of the font selected at that point.
fn page_fragments(document: &Document, page_id: ObjectId) -> Result<Vec<String>, lopdf::Error> {
    let encodings = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect::<BTreeMap<Vec<u8>, &str>>();
    let content = Content::decode(&document.get_page_content(page_id)?)?;

    let mut fragments = Vec::new();
    let mut encoding = None;
    for operation in &content.operations {
        match operation.operator.as_str() {
            "Tf" => {
                if let Some(Ok(font)) = operation.operands.first().map(Object::as_name) {
                    encoding = encodings.get(font).copied();
                }
            }
            "Tj" | "TJ" | "'" => {
                if let Some(operand) = operation.operands.first() {
                    fragments.push(show_text(encoding, operand));
                }
            }
            // `aw ac string "`
            "\"" => {
                if let Some(operand) = operation.operands.get(2) {
                    fragments.push(show_text(encoding, operand));
                }
            }
            _ => {}
        }
    }

    Ok(fragments)
}

/// Decodes a `Tj` string or a `TJ` array. Inside an array, a displacement wider
/// than a tenth of an em is read as a word gap.
fn show_text(encoding: Option<&str>, operand: &Object) -> String {
    match operand {
        Object::String(bytes, _) => Document::decode_text(encoding, bytes),
        Object::Array(items) => {
            let mut text = String::new();
            for item in items {
                match item {
                    Object::String(bytes, _) => text.push_str(&Document::decode_text(encoding, bytes)),
                    Object::Integer(offset) if *offset < -100 => text.push(' '),
                    Object::Real(offset) if *offset < -100.0 => text.push(' '),
                    _ => {}
                }
            }
            text
        }
        _ => String::new(),
    }
}

/// Joins text fragments with single spaces in content-stream order, dropping
/// blank ones.
pub fn join_fragments<S: AsRef<str>>(fragments: &[S]) -> String {
    fragments
        .iter()
        .map(|fragment| fragment.as_ref().trim())
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
