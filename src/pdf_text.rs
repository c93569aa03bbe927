//! Positioned text extraction from PDF content streams.
//!
//! A deliberately small text-operator walk: it tracks the text-line origin
//! and effective font size through BT/ET, Tf, Tm, Td/TD, TL, T* and the
//! text-showing operators, and emits one fragment per shown string. Kerning
//! adjustments inside TJ arrays are ignored and glyph widths are not
//! measured; the layout reconstruction downstream only needs approximate
//! positions.

use lopdf::content::Content;
use lopdf::{Document, Object};

use crate::error::AppError;

/// One shown string with its approximate position and size.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub text: String,
}

#[derive(Debug)]
pub struct PageText {
    pub number: u32,
    pub fragments: Vec<TextFragment>,
}

/// PDF detection by declared media type, extension, or the `%PDF-` magic.
pub fn is_pdf(name: &str, bytes: &[u8]) -> bool {
    let by_type = mime_guess::from_path(name)
        .first()
        .map(|m| m.essence_str() == "application/pdf")
        .unwrap_or(false);
    by_type || name.to_lowercase().ends_with(".pdf") || bytes.starts_with(b"%PDF-")
}

/// Parses the document and walks up to `max_pages` pages (0 = all).
/// Returns the Info-dictionary title (when present) and per-page fragments.
pub fn extract_pages(
    bytes: &[u8],
    max_pages: usize,
) -> Result<(Option<String>, Vec<PageText>), AppError> {
    let doc = Document::load_mem(bytes)?;
    let title = document_title(&doc);

    let mut pages = Vec::new();
    for (number, page_id) in doc.get_pages() {
        if max_pages > 0 && pages.len() >= max_pages {
            break;
        }
        let content_data = doc.get_page_content(page_id)?;
        let content = Content::decode(&content_data)?;
        let fragments = walk_operations(&content);
        log::debug!("Page {}: {} text fragment(s)", number, fragments.len());
        pages.push(PageText { number, fragments });
    }
    Ok((title, pages))
}

fn document_title(doc: &Document) -> Option<String> {
    let info = doc.trailer.get(b"Info").ok()?;
    let info = match info {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let dict = info.as_dict().ok()?;
    match dict.get(b"Title") {
        Ok(Object::String(bytes, _)) => {
            let title = decode_pdf_string(bytes);
            let title = title.trim();
            (!title.is_empty()).then(|| title.to_string())
        }
        _ => None,
    }
}

fn walk_operations(content: &Content) -> Vec<TextFragment> {
    let mut fragments = Vec::new();

    // Text state, reset at each BT.
    let mut font_size = 0.0f64;
    let mut leading = 0.0f64;
    let mut scale = 1.0f64;
    let mut x = 0.0f64;
    let mut y = 0.0f64;

    for op in &content.operations {
        match op.operator.as_str() {
            "BT" => {
                scale = 1.0;
                x = 0.0;
                y = 0.0;
            }
            "Tf" => {
                if let Some(size) = op.operands.get(1).and_then(number) {
                    font_size = size;
                }
            }
            "Tm" => {
                // [a b c d e f]: d carries the vertical scale, e/f the origin.
                if op.operands.len() == 6 {
                    if let (Some(d), Some(e), Some(f)) = (
                        op.operands.get(3).and_then(number),
                        op.operands.get(4).and_then(number),
                        op.operands.get(5).and_then(number),
                    ) {
                        scale = if d == 0.0 { 1.0 } else { d.abs() };
                        x = e;
                        y = f;
                    }
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (
                    op.operands.first().and_then(number),
                    op.operands.get(1).and_then(number),
                ) {
                    x += tx;
                    y += ty;
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (
                    op.operands.first().and_then(number),
                    op.operands.get(1).and_then(number),
                ) {
                    leading = -ty;
                    x += tx;
                    y += ty;
                }
            }
            "TL" => {
                if let Some(l) = op.operands.first().and_then(number) {
                    leading = l;
                }
            }
            "T*" => {
                y -= leading;
            }
            "Tj" => {
                if let Some(text) = op.operands.first().and_then(string_operand) {
                    push_fragment(&mut fragments, x, y, font_size * scale, text);
                }
            }
            "'" => {
                y -= leading;
                if let Some(text) = op.operands.first().and_then(string_operand) {
                    push_fragment(&mut fragments, x, y, font_size * scale, text);
                }
            }
            "\"" => {
                // aw ac string
                y -= leading;
                if let Some(text) = op.operands.get(2).and_then(string_operand) {
                    push_fragment(&mut fragments, x, y, font_size * scale, text);
                }
            }
            "TJ" => {
                if let Some(Object::Array(parts)) = op.operands.first() {
                    let text: String = parts
                        .iter()
                        .filter_map(|part| match part {
                            Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
                            _ => None, // kerning offsets
                        })
                        .collect();
                    push_fragment(&mut fragments, x, y, font_size * scale, text);
                }
            }
            _ => {}
        }
    }

    fragments
}

fn push_fragment(fragments: &mut Vec<TextFragment>, x: f64, y: f64, size: f64, text: String) {
    if text.is_empty() {
        return;
    }
    fragments.push(TextFragment { x, y, size, text });
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn string_operand(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        _ => None,
    }
}

/// UTF-16BE when BOM-prefixed, Latin-1 otherwise. Font-specific encodings are
/// out of scope for this walk; Latin-1 covers the standard text encodings
/// byte-for-byte well enough for layout purposes.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xfe, 0xff]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}
