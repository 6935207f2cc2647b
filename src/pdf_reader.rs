use std::collections::BTreeMap;
use std::path::Path;

use encoding_rs::UTF_16BE;
use lopdf::content::Content;
use lopdf::{Document, Object};

use crate::error::PickError;
use crate::fragments::{FragmentIndex, RawSpan};

// Fallback when no MediaBox is reachable from the page tree (A4 portrait).
const DEFAULT_PAGE_WIDTH: f32 = 595.0;
const DEFAULT_PAGE_HEIGHT: f32 = 842.0;

// TJ kerning adjustments further left than this are treated as an
// intentional gap between words.
const KERN_GAP_THRESHOLD: i64 = -100;

fn looks_decoding_broken(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    let total = text.chars().count();
    let replacement = text.matches('\u{FFFD}').count();
    let control = text
        .chars()
        .filter(|ch| ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'))
        .count();

    replacement * 8 > total || control * 5 > total
}

fn decode_show_text(encoding: Option<&str>, bytes: &[u8]) -> String {
    let decoded = Document::decode_text(encoding, bytes);
    if !looks_decoding_broken(&decoded) {
        return decoded;
    }

    let utf16_bytes = if bytes.starts_with(&[0xFE, 0xFF]) || bytes.starts_with(&[0xFF, 0xFE]) {
        &bytes[2..]
    } else if encoding.is_some_and(|name| {
        let lower = name.to_ascii_lowercase();
        lower.contains("utf16") || lower.contains("identity-h") || lower.contains("unicode")
    }) {
        bytes
    } else {
        return String::from_utf8_lossy(bytes).to_string();
    };

    let (utf16, had_errors) = UTF_16BE.decode_without_bom_handling(utf16_bytes);
    if !had_errors && !utf16.is_empty() {
        utf16.into_owned()
    } else {
        tracing::warn!("show-text operand resisted decoding, keeping lossy UTF-8");
        String::from_utf8_lossy(bytes).to_string()
    }
}

fn operand_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

/// Current text-space position while walking one content stream. Only the
/// translation part of the text matrix is tracked: fragment ordering and
/// click resolution need positions, not glyph-accurate geometry.
#[derive(Debug, Default)]
struct TextCursor {
    x: f32,
    y: f32,
    leading: f32,
}

impl TextCursor {
    fn begin_text(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
    }

    fn set_matrix(&mut self, operands: &[Object]) {
        if operands.len() == 6
            && let (Some(x), Some(y)) = (operand_number(&operands[4]), operand_number(&operands[5]))
        {
            self.x = x;
            self.y = y;
        }
    }

    fn translate(&mut self, operands: &[Object], set_leading: bool) {
        if operands.len() == 2
            && let (Some(dx), Some(dy)) = (operand_number(&operands[0]), operand_number(&operands[1]))
        {
            if set_leading {
                self.leading = -dy;
            }
            self.x += dx;
            self.y += dy;
        }
    }

    fn set_leading(&mut self, operands: &[Object]) {
        if let Some(leading) = operands.first().and_then(operand_number) {
            self.leading = leading;
        }
    }

    fn next_line(&mut self) {
        self.y -= self.leading;
    }
}

fn collect_show_text(text: &mut String, encoding: Option<&str>, operands: &[Object]) {
    for operand in operands {
        match operand {
            Object::String(bytes, _) => text.push_str(&decode_show_text(encoding, bytes)),
            Object::Array(items) => collect_show_text(text, encoding, items),
            Object::Integer(value) if *value < KERN_GAP_THRESHOLD => text.push(' '),
            _ => {}
        }
    }
}

fn collect_page_spans(
    document: &Document,
    page_id: lopdf::ObjectId,
) -> Result<Vec<RawSpan>, PickError> {
    let raw_content = document.get_page_content(page_id)?;
    let content = Content::decode(&raw_content)?;
    let encodings = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect::<BTreeMap<Vec<u8>, &str>>();

    let mut spans = Vec::new();
    let mut cursor = TextCursor::default();
    let mut current_encoding = None;

    let mut emit = |cursor: &TextCursor, text: String| {
        if !text.trim().is_empty() {
            spans.push(RawSpan {
                text,
                position_x: cursor.x,
                position_y: cursor.y,
            });
        }
    };

    for operation in content.operations {
        match operation.operator.as_str() {
            "BT" => cursor.begin_text(),
            "Tf" => {
                if let Some(font_name) = operation
                    .operands
                    .first()
                    .and_then(|operand| operand.as_name().ok())
                {
                    current_encoding = encodings.get(font_name).copied();
                }
            }
            "Tm" => cursor.set_matrix(&operation.operands),
            "Td" => cursor.translate(&operation.operands, false),
            "TD" => cursor.translate(&operation.operands, true),
            "TL" => cursor.set_leading(&operation.operands),
            "T*" => cursor.next_line(),
            "Tj" | "TJ" => {
                let mut text = String::new();
                collect_show_text(&mut text, current_encoding, &operation.operands);
                emit(&cursor, text);
            }
            "'" | "\"" => {
                cursor.next_line();
                let mut text = String::new();
                collect_show_text(&mut text, current_encoding, &operation.operands);
                emit(&cursor, text);
            }
            _ => {}
        }
    }

    Ok(spans)
}

fn media_box_size(object: &Object) -> Option<(f32, f32)> {
    let values = object.as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let x1 = operand_number(&values[0])?;
    let y1 = operand_number(&values[1])?;
    let x2 = operand_number(&values[2])?;
    let y2 = operand_number(&values[3])?;
    Some(((x2 - x1).abs(), (y2 - y1).abs()))
}

fn page_size(document: &Document, page_id: lopdf::ObjectId) -> (f32, f32) {
    let mut current = Some(page_id);
    // MediaBox is commonly inherited from an ancestor Pages node.
    for _ in 0..16 {
        let Some(id) = current else { break };
        let Ok(dict) = document.get_dictionary(id) else {
            break;
        };
        if let Ok(object) = dict.get(b"MediaBox")
            && let Some(size) = media_box_size(object)
        {
            return size;
        }
        current = dict
            .get(b"Parent")
            .ok()
            .and_then(|parent| parent.as_reference().ok());
    }
    (DEFAULT_PAGE_WIDTH, DEFAULT_PAGE_HEIGHT)
}

fn page_fragments(document: &Document, page_number: u32) -> Result<FragmentIndex, PickError> {
    let pages = document.get_pages();
    let page_id = pages
        .get(&page_number)
        .copied()
        .ok_or(PickError::PageNotFound {
            page: page_number,
            page_count: pages.len(),
        })?;

    let spans = collect_page_spans(document, page_id)?;
    let (width, height) = page_size(document, page_id);
    let index = FragmentIndex::build(spans, width, height);
    tracing::debug!(
        page = page_number,
        fragments = index.len(),
        "built page fragment index"
    );
    Ok(index)
}

pub(crate) fn read_page_fragments(
    input_pdf: &Path,
    page_number: u32,
) -> Result<FragmentIndex, PickError> {
    let document = Document::load(input_pdf)?;
    page_fragments(&document, page_number)
}

pub(crate) fn read_page_fragments_from_bytes(
    input_pdf: &[u8],
    page_number: u32,
) -> Result<FragmentIndex, PickError> {
    let document = Document::load_mem(input_pdf)?;
    page_fragments(&document, page_number)
}
