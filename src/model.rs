use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::table::{Row, Table};

pub const SESSION_STORAGE_KEY: &str = "pdfpick:session:v1";
pub const PDF_STORAGE_KEY: &str = "pdfpick:active-pdf:v1";

/// One piece of text extracted from a PDF page, placed at its reading-order
/// position. `index` is dense within a page (0..N-1) and stable for as long
/// as the page is displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub index: usize,
    pub str: String,
    pub position_x: f32,
    pub position_y: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCell {
    pub row: usize,
    pub column: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditingMode {
    Template,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// Point-in-time snapshot of everything worth restoring across restarts.
/// Fragment data is deliberately absent: it is rebuilt from the PDF on page
/// load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSession {
    pub table: Table,
    pub default_row: Row,
    pub template_row: Option<usize>,
    pub template_offset: Option<i64>,
    pub active_pdf_name: Option<String>,
    pub saved_at: DateTime<Utc>,
}
