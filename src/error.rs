use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PickError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to load PDF: {0}")]
    PdfLoad(#[from] lopdf::Error),

    #[error("invalid session data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("page {page} not found (document has {page_count} pages)")]
    PageNotFound { page: u32, page_count: usize },

    #[error("row {row} is out of range (table has {row_count} rows)")]
    RowOutOfRange { row: usize, row_count: usize },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("storage error: {0}")]
    Storage(String),
}
