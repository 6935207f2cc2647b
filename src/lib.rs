mod atom;
mod csv_out;
mod error;
mod fragments;
mod model;
mod options;
mod pdf_reader;
mod session;
mod storage;
mod table;
mod template;
mod value;
mod warning;

use std::path::Path;

pub use atom::{Atom, Operator};
pub use error::PickError;
pub use fragments::{FragmentIndex, RawSpan};
pub use model::{
    ActiveCell, Direction, EditingMode, PDF_STORAGE_KEY, SESSION_STORAGE_KEY, SavedSession,
    TextFragment,
};
pub use options::{ACTION_COLUMN_ID, ColumnSchema, ExportOptions};
pub use session::{AUTOSAVE_INTERVAL, Autosaver, Session};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use table::{Row, Table};
pub use template::{ReplayedRow, adjust_row_base, basis_column, compute_offset, replay};
pub use value::{CellValue, ResolvedTerm, display, parse_number, render, resolve};
pub use warning::{PickWarning, WarningCode};

#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub row_count: usize,
    pub column_count: usize,
    pub warnings: Vec<PickWarning>,
}

/// Build the fragment index for one page of a PDF on disk. Pages are
/// 1-based, matching what viewers display.
pub fn read_page_fragments(
    input_pdf: &Path,
    page_number: u32,
) -> Result<FragmentIndex, PickError> {
    pdf_reader::read_page_fragments(input_pdf, page_number)
}

/// Same as [`read_page_fragments`], for an in-memory document.
pub fn read_page_fragments_from_bytes(
    input_pdf: &[u8],
    page_number: u32,
) -> Result<FragmentIndex, PickError> {
    pdf_reader::read_page_fragments_from_bytes(input_pdf, page_number)
}

fn empty_export_warning(table: &Table) -> Option<PickWarning> {
    if table.rows().iter().all(table::Row::is_empty) {
        Some(PickWarning::new(
            WarningCode::EmptyExport,
            "no populated cells; the export contains only empty rows",
        ))
    } else {
        None
    }
}

/// Write the table as CSV: header in schema order, every cell reduced to its
/// resolved value.
pub fn export_table_to_csv(
    table: &Table,
    schema: &ColumnSchema,
    output_csv: &Path,
    options: ExportOptions,
) -> Result<ExportReport, PickError> {
    let mut warnings = Vec::new();
    warnings.extend(empty_export_warning(table));
    let row_count = csv_out::write_csv(output_csv, schema, table, options, &mut warnings)?;

    Ok(ExportReport {
        row_count,
        column_count: schema.len(),
        warnings,
    })
}

/// In-memory variant of [`export_table_to_csv`].
pub fn export_table_to_csv_string(
    table: &Table,
    schema: &ColumnSchema,
    options: ExportOptions,
) -> Result<(String, ExportReport), PickError> {
    let mut warnings = Vec::new();
    warnings.extend(empty_export_warning(table));
    let (csv, row_count) = csv_out::write_csv_to_string(schema, table, options, &mut warnings)?;

    Ok((
        csv,
        ExportReport {
            row_count,
            column_count: schema.len(),
            warnings,
        },
    ))
}
