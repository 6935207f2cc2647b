use std::path::Path;

use csv::WriterBuilder;

use crate::error::PickError;
use crate::options::{ColumnSchema, ExportOptions};
use crate::table::Table;
use crate::value::{self, ResolvedTerm};
use crate::warning::{PickWarning, WarningCode};

/// Render every cell to its final string (resolved terms, space-joined) in
/// schema order. Cells whose arithmetic produced NaN are still emitted but
/// flagged uncalculable.
pub(crate) fn rendered_rows(
    schema: &ColumnSchema,
    table: &Table,
    warnings: &mut Vec<PickWarning>,
) -> Vec<Vec<String>> {
    table
        .rows()
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            schema
                .columns()
                .iter()
                .map(|column| {
                    let Some(cell) = row.get(column).filter(|cell| !cell.is_empty()) else {
                        return String::new();
                    };
                    let terms = value::resolve(cell);
                    if terms.iter().any(ResolvedTerm::is_uncalculable) {
                        warnings.push(
                            PickWarning::new(
                                WarningCode::UncalculableValue,
                                "cell arithmetic did not produce a number",
                            )
                            .with_row(row_index)
                            .with_column(column),
                        );
                    }
                    terms
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect()
        })
        .collect()
}

fn write_records<W: std::io::Write>(
    mut writer: csv::Writer<W>,
    schema: &ColumnSchema,
    rows: &[Vec<String>],
) -> Result<csv::Writer<W>, PickError> {
    writer.write_record(schema.columns())?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(writer)
}

pub(crate) fn write_csv(
    path: &Path,
    schema: &ColumnSchema,
    table: &Table,
    options: ExportOptions,
    warnings: &mut Vec<PickWarning>,
) -> Result<usize, PickError> {
    let rows = rendered_rows(schema, table, warnings);
    let writer = WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_path(path)?;
    write_records(writer, schema, &rows)?;
    Ok(rows.len())
}

pub(crate) fn write_csv_to_string(
    schema: &ColumnSchema,
    table: &Table,
    options: ExportOptions,
    warnings: &mut Vec<PickWarning>,
) -> Result<(String, usize), PickError> {
    let rows = rendered_rows(schema, table, warnings);
    let writer = WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(Vec::<u8>::new());
    let writer = write_records(writer, schema, &rows)?;

    let bytes = writer
        .into_inner()
        .map_err(|error| PickError::Csv(error.into_error().into()))?;
    let csv = String::from_utf8(bytes)
        .map_err(|error| PickError::InvalidOption(format!("invalid utf-8 csv output: {error}")))?;
    Ok((csv, rows.len()))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::atom::{Atom, Operator};
    use crate::options::{ColumnSchema, ExportOptions};
    use crate::table::{Row, Table};
    use crate::warning::WarningCode;

    use super::{rendered_rows, write_csv_to_string};

    fn frag(index: usize, str: &str) -> Atom {
        Atom::Fragment {
            index,
            str: str.to_string(),
        }
    }

    #[test]
    fn renders_cells_resolved_in_schema_order() {
        let schema = ColumnSchema::from_str("name,total").expect("schema should parse");
        let table = Table::new()
            .with_cell(0, "total", vec![frag(0, "5"), Atom::Operator(Operator::Add), frag(1, "3")])
            .and_then(|table| table.with_cell(0, "name", vec![Atom::manual("North Ward")]))
            .expect("cells should set");

        let mut warnings = Vec::new();
        let (csv, row_count) =
            write_csv_to_string(&schema, &table, ExportOptions::default(), &mut warnings)
                .expect("export should succeed");

        assert_eq!(row_count, 1);
        assert_eq!(csv, "name,total\nNorth Ward,8\n");
        assert!(warnings.is_empty());
    }

    #[test]
    fn custom_delimiter_is_honoured() {
        let schema = ColumnSchema::from_str("a,b").expect("schema should parse");
        let table = Table::new()
            .with_cell(0, "a", vec![Atom::manual("x")])
            .expect("cell should set");

        let options = ExportOptions { delimiter: b';' };
        let mut warnings = Vec::new();
        let (csv, _) = write_csv_to_string(&schema, &table, options, &mut warnings)
            .expect("export should succeed");
        assert_eq!(csv, "a;b\nx;\n");
    }

    #[test]
    fn uncalculable_cells_are_flagged_not_fatal() {
        let schema = ColumnSchema::from_str("total").expect("schema should parse");
        let table = Table::new()
            .with_cell(
                0,
                "total",
                vec![frag(0, "5"), Atom::Operator(Operator::Add), frag(1, "ward")],
            )
            .expect("cell should set");

        let mut warnings = Vec::new();
        let rows = rendered_rows(&schema, &table, &mut warnings);
        assert_eq!(rows[0][0], "NaN");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, WarningCode::UncalculableValue);
        assert_eq!(warnings[0].row, Some(0));
    }
}
