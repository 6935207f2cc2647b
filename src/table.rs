use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PickError;
use crate::value::CellValue;

/// One table row: column id to cell value. Rows never mutate in place; every
/// change builds a replacement so no reader observes a half-updated row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    cells: BTreeMap<String, CellValue>,
}

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    /// A column counts as populated once it holds at least one atom; an
    /// empty sequence is an empty cell.
    #[must_use]
    pub fn is_populated(&self, column: &str) -> bool {
        self.cells.get(column).is_some_and(|value| !value.is_empty())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.values().all(Vec::is_empty)
    }

    #[must_use]
    pub fn with_cell(&self, column: impl Into<String>, value: CellValue) -> Self {
        let mut cells = self.cells.clone();
        cells.insert(column.into(), value);
        Self { cells }
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &CellValue)> {
        self.cells.iter()
    }
}

/// The ordered row collection. Row index is semantic: it feeds template
/// offset direction and grid navigation. All operations are copy-on-write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    /// A fresh table holds exactly one empty row, the grid always has
    /// somewhere to put the active cell.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: vec![Row::new()],
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Result<&Row, PickError> {
        self.rows.get(index).ok_or(PickError::RowOutOfRange {
            row: index,
            row_count: self.rows.len(),
        })
    }

    #[must_use]
    pub fn with_row_appended(&self, row: Row) -> Self {
        let mut rows = self.rows.clone();
        rows.push(row);
        Self { rows }
    }

    pub fn with_row_replaced(&self, index: usize, row: Row) -> Result<Self, PickError> {
        if index >= self.rows.len() {
            return Err(PickError::RowOutOfRange {
                row: index,
                row_count: self.rows.len(),
            });
        }
        let mut rows = self.rows.clone();
        rows[index] = row;
        Ok(Self { rows })
    }

    /// Remove a row; subsequent rows shift up.
    pub fn with_row_removed(&self, index: usize) -> Result<Self, PickError> {
        if index >= self.rows.len() {
            return Err(PickError::RowOutOfRange {
                row: index,
                row_count: self.rows.len(),
            });
        }
        let mut rows = self.rows.clone();
        rows.remove(index);
        Ok(Self { rows })
    }

    pub fn with_cell(
        &self,
        row_index: usize,
        column: impl Into<String>,
        value: CellValue,
    ) -> Result<Self, PickError> {
        let row = self.row(row_index)?.with_cell(column, value);
        self.with_row_replaced(row_index, row)
    }

    /// Write one value into a column of every row at once (update-all mode,
    /// for columns that share a constant like a state or county name).
    #[must_use]
    pub fn with_column_set_all(&self, column: &str, value: &CellValue) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|row| row.with_cell(column, value.clone()))
            .collect();
        Self { rows }
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}
