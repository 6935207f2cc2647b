use std::time::{Duration, Instant};

use chrono::Utc;

use crate::atom::{Atom, Operator};
use crate::error::PickError;
use crate::fragments::FragmentIndex;
use crate::model::{
    ActiveCell, Direction, EditingMode, SESSION_STORAGE_KEY, PDF_STORAGE_KEY, SavedSession,
};
use crate::options::{ColumnSchema, ExportOptions};
use crate::storage::{self, KeyValueStore};
use crate::table::{Row, Table};
use crate::template;
use crate::value;
use crate::warning::PickWarning;
use crate::{ExportReport, export_table_to_csv_string};

pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// All mutable state of one editing session, held in one explicit object and
/// passed to whoever needs it. Every user interaction is a synchronous
/// method; each mutation replaces whole values (table, fragment index), so
/// no observer ever sees a partial update.
#[derive(Debug, Clone)]
pub struct Session {
    schema: ColumnSchema,
    table: Table,
    fragments: Option<FragmentIndex>,
    active_cell: ActiveCell,
    editing_mode: EditingMode,
    update_all: bool,
    template_row: Option<usize>,
    template_offset: Option<i64>,
    default_row: Row,
    copied_row: Option<Row>,
    active_pdf_name: Option<String>,
    warnings: Vec<PickWarning>,
}

impl Session {
    #[must_use]
    pub fn new(schema: ColumnSchema) -> Self {
        let active_cell = ActiveCell {
            row: 0,
            column: schema.first_column().to_string(),
        };
        Self {
            schema,
            table: Table::new(),
            fragments: None,
            active_cell,
            editing_mode: EditingMode::Template,
            update_all: false,
            template_row: None,
            template_offset: None,
            default_row: Row::new(),
            copied_row: None,
            active_pdf_name: None,
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    #[must_use]
    pub fn fragments(&self) -> Option<&FragmentIndex> {
        self.fragments.as_ref()
    }

    #[must_use]
    pub fn active_cell(&self) -> &ActiveCell {
        &self.active_cell
    }

    #[must_use]
    pub fn template_row(&self) -> Option<usize> {
        self.template_row
    }

    #[must_use]
    pub fn template_offset(&self) -> Option<i64> {
        self.template_offset
    }

    #[must_use]
    pub fn editing_mode(&self) -> EditingMode {
        self.editing_mode
    }

    #[must_use]
    pub fn active_pdf_name(&self) -> Option<&str> {
        self.active_pdf_name.as_deref()
    }

    /// Drain the recoverable warnings accumulated since the last call.
    pub fn take_warnings(&mut self) -> Vec<PickWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Replace the page's fragment lookup wholesale. The pinned offset is
    /// page-relative, so navigation unpins it.
    pub fn load_page(&mut self, fragments: FragmentIndex) {
        tracing::debug!(fragments = fragments.len(), "page fragments replaced");
        self.fragments = Some(fragments);
        self.template_offset = None;
    }

    pub fn set_editing_mode(&mut self, mode: EditingMode) {
        self.editing_mode = mode;
    }

    pub fn set_update_all(&mut self, update_all: bool) {
        self.update_all = update_all;
    }

    pub fn set_active_cell(&mut self, row: usize, column: &str) -> Result<(), PickError> {
        if row >= self.table.len() {
            return Err(PickError::RowOutOfRange {
                row,
                row_count: self.table.len(),
            });
        }
        if !self.schema.contains(column) {
            return Err(PickError::UnknownColumn(column.to_string()));
        }
        self.active_cell = ActiveCell {
            row,
            column: column.to_string(),
        };
        Ok(())
    }

    /// Keyboard navigation: move the active cell one step, clamped to the
    /// grid bounds.
    pub fn move_active(&mut self, direction: Direction) {
        match direction {
            Direction::Left => {
                if let Some(position) = self.schema.position(&self.active_cell.column)
                    && position > 0
                {
                    self.active_cell.column = self.schema.columns()[position - 1].clone();
                }
            }
            Direction::Right => {
                if let Some(position) = self.schema.position(&self.active_cell.column)
                    && position + 1 < self.schema.len()
                {
                    self.active_cell.column = self.schema.columns()[position + 1].clone();
                }
            }
            Direction::Up => {
                if self.active_cell.row > 0 {
                    self.active_cell.row -= 1;
                }
            }
            Direction::Down => {
                if self.active_cell.row + 1 < self.table.len() {
                    self.active_cell.row += 1;
                }
            }
        }
    }

    fn append_atom(&mut self, atom: Atom) -> Result<(), PickError> {
        let row = self.active_cell.row;
        let column = self.active_cell.column.clone();
        let mut cell = self
            .table
            .row(row)?
            .get(&column)
            .cloned()
            .unwrap_or_default();
        cell.push(atom);
        self.table = self.table.with_cell(row, column, cell)?;
        Ok(())
    }

    /// Resolve a click in rendered pixel space and append the nearest
    /// fragment to the active cell. No page loaded or click out of bounds is
    /// a silent no-op.
    pub fn click_at(&mut self, x: f32, y: f32, scale: f32) -> Result<bool, PickError> {
        let Some(atom) = self
            .fragments
            .as_ref()
            .and_then(|fragments| fragments.nearest_to_click(x, y, scale))
            .map(Atom::fragment)
        else {
            return Ok(false);
        };
        self.append_atom(atom)?;
        Ok(true)
    }

    /// Append a fragment by its index directly (headless picking).
    pub fn click_fragment(&mut self, index: usize) -> Result<bool, PickError> {
        let Some(atom) = self
            .fragments
            .as_ref()
            .and_then(|fragments| fragments.get(index))
            .map(Atom::fragment)
        else {
            return Ok(false);
        };
        self.append_atom(atom)?;
        Ok(true)
    }

    /// Operators only make sense after an operand; the control stays
    /// disabled on an empty cell or right after another operator.
    #[must_use]
    pub fn can_append_operator(&self) -> bool {
        self.table
            .row(self.active_cell.row)
            .ok()
            .and_then(|row| row.get(&self.active_cell.column))
            .is_some_and(|cell| cell.last().is_some_and(|atom| !atom.is_operator()))
    }

    pub fn append_operator(&mut self, operator: Operator) -> Result<bool, PickError> {
        if !self.can_append_operator() {
            return Ok(false);
        }
        self.append_atom(Atom::Operator(operator))?;
        Ok(true)
    }

    /// Replace the active cell with one manual entry. With update-all on,
    /// the value lands in that column of every row and becomes the default
    /// for rows added later.
    pub fn enter_manual(&mut self, text: impl Into<String>) -> Result<(), PickError> {
        let text = text.into();
        let column = self.active_cell.column.clone();
        let original = self
            .table
            .row(self.active_cell.row)?
            .get(&column)
            .and_then(|cell| match cell.as_slice() {
                [Atom::Manual { str, .. }] => Some(str.clone()),
                _ => None,
            });
        let value = vec![Atom::Manual {
            str: text,
            original,
        }];

        if self.update_all {
            self.default_row = self.default_row.with_cell(column.clone(), value.clone());
            self.table = self.table.with_column_set_all(&column, &value);
        } else {
            self.table = self.table.with_cell(self.active_cell.row, column, value)?;
        }
        Ok(())
    }

    pub fn clear_active_cell(&mut self) -> Result<(), PickError> {
        let column = self.active_cell.column.clone();
        self.table = self.table.with_cell(self.active_cell.row, column, Vec::new())?;
        Ok(())
    }

    pub fn add_row(&mut self) {
        self.table = self.table.with_row_appended(self.default_row.clone());
    }

    pub fn set_template_row(&mut self, row: usize) -> Result<(), PickError> {
        if row >= self.table.len() {
            return Err(PickError::RowOutOfRange {
                row,
                row_count: self.table.len(),
            });
        }
        self.template_row = Some(row);
        Ok(())
    }

    #[must_use]
    pub fn can_apply_template(&self) -> bool {
        self.template_row
            .is_some_and(|template| template != self.active_cell.row)
            && self.fragments.is_some()
    }

    #[must_use]
    pub fn can_add_templated_row(&self) -> bool {
        self.template_row.is_some() && self.template_offset.is_some() && self.fragments.is_some()
    }

    /// Project the template onto a row. `Ok(false)` covers every deferred
    /// case: no template designated, template is the target itself, no page
    /// loaded, or the offset is still undetermined. Nothing mutates then.
    pub fn apply_template_to_row(&mut self, target: usize) -> Result<bool, PickError> {
        let Some(template_index) = self.template_row else {
            return Ok(false);
        };
        if template_index == target {
            return Ok(false);
        }
        let Some(fragments) = &self.fragments else {
            return Ok(false);
        };

        let template = self.table.row(template_index)?;
        let target_row = self.table.row(target)?;
        let Some(offset) =
            template::compute_offset(&self.schema, template, target_row, self.template_offset)
        else {
            return Ok(false);
        };

        let mut warnings = Vec::new();
        let replayed = template::replay(
            &self.schema,
            template,
            target_row,
            target,
            template_index,
            offset,
            fragments,
            &mut warnings,
        );
        self.warnings.extend(warnings);
        self.template_offset = Some(replayed.offset_used);
        self.table = self.table.with_row_replaced(target, replayed.row)?;
        Ok(true)
    }

    pub fn apply_template_to_active_row(&mut self) -> Result<bool, PickError> {
        self.apply_template_to_row(self.active_cell.row)
    }

    /// Append a fresh row and fill it from the template in one step. Only
    /// available once an offset has been pinned; otherwise a no-op.
    pub fn add_templated_row(&mut self) -> Result<bool, PickError> {
        if !self.can_add_templated_row() {
            return Ok(false);
        }
        self.add_row();
        let target = self.table.len() - 1;
        self.active_cell.row = target;
        self.apply_template_to_row(target)
    }

    /// Delete a row; later rows shift up. The template designation follows
    /// the move, and clears when the template itself goes. The grid never
    /// drops to zero rows.
    pub fn delete_row(&mut self, row: usize) -> Result<(), PickError> {
        self.table = self.table.with_row_removed(row)?;
        if self.table.is_empty() {
            self.table = Table::new();
        }
        self.template_row = match self.template_row {
            Some(template) if template == row => None,
            Some(template) if template > row => Some(template - 1),
            other => other,
        };
        if self.active_cell.row >= self.table.len() {
            self.active_cell.row = self.table.len() - 1;
        }
        Ok(())
    }

    /// Deep-capture a row for later pasting.
    pub fn copy_row(&mut self, row: usize) -> Result<(), PickError> {
        self.copied_row = Some(self.table.row(row)?.clone());
        Ok(())
    }

    /// Paste the copied row at a target row, re-resolving every non-manual
    /// atom against the *current* page by index; the pasted row becomes the
    /// new template and the stale offset is unpinned. Meant for carrying a
    /// template across page or document changes.
    pub fn paste_row(&mut self, target: usize) -> Result<bool, PickError> {
        let Some(fragments) = &self.fragments else {
            return Ok(false);
        };
        let Some(copied) = &self.copied_row else {
            return Ok(false);
        };

        let mut warnings = Vec::new();
        let mut row = Row::new();
        for (column, cell) in copied.columns() {
            let refreshed = cell
                .iter()
                .map(|atom| template::translate_atom(atom, 0, fragments, column, &mut warnings))
                .collect();
            row = row.with_cell(column.clone(), refreshed);
        }

        self.warnings.extend(warnings);
        self.table = self.table.with_row_replaced(target, row)?;
        self.template_row = Some(target);
        self.template_offset = None;
        Ok(true)
    }

    /// Nudge the whole template row to a new base fragment index (numeric
    /// stepper in the UI), realigning every clicked reference without
    /// redoing the clicks.
    pub fn adjust_template_base(&mut self, new_base_index: usize) -> Result<bool, PickError> {
        let Some(template_index) = self.template_row else {
            return Ok(false);
        };
        let Some(fragments) = &self.fragments else {
            return Ok(false);
        };

        let mut warnings = Vec::new();
        let row = self.table.row(template_index)?;
        let Some(adjusted) =
            template::adjust_row_base(&self.schema, row, new_base_index, fragments, &mut warnings)
        else {
            return Ok(false);
        };

        self.warnings.extend(warnings);
        self.table = self.table.with_row_replaced(template_index, adjusted)?;
        Ok(true)
    }

    /// Cell text for the grid. Template mode shows `{{index}}` placeholders;
    /// manual mode shows captured text as-is.
    pub fn display_cell(&self, row: usize, column: &str) -> Result<String, PickError> {
        let cell = self.table.row(row)?.get(column);
        let Some(cell) = cell else {
            return Ok(String::new());
        };
        Ok(value::render(
            cell,
            self.editing_mode == EditingMode::Template,
        ))
    }

    /// The fully resolved cell value (what CSV export emits).
    pub fn resolved_cell(&self, row: usize, column: &str) -> Result<String, PickError> {
        let cell = self.table.row(row)?.get(column);
        Ok(cell.map(|cell| value::display(cell)).unwrap_or_default())
    }

    /// Clear the table back to a single empty row; template and clipboard
    /// state go with it.
    pub fn reset(&mut self) {
        self.table = Table::new();
        self.template_row = None;
        self.template_offset = None;
        self.copied_row = None;
        self.active_cell = ActiveCell {
            row: 0,
            column: self.schema.first_column().to_string(),
        };
    }

    pub fn export_csv_string(
        &self,
        options: ExportOptions,
    ) -> Result<(String, ExportReport), PickError> {
        export_table_to_csv_string(&self.table, &self.schema, options)
    }

    fn snapshot(&self) -> SavedSession {
        SavedSession {
            table: self.table.clone(),
            default_row: self.default_row.clone(),
            template_row: self.template_row,
            template_offset: self.template_offset,
            active_pdf_name: self.active_pdf_name.clone(),
            saved_at: Utc::now(),
        }
    }

    pub fn save_to(&self, store: &mut impl KeyValueStore) -> Result<(), PickError> {
        storage::put_json(store, SESSION_STORAGE_KEY, &self.snapshot())
    }

    /// Restore a session saved earlier. Fragment data is not part of the
    /// snapshot; reload the PDF page afterwards.
    pub fn restore_from(
        store: &impl KeyValueStore,
        schema: ColumnSchema,
    ) -> Result<Option<Self>, PickError> {
        let Some(saved) = storage::get_json::<SavedSession>(store, SESSION_STORAGE_KEY)? else {
            return Ok(None);
        };

        let mut session = Self::new(schema);
        session.table = if saved.table.is_empty() {
            Table::new()
        } else {
            saved.table
        };
        session.default_row = saved.default_row;
        session.template_row = saved.template_row.filter(|row| *row < session.table.len());
        session.template_offset = saved.template_offset;
        session.active_pdf_name = saved.active_pdf_name;
        Ok(Some(session))
    }

    /// Keep the uploaded PDF alongside the session so a restart can reopen
    /// the same document.
    pub fn store_active_pdf(
        &mut self,
        store: &mut impl KeyValueStore,
        name: impl Into<String>,
        bytes: &[u8],
    ) -> Result<(), PickError> {
        store.put(PDF_STORAGE_KEY, bytes)?;
        self.active_pdf_name = Some(name.into());
        Ok(())
    }

    pub fn load_active_pdf(
        store: &impl KeyValueStore,
    ) -> Result<Option<Vec<u8>>, PickError> {
        store.get(PDF_STORAGE_KEY)
    }
}

/// Fixed-interval autosave ticker. Driven from the host event loop; each
/// tick takes a point-in-time snapshot and never blocks interactive edits.
#[derive(Debug)]
pub struct Autosaver {
    interval: Duration,
    last_save: Option<Instant>,
}

impl Autosaver {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_save: None,
        }
    }

    #[must_use]
    pub fn with_default_interval() -> Self {
        Self::new(AUTOSAVE_INTERVAL)
    }

    pub fn maybe_save(
        &mut self,
        session: &Session,
        store: &mut impl KeyValueStore,
        now: Instant,
    ) -> Result<bool, PickError> {
        if let Some(last) = self.last_save
            && now.duration_since(last) < self.interval
        {
            return Ok(false);
        }
        session.save_to(store)?;
        self.last_save = Some(now);
        Ok(true)
    }
}
