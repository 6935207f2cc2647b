use crate::atom::Atom;
use crate::fragments::FragmentIndex;
use crate::options::{ACTION_COLUMN_ID, ColumnSchema};
use crate::table::Row;
use crate::warning::{PickWarning, WarningCode};

/// Outcome of projecting a template onto a target row: the synthesized row
/// and the (unscaled) stride that produced it, for the caller to pin.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayedRow {
    pub row: Row,
    pub offset_used: i64,
}

fn first_fragment_index(value: &[Atom]) -> Option<usize> {
    value.iter().find_map(|atom| match atom {
        Atom::Fragment { index, .. } => Some(*index),
        _ => None,
    })
}

/// The basis column: first schema column in which the target row holds at
/// least one real fragment reference, i.e. where the user has clicked the
/// page. The action column never qualifies.
#[must_use]
pub fn basis_column<'schema>(schema: &'schema ColumnSchema, row: &Row) -> Option<&'schema str> {
    schema
        .columns()
        .iter()
        .filter(|column| column.as_str() != ACTION_COLUMN_ID)
        .find(|column| {
            row.get(column)
                .is_some_and(|value| first_fragment_index(value).is_some())
        })
        .map(String::as_str)
}

/// Infer the stride between a template row and a target row, in
/// fragment-index space.
///
/// A previously pinned offset wins unconditionally, keeping one consistent
/// stride per page for the whole session. Otherwise the offset is the signed
/// difference between the first fragment index of the target's basis column
/// and the template's fragment index in that same column. `None` means the
/// target row does not yet carry enough click data to infer anything, and
/// replay must be deferred.
#[must_use]
pub fn compute_offset(
    schema: &ColumnSchema,
    template: &Row,
    target: &Row,
    pinned: Option<i64>,
) -> Option<i64> {
    if let Some(offset) = pinned {
        return Some(offset);
    }

    let basis = basis_column(schema, target)?;
    let target_index = target.get(basis).and_then(|value| first_fragment_index(value))?;
    let template_index = template.get(basis).and_then(|value| first_fragment_index(value))?;

    let offset = i64::try_from(target_index).ok()? - i64::try_from(template_index).ok()?;
    tracing::debug!(basis, offset, "inferred template offset");
    Some(offset)
}

pub(crate) fn translate_atom(
    atom: &Atom,
    effective_offset: i64,
    fragments: &FragmentIndex,
    column: &str,
    warnings: &mut Vec<PickWarning>,
) -> Atom {
    let translated = match atom {
        Atom::Operator(_) | Atom::Manual { .. } => return atom.clone(),
        Atom::Fragment { index, .. } => *index as i64 + effective_offset,
        // A stale placeholder can come back into range under a new offset.
        Atom::Unresolved { index } => index + effective_offset,
    };

    match fragments.get_translated(translated) {
        Some(fragment) => Atom::fragment(fragment),
        None => {
            warnings.push(
                PickWarning::new(
                    WarningCode::UnresolvedFragment,
                    "translated fragment index is outside the current page",
                )
                .with_column(column)
                .with_fragment_index(translated),
            );
            Atom::Unresolved { index: translated }
        }
    }
}

/// Project the template row onto a target row.
///
/// The stride scales linearly with row distance (`offset * (target_index -
/// template_index)`), so one call extrapolates forwards, backwards, and
/// across multi-row gaps. Columns the target already populated are left
/// untouched; operator and manual atoms copy verbatim; fragment references
/// translate and re-resolve against the current page, degrading to an
/// unresolved placeholder when the translated index has no fragment.
#[must_use]
pub fn replay(
    schema: &ColumnSchema,
    template: &Row,
    target: &Row,
    target_index: usize,
    template_index: usize,
    offset: i64,
    fragments: &FragmentIndex,
    warnings: &mut Vec<PickWarning>,
) -> ReplayedRow {
    let row_distance = target_index as i64 - template_index as i64;
    let effective_offset = offset * row_distance;

    let mut row = target.clone();
    for column in schema.columns() {
        if target.is_populated(column) {
            continue;
        }
        let Some(template_value) = template.get(column).filter(|value| !value.is_empty()) else {
            continue;
        };

        let value = template_value
            .iter()
            .map(|atom| translate_atom(atom, effective_offset, fragments, column, warnings))
            .collect();
        row = row.with_cell(column.clone(), value);
    }

    ReplayedRow {
        row,
        offset_used: offset,
    }
}

/// Re-anchor a templated row at a user-supplied base index: every fragment
/// reference (and recoverable placeholder) in the row shifts by
/// `new_base - current_base` and picks up the text found at its new index.
/// Manual entries and operators stay put. `None` when the row holds no
/// fragment basis to measure from.
#[must_use]
pub fn adjust_row_base(
    schema: &ColumnSchema,
    row: &Row,
    new_base_index: usize,
    fragments: &FragmentIndex,
    warnings: &mut Vec<PickWarning>,
) -> Option<Row> {
    let basis = basis_column(schema, row)?;
    let current_base = row.get(basis).and_then(|value| first_fragment_index(value))?;
    let offset = i64::try_from(new_base_index).ok()? - i64::try_from(current_base).ok()?;

    let mut adjusted = row.clone();
    for (column, value) in row.columns() {
        if value.is_empty() {
            continue;
        }
        let translated = value
            .iter()
            .map(|atom| translate_atom(atom, offset, fragments, column, warnings))
            .collect();
        adjusted = adjusted.with_cell(column.clone(), translated);
    }
    Some(adjusted)
}
