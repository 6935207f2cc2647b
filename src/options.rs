use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Column id of the non-data action column the grid pins on the left. It
/// never holds cell values and is excluded from basis search and export.
pub const ACTION_COLUMN_ID: &str = "apply-template";

/// Default column set: precinct-level election results, the workload this
/// tool was built around.
const DEFAULT_COLUMNS: [&str; 19] = [
    "State",
    "County",
    "Precinct",
    "republican_registrations",
    "democrat_registrations",
    "registered_voters",
    "republican_votes_total",
    "democrat_votes_total",
    "total_votes_overall",
    "total_votes_election_day",
    "total_votes_early",
    "total_votes_absentee",
    "democrat_votes_election_day",
    "democrat_votes_early",
    "democrat_votes_absentee",
    "republican_votes_election_day",
    "republican_votes_early",
    "republican_votes_absentee",
    "overall_turnout",
];

/// The fixed, ordered set of data columns every row shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    columns: Vec<String>,
}

impl ColumnSchema {
    /// Build a schema from explicit column names. Names must be non-empty,
    /// unique, and must not shadow the action column.
    pub fn new(columns: Vec<String>) -> Result<Self, String> {
        if columns.is_empty() {
            return Err("schema requires at least one column".to_string());
        }
        for (position, column) in columns.iter().enumerate() {
            if column.trim().is_empty() {
                return Err("column names must be non-empty".to_string());
            }
            if column == ACTION_COLUMN_ID {
                return Err(format!("'{ACTION_COLUMN_ID}' is reserved for row actions"));
            }
            if columns[..position].contains(column) {
                return Err(format!("duplicate column name: '{column}'"));
            }
        }
        Ok(Self { columns })
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub fn first_column(&self) -> &str {
        &self.columns[0]
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|candidate| candidate == column)
    }

    #[must_use]
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|candidate| candidate == column)
    }
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl FromStr for ColumnSchema {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let columns = spec
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        Self::new(columns)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub delimiter: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{ACTION_COLUMN_ID, ColumnSchema};

    #[test]
    fn default_schema_keeps_declaration_order() {
        let schema = ColumnSchema::default();
        assert_eq!(schema.first_column(), "State");
        assert_eq!(schema.position("Precinct"), Some(2));
        assert_eq!(schema.len(), 19);
    }

    #[test]
    fn parses_comma_separated_columns() {
        let schema = ColumnSchema::from_str("date, event ,count").expect("schema should parse");
        assert_eq!(schema.columns(), ["date", "event", "count"]);
    }

    #[test]
    fn rejects_reserved_and_duplicate_names() {
        let err =
            ColumnSchema::from_str(&format!("a,{ACTION_COLUMN_ID}")).expect_err("reserved name");
        assert!(err.contains("reserved"));

        let err = ColumnSchema::from_str("a,b,a").expect_err("duplicate name");
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn rejects_empty_schema() {
        assert!(ColumnSchema::from_str(" , ").is_err());
    }
}
