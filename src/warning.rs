#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningCode {
    UncalculableValue,
    UnresolvedFragment,
    EmptyExport,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickWarning {
    pub code: WarningCode,
    pub message: String,
    pub row: Option<usize>,
    pub column: Option<String>,
    pub fragment_index: Option<i64>,
}

impl PickWarning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            row: None,
            column: None,
            fragment_index: None,
        }
    }

    #[must_use]
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_fragment_index(mut self, index: i64) -> Self {
        self.fragment_index = Some(index);
        self
    }
}
