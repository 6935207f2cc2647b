use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::TextFragment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    pub const ALL: [Operator; 4] = [
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
    ];

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "\u{00D7}",
            Self::Divide => "\u{00F7}",
        }
    }

    #[must_use]
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            Self::Add => left + right,
            Self::Subtract => left - right,
            Self::Multiply => left * right,
            Self::Divide => left / right,
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(symbol: &str) -> Result<Self, Self::Err> {
        match symbol.trim() {
            "+" => Ok(Self::Add),
            "-" => Ok(Self::Subtract),
            "\u{00D7}" | "x" | "X" | "*" => Ok(Self::Multiply),
            "\u{00F7}" | "/" => Ok(Self::Divide),
            other => Err(format!("unknown operator: '{other}'")),
        }
    }
}

/// One element of a cell's value sequence. The discriminant is explicit so
/// every consumer matches exhaustively instead of sniffing field shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Atom {
    /// A captured reference to a page fragment, with the text cached at
    /// capture time.
    Fragment { index: usize, str: String },
    /// Binary arithmetic between the neighbouring atoms.
    Operator(Operator),
    /// Free-typed text, never subject to offset translation. `original`
    /// holds the pre-edit text when an existing manual entry is retyped.
    Manual {
        str: String,
        original: Option<String>,
    },
    /// A fragment reference whose translated index had no fragment behind
    /// it. Kept around (index included) so a later offset adjustment can
    /// still recover it; renders as a gap until then.
    Unresolved { index: i64 },
}

impl Atom {
    #[must_use]
    pub fn fragment(fragment: &TextFragment) -> Self {
        Self::Fragment {
            index: fragment.index,
            str: fragment.str.clone(),
        }
    }

    #[must_use]
    pub fn manual(str: impl Into<String>) -> Self {
        Self::Manual {
            str: str.into(),
            original: None,
        }
    }

    /// The raw text this atom contributes, as seen by operand parsing.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Fragment { str, .. } | Self::Manual { str, .. } => str,
            Self::Operator(operator) => operator.symbol(),
            Self::Unresolved { .. } => "",
        }
    }

    #[must_use]
    pub const fn is_operator(&self) -> bool {
        matches!(self, Self::Operator(_))
    }

    #[must_use]
    pub const fn is_manual(&self) -> bool {
        matches!(self, Self::Manual { .. })
    }

    #[must_use]
    pub const fn is_fragment(&self) -> bool {
        matches!(self, Self::Fragment { .. })
    }
}
