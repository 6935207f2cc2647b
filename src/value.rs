use std::fmt::{Display, Formatter};

use crate::atom::Atom;

/// A cell's value: the ordered sequence of atoms the user assembled.
/// Insertion order is semantic, it defines evaluation order.
pub type CellValue = Vec<Atom>;

/// Parse a cell operand as a number. Group separators are stripped first so
/// figures like `1,234` from tabular PDFs stay numeric.
#[must_use]
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim().replace(',', "");
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedTerm {
    Number(f64),
    Text(String),
}

impl ResolvedTerm {
    /// Coerce this term to a number; text that does not parse becomes NaN so
    /// downstream arithmetic degrades instead of erroring.
    #[must_use]
    pub fn as_number(&self) -> f64 {
        match self {
            Self::Number(value) => *value,
            Self::Text(text) => parse_number(text).unwrap_or(f64::NAN),
        }
    }

    #[must_use]
    pub fn is_uncalculable(&self) -> bool {
        matches!(self, Self::Number(value) if value.is_nan())
    }
}

impl Display for ResolvedTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

fn render_atom(atom: &Atom, template_mode: bool) -> String {
    match atom {
        Atom::Fragment { index, str } => {
            if template_mode {
                format!("{{{{{index}}}}}")
            } else {
                str.clone()
            }
        }
        Atom::Operator(operator) => operator.symbol().to_string(),
        Atom::Manual { str, .. } => str.clone(),
        Atom::Unresolved { .. } => String::new(),
    }
}

/// Render a cell for display. In template mode fragment references show as
/// `{{index}}` placeholders; a cell holding nothing but manual entries always
/// shows the manual text, placeholders make no sense for it.
#[must_use]
pub fn render(value: &[Atom], template_mode: bool) -> String {
    if value.is_empty() {
        return String::new();
    }

    let manual_only = value.iter().all(Atom::is_manual);
    value
        .iter()
        .map(|atom| render_atom(atom, template_mode && !manual_only))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduce a cell's atom sequence to its resolved terms in a single
/// left-to-right pass.
///
/// An operator consumes the previously produced term (or, when none has been
/// produced yet, the previous atom's text parsed as a number) as its left
/// operand and the next atom's text as its right operand; the right operand
/// is thereby spent. A trailing operator is inert. A leading operator with
/// nothing on either side of the output is skipped without consuming its
/// neighbour. Operands that fail to parse become NaN; resolution itself
/// never fails.
#[must_use]
pub fn resolve(value: &[Atom]) -> Vec<ResolvedTerm> {
    let mut terms: Vec<ResolvedTerm> = Vec::new();
    let mut index = 0;

    while index < value.len() {
        match &value[index] {
            Atom::Unresolved { .. } => {}
            Atom::Operator(operator) if index + 1 < value.len() => {
                let left = match terms.pop() {
                    Some(term) => term.as_number(),
                    None => {
                        if index == 0 {
                            index += 1;
                            continue;
                        }
                        parse_number(value[index - 1].text()).unwrap_or(f64::NAN)
                    }
                };
                let right = parse_number(value[index + 1].text()).unwrap_or(f64::NAN);
                terms.push(ResolvedTerm::Number(operator.apply(left, right)));
                index += 1;
            }
            Atom::Operator(_) => {}
            Atom::Manual { str, .. } => terms.push(ResolvedTerm::Text(str.clone())),
            Atom::Fragment { str, .. } => {
                if let Some(number) = parse_number(str) {
                    terms.push(ResolvedTerm::Number(number));
                } else {
                    match terms.pop() {
                        Some(previous) => {
                            terms.push(ResolvedTerm::Text(format!("{previous} {str}")));
                        }
                        None => terms.push(ResolvedTerm::Text(str.clone())),
                    }
                }
            }
        }
        index += 1;
    }

    terms
}

/// The final single-string value of a cell: resolved terms space-joined.
/// This is what non-template display and CSV export emit.
#[must_use]
pub fn display(value: &[Atom]) -> String {
    resolve(value)
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use crate::atom::{Atom, Operator};

    use super::{ResolvedTerm, display, parse_number, render, resolve};

    fn frag(index: usize, str: &str) -> Atom {
        Atom::Fragment {
            index,
            str: str.to_string(),
        }
    }

    #[test]
    fn empty_value_resolves_to_nothing() {
        assert_eq!(resolve(&[]), Vec::<ResolvedTerm>::new());
        assert_eq!(render(&[], true), "");
    }

    #[test]
    fn manual_entry_resolves_to_its_text() {
        let value = vec![Atom::manual("x")];
        assert_eq!(resolve(&value), vec![ResolvedTerm::Text("x".to_string())]);
    }

    #[test]
    fn applies_operator_between_numeric_fragments() {
        let value = vec![frag(0, "5"), Atom::Operator(Operator::Add), frag(1, "3")];
        assert_eq!(resolve(&value), vec![ResolvedTerm::Number(8.0)]);
        assert_eq!(display(&value), "8");
    }

    #[test]
    fn trailing_operator_is_inert() {
        let value = vec![frag(0, "5"), Atom::Operator(Operator::Add)];
        assert_eq!(resolve(&value), vec![ResolvedTerm::Number(5.0)]);
    }

    #[test]
    fn leading_operator_is_skipped_without_consuming_its_neighbour() {
        let value = vec![Atom::Operator(Operator::Add), frag(0, "7")];
        assert_eq!(resolve(&value), vec![ResolvedTerm::Number(7.0)]);
    }

    #[test]
    fn chains_operators_left_to_right() {
        let value = vec![
            frag(0, "10"),
            Atom::Operator(Operator::Subtract),
            frag(1, "4"),
            Atom::Operator(Operator::Multiply),
            frag(2, "3"),
        ];
        assert_eq!(resolve(&value), vec![ResolvedTerm::Number(18.0)]);
    }

    #[test]
    fn non_numeric_operand_propagates_nan() {
        let value = vec![
            frag(0, "5"),
            Atom::Operator(Operator::Add),
            frag(1, "precinct"),
        ];
        let terms = resolve(&value);
        assert_eq!(terms.len(), 1);
        assert!(terms[0].is_uncalculable());
    }

    #[test]
    fn adjacent_text_fragments_merge_with_single_space() {
        let value = vec![frag(0, "Saint"), frag(1, "Louis")];
        assert_eq!(
            resolve(&value),
            vec![ResolvedTerm::Text("Saint Louis".to_string())]
        );
    }

    #[test]
    fn grouped_numbers_parse_after_comma_stripping() {
        assert_eq!(parse_number("1,234"), Some(1234.0));
        assert_eq!(parse_number(" 42 "), Some(42.0));
        assert_eq!(parse_number("precinct"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn template_mode_renders_placeholders() {
        let value = vec![frag(3, "98"), Atom::Operator(Operator::Add), frag(7, "2")];
        assert_eq!(render(&value, true), "{{3}} + {{7}}");
        assert_eq!(render(&value, false), "98 + 2");
    }

    #[test]
    fn manual_only_cell_never_shows_placeholders() {
        let value = vec![Atom::manual("Lake County")];
        assert_eq!(render(&value, true), "Lake County");
    }

    #[test]
    fn unresolved_atoms_render_as_gap_and_resolve_to_nothing() {
        let value = vec![frag(0, "A"), Atom::Unresolved { index: 99 }, frag(1, "B")];
        assert_eq!(render(&value, false), "A  B");
        assert_eq!(
            resolve(&value),
            vec![ResolvedTerm::Text("A B".to_string())]
        );
    }

    #[test]
    fn standalone_number_survives_as_a_term() {
        let value = vec![frag(0, "precinct"), frag(1, "12")];
        assert_eq!(
            resolve(&value),
            vec![
                ResolvedTerm::Text("precinct".to_string()),
                ResolvedTerm::Number(12.0)
            ]
        );
    }
}
