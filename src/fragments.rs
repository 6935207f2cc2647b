use std::cmp::Ordering;

use crate::model::TextFragment;

/// Raw positioned text, as handed over by the extraction layer before any
/// ordering or indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSpan {
    pub text: String,
    pub position_x: f32,
    pub position_y: f32,
}

/// The per-page fragment lookup table: blank-filtered spans in reading order
/// (top-to-bottom, then left-to-right), each carrying its dense index.
/// Immutable for as long as the page is displayed; page navigation replaces
/// the whole value.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentIndex {
    fragments: Vec<TextFragment>,
    page_width: f32,
    page_height: f32,
}

fn reading_order(a: &RawSpan, b: &RawSpan) -> Ordering {
    if (a.position_y - b.position_y).abs() < f32::EPSILON {
        a.position_x
            .partial_cmp(&b.position_x)
            .unwrap_or(Ordering::Equal)
    } else {
        b.position_y
            .partial_cmp(&a.position_y)
            .unwrap_or(Ordering::Equal)
    }
}

impl FragmentIndex {
    #[must_use]
    pub fn build(spans: Vec<RawSpan>, page_width: f32, page_height: f32) -> Self {
        let mut spans = spans
            .into_iter()
            .filter(|span| !span.text.trim().is_empty())
            .collect::<Vec<_>>();
        spans.sort_by(reading_order);

        let fragments = spans
            .into_iter()
            .enumerate()
            .map(|(index, span)| TextFragment {
                index,
                str: span.text.trim().to_string(),
                position_x: span.position_x,
                position_y: span.position_y,
            })
            .collect();

        Self {
            fragments,
            page_width,
            page_height,
        }
    }

    #[must_use]
    pub fn fragments(&self) -> &[TextFragment] {
        &self.fragments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    #[must_use]
    pub fn page_width(&self) -> f32 {
        self.page_width
    }

    #[must_use]
    pub fn page_height(&self) -> f32 {
        self.page_height
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TextFragment> {
        self.fragments.get(index)
    }

    /// Lookup for offset-translated indices, which may have gone negative.
    #[must_use]
    pub fn get_translated(&self, index: i64) -> Option<&TextFragment> {
        usize::try_from(index).ok().and_then(|index| self.get(index))
    }

    /// Resolve a click in rendered pixel space to the nearest fragment.
    /// Fragment coordinates are in PDF space (y grows upward), clicks are in
    /// screen space (y grows downward), so the y axis is inverted before the
    /// Euclidean comparison. Clicks outside the rendered page box resolve to
    /// nothing.
    #[must_use]
    pub fn nearest_to_click(&self, click_x: f32, click_y: f32, scale: f32) -> Option<&TextFragment> {
        if scale <= 0.0 {
            return None;
        }
        let rendered_width = self.page_width * scale;
        let rendered_height = self.page_height * scale;
        if !(0.0..=rendered_width).contains(&click_x) || !(0.0..=rendered_height).contains(&click_y)
        {
            return None;
        }

        self.fragments.iter().min_by(|a, b| {
            let da = distance_to_click(a, click_x, click_y, rendered_height, scale);
            let db = distance_to_click(b, click_x, click_y, rendered_height, scale);
            da.partial_cmp(&db).unwrap_or(Ordering::Equal)
        })
    }
}

fn distance_to_click(
    fragment: &TextFragment,
    click_x: f32,
    click_y: f32,
    rendered_height: f32,
    scale: f32,
) -> f32 {
    let dx = fragment.position_x * scale - click_x;
    let dy = rendered_height - fragment.position_y * scale - click_y;
    dx.hypot(dy)
}

#[cfg(test)]
mod tests {
    use super::{FragmentIndex, RawSpan};

    fn span(text: &str, x: f32, y: f32) -> RawSpan {
        RawSpan {
            text: text.to_string(),
            position_x: x,
            position_y: y,
        }
    }

    #[test]
    fn sorts_top_to_bottom_then_left_to_right_with_dense_indices() {
        let index = FragmentIndex::build(
            vec![
                span("bottom-right", 200.0, 100.0),
                span("top-right", 200.0, 700.0),
                span("top-left", 50.0, 700.0),
                span("bottom-left", 50.0, 100.0),
            ],
            595.0,
            842.0,
        );

        let texts = index
            .fragments()
            .iter()
            .map(|fragment| fragment.str.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            texts,
            ["top-left", "top-right", "bottom-left", "bottom-right"]
        );
        let indices = index
            .fragments()
            .iter()
            .map(|fragment| fragment.index)
            .collect::<Vec<_>>();
        assert_eq!(indices, [0, 1, 2, 3]);
    }

    #[test]
    fn drops_blank_spans_and_trims_text() {
        let index = FragmentIndex::build(
            vec![span("  ", 10.0, 10.0), span("  kept  ", 20.0, 10.0)],
            595.0,
            842.0,
        );
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(0).expect("fragment should exist").str, "kept");
    }

    #[test]
    fn translated_lookup_rejects_negative_and_out_of_range() {
        let index = FragmentIndex::build(vec![span("only", 10.0, 10.0)], 595.0, 842.0);
        assert!(index.get_translated(0).is_some());
        assert!(index.get_translated(-1).is_none());
        assert!(index.get_translated(5).is_none());
    }

    #[test]
    fn click_resolves_to_nearest_fragment_with_inverted_y() {
        let index = FragmentIndex::build(
            vec![span("high", 100.0, 800.0), span("low", 100.0, 50.0)],
            595.0,
            842.0,
        );

        // A click near the top of the rendered page (small screen y) must hit
        // the fragment with the LARGE pdf y.
        let hit = index
            .nearest_to_click(100.0, 30.0, 1.0)
            .expect("click should resolve");
        assert_eq!(hit.str, "high");

        let hit = index
            .nearest_to_click(100.0, 800.0, 1.0)
            .expect("click should resolve");
        assert_eq!(hit.str, "low");
    }

    #[test]
    fn click_outside_page_box_resolves_to_none() {
        let index = FragmentIndex::build(vec![span("only", 10.0, 10.0)], 595.0, 842.0);
        assert!(index.nearest_to_click(-5.0, 10.0, 1.0).is_none());
        assert!(index.nearest_to_click(10.0, 900.0, 1.0).is_none());
        // Scaling grows the clickable area with the rendered page.
        assert!(index.nearest_to_click(700.0, 10.0, 1.25).is_some());
    }
}
