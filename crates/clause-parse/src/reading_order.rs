//! Multi-column reading-order restoration (§4.2: target >= 98% order accuracy
//! on two-column samples).
//!
//! PDF content streams emit text in drawing order, which for a two-column
//! layout interleaves left- and right-column lines by y-position rather than
//! respecting column boundaries. We cluster spans into columns by x-position
//! gaps, then emit column-major, top-to-bottom within each column.

use crate::element::PositionedSpan;

/// Minimum horizontal gap between clusters of x-origins to treat them as
/// separate columns, as a fraction of page width.
const COLUMN_GAP_FRACTION: f32 = 0.08;

pub fn restore_order(mut spans: Vec<PositionedSpan>, page_width: f32) -> Vec<PositionedSpan> {
    if spans.is_empty() {
        return spans;
    }

    let columns = cluster_columns(&spans, page_width);

    spans.sort_by(|a, b| {
        let col_a = column_of(a.x, &columns);
        let col_b = column_of(b.x, &columns);
        col_a
            .cmp(&col_b)
            .then_with(|| b.y.partial_cmp(&a.y).unwrap_or(std::cmp::Ordering::Equal))
    });

    spans
}

/// Returns sorted column boundary x-origins (one per detected column).
fn cluster_columns(spans: &[PositionedSpan], page_width: f32) -> Vec<f32> {
    let mut xs: Vec<f32> = spans.iter().map(|s| s.x).collect();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let gap_threshold = page_width * COLUMN_GAP_FRACTION;
    let mut columns = vec![xs[0]];
    for window in xs.windows(2) {
        if window[1] - window[0] > gap_threshold {
            columns.push(window[1]);
        }
    }
    columns
}

fn column_of(x: f32, columns: &[f32]) -> usize {
    columns
        .iter()
        .rposition(|&col_x| x >= col_x)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(page: u32, x: f32, y: f32, text: &str) -> PositionedSpan {
        PositionedSpan { page, x, y, text: text.to_string(), font_size: 10.0 }
    }

    #[test]
    fn two_column_layout_reads_left_column_fully_before_right() {
        let spans = vec![
            span(1, 10.0, 700.0, "L1"),
            span(1, 300.0, 700.0, "R1"),
            span(1, 10.0, 680.0, "L2"),
            span(1, 300.0, 680.0, "R2"),
        ];
        let ordered = restore_order(spans, 600.0);
        let texts: Vec<&str> = ordered.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["L1", "L2", "R1", "R2"]);
    }

    #[test]
    fn single_column_sorts_top_to_bottom() {
        let spans = vec![span(1, 10.0, 680.0, "second"), span(1, 10.0, 700.0, "first")];
        let ordered = restore_order(spans, 600.0);
        assert_eq!(ordered[0].text, "first");
        assert_eq!(ordered[1].text, "second");
    }
}
