//! Per-cell queries used while emitting the code, underline, and arrow rows
//! (`spec.md` §4.7). All three are O(k) over the small set of labels live on
//! the current line/cluster; the row painters call them once per column so
//! the three passes must agree on tie-breaks or glyphs stop lining up.

use crate::cluster::Cluster;
use crate::label::{Label, LabelInfo};
use crate::unicode::AmbiguousWidth;

/// Candidate tracked while scanning for the highest-priority, shortest-span
/// label touching a position. Shared by [`highlight_label`] and
/// [`underline_owner`] since both use the same priority/length tiebreak.
struct Best {
    label_idx: usize,
    priority: i32,
    span: u32,
}

fn consider(best: &mut Option<Best>, label_idx: usize, priority: i32, span: u32) {
    let better = match best {
        None => true,
        Some(b) => priority > b.priority || (priority == b.priority && span < b.span),
    };
    if better {
        *best = Some(Best { label_idx, priority, span });
    }
}

/// The label that provides the foreground color at character position `p`:
/// among the margin label, the group's multi-line labels, and the cluster's
/// other line-labels, the one with strictly highest `priority`, ties broken
/// by strictly shorter span, further ties keeping the first encountered
/// (`spec.md` §4.7 "Highlight").
#[must_use]
pub fn highlight_label(
    p: u32,
    cluster: &Cluster,
    group_multi: &[LabelInfo],
    labels: &[Label],
) -> Option<usize> {
    let mut best = None;
    let mut try_info = |best: &mut Option<Best>, label_idx: usize, info: &LabelInfo| {
        if info.start_char <= p && p < info.end_char {
            consider(best, label_idx, labels[label_idx].priority, info.char_len());
        }
    };
    if let Some(ml) = &cluster.margin_label {
        try_info(&mut best, ml.label_idx, &ml.info);
    }
    for info in group_multi {
        try_info(&mut best, info.label_idx, info);
    }
    for ll in &cluster.line_labels {
        try_info(&mut best, ll.label_idx, &ll.info);
    }
    best.map(|b| b.label_idx)
}

/// The line-label that owns the vertical bar glyph at `(row, col)`, where
/// `row` indexes into `cluster.line_labels` (the order arrow rows are
/// emitted in): a label anchored at `col`, carrying a message or itself
/// multi-line, whose own row index is `<= row` — so above its row the bar
/// continues, and at/below it the painter turns it into an arrowhead or
/// corner instead (`spec.md` §4.7 "Vertical bar"). The cluster's margin
/// label is never a candidate: it is drawn entirely by the margin engine.
#[must_use]
pub fn vbar_owner(
    col: u32,
    row: usize,
    cluster: &Cluster,
    labels: &[Label],
    ambiwidth: AmbiguousWidth,
) -> Option<usize> {
    for (i, ll) in cluster.line_labels.iter().enumerate() {
        if ll.col != col || i > row {
            continue;
        }
        let msg_width = labels[ll.label_idx].resolved_message_width(ambiwidth);
        if msg_width > 0 || ll.info.multi {
            return Some(ll.label_idx);
        }
    }
    None
}

/// The single-line label that owns the underline overlay at column `p`:
/// among non-multi labels in the cluster with `start_char <= p <=
/// last_char`, the highest priority, ties broken by shortest span
/// (`spec.md` §4.7 "Underline"). Callers gate this on `config.underlines`
/// and only apply it to the cluster's first drawn underline row.
#[must_use]
pub fn underline_owner(p: u32, cluster: &Cluster, labels: &[Label]) -> Option<usize> {
    let mut best = None;
    for ll in &cluster.line_labels {
        if ll.info.multi {
            continue;
        }
        if ll.info.start_char <= p && p < ll.info.end_char {
            consider(&mut best, ll.label_idx, labels[ll.label_idx].priority, ll.info.char_len());
        }
    }
    best.map(|b| b.label_idx)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::cluster::LineLabel;
    use crate::label::Label;
    use crate::line::Line;
    use pretty_assertions::assert_eq;

    fn line_label(idx: usize, start: u32, end: u32, col: u32, multi: bool) -> LineLabel {
        LineLabel {
            label_idx: idx,
            info: LabelInfo { label_idx: idx, start_char: start, end_char: end, multi },
            col,
            draw_msg: true,
        }
    }

    fn cluster(line_labels: Vec<LineLabel>) -> Cluster {
        Cluster {
            line_no: 0,
            line: Line { char_offset: 0, byte_offset: 0, char_len: 20, byte_len: 20, newline: true },
            margin_label: None,
            line_labels,
            arrow_len: 10,
            min_col: 0,
            max_msg_width: 5,
            start_col: 0,
            end_col: 20,
        }
    }

    #[test]
    fn highlight_picks_highest_priority() {
        let labels = vec![
            Label { priority: 1, ..Label::new(0, 0, 5) },
            Label { priority: 5, ..Label::new(0, 2, 4) },
        ];
        let c = cluster(vec![line_label(0, 0, 5, 0, false), line_label(1, 2, 4, 2, false)]);
        assert_eq!(highlight_label(3, &c, &[], &labels), Some(1));
    }

    #[test]
    fn highlight_ties_broken_by_shorter_span() {
        let labels = vec![
            Label { priority: 0, ..Label::new(0, 0, 10) },
            Label { priority: 0, ..Label::new(0, 3, 5) },
        ];
        let c = cluster(vec![line_label(0, 0, 10, 0, false), line_label(1, 3, 5, 3, false)]);
        assert_eq!(highlight_label(4, &c, &[], &labels), Some(1));
    }

    #[test]
    fn underline_ignores_multi_line_labels() {
        let labels = vec![Label::new(0, 0, 10)];
        let c = cluster(vec![line_label(0, 0, 10, 0, true)]);
        assert_eq!(underline_owner(5, &c, &labels), None);
    }

    #[test]
    fn vbar_owner_respects_row_ordering() {
        let labels = vec![
            Label { message: "msg".to_owned(), ..Label::new(0, 0, 5) },
            Label { message: "msg".to_owned(), ..Label::new(0, 0, 5) },
        ];
        let c = cluster(vec![line_label(0, 0, 5, 3, false), line_label(1, 0, 5, 3, false)]);
        assert_eq!(vbar_owner(3, 0, &c, &labels, AmbiguousWidth::Narrow), Some(0));
        assert_eq!(vbar_owner(3, 1, &c, &labels, AmbiguousWidth::Narrow), Some(0));
    }
}
