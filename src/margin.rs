//! The left margin engine: one rail column per active multi-line label in a
//! group, plus the corner/rail glyphs that trace each label's opening and
//! closing lines (`spec.md` §4.8).
//!
//! The turning glyphs a multi-line label's own arrow row draws (`LBot`,
//! `MBot`, `RBot`, the horizontal reach, and the final `RArrow`) are drawn in
//! the *content* area by `render.rs`, not here — this module only computes
//! the rail glyph for a given `(label, line)` pair, which every row kind
//! (code, underline, arrow, ellipsis) queries identically so the rails line
//! up down the page.

use crate::charset::Glyph;
use crate::cluster::MultiSpan;

/// Which kind of row is being drawn, controlling which glyph variant a rail
/// column uses (`spec.md` §4.8 `MarginType`).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum MarginType {
    /// Underline row context: rails go blank, per `spec.md` §4.8.
    None,
    /// Code row.
    Line,
    /// Arrow row.
    Arrow,
    /// A line skipped between two multi-line endpoints.
    Ellipsis,
}

/// The glyph for one label's rail column at `line_no` (`spec.md` §4.8).
#[must_use]
pub fn margin_glyph(m: &MultiSpan, line_no: usize, margin_type: MarginType) -> Glyph {
    if line_no < m.start_line || line_no > m.end_line {
        return Glyph::Space;
    }
    match margin_type {
        MarginType::None => Glyph::Space,
        MarginType::Ellipsis => {
            if line_no == m.start_line {
                Glyph::LTop
            } else if line_no == m.end_line {
                Glyph::LBot
            } else {
                Glyph::VBarGap
            }
        }
        MarginType::Line | MarginType::Arrow => {
            if line_no == m.start_line {
                Glyph::LTop
            } else if line_no == m.end_line {
                Glyph::LBot
            } else {
                Glyph::VBar
            }
        }
    }
}

/// Total margin width in columns: one rail per active multi-line label in
/// the group (`spec.md` §4.8, "per multi-line label in the group").
#[must_use]
pub fn margin_width(multi_spans: &[MultiSpan]) -> usize {
    multi_spans.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::LabelInfo;
    use pretty_assertions::assert_eq;

    fn span(start_line: usize, end_line: usize) -> MultiSpan {
        MultiSpan {
            info: LabelInfo { label_idx: 0, start_char: 0, end_char: 10, multi: true },
            start_line,
            end_line,
        }
    }

    #[test]
    fn rail_is_blank_outside_span() {
        let m = span(2, 4);
        assert_eq!(margin_glyph(&m, 1, MarginType::Line), Glyph::Space);
        assert_eq!(margin_glyph(&m, 5, MarginType::Line), Glyph::Space);
    }

    #[test]
    fn rail_draws_corners_and_continuation() {
        let m = span(2, 4);
        assert_eq!(margin_glyph(&m, 2, MarginType::Line), Glyph::LTop);
        assert_eq!(margin_glyph(&m, 3, MarginType::Line), Glyph::VBar);
        assert_eq!(margin_glyph(&m, 4, MarginType::Line), Glyph::LBot);
    }

    #[test]
    fn ellipsis_rows_use_gapped_bar() {
        let m = span(2, 6);
        assert_eq!(margin_glyph(&m, 4, MarginType::Ellipsis), Glyph::VBarGap);
    }

    #[test]
    fn none_type_is_always_blank() {
        let m = span(2, 4);
        assert_eq!(margin_glyph(&m, 3, MarginType::None), Glyph::Space);
    }
}
