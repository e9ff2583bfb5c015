//! Line-label collection, cluster building, and the column-range solver
//! (`spec.md` §4.5, §4.6).
//!
//! This is the geometric heart of the engine: for one line of one group, it
//! decides which labels touch the line, how they're ordered, how they're
//! packed into one or more horizontal windows ("clusters") that fit the
//! configured width, and exactly which `[start_col, end_col)` of the line
//! each cluster shows.

use crate::charset::Glyph;
use crate::config::{Config, LabelAttach};
use crate::label::{Group, Label, LabelInfo};
use crate::line::Line;
use crate::source::Source;
use crate::unicode::{display_width, is_regional_indicator, is_width_zero_joiner, AmbiguousWidth};

/// A multi-line label resolved to its opening and closing line numbers, so
/// line-label collection doesn't re-run a source lookup for every line it
/// iterates over (`spec.md` §4.5 step 1).
#[derive(Clone, Copy, Debug)]
pub struct MultiSpan {
    pub info: LabelInfo,
    pub start_line: usize,
    pub end_line: usize,
}

/// Resolve every multi-line label in `group` to its start/end line numbers.
/// Call once per group per render, not once per line.
#[must_use]
pub fn resolve_multi_spans(group: &Group, source: &dyn Source) -> Vec<MultiSpan> {
    group
        .multi_labels
        .iter()
        .map(|info| {
            let start_line = source.line_for_chars(info.start_char);
            let end_line = if info.end_char > info.start_char {
                source.line_for_chars(info.end_char - 1)
            } else {
                start_line
            };
            MultiSpan {
                info: *info,
                start_line,
                end_line,
            }
        })
        .collect()
}

/// Resolve every single-line label in `group` to its containing line number.
#[must_use]
pub fn resolve_single_lines(group: &Group, source: &dyn Source) -> Vec<(LabelInfo, usize)> {
    group
        .labels
        .iter()
        .map(|info| (*info, source.line_for_chars(info.start_char)))
        .collect()
}

/// True if `line_no` lies strictly between some multi-line label's start and
/// end lines without being either endpoint — the "only multi-line labels
/// straddle it" case that renders as an ellipsis row (`spec.md` §4.5 step 4,
/// §8 boundary case).
#[must_use]
pub fn line_straddled_by_multi(line_no: usize, multi_spans: &[MultiSpan]) -> bool {
    multi_spans
        .iter()
        .any(|m| line_no > m.start_line && line_no < m.end_line)
}

/// A per-line placement record for one label: which anchor column, and
/// whether its message is drawn on this line (`spec.md` §3 `LineLabel`).
#[derive(Clone, Copy, Debug)]
pub struct LineLabel {
    pub label_idx: usize,
    pub info: LabelInfo,
    pub col: u32,
    pub draw_msg: bool,
}

fn attach_col(start_col: u32, end_col: u32, attach: LabelAttach) -> u32 {
    match attach {
        LabelAttach::Start => start_col,
        LabelAttach::End => end_col,
        LabelAttach::Middle => start_col + (end_col - start_col) / 2,
    }
}

/// Collect and sort the line-labels touching `line_no` (`spec.md` §4.5
/// steps 1-3).
#[must_use]
pub fn collect_line_labels(
    line_no: usize,
    line: &Line,
    multi_spans: &[MultiSpan],
    singles: &[(LabelInfo, usize)],
    labels: &[Label],
    config: &Config,
) -> Vec<LineLabel> {
    let mut out = Vec::new();

    for m in multi_spans {
        if line_no == m.start_line {
            let col = m.info.start_char - line.char_offset;
            out.push(LineLabel {
                label_idx: m.info.label_idx,
                info: m.info,
                col,
                draw_msg: false,
            });
        } else if line_no == m.end_line {
            let last = m.info.end_char.saturating_sub(1).max(line.char_offset);
            let col = last - line.char_offset;
            out.push(LineLabel {
                label_idx: m.info.label_idx,
                info: m.info,
                col,
                draw_msg: true,
            });
        }
    }

    for (info, ln) in singles {
        if *ln != line_no {
            continue;
        }
        let start_col = info.start_char - line.char_offset;
        let end_col = info
            .end_char
            .saturating_sub(1)
            .max(info.start_char)
            - line.char_offset;
        let col = attach_col(start_col, end_col, config.label_attach);
        out.push(LineLabel {
            label_idx: info.label_idx,
            info: *info,
            col,
            draw_msg: true,
        });
    }

    out.sort_by(|a, b| {
        let oa = labels[a.label_idx].order;
        let ob = labels[b.label_idx].order;
        oa.cmp(&ob)
            .then(a.col.cmp(&b.col))
            .then(a.info.char_len().cmp(&b.info.char_len()))
            .then(a.label_idx.cmp(&b.label_idx))
    });

    out
}

/// A horizontal window over one line that a subset of its line-labels fit
/// into, given the width budget (`spec.md` §3 `Cluster`).
#[derive(Clone, Debug)]
pub struct Cluster {
    pub line_no: usize,
    pub line: Line,
    pub margin_label: Option<LineLabel>,
    pub line_labels: Vec<LineLabel>,
    pub arrow_len: u32,
    pub min_col: u32,
    pub max_msg_width: usize,
    pub start_col: u32,
    pub end_col: u32,
}

impl Cluster {
    /// Every line-label in the cluster, margin label included, in the order
    /// they should be considered for cell queries.
    pub fn all_labels(&self) -> impl Iterator<Item = &LineLabel> {
        self.margin_label.iter().chain(self.line_labels.iter())
    }
}

struct Building {
    margin_label: Option<LineLabel>,
    line_labels: Vec<LineLabel>,
    min_col: u32,
    max_col: u32,
    max_msg_width: usize,
}

impl Building {
    fn new() -> Self {
        Self {
            margin_label: None,
            line_labels: Vec::new(),
            min_col: u32::MAX,
            max_col: 0,
            max_msg_width: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.margin_label.is_none() && self.line_labels.is_empty()
    }

    fn push(&mut self, ll: LineLabel, labels: &[Label], ambiwidth: AmbiguousWidth) {
        self.min_col = self.min_col.min(ll.col);
        self.max_col = self.max_col.max(ll.col);
        if ll.draw_msg {
            let w = labels[ll.label_idx].resolved_message_width(ambiwidth);
            self.max_msg_width = self.max_msg_width.max(w);
        }
        if ll.info.multi && self.margin_label.is_none() {
            self.margin_label = Some(ll);
        } else {
            self.line_labels.push(ll);
        }
    }

    fn budget(&self, extra_arrow_len: u32) -> u32 {
        (self.max_col - self.min_col) + extra_arrow_len + 1 + self.max_msg_width as u32
    }

    fn finish(self, line_no: usize, line: Line, extra_arrow_len: u32) -> Cluster {
        let min_col = if self.min_col == u32::MAX { 0 } else { self.min_col };
        Cluster {
            line_no,
            line,
            margin_label: self.margin_label,
            line_labels: self.line_labels,
            arrow_len: self.max_col + extra_arrow_len,
            min_col,
            max_msg_width: self.max_msg_width,
            start_col: 0,
            end_col: 0,
        }
    }
}

/// Partition a line's sorted line-labels into one or more clusters that each
/// fit inside `config.limit_width` (`spec.md` §4.5 step 6). With
/// `limit_width == 0` the line is never split.
#[must_use]
pub fn build_clusters(
    line_no: usize,
    line: &Line,
    line_labels: &[LineLabel],
    labels: &[Label],
    config: &Config,
) -> Vec<Cluster> {
    if line_labels.is_empty() {
        return Vec::new();
    }
    let extra_arrow_len = if config.compact { 1 } else { 2 };
    let mut clusters = Vec::new();
    let mut current = Building::new();

    for &ll in line_labels {
        if config.limit_width > 0 && !current.is_empty() {
            let mut probe = Building::new();
            probe.min_col = current.min_col.min(ll.col);
            probe.max_col = current.max_col.max(ll.col);
            probe.max_msg_width = current.max_msg_width;
            if ll.draw_msg {
                let w = labels[ll.label_idx].resolved_message_width(config.ambiwidth);
                probe.max_msg_width = probe.max_msg_width.max(w);
            }
            if probe.budget(extra_arrow_len) as usize > config.limit_width {
                clusters.push(std::mem::replace(&mut current, Building::new()).finish(
                    line_no,
                    *line,
                    extra_arrow_len,
                ));
            }
        }
        current.push(ll, labels, config.ambiwidth);
    }
    if !current.is_empty() {
        clusters.push(current.finish(line_no, *line, extra_arrow_len));
    }
    clusters
}

/// Per-column cumulative display width of a line's text, tab-expanded and
/// grapheme-joined exactly as [`crate::unicode::display_width`] computes a
/// whole-string width, but retained per prefix so the column-range solver
/// can binary search it (`spec.md` §4.5 step 5 "width cache").
#[must_use]
pub fn build_width_cache(text: &str, tab_width: usize, ambiwidth: AmbiguousWidth) -> Vec<u32> {
    let mut cache = Vec::with_capacity(text.chars().count() + 2);
    cache.push(0u32);
    let mut column = 0u32;
    let mut prev_regional = false;
    for c in text.chars() {
        if c == '\t' {
            let step = tab_width.saturating_sub((column as usize) % tab_width.max(1)).max(1);
            column += step as u32;
            prev_regional = false;
        } else if c == '\n' {
            // terminator is not part of the line's own content
        } else if is_width_zero_joiner(c) {
            // folds into previous cell, no width
        } else if is_regional_indicator(c) {
            if prev_regional {
                prev_regional = false;
            } else {
                prev_regional = true;
                column += display_width(&c.to_string(), 0, tab_width, ambiwidth) as u32;
            }
        } else {
            prev_regional = false;
            column += display_width(&c.to_string(), 0, tab_width, ambiwidth) as u32;
        }
        cache.push(column);
    }
    cache
}

fn width_at(cache: &[u32], col: u32) -> u32 {
    cache[(col as usize).min(cache.len() - 1)]
}

/// Largest column in `[lo, hi]` whose cumulative width relative to `lo` does
/// not exceed `budget` (`spec.md` §4.6 `width_index`).
#[must_use]
pub fn width_index(cache: &[u32], lo: u32, hi: u32, budget: u32) -> u32 {
    if lo >= hi {
        return lo;
    }
    let base = width_at(cache, lo);
    let mut low = lo;
    let mut high = hi;
    while low < high {
        let mid = low + (high - low + 1) / 2;
        if width_at(cache, mid) - base <= budget {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    low
}

/// Smallest column in `[lo, hi]` whose cumulative width relative to `hi` does
/// not exceed `budget` — the symmetric counterpart of [`width_index`] used to
/// grow a cluster's visible window leftward from its anchor.
#[must_use]
pub fn width_index_from_end(cache: &[u32], lo: u32, hi: u32, budget: u32) -> u32 {
    if lo >= hi {
        return lo;
    }
    let top = width_at(cache, hi);
    let mut low = lo;
    let mut high = hi;
    while low < high {
        let mid = low + (high - low) / 2;
        if top - width_at(cache, mid) <= budget {
            high = mid;
        } else {
            low = mid + 1;
        }
    }
    low
}

/// The visible `[start_col, end_col)` window a cluster's code/underline/arrow
/// rows draw, plus whether prefix/suffix content was elided.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ColumnRange {
    pub start_col: u32,
    pub end_col: u32,
    pub skip_prefix: bool,
    pub skip_suffix: bool,
}

/// Choose a cluster's visible column range so that `line_no_width + 4 +
/// margin_width + (visible content width) + 1 + max_msg_width` fits inside
/// `config.limit_width` (`spec.md` §4.6). Always returns the full line when
/// `limit_width == 0`.
#[must_use]
pub fn solve_column_range(
    cluster: &Cluster,
    width_cache: &[u32],
    line_char_len: u32,
    config: &Config,
    line_no_width: usize,
    margin_width: usize,
) -> ColumnRange {
    if config.limit_width == 0 {
        return ColumnRange {
            start_col: 0,
            end_col: line_char_len,
            skip_prefix: false,
            skip_suffix: false,
        };
    }

    let ellipsis_width = config.charset.glyph_width(Glyph::Ellipsis) as u32;
    let fixed = line_no_width as u32 + 4 + margin_width as u32 + 1 + cluster.max_msg_width as u32;
    let limit = config.limit_width as u32;
    let budget_for_content = limit.saturating_sub(fixed);

    let min_col = cluster.min_col.min(line_char_len);
    let arrow_end = cluster.arrow_len.min(line_char_len);

    let essential_width = width_at(width_cache, arrow_end) - width_at(width_cache, min_col);

    if essential_width > budget_for_content {
        let reserve = ellipsis_width.min(budget_for_content);
        let inner_budget = budget_for_content.saturating_sub(reserve);
        let end_col = width_index(width_cache, min_col, line_char_len, inner_budget).max(min_col);
        return ColumnRange {
            start_col: min_col,
            end_col,
            skip_prefix: min_col > 0,
            skip_suffix: end_col < line_char_len,
        };
    }

    let slack = budget_for_content - essential_width;
    let left_avail = width_at(width_cache, min_col);
    let right_avail = width_at(width_cache, line_char_len) - width_at(width_cache, arrow_end);

    if left_avail == 0 && right_avail <= slack {
        return ColumnRange {
            start_col: 0,
            end_col: line_char_len,
            skip_prefix: false,
            skip_suffix: false,
        };
    }

    let total_avail = left_avail + right_avail;
    let left_budget = if total_avail == 0 {
        0
    } else {
        (slack * left_avail / total_avail).min(left_avail)
    };
    let right_budget = (slack - left_budget).min(right_avail);

    let start_col = width_index_from_end(width_cache, 0, min_col, left_budget);
    let end_col = width_index(width_cache, arrow_end, line_char_len, right_budget);

    ColumnRange {
        start_col,
        end_col,
        skip_prefix: start_col > 0,
        skip_suffix: end_col < line_char_len,
    }
}
