//! Label model, derived `LabelInfo`, and per-source groups
//! (`spec.md` §3 `Label`/`LabelInfo`/`Group`, §4.4 "Group assembly").
//!
//! Grounded on the teacher's `Label`/`Diagnostic` builder shape
//! (`ori_diagnostic::diagnostic`), generalized from a single `Span` per label
//! to the spec's half-open `start_pos..end_pos` plus the multi-line/group
//! bookkeeping a terminal renderer needs that a plain diagnostic struct does
//! not.

use std::collections::HashMap;

use tracing::debug;

use crate::color::ColorFn;
use crate::config::IndexType;
use crate::error::{MusubiError, Result};
use crate::source::Source;
use crate::unicode::{display_width, AmbiguousWidth};

/// A user-supplied label: a span into one source plus a message and the
/// knobs overlap resolution and color use to pick among labels that share a
/// line (`spec.md` §3 `Label`).
#[derive(Clone)]
pub struct Label {
    pub src_id: u32,
    pub start_pos: u32,
    pub end_pos: u32,
    pub message: String,
    /// Explicit display width of `message`, or `None` to auto-compute from
    /// the message text at render time.
    pub message_width: Option<usize>,
    pub color_fn: Option<ColorFn>,
    pub order: i32,
    pub priority: i32,
}

impl Label {
    #[must_use]
    pub fn new(src_id: u32, start_pos: u32, end_pos: u32) -> Self {
        debug_assert!(start_pos <= end_pos, "label start_pos must be <= end_pos");
        Self {
            src_id,
            start_pos,
            end_pos,
            message: String::new(),
            message_width: None,
            color_fn: None,
            order: 0,
            priority: 0,
        }
    }

    /// Resolved display width of the message, honoring an explicit override.
    #[must_use]
    pub fn resolved_message_width(&self, ambiwidth: AmbiguousWidth) -> usize {
        self.message_width
            .unwrap_or_else(|| display_width(&self.message, 0, 1, ambiwidth))
    }
}

/// Derived, per-render facts about a [`Label`]: where it lands once resolved
/// to absolute character offsets, and whether it spans more than one line
/// (`spec.md` §3 `LabelInfo`).
#[derive(Clone, Copy, Debug)]
pub struct LabelInfo {
    /// Index into the `Report`'s label vec.
    pub label_idx: usize,
    pub start_char: u32,
    pub end_char: u32,
    pub multi: bool,
}

impl LabelInfo {
    #[must_use]
    pub fn char_len(&self) -> u32 {
        self.end_char - self.start_char
    }
}

/// All labels touching one source, rendered as one contiguous block
/// (`spec.md` §3 `Group`).
#[derive(Clone, Debug, Default)]
pub struct Group {
    pub src_idx: usize,
    pub labels: Vec<LabelInfo>,
    /// Sorted strictly by descending span length so the longest multi-line
    /// labels get the outer margin rails (`spec.md` §4.4).
    pub multi_labels: Vec<LabelInfo>,
    pub first_char: u32,
    pub last_char: u32,
}

impl Group {
    fn new(src_idx: usize) -> Self {
        Self {
            src_idx,
            labels: Vec::new(),
            multi_labels: Vec::new(),
            first_char: u32::MAX,
            last_char: 0,
        }
    }

    fn widen(&mut self, info: &LabelInfo) {
        self.first_char = self.first_char.min(info.start_char);
        self.last_char = self.last_char.max(info.end_char);
    }
}

/// Resolve one label's byte/char positions to absolute character offsets and
/// a first/last line, per `spec.md` §4.4 step 2.
fn resolve_label_info(
    label_idx: usize,
    label: &Label,
    source: &mut dyn Source,
    index_type: IndexType,
) -> Result<(LabelInfo, usize, usize)> {
    let (first_line_no, start_char) = resolve_pos(label.start_pos, source, index_type)?;
    let (last_line_no, mut end_char) = resolve_pos(label.end_pos, source, index_type)?;

    let table = source.line_table();
    let first_line = table
        .line(first_line_no)
        .copied()
        .ok_or_else(|| MusubiError::Param("label resolves past end of source".to_owned()))?;
    let last_line = table
        .line(last_line_no)
        .copied()
        .ok_or_else(|| MusubiError::Param("label resolves past end of source".to_owned()))?;

    let start_char = start_char.clamp(first_line.char_offset, first_line.char_end());
    let last_bound = last_line.char_end() + u32::from(last_line.newline);
    end_char = end_char.clamp(last_line.char_offset, last_bound);

    if label.start_pos == label.end_pos {
        end_char = start_char;
    }

    let multi = first_line_no != last_line_no;
    let info = LabelInfo {
        label_idx,
        start_char,
        end_char,
        multi,
    };
    Ok((info, first_line_no, last_line_no))
}

/// Resolve a single raw position to `(line_no, absolute_char_offset)`,
/// converting byte offsets to character offsets within their line when
/// `index_type == Byte` (`spec.md` §4.3 "byte-to-character conversion
/// within a line").
fn resolve_pos(
    pos: u32,
    source: &mut dyn Source,
    index_type: IndexType,
) -> Result<(usize, u32)> {
    match index_type {
        IndexType::Char => {
            let line_no = source.line_for_chars(pos);
            Ok((line_no, pos))
        }
        IndexType::Byte => {
            let line_no = source.line_for_bytes(pos);
            let line = source
                .line_table()
                .line(line_no)
                .copied()
                .ok_or_else(|| MusubiError::Param("byte position out of range".to_owned()))?;
            let text = source.get_line(line_no)?;
            let in_line = source.line_table().byte_to_char_in_line(line_no, text, pos);
            Ok((line_no, line.char_offset + in_line))
        }
    }
}

/// Build one [`Group`] per distinct source referenced by `labels`, in the
/// order each source is first seen, initializing each source's line index on
/// first touch (`spec.md` §4.4 "make_groups").
pub fn build_groups(
    labels: &[Label],
    sources: &mut [Box<dyn Source>],
    index_type: IndexType,
) -> Result<Vec<Group>> {
    let mut groups: Vec<Group> = Vec::new();
    let mut index_of: HashMap<u32, usize> = HashMap::new();

    for (label_idx, label) in labels.iter().enumerate() {
        let src_idx = usize::try_from(label.src_id).unwrap_or(usize::MAX);
        let source = sources
            .get_mut(src_idx)
            .ok_or(MusubiError::Source(label.src_id))?;
        source.init()?;

        let gidx = *index_of.entry(label.src_id).or_insert_with(|| {
            debug!(src_id = label.src_id, "opening new label group");
            groups.push(Group::new(src_idx));
            groups.len() - 1
        });

        let (info, _first_line, _last_line) =
            resolve_label_info(label_idx, label, source.as_mut(), index_type)?;

        let group = &mut groups[gidx];
        group.widen(&info);
        if info.multi {
            group.multi_labels.push(info);
        } else {
            group.labels.push(info);
        }
    }

    for group in &mut groups {
        group
            .multi_labels
            .sort_by(|a, b| b.char_len().cmp(&a.char_len()));
    }

    Ok(groups)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use pretty_assertions::assert_eq;

    fn sources(texts: &[&str]) -> Vec<Box<dyn Source>> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Box::new(MemorySource::new(format!("s{i}.txt"), *t)) as Box<dyn Source>)
            .collect()
    }

    #[test]
    fn single_line_label_is_not_multi() {
        let mut srcs = sources(&["abc\ndef\n"]);
        let labels = vec![Label::new(0, 0, 2)];
        let groups = build_groups(&labels, &mut srcs, IndexType::Char).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].labels.len(), 1);
        assert!(!groups[0].labels[0].multi);
    }

    #[test]
    fn label_spanning_lines_is_multi() {
        let mut srcs = sources(&["abc\ndef\nghi\n"]);
        let labels = vec![Label::new(0, 1, 6)];
        let groups = build_groups(&labels, &mut srcs, IndexType::Char).unwrap();
        assert_eq!(groups[0].multi_labels.len(), 1);
        assert!(groups[0].multi_labels[0].multi);
    }

    #[test]
    fn zero_length_label_collapses_to_single_column() {
        let mut srcs = sources(&["abcdef\n"]);
        let labels = vec![Label::new(0, 3, 3)];
        let groups = build_groups(&labels, &mut srcs, IndexType::Char).unwrap();
        let info = groups[0].labels[0];
        assert_eq!(info.start_char, info.end_char);
    }

    #[test]
    fn multi_labels_sorted_by_descending_length() {
        let mut srcs = sources(&["a\nb\nc\nd\ne\n"]);
        let labels = vec![Label::new(0, 0, 4), Label::new(0, 0, 8)];
        let groups = build_groups(&labels, &mut srcs, IndexType::Char).unwrap();
        assert_eq!(groups[0].multi_labels.len(), 2);
        assert!(groups[0].multi_labels[0].char_len() >= groups[0].multi_labels[1].char_len());
    }

    #[test]
    fn unknown_source_id_is_an_error() {
        let mut srcs = sources(&["abc\n"]);
        let labels = vec![Label::new(9, 0, 1)];
        let err = build_groups(&labels, &mut srcs, IndexType::Char).unwrap_err();
        assert_eq!(err, MusubiError::Source(9));
    }

    #[test]
    fn two_sources_produce_two_groups_in_first_seen_order() {
        let mut srcs = sources(&["abc\n", "def\n"]);
        let labels = vec![Label::new(1, 0, 1), Label::new(0, 0, 1)];
        let groups = build_groups(&labels, &mut srcs, IndexType::Char).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].src_idx, 1);
        assert_eq!(groups[1].src_idx, 0);
    }

    #[test]
    fn byte_index_type_converts_multibyte_offsets() {
        let mut srcs = sources(&["a\u{4e2d}b\n"]);
        // byte positions: a=0, 中=1..4, b=4
        let labels = vec![Label::new(0, 1, 4)];
        let groups = build_groups(&labels, &mut srcs, IndexType::Byte).unwrap();
        let info = groups[0].labels[0];
        assert_eq!(info.start_char, 1);
        assert_eq!(info.end_char, 2);
    }
}
