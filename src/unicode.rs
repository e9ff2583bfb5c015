//! Display width and budget-based slicing (`spec.md` §4.2).
//!
//! The original C library hand-rolls UTF-8 decoding (forward and backward)
//! because it works over raw byte buffers with no type-level validity
//! guarantee. Every `&str` this crate touches is already guaranteed valid
//! UTF-8 by the type itself, so decoding is exactly `str::chars()` /
//! `str::char_indices()` / grapheme iteration — there is no analogous
//! "malformed byte" recovery path to port. What *is* ported is the width and
//! budget-slicing policy itself: ambiguous-width handling, tab expansion,
//! and grapheme joining for flags/skin tones/ZWJ sequences.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

/// Ambiguous-width policy (`spec.md` §6 `ambiwidth: 1|2`).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AmbiguousWidth {
    Narrow,
    Wide,
}

/// Display width in columns of a single code point, honoring `ambiwidth`.
/// Zero-width code points (combining marks) return 0; control characters
/// (for which `unicode-width` returns `None`) are treated as zero-width too,
/// since the engine never draws raw control bytes itself (tabs and `\n` are
/// special-cased by callers before this is reached).
///
/// `ambiwidth` only changes the width of codepoints in Unicode's "Ambiguous"
/// East Asian Width category (`spec.md` §6 `ambiwidth: 1|2`): `width()`
/// reports those as narrow (1 column), `width_cjk()` reports them as wide (2
/// columns), matching the two configured policies exactly.
#[must_use]
pub fn char_width(c: char, ambiwidth: AmbiguousWidth) -> usize {
    let w = match ambiwidth {
        AmbiguousWidth::Narrow => c.width(),
        AmbiguousWidth::Wide => c.width_cjk(),
    };
    w.unwrap_or(0)
}

/// Returns true if `c` is a joiner that should be treated as width-0 and
/// folded into the previous grapheme when building a per-column width cache:
/// the zero-width joiner, skin-tone modifier selectors, and (by construction
/// of the caller, which only calls this on the second of a pair) a regional
/// indicator following another regional indicator.
#[must_use]
pub fn is_width_zero_joiner(c: char) -> bool {
    c == '\u{200d}' || ('\u{1f3fb}'..='\u{1f3ff}').contains(&c)
}

#[must_use]
pub fn is_regional_indicator(c: char) -> bool {
    ('\u{1f1e6}'..='\u{1f1ff}').contains(&c)
}

/// Display width of `text` with tabs expanded from a starting `column` and
/// grapheme joiners folded, mirroring the per-column width cache the
/// cluster builder computes over a line (`spec.md` §4.5 step 5).
#[must_use]
pub fn display_width(text: &str, start_column: usize, tab_width: usize, ambiwidth: AmbiguousWidth) -> usize {
    let mut column = start_column;
    let mut prev_regional = false;
    for c in text.chars() {
        if c == '\t' {
            let step = tab_width.saturating_sub(column % tab_width.max(1)).max(1);
            column += step;
            prev_regional = false;
            continue;
        }
        if c == '\n' {
            continue;
        }
        if is_width_zero_joiner(c) {
            continue;
        }
        if is_regional_indicator(c) {
            if prev_regional {
                prev_regional = false;
                continue;
            }
            prev_regional = true;
            column += char_width(c, ambiwidth);
            continue;
        }
        prev_regional = false;
        column += char_width(c, ambiwidth);
    }
    column - start_column
}

/// Remove leading code points from `s` until its remaining display width is
/// `<= width`; returns the trimmed slice and the unused portion of the
/// budget. Used for left-ellipsizing filenames (`spec.md` §4.2).
#[must_use]
pub fn keep_suffix(s: &str, width: usize, ambiwidth: AmbiguousWidth) -> (&str, usize) {
    let total = display_width(s, 0, 1, ambiwidth);
    if total <= width {
        return (s, width - total);
    }
    for (byte_idx, _c) in s.char_indices() {
        let remaining = display_width(&s[byte_idx..], 0, 1, ambiwidth);
        if remaining <= width {
            return (&s[byte_idx..], width - remaining);
        }
    }
    ("", width)
}

/// Keep a leading prefix of `s` whose display width is `<= width`; returns
/// the kept slice and the unused budget. Used for right-ellipsizing line
/// content (`spec.md` §4.2, §4.6).
#[must_use]
pub fn keep_prefix(s: &str, width: usize, ambiwidth: AmbiguousWidth) -> (&str, usize) {
    let mut column = 0;
    let mut end = 0;
    for (byte_idx, c) in s.char_indices() {
        let w = char_width(c, ambiwidth);
        if column + w > width {
            return (&s[..end], width - column);
        }
        column += w;
        end = byte_idx + c.len_utf8();
    }
    (&s[..end], width - column)
}

/// Grapheme-aware truncation helper used by the reference-row filename
/// ellipsis: true grapheme clusters (not raw code points) are counted so a
/// flag emoji or ZWJ sequence is never split.
#[must_use]
pub fn grapheme_count(s: &str) -> usize {
    s.graphemes(true).count()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ascii_width_is_one_per_char() {
        assert_eq!(display_width("hello", 0, 4, AmbiguousWidth::Narrow), 5);
    }

    #[test]
    fn tab_expands_to_next_stop() {
        assert_eq!(display_width("\t", 0, 4, AmbiguousWidth::Narrow), 4);
        assert_eq!(display_width("\t", 1, 4, AmbiguousWidth::Narrow), 3);
        assert_eq!(display_width("a\t", 0, 4, AmbiguousWidth::Narrow), 4);
    }

    #[test]
    fn double_wide_char_counts_two() {
        assert_eq!(display_width("\u{4e2d}", 0, 4, AmbiguousWidth::Narrow), 2);
    }

    #[test]
    fn keep_suffix_trims_from_left() {
        let (kept, slack) = keep_suffix("abcdef", 3, AmbiguousWidth::Narrow);
        assert_eq!(kept, "def");
        assert_eq!(slack, 0);
    }

    #[test]
    fn keep_suffix_noop_when_it_fits() {
        let (kept, slack) = keep_suffix("ab", 5, AmbiguousWidth::Narrow);
        assert_eq!(kept, "ab");
        assert_eq!(slack, 3);
    }

    #[test]
    fn keep_prefix_trims_from_right() {
        let (kept, slack) = keep_prefix("abcdef", 3, AmbiguousWidth::Narrow);
        assert_eq!(kept, "abc");
        assert_eq!(slack, 0);
    }

    #[test]
    fn ambiguous_width_char_honors_policy() {
        // U+00A7 SECTION SIGN is East Asian Width "Ambiguous": narrow under
        // the default policy, wide when `ambiwidth = 2` is configured.
        assert_eq!(char_width('\u{a7}', AmbiguousWidth::Narrow), 1);
        assert_eq!(char_width('\u{a7}', AmbiguousWidth::Wide), 2);
    }

    #[test]
    fn regional_indicator_pair_is_one_cell() {
        let flag = "\u{1f1fa}\u{1f1f8}"; // US flag
        assert_eq!(grapheme_count(flag), 1);
        assert_eq!(display_width(flag, 0, 4, AmbiguousWidth::Narrow), 2);
    }
}
