//! Line records and the per-source line index (`spec.md` §3 `Line`, §4.3).
//!
//! Generalizes the teacher workspace's byte-offset-only `LineOffsetTable`
//! (`ori_diagnostic::span_utils`) to the dual char/byte indexing `spec.md`
//! requires, since labels may be expressed in either index space
//! (`Config::index_type`).

use smallvec::SmallVec;

/// One line of a source. `char_len`/`byte_len` cover the line's content only
/// (not the terminator); `newline` records whether a `\n` follows.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct Line {
    pub char_offset: u32,
    pub byte_offset: u32,
    pub char_len: u32,
    pub byte_len: u32,
    pub newline: bool,
}

impl Line {
    #[must_use]
    pub fn char_end(&self) -> u32 {
        self.char_offset + self.char_len
    }

    #[must_use]
    pub fn byte_end(&self) -> u32 {
        self.byte_offset + self.byte_len
    }
}

/// A sorted table of [`Line`] records supporting O(log L) lookup by either
/// character or byte offset. Built once per source (on first `init`) and
/// reused for the source's lifetime.
#[derive(Clone, Default, Debug)]
pub struct LineTable {
    lines: SmallVec<[Line; 16]>,
}

impl LineTable {
    #[must_use]
    pub fn new() -> Self {
        Self { lines: SmallVec::new() }
    }

    /// Scan `text` once, splitting on `\n`, and build the index. Mirrors the
    /// in-memory source's `init` (`spec.md` §4.3): each `\n` closes the
    /// current line with `newline = true`; a source with no trailing
    /// newline still gets a final line record with `newline = false`.
    #[must_use]
    pub fn build(text: &str) -> Self {
        let mut scanner = LineScanner::new();
        scanner.feed(text);
        scanner.finish()
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    /// Binary search for the line containing character offset `pos`. The
    /// upper bound includes the line's virtual `\n` character (`spec.md`
    /// §3 `Line`: "tile the source with exactly one `\n` virtual character
    /// of length 1"), so a position exactly on a line's terminator resolves
    /// to that line rather than the next one.
    #[must_use]
    pub fn line_for_char(&self, pos: u32) -> usize {
        self.search(pos, |l| l.char_end() + u32::from(l.newline))
    }

    /// Binary search for the line containing byte offset `pos`, with the
    /// same virtual-newline upper bound as [`Self::line_for_char`].
    #[must_use]
    pub fn line_for_byte(&self, pos: u32) -> usize {
        self.search(pos, |l| l.byte_end() + u32::from(l.newline))
    }

    fn search(&self, pos: u32, end_of: impl Fn(&Line) -> u32) -> usize {
        if self.lines.is_empty() {
            return 0;
        }
        let mut lo = 0usize;
        let mut hi = self.lines.len() - 1;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if pos < end_of(&self.lines[mid]) {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }

    /// Convert a byte offset within line `line_no` to a character offset
    /// within the same line, by walking the line's text (`spec.md` §4.3,
    /// "byte-to-character conversion within a line").
    #[must_use]
    pub fn byte_to_char_in_line(&self, line_no: usize, line_text: &str, byte_pos: u32) -> u32 {
        let line = match self.lines.get(line_no) {
            Some(l) => l,
            None => return 0,
        };
        let target = byte_pos.saturating_sub(line.byte_offset);
        let mut chars = 0u32;
        let mut bytes = 0u32;
        for c in line_text.chars() {
            if bytes >= target {
                break;
            }
            bytes += u32::try_from(c.len_utf8()).unwrap_or(1);
            chars += 1;
        }
        chars
    }
}

/// Builds a [`LineTable`] incrementally across multiple calls to `feed`,
/// each given an arbitrary chunk of valid UTF-8. Lets the file source scan a
/// file in fixed-size blocks (`spec.md` §4.3) without ever holding the whole
/// file's decoded text at once.
#[derive(Default)]
pub struct LineScanner {
    lines: SmallVec<[Line; 16]>,
    char_offset: u32,
    byte_offset: u32,
    char_len: u32,
    byte_len: u32,
    line_start_char: u32,
    line_start_byte: u32,
    saw_any: bool,
}

impl LineScanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, text: &str) {
        for c in text.chars() {
            self.saw_any = true;
            if c == '\n' {
                self.lines.push(Line {
                    char_offset: self.line_start_char,
                    byte_offset: self.line_start_byte,
                    char_len: self.char_len,
                    byte_len: self.byte_len,
                    newline: true,
                });
                self.char_offset += self.char_len + 1;
                self.byte_offset += self.byte_len + 1;
                self.line_start_char = self.char_offset;
                self.line_start_byte = self.byte_offset;
                self.char_len = 0;
                self.byte_len = 0;
            } else {
                self.char_len += 1;
                self.byte_len += u32::try_from(c.len_utf8()).unwrap_or(1);
            }
        }
    }

    #[must_use]
    pub fn finish(mut self) -> LineTable {
        if self.char_len > 0 || self.byte_len > 0 || !self.saw_any {
            self.lines.push(Line {
                char_offset: self.line_start_char,
                byte_offset: self.line_start_byte,
                char_len: self.char_len,
                byte_len: self.byte_len,
                newline: false,
            });
        }
        LineTable { lines: self.lines }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_lines_with_trailing_newline() {
        let table = LineTable::build("ab\ncd\n");
        assert_eq!(table.line_count(), 2);
        assert_eq!(table.line(0).unwrap().char_len, 2);
        assert!(table.line(0).unwrap().newline);
        assert_eq!(table.line(1).unwrap().char_offset, 3);
    }

    #[test]
    fn builds_final_line_without_trailing_newline() {
        let table = LineTable::build("ab\ncd");
        assert_eq!(table.line_count(), 2);
        assert!(!table.line(1).unwrap().newline);
    }

    #[test]
    fn empty_source_has_one_empty_line() {
        let table = LineTable::build("");
        assert_eq!(table.line_count(), 1);
        assert_eq!(table.line(0).unwrap().char_len, 0);
    }

    #[test]
    fn line_for_char_finds_correct_line() {
        let table = LineTable::build("abc\ndef\nghi");
        assert_eq!(table.line_for_char(0), 0);
        assert_eq!(table.line_for_char(3), 0);
        assert_eq!(table.line_for_char(4), 1);
        assert_eq!(table.line_for_char(10), 2);
    }

    #[test]
    fn line_for_byte_matches_multibyte_offsets() {
        let table = LineTable::build("a\u{4e2d}b\ncd");
        // line 0 is "a中b" -> byte_len = 1 + 3 + 1 = 5
        assert_eq!(table.line(0).unwrap().byte_len, 5);
        assert_eq!(table.line_for_byte(4), 0);
        assert_eq!(table.line_for_byte(6), 1);
    }

    #[test]
    fn byte_to_char_in_line_counts_code_points() {
        let table = LineTable::build("a\u{4e2d}b");
        let text = "a\u{4e2d}b";
        assert_eq!(table.byte_to_char_in_line(0, text, 0), 0);
        assert_eq!(table.byte_to_char_in_line(0, text, 1), 1);
        assert_eq!(table.byte_to_char_in_line(0, text, 4), 2);
    }
}
