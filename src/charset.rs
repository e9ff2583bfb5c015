//! Drawing glyphs and the two built-in character sets.
//!
//! Every glyph here is wrapped into a [`crate::chunk::Chunk`] (a
//! length-prefixed byte run, conceptually: `spec.md` §4.1) before reaching
//! the writer, so the chunk writer never needs to know whether it is writing
//! a box-drawing character or an ANSI escape sequence — both arrive as the
//! same `Chunk` type.

/// The full set of glyphs the layout engine draws. Indexes a 23-entry
/// character set table; `ascii()` and `unicode()` are the two built-ins.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(usize)]
pub enum Glyph {
    Space,
    Newline,
    LBox,
    RBox,
    Colon,
    HBar,
    VBar,
    XBar,
    VBarBreak,
    VBarGap,
    UArrow,
    RArrow,
    LTop,
    MTop,
    RTop,
    LBot,
    MBot,
    RBot,
    LCross,
    RCross,
    Underbar,
    Underline,
    Ellipsis,
}

/// Number of glyph slots in a character set table.
pub const GLYPH_COUNT: usize = 23;

impl Glyph {
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// A complete character set: one chunk payload per [`Glyph`].
#[derive(Clone, Copy)]
pub struct CharSet {
    table: [&'static str; GLYPH_COUNT],
}

impl CharSet {
    /// Look up the payload string for a glyph.
    #[must_use]
    pub fn get(&self, g: Glyph) -> &'static str {
        self.table[g.index()]
    }

    /// Display width in columns of a single instance of this glyph. Every
    /// built-in glyph but `Ellipsis` is exactly one column wide (ASCII or a
    /// single East-Asian-narrow box-drawing character); `Ellipsis` is one
    /// column in the unicode set (`…`) but three in the ASCII set (`...`),
    /// so it's the one glyph whose width actually depends on the charset in
    /// effect (`spec.md` §4.6's width budget must account for this).
    #[must_use]
    pub fn glyph_width(self, g: Glyph) -> usize {
        self.get(g).chars().count().max(1)
    }
}

/// The plain-ASCII character set. Produces ASCII-only bytes when used
/// exclusively (see `spec.md` §8's round-trip property).
#[must_use]
pub const fn ascii() -> CharSet {
    CharSet {
        table: [
            " ",  // Space
            "\n", // Newline
            "[",  // LBox
            "]",  // RBox
            ":",  // Colon
            "-",  // HBar
            "|",  // VBar
            "+",  // XBar
            ":",  // VBarBreak
            ":",  // VBarGap
            "^",  // UArrow
            ">",  // RArrow
            ",",  // LTop
            "v",  // MTop
            ".",  // RTop
            "'",  // LBot
            "^",  // MBot
            "'",  // RBot
            "+",  // LCross
            "+",  // RCross
            "^",  // Underbar
            "^",  // Underline
            "...", // Ellipsis
        ],
    }
}

/// The unicode box-drawing character set.
#[must_use]
pub const fn unicode() -> CharSet {
    CharSet {
        table: [
            " ",  // Space
            "\n", // Newline
            "[",  // LBox
            "]",  // RBox
            ":",  // Colon
            "\u{2500}", // HBar "─"
            "\u{2502}", // VBar "│"
            "\u{253c}", // XBar "┼"
            "\u{2506}", // VBarBreak "┆"
            "\u{250a}", // VBarGap "┊"
            "\u{25b2}", // UArrow "▲"
            "\u{25b6}", // RArrow "▶"
            "\u{256d}", // LTop "╭"
            "\u{252c}", // MTop "┬"
            "\u{256e}", // RTop "╮"
            "\u{2570}", // LBot "╰"
            "\u{2534}", // MBot "┴"
            "\u{256f}", // RBot "╯"
            "\u{251c}", // LCross "├"
            "\u{2524}", // RCross "┤"
            "\u{2500}", // Underbar "─" (caret row draws its own carets; this
                        // is the plain horizontal continuation under a vbar)
            "\u{2500}", // Underline "─"
            "\u{2026}", // Ellipsis "…"
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_ascii_only() {
        let set = ascii();
        for g in [
            Glyph::HBar,
            Glyph::VBar,
            Glyph::LTop,
            Glyph::RTop,
            Glyph::LBot,
            Glyph::RBot,
            Glyph::Ellipsis,
        ] {
            assert!(set.get(g).is_ascii(), "{g:?} should be ascii");
        }
    }

    #[test]
    fn unicode_ellipsis_is_single_char() {
        assert_eq!(unicode().get(Glyph::Ellipsis), "\u{2026}");
    }
}
