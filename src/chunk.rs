//! The chunk writer (`spec.md` §4.1): the single place that turns glyphs,
//! color transitions and raw text into bytes on the sink.
//!
//! A `Chunk` is conceptually a length-prefixed byte run in the original C
//! library (byte 0 = length 1..=63, the rest the payload) so that glyphs and
//! color escapes share one representation at the FFI boundary. In Rust a
//! `&str`/`String` already carries its length, so we drop the length prefix
//! and keep only the "glyphs and escapes are interchangeable small strings"
//! idea: [`Chunk`] is just a `Cow<'static, str>`.

use std::borrow::Cow;

use crate::charset::{CharSet, Glyph};
use crate::color::ColorKind;

/// A length-bounded run of bytes: either a `'static` glyph payload or an
/// owned, dynamically formatted ANSI escape (e.g. from [`crate::color::ColorGenerator`]).
pub type Chunk = Cow<'static, str>;

/// Fixed-size scratch buffer used by the padding fast path (`spec.md` §4.1,
/// "fast memset-and-flush"; `muW_padding` in musubi.h). Sized generously
/// above any realistic terminal width so a single `draw` call for spaces or
/// horizontal rules flushes in one or two writes instead of one per glyph.
const PAD_BUF_LEN: usize = 64;

/// The sink a [`ChunkWriter`] writes bytes through. Mirrors the `spec.md`
/// §6 writer callback `fn(user_data, bytes, len) -> int`: any nonzero return
/// aborts the render. Blanket-implemented for `FnMut(&[u8]) -> i32` closures
/// so callers rarely need to name this trait.
pub trait Sink {
    fn write(&mut self, bytes: &[u8]) -> i32;
}

impl<F: FnMut(&[u8]) -> i32> Sink for F {
    fn write(&mut self, bytes: &[u8]) -> i32 {
        self(bytes)
    }
}

/// Writes glyphs, raw text, and color transitions through a [`Sink`],
/// tracking the color state required by `spec.md`'s invariant: `cur_label`
/// is null whenever `cur_kind == Reset`.
pub struct ChunkWriter<'a> {
    sink: &'a mut dyn Sink,
    charset: CharSet,
    cur_kind: ColorKind,
    /// Identity of the label whose color function is currently active, if
    /// any label-local color is in effect. `None` means the default palette
    /// (or no color at all) is active.
    cur_label: Option<u32>,
}

impl<'a> ChunkWriter<'a> {
    #[must_use]
    pub fn new(sink: &'a mut dyn Sink, charset: CharSet) -> Self {
        Self {
            sink,
            charset,
            cur_kind: ColorKind::Reset,
            cur_label: None,
        }
    }

    /// Write a raw slice of already-encoded text, unconditionally.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), i32> {
        if bytes.is_empty() {
            return Ok(());
        }
        let status = self.sink.write(bytes);
        if status != 0 {
            return Err(status);
        }
        Ok(())
    }

    /// Write a string slice.
    pub fn write_str(&mut self, s: &str) -> Result<(), i32> {
        self.write(s.as_bytes())
    }

    /// Emit `count` copies of `glyph`. Single-byte-payload glyphs use the
    /// padding fast path (a stack buffer filled once and flushed in chunks);
    /// multi-byte glyphs (most unicode box-drawing characters) fall back to
    /// one write per repetition, matching `muW_padding`'s two-path split.
    pub fn draw(&mut self, glyph: Glyph, count: usize) -> Result<(), i32> {
        if count == 0 {
            return Ok(());
        }
        let payload = self.charset.get(glyph);
        if payload.len() == 1 {
            let byte = payload.as_bytes()[0];
            let mut buf = [0_u8; PAD_BUF_LEN];
            buf.fill(byte);
            let mut remaining = count;
            while remaining > 0 {
                let n = remaining.min(PAD_BUF_LEN);
                self.write(&buf[..n])?;
                remaining -= n;
            }
            Ok(())
        } else {
            for _ in 0..count {
                self.write_str(payload)?;
            }
            Ok(())
        }
    }

    /// Write `text` with every occurrence of `from_char` replaced by
    /// `to_char` (used for tab expansion callers that pre-expand tabs to
    /// spaces, and for rendering embedded newlines in footer messages as a
    /// caller-chosen placeholder).
    pub fn replace(&mut self, text: &str, from_char: char, to_char: char) -> Result<(), i32> {
        if text.contains(from_char) {
            let replaced = text.replace(from_char, &to_char.to_string());
            self.write_str(&replaced)
        } else {
            self.write_str(text)
        }
    }

    /// Transition the color state to `kind`, attributing it to `label`
    /// (`None` for the default palette). Emits `Reset` first if the active
    /// kind or label is changing away from a non-reset state, then the new
    /// kind's escape (unless the new kind is itself `Reset`).
    ///
    /// `color_fn` supplies the escape for a kind; it is the label's own
    /// color function if the label has one, else the configuration default,
    /// exactly as `spec.md` §4.1 describes: the writer does not know or
    /// care whether the color comes from a label or the palette.
    pub fn use_color(
        &mut self,
        label: Option<u32>,
        kind: ColorKind,
        color_fn: &dyn Fn(ColorKind) -> String,
    ) -> Result<(), i32> {
        if kind == self.cur_kind && label == self.cur_label {
            return Ok(());
        }
        if self.cur_kind != ColorKind::Reset {
            let reset = color_fn(ColorKind::Reset);
            self.write_str(&reset)?;
        }
        if kind != ColorKind::Reset {
            let escape = color_fn(kind);
            self.write_str(&escape)?;
        }
        self.cur_kind = kind;
        self.cur_label = if kind == ColorKind::Reset { None } else { label };
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::charset::ascii;
    use pretty_assertions::assert_eq;

    #[test]
    fn draw_repeats_single_byte_glyph() {
        let mut out = Vec::new();
        {
            let mut sink = |bytes: &[u8]| {
                out.extend_from_slice(bytes);
                0
            };
            let mut w = ChunkWriter::new(&mut sink, ascii());
            w.draw(Glyph::HBar, 5).unwrap();
        }
        assert_eq!(out, b"-----");
    }

    #[test]
    fn use_color_resets_before_switching_kind() {
        let mut out = Vec::new();
        {
            let mut sink = |bytes: &[u8]| {
                out.extend_from_slice(bytes);
                0
            };
            let mut w = ChunkWriter::new(&mut sink, ascii());
            let color = |k: ColorKind| match k {
                ColorKind::Reset => "R".to_string(),
                ColorKind::Error => "E".to_string(),
                ColorKind::Warning => "W".to_string(),
                _ => String::new(),
            };
            w.use_color(None, ColorKind::Error, &color).unwrap();
            w.use_color(None, ColorKind::Warning, &color).unwrap();
            w.use_color(None, ColorKind::Reset, &color).unwrap();
        }
        assert_eq!(out, b"ERWR");
    }

    #[test]
    fn use_color_is_noop_when_unchanged() {
        let mut out = Vec::new();
        {
            let mut sink = |bytes: &[u8]| {
                out.extend_from_slice(bytes);
                0
            };
            let mut w = ChunkWriter::new(&mut sink, ascii());
            let color = |k: ColorKind| match k {
                ColorKind::Error => "E".to_string(),
                _ => String::new(),
            };
            w.use_color(Some(1), ColorKind::Error, &color).unwrap();
            w.use_color(Some(1), ColorKind::Error, &color).unwrap();
        }
        assert_eq!(out, b"E");
    }

    #[test]
    fn writer_error_short_circuits() {
        let mut sink = |_bytes: &[u8]| 7;
        let mut w = ChunkWriter::new(&mut sink, ascii());
        let err = w.write_str("x").unwrap_err();
        assert_eq!(err, 7);
    }
}
