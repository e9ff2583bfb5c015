//! Render configuration (`spec.md` §6 "Configuration fields").
//!
//! A [`Config`] is cheap to clone and may be replaced on a [`crate::Report`]
//! mid-lifecycle; `spec.md` §4.10 and §9 note that one upstream variant
//! refuses a config swap once labels exist while another recomputes — this
//! port takes the recompute branch (see `DESIGN.md`), so there is nothing
//! here that needs to reject a late `set_config`.

use std::rc::Rc;

use crate::charset::{self, CharSet};
use crate::color::{default_color, ColorFn};
use crate::unicode::AmbiguousWidth;

/// Where an inline (single-line) label's caret/arrow anchors within its span.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum LabelAttach {
    Start,
    #[default]
    Middle,
    End,
}

/// Whether label positions are expressed as byte offsets or character
/// offsets into the source (`spec.md` §6 `index_type: byte|char`).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum IndexType {
    Byte,
    #[default]
    Char,
}

/// Render-time configuration. `limit_width == 0` disables width limiting
/// entirely (`spec.md` §4.6).
#[derive(Clone)]
pub struct Config {
    /// When two arrows cross in the margin or an arrow row, prefer drawing a
    /// horizontal bar with a gap rather than an `XBar` glyph.
    pub cross_gap: bool,
    /// Suppresses blank margin rows between unlabeled lines and the
    /// underline row (`spec.md` §4.5 step 4, §4.9).
    pub compact: bool,
    /// Whether to draw the underline row at all.
    pub underlines: bool,
    /// Whether multi-line labels get an up-arrow glyph on their first drawn
    /// underline row (`spec.md` §4.9).
    pub multiline_arrows: bool,
    pub tab_width: usize,
    /// Total rendering width budget; `0` disables limiting.
    pub limit_width: usize,
    pub ambiwidth: AmbiguousWidth,
    pub label_attach: LabelAttach,
    pub index_type: IndexType,
    /// Default color function, used for any label with no color of its own.
    /// `None` produces ANSI-escape-free output (`spec.md` §8).
    pub color: Option<ColorFn>,
    pub charset: CharSet,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cross_gap: false,
            compact: false,
            underlines: true,
            multiline_arrows: true,
            tab_width: 4,
            limit_width: 0,
            ambiwidth: AmbiguousWidth::Narrow,
            label_attach: LabelAttach::Middle,
            index_type: IndexType::Char,
            color: Some(Rc::new(default_color)),
            charset: charset::unicode(),
        }
    }
}

impl Config {
    /// The color function in effect for a label, honoring the spec's rule
    /// that the writer never distinguishes label-local from default colors:
    /// the label's own function wins if present, else the config default,
    /// else a const `""` (no color at all).
    #[must_use]
    pub fn color_for(&self, label_color: Option<&ColorFn>) -> ColorFn {
        if let Some(f) = label_color {
            return f.clone();
        }
        if let Some(f) = &self.color {
            return f.clone();
        }
        Rc::new(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorKind;

    #[test]
    fn default_limit_width_disables_limiting() {
        assert_eq!(Config::default().limit_width, 0);
    }

    #[test]
    fn no_color_config_produces_empty_escapes() {
        let mut cfg = Config::default();
        cfg.color = None;
        let f = cfg.color_for(None);
        assert_eq!(f(ColorKind::Error), "");
    }

    #[test]
    fn label_color_overrides_default() {
        let cfg = Config::default();
        let label_fn: ColorFn = Rc::new(|_| "LABEL".to_owned());
        let f = cfg.color_for(Some(&label_fn));
        assert_eq!(f(ColorKind::Error), "LABEL");
    }
}
