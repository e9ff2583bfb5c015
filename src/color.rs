//! Color kinds, the color callback contract (`spec.md` §6), and the
//! deterministic color generator supplemented from `musubi.h`.

use std::rc::Rc;

/// The semantic role a chunk of colored text plays, passed to the active
/// color function so it can pick an escape sequence. `Reset` always clears
/// back to the terminal default.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ColorKind {
    Reset,
    Error,
    Warning,
    Kind,
    Margin,
    SkippedMargin,
    Unimportant,
    Note,
    Label,
}

/// A color callback: given a [`ColorKind`], returns the escape sequence to
/// emit for it. Stored as `Rc` rather than a bare function pointer since a
/// label's color may close over per-label state (e.g. a [`ColorGenerator`]
/// output captured at label-construction time).
pub type ColorFn = Rc<dyn Fn(ColorKind) -> String>;

/// The default ANSI SGR palette (`spec.md` §6).
#[must_use]
pub fn default_color(kind: ColorKind) -> String {
    match kind {
        ColorKind::Reset => "\x1b[0m".to_owned(),
        ColorKind::Error => "\x1b[31m".to_owned(),
        ColorKind::Warning => "\x1b[33m".to_owned(),
        ColorKind::Kind => "\x1b[38;5;147m".to_owned(),
        ColorKind::Margin => "\x1b[38;5;246m".to_owned(),
        ColorKind::SkippedMargin => "\x1b[38;5;240m".to_owned(),
        ColorKind::Unimportant => "\x1b[38;5;249m".to_owned(),
        ColorKind::Note => "\x1b[38;5;115m".to_owned(),
        ColorKind::Label => "\x1b[39m".to_owned(),
    }
}

/// Deterministic per-label color generator, ported verbatim from musubi.h's
/// `mu_colorgen_init`/`mu_colorgen_next` (lines 474-496) so two independent
/// ports of this crate agree on which colors a given sequence of
/// `next_color()` calls produces (`spec.md` §8's round-trip property
/// implicitly assumes this).
///
/// Three lanes are seeded `30000`/`15000`/`35000` and advanced by the same
/// additive recurrence (`state[i] += 40503 * (i*4 + 1130); state[i] %=
/// 65536`), then mapped through a `min_brightness` floor (a fraction in
/// `0.0..=1.0`, not a cube level) into the blue/green/red channel widths `5`,
/// `30`, `180` of the 216-color cube (`ESC[38;5;16..=231m`); `state[0]` feeds
/// the widest (red) weight and `state[2]` the narrowest (blue), matching the
/// C source's own lane-to-weight pairing.
#[derive(Clone, Debug)]
pub struct ColorGenerator {
    state: [i32; 3],
    min_brightness: f32,
}

impl ColorGenerator {
    /// `min_brightness` is the lowest fraction (`0.0..=1.0`) any channel may
    /// fall to, keeping generated colors off pure black; values outside the
    /// range are clamped.
    #[must_use]
    pub fn new(min_brightness: f32) -> Self {
        Self {
            state: [30000, 15000, 35000],
            min_brightness: min_brightness.clamp(0.0, 1.0),
        }
    }

    /// Advance the generator and return the next color as a complete
    /// `ESC[38;5;Nm` chunk.
    pub fn next_color(&mut self) -> String {
        format!("\x1b[38;5;{}m", self.next_code())
    }

    /// Advance the generator and return the next color's 256-color code.
    /// Each channel's float contribution is truncated toward zero and added
    /// in turn, exactly as the C source's `code += (int)(...)` does.
    pub fn next_code(&mut self) -> i32 {
        for (i, s) in self.state.iter_mut().enumerate() {
            *s = (*s + 40503 * (i as i32 * 4 + 1130)) % 65536;
        }
        let lane = |v: i32| (v as f32 / 65535.0) * (1.0 - self.min_brightness) + self.min_brightness;
        let mut code = 16_i32;
        code += (lane(self.state[2]) * 5.0) as i32;
        code += (lane(self.state[1]) * 30.0) as i32;
        code += (lane(self.state[0]) * 180.0) as i32;
        code
    }
}
