//! Musubi: a layout and rendering engine for richly annotated diagnostic
//! reports, rendered as aligned, boxed, colored terminal text.
//!
//! Given one or more source texts and a flat list of labels (spans with
//! messages) into those texts, [`Report`] computes the two-dimensional
//! character grid a compiler or linter's diagnostics are usually drawn as —
//! grouping labels by source, mapping positions to line/column, packing
//! overlapping labels into width-limited clusters, and resolving which label
//! wins at every cell — then drives a caller-supplied writer through it.
//!
//! # Example
//!
//! ```
//! use musubi::{Report, MemorySource};
//!
//! let mut report = Report::new();
//! let src = report.source(Box::new(MemorySource::new("demo.rs", "let x = 1 + true;\n")));
//! report.label(12, 16, src);
//! report.message("expected number, found bool", None).unwrap();
//!
//! let mut out = String::new();
//! report.writer(move |bytes: &[u8]| {
//!     out.push_str(&String::from_utf8_lossy(bytes));
//!     0
//! });
//! report.render(0, src).unwrap();
//! ```
//!
//! # Scope
//!
//! This crate is the layout/rendering *engine* only: it does not parse
//! source code, does not know diagnostic semantics, does not detect an
//! interactive TTY, and does not emit HTML/SVG. See `spec.md` §1 for the
//! full boundary.

mod cell;
mod charset;
mod chunk;
mod cluster;
mod color;
mod config;
mod error;
mod label;
mod line;
mod margin;
mod render;
mod report;
mod source;
mod unicode;

pub use charset::{ascii, unicode as unicode_charset, CharSet, Glyph};
pub use color::{default_color, ColorFn, ColorGenerator, ColorKind};
pub use config::{Config, IndexType, LabelAttach};
pub use error::{MusubiError, Result};
pub use label::Label;
pub use report::{Level, Report, SourceCache, Title};
pub use source::{FileSource, MemorySource, Source};
pub use unicode::AmbiguousWidth;
