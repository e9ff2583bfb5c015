//! Row painters (`spec.md` §4.9): header, reference, code, underline, arrow,
//! ellipsis, and footer rows, plus the orchestration that walks groups and
//! lines in the order `spec.md` §4.5/§4.9 describe and drives a
//! [`ChunkWriter`] through them.
//!
//! Grounded on the teacher's emitter loop shape (`ori_diagnostic::emitter`
//! walks spans and writes formatted text to a `Write` sink); generalized from
//! one emitted diagnostic at a time to the cluster/margin/cell geometry this
//! engine resolves first.

use crate::cell::{highlight_label, underline_owner, vbar_owner};
use crate::charset::Glyph;
use crate::chunk::{ChunkWriter, Sink};
use crate::cluster::{
    build_clusters, build_width_cache, collect_line_labels, line_straddled_by_multi,
    resolve_multi_spans, resolve_single_lines, solve_column_range, Cluster, ColumnRange, MultiSpan,
};
use crate::color::ColorKind;
use crate::config::Config;
use crate::error::{MusubiError, Result};
use crate::label::{build_groups, Group, Label, LabelInfo};
use crate::margin::{margin_glyph, margin_width, MarginType};
use crate::report::Title;
use crate::source::Source;
use crate::unicode::keep_suffix;

/// Below this many columns a reference row's filename is never ellipsized
/// further, even if that overflows `config.limit_width` (`spec.md` §4.2).
const MIN_FILENAME_WIDTH: usize = 3;

fn wr<T>(r: std::result::Result<T, i32>) -> Result<T> {
    r.map_err(MusubiError::Writer)
}

fn digit_width(mut n: u64) -> usize {
    if n == 0 {
        return 1;
    }
    let mut w = 0;
    while n > 0 {
        w += 1;
        n /= 10;
    }
    w
}

/// Write the shared left-hand gutter every row kind starts with: a
/// right-justified line number (or blanks), then the main vertical bar (or
/// blanks for rows that don't show it).
fn write_gutter(
    w: &mut ChunkWriter,
    line_no_width: usize,
    line_no: Option<u32>,
    vbar: Option<Glyph>,
) -> Result<()> {
    match line_no {
        Some(n) => {
            let s = n.to_string();
            let pad = line_no_width.saturating_sub(s.len());
            wr(w.draw(Glyph::Space, pad))?;
            wr(w.write_str(&s))?;
        }
        None => wr(w.draw(Glyph::Space, line_no_width))?,
    }
    wr(w.draw(Glyph::Space, 1))?;
    match vbar {
        Some(g) => wr(w.draw(g, 1))?,
        None => wr(w.draw(Glyph::Space, 1))?,
    }
    wr(w.draw(Glyph::Space, 1))?;
    Ok(())
}

/// Write one margin rail glyph per multi-line label in the group
/// (`spec.md` §4.8).
fn write_margin(
    w: &mut ChunkWriter,
    multi_spans: &[MultiSpan],
    line_no: usize,
    margin_type: MarginType,
) -> Result<()> {
    for m in multi_spans {
        wr(w.draw(margin_glyph(m, line_no, margin_type), 1))?;
    }
    Ok(())
}

fn emit_header(
    w: &mut ChunkWriter,
    config: &Config,
    title: Option<&Title>,
    code: Option<&str>,
) -> Result<()> {
    let Some(title) = title else {
        return Ok(());
    };
    let color_fn = config.color_for(None);
    if let Some(code) = code {
        wr(w.draw(Glyph::LBox, 1))?;
        wr(w.write_str(code))?;
        wr(w.draw(Glyph::RBox, 1))?;
        wr(w.draw(Glyph::Space, 1))?;
    }
    let (kind_text, kind_color) = title.kind_text_and_color();
    wr(w.use_color(None, kind_color, color_fn.as_ref()))?;
    wr(w.write_str(kind_text))?;
    wr(w.use_color(None, ColorKind::Reset, color_fn.as_ref()))?;
    wr(w.draw(Glyph::Colon, 1))?;
    wr(w.draw(Glyph::Space, 1))?;
    wr(w.replace(&title.text, '\n', ' '))?;
    wr(w.draw(Glyph::Newline, 1))?;
    Ok(())
}

fn reference_row(
    w: &mut ChunkWriter,
    config: &Config,
    source: &dyn Source,
    group: &Group,
    line_no_width: usize,
) -> Result<()> {
    let line_no = source.line_for_chars(group.first_char);
    let line = source
        .line_table()
        .line(line_no)
        .copied()
        .ok_or_else(|| MusubiError::Param("group references a line past end of source".to_owned()))?;
    let col = group.first_char - line.char_offset + 1;
    let display_line = source.line_no_offset() + line_no as u32 + 1;
    let line_digits = display_line.to_string();
    let col_digits = col.to_string();

    write_gutter(w, line_no_width, None, None)?;
    wr(w.draw(Glyph::LTop, 1))?;
    wr(w.draw(Glyph::HBar, 1))?;
    wr(w.draw(Glyph::LBox, 1))?;

    let name = source.name();
    if config.limit_width > 0 {
        let overhead = line_no_width + 5 + line_digits.len() + col_digits.len();
        let budget = config.limit_width.saturating_sub(overhead).max(MIN_FILENAME_WIDTH);
        let (kept, _) = keep_suffix(name, budget, config.ambiwidth);
        if kept.len() < name.len() {
            wr(w.draw(Glyph::Ellipsis, 1))?;
        }
        wr(w.write_str(kept))?;
    } else {
        wr(w.write_str(name))?;
    }

    wr(w.draw(Glyph::Colon, 1))?;
    wr(w.write_str(&line_digits))?;
    wr(w.draw(Glyph::Colon, 1))?;
    wr(w.write_str(&col_digits))?;
    wr(w.draw(Glyph::RBox, 1))?;
    wr(w.draw(Glyph::Newline, 1))?;
    Ok(())
}

fn blank_row(w: &mut ChunkWriter, line_no_width: usize, margin_w: usize) -> Result<()> {
    write_gutter(w, line_no_width, None, Some(Glyph::VBar))?;
    wr(w.draw(Glyph::Space, margin_w))?;
    wr(w.draw(Glyph::Newline, 1))?;
    Ok(())
}

fn ellipsis_row(
    w: &mut ChunkWriter,
    multi_spans: &[MultiSpan],
    line_no: usize,
    line_no_width: usize,
) -> Result<()> {
    write_gutter(w, line_no_width, None, Some(Glyph::VBarGap))?;
    write_margin(w, multi_spans, line_no, MarginType::Ellipsis)?;
    wr(w.draw(Glyph::Newline, 1))?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn code_row(
    w: &mut ChunkWriter,
    config: &Config,
    chars: &[char],
    width_cache: &[u32],
    cluster: &Cluster,
    range: &ColumnRange,
    multi_spans: &[MultiSpan],
    group_multi: &[LabelInfo],
    labels: &[Label],
    line_no_width: usize,
    display_line_no: u32,
) -> Result<()> {
    write_gutter(w, line_no_width, Some(display_line_no), Some(Glyph::VBar))?;
    write_margin(w, multi_spans, cluster.line_no, MarginType::Line)?;

    let default_fn = config.color_for(None);
    if range.skip_prefix {
        wr(w.use_color(None, ColorKind::SkippedMargin, default_fn.as_ref()))?;
        wr(w.draw(Glyph::Ellipsis, 1))?;
        wr(w.use_color(None, ColorKind::Reset, default_fn.as_ref()))?;
    }

    let mut active: Option<usize> = None;
    for c in range.start_col..range.end_col {
        let ch = chars.get(c as usize).copied().unwrap_or(' ');
        let p = cluster.line.char_offset + c;
        let hl = highlight_label(p, cluster, group_multi, labels);
        if hl != active {
            match hl {
                Some(li) => {
                    let color = config.color_for(labels[li].color_fn.as_ref());
                    wr(w.use_color(Some(li as u32), ColorKind::Label, color.as_ref()))?;
                }
                None => wr(w.use_color(None, ColorKind::Reset, default_fn.as_ref()))?,
            }
            active = hl;
        }
        if ch == '\t' {
            let next = (c + 1) as usize;
            let cur = c as usize;
            let step = width_cache
                .get(next)
                .zip(width_cache.get(cur))
                .map_or(1, |(a, b)| a.saturating_sub(*b).max(1));
            wr(w.draw(Glyph::Space, step as usize))?;
        } else {
            wr(w.write_str(&ch.to_string()))?;
        }
    }
    wr(w.use_color(None, ColorKind::Reset, default_fn.as_ref()))?;

    if range.skip_suffix {
        wr(w.use_color(None, ColorKind::SkippedMargin, default_fn.as_ref()))?;
        wr(w.draw(Glyph::Ellipsis, 1))?;
        wr(w.use_color(None, ColorKind::Reset, default_fn.as_ref()))?;
    }
    wr(w.draw(Glyph::Newline, 1))?;
    Ok(())
}

fn underline_row(
    w: &mut ChunkWriter,
    config: &Config,
    cluster: &Cluster,
    range: &ColumnRange,
    multi_spans: &[MultiSpan],
    labels: &[Label],
    line_no_width: usize,
) -> Result<()> {
    if !config.underlines {
        return Ok(());
    }
    write_gutter(w, line_no_width, None, None)?;
    write_margin(w, multi_spans, cluster.line_no, MarginType::None)?;

    if range.skip_prefix {
        wr(w.draw(Glyph::Space, 1))?;
    }
    let default_fn = config.color_for(None);
    let arrow_col = cluster.margin_label.map(|ml| ml.col);
    // Every line-label's vbar is above its own arrow row at this point, so
    // every entry in `cluster.line_labels` is a live candidate here
    // (`spec.md` §4.9 "Underline row"): pass the last possible row index.
    let top_row = cluster.line_labels.len();
    for c in range.start_col..range.end_col {
        let p = cluster.line.char_offset + c;
        let vbar = vbar_owner(c, top_row, cluster, labels, config.ambiwidth);
        let under = underline_owner(p, cluster, labels);
        match (vbar, under) {
            (Some(_), Some(ui)) => {
                let color = config.color_for(labels[ui].color_fn.as_ref());
                wr(w.use_color(Some(ui as u32), ColorKind::Label, color.as_ref()))?;
                wr(w.draw(Glyph::Underbar, 1))?;
            }
            _ if config.multiline_arrows && arrow_col == Some(c) => {
                wr(w.use_color(None, ColorKind::Reset, default_fn.as_ref()))?;
                wr(w.draw(Glyph::UArrow, 1))?;
            }
            (Some(vi), None) => {
                let color = config.color_for(labels[vi].color_fn.as_ref());
                wr(w.use_color(Some(vi as u32), ColorKind::Label, color.as_ref()))?;
                wr(w.draw(Glyph::VBar, 1))?;
            }
            (None, Some(ui)) => {
                let color = config.color_for(labels[ui].color_fn.as_ref());
                wr(w.use_color(Some(ui as u32), ColorKind::Label, color.as_ref()))?;
                wr(w.draw(Glyph::Underline, 1))?;
            }
            (None, None) => {
                wr(w.use_color(None, ColorKind::Reset, default_fn.as_ref()))?;
                wr(w.draw(Glyph::Space, 1))?;
            }
        }
    }
    wr(w.use_color(None, ColorKind::Reset, default_fn.as_ref()))?;
    if range.skip_suffix {
        wr(w.draw(Glyph::Space, 1))?;
    }
    wr(w.draw(Glyph::Newline, 1))?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn arrow_row(
    w: &mut ChunkWriter,
    config: &Config,
    cluster: &Cluster,
    range: &ColumnRange,
    ll: &crate::cluster::LineLabel,
    labels: &[Label],
    multi_spans: &[MultiSpan],
    line_no_width: usize,
) -> Result<()> {
    write_gutter(w, line_no_width, None, None)?;
    write_margin(w, multi_spans, cluster.line_no, MarginType::Arrow)?;

    // Leading ellipsis region (`spec.md` §4.9 "Arrow row"): the same one
    // column `code_row` spends on its leading `Ellipsis` glyph and
    // `underline_row` spends on a compensating space, so every row's anchor
    // columns stay aligned. `HBar` continues the margin label's own
    // horizontal rail across the gutter; every other arrow just pads with a
    // space.
    if range.skip_prefix {
        let is_margin_label = cluster.margin_label.is_some_and(|m| m.label_idx == ll.label_idx);
        if is_margin_label {
            wr(w.draw(Glyph::HBar, 1))?;
        } else {
            wr(w.draw(Glyph::Space, 1))?;
        }
    }

    let lead = ll.col.saturating_sub(cluster.start_col);
    wr(w.draw(Glyph::Space, lead as usize))?;

    let label = &labels[ll.label_idx];
    let color = config.color_for(label.color_fn.as_ref());
    wr(w.use_color(Some(ll.label_idx as u32), ColorKind::Label, color.as_ref()))?;

    let turn = if !ll.info.multi {
        Glyph::LBot
    } else if label.resolved_message_width(config.ambiwidth) > 0 {
        Glyph::MBot
    } else {
        Glyph::RBot
    };
    wr(w.draw(turn, 1))?;
    let reach = if config.compact { 1 } else { 2 };
    wr(w.draw(Glyph::HBar, reach))?;
    if ll.info.multi {
        wr(w.draw(Glyph::RArrow, 1))?;
    }
    wr(w.draw(Glyph::Space, 1))?;
    wr(w.replace(&label.message, '\n', ' '))?;
    wr(w.use_color(None, ColorKind::Reset, color.as_ref()))?;
    wr(w.draw(Glyph::Newline, 1))?;
    Ok(())
}

fn caption(kind: &str, idx: usize, total: usize) -> String {
    if total > 1 {
        format!("{kind} {}", idx + 1)
    } else {
        kind.to_owned()
    }
}

fn footer(
    w: &mut ChunkWriter,
    config: &Config,
    helps: &[String],
    notes: &[String],
    line_no_width: usize,
) -> Result<()> {
    let default_fn = config.color_for(None);
    let mut emit_block = |w: &mut ChunkWriter, kind: &str, total: usize, idx: usize, text: &str| -> Result<()> {
        let cap = caption(kind, idx, total);
        let pad = " ".repeat(cap.chars().count() + 2);
        wr(w.use_color(None, ColorKind::Note, default_fn.as_ref()))?;
        wr(w.write_str(&cap))?;
        wr(w.draw(Glyph::Colon, 1))?;
        wr(w.use_color(None, ColorKind::Reset, default_fn.as_ref()))?;
        wr(w.draw(Glyph::Space, 1))?;
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                wr(w.write_str(&pad))?;
            }
            wr(w.write_str(line))?;
            wr(w.draw(Glyph::Newline, 1))?;
        }
        Ok(())
    };
    for (i, h) in helps.iter().enumerate() {
        emit_block(w, "Help", helps.len(), i, h)?;
    }
    for (i, n) in notes.iter().enumerate() {
        emit_block(w, "Note", notes.len(), i, n)?;
    }
    if !config.compact {
        wr(w.draw(Glyph::HBar, line_no_width + 2))?;
        wr(w.draw(Glyph::RBot, 1))?;
        wr(w.draw(Glyph::Newline, 1))?;
    }
    Ok(())
}

/// A group plus the per-group facts (`spec.md` §4.4/§4.5) resolved once,
/// before any row is drawn, so `line_no_width` can be sized against every
/// group up front.
struct GroupPlan {
    group: Group,
    multi_spans: Vec<MultiSpan>,
    singles: Vec<(LabelInfo, usize)>,
    first_line: usize,
    last_line: usize,
}

/// Drive the whole render: `make_groups`, plan each group's line range,
/// size the shared line-number gutter, then walk groups/lines/clusters
/// emitting rows (`spec.md` §2 overview, §4.9).
pub(crate) fn render_report(
    config: &Config,
    sources: &mut [Box<dyn Source>],
    labels: &[Label],
    helps: &[String],
    notes: &[String],
    title: Option<&Title>,
    code: Option<&str>,
    sink: &mut dyn Sink,
    header_src: u32,
) -> Result<()> {
    let header_idx = usize::try_from(header_src).unwrap_or(usize::MAX);
    if sources.get(header_idx).is_none() {
        return Err(MusubiError::Source(header_src));
    }

    let groups = build_groups(labels, sources, config.index_type)?;

    let mut plans = Vec::with_capacity(groups.len());
    let mut max_display_line = 0u32;
    for group in groups {
        let source: &dyn Source = sources[group.src_idx].as_ref();
        let multi_spans = resolve_multi_spans(&group, source);
        let singles = resolve_single_lines(&group, source);
        let first_line = multi_spans
            .iter()
            .map(|m| m.start_line)
            .chain(singles.iter().map(|(_, l)| *l))
            .min()
            .unwrap_or(0);
        let last_line = multi_spans
            .iter()
            .map(|m| m.end_line)
            .chain(singles.iter().map(|(_, l)| *l))
            .max()
            .unwrap_or(0);
        max_display_line = max_display_line.max(source.line_no_offset() + last_line as u32 + 1);
        plans.push(GroupPlan { group, multi_spans, singles, first_line, last_line });
    }
    let line_no_width = digit_width(u64::from(max_display_line)).max(1);

    let mut w = ChunkWriter::new(sink, config.charset);
    emit_header(&mut w, config, title, code)?;

    for (gi, plan) in plans.iter().enumerate() {
        let source: &mut dyn Source = sources[plan.group.src_idx].as_mut();
        reference_row(&mut w, config, &*source, &plan.group, line_no_width)?;
        let margin_w = margin_width(&plan.multi_spans);
        if !config.compact {
            blank_row(&mut w, line_no_width, margin_w)?;
        }

        for line_no in plan.first_line..=plan.last_line {
            let line = *source
                .line_table()
                .line(line_no)
                .ok_or_else(|| MusubiError::Param("group spans past end of source".to_owned()))?;
            let line_labels =
                collect_line_labels(line_no, &line, &plan.multi_spans, &plan.singles, labels, config);
            if line_labels.is_empty() {
                if line_straddled_by_multi(line_no, &plan.multi_spans) {
                    ellipsis_row(&mut w, &plan.multi_spans, line_no, line_no_width)?;
                }
                continue;
            }

            let text = source.get_line(line_no)?.to_owned();
            let chars: Vec<char> = text.chars().collect();
            let width_cache = build_width_cache(&text, config.tab_width, config.ambiwidth);
            let clusters = build_clusters(line_no, &line, &line_labels, labels, config);
            let display_line_no = source.line_no_offset() + line_no as u32 + 1;

            for cluster in &clusters {
                let range =
                    solve_column_range(cluster, &width_cache, line.char_len, config, line_no_width, margin_w);
                let mut cluster = cluster.clone();
                cluster.start_col = range.start_col;
                cluster.end_col = range.end_col;

                code_row(
                    &mut w,
                    config,
                    &chars,
                    &width_cache,
                    &cluster,
                    &range,
                    &plan.multi_spans,
                    &plan.group.multi_labels,
                    labels,
                    line_no_width,
                    display_line_no,
                )?;
                underline_row(&mut w, config, &cluster, &range, &plan.multi_spans, labels, line_no_width)?;
                for ll in cluster.all_labels() {
                    if ll.draw_msg {
                        arrow_row(&mut w, config, &cluster, &range, ll, labels, &plan.multi_spans, line_no_width)?;
                    }
                }
            }
        }

        if gi + 1 < plans.len() && !config.compact {
            blank_row(&mut w, line_no_width, margin_w)?;
        }
    }

    footer(&mut w, config, helps, notes, line_no_width)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::label::Label;
    use crate::report::Level;
    use crate::source::MemorySource;
    use pretty_assertions::assert_eq;

    fn run(
        config: &Config,
        sources: &mut [Box<dyn Source>],
        labels: &[Label],
        title: Option<&Title>,
    ) -> String {
        let mut out = Vec::new();
        {
            let mut sink = |bytes: &[u8]| {
                out.extend_from_slice(bytes);
                0
            };
            render_report(config, sources, labels, &[], &[], title, None, &mut sink, 0).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn renders_single_line_label_with_ascii_charset() {
        let mut cfg = Config::default();
        cfg.charset = crate::charset::ascii();
        cfg.color = None;
        let mut sources: Vec<Box<dyn Source>> =
            vec![Box::new(MemorySource::new("demo.rs", "let x = 1;\n"))];
        let labels = vec![Label { message: "unused".to_owned(), ..Label::new(0, 4, 5) }];
        let out = run(&cfg, &mut sources, &labels, None);
        assert!(out.is_ascii());
        assert!(out.contains("demo.rs:1:5"));
        assert!(out.contains("unused"));
    }

    #[test]
    fn header_includes_code_and_level() {
        let cfg = Config::default();
        let mut sources: Vec<Box<dyn Source>> = vec![Box::new(MemorySource::new("f", "x\n"))];
        let title = Title { level: Level::Error, custom_name: None, text: "bad thing".to_owned() };
        let out = run(&cfg, &mut sources, &[], Some(&title));
        assert!(out.contains("Error"));
        assert!(out.contains("bad thing"));
    }

    #[test]
    fn multi_line_label_draws_margin_rail_and_arrow() {
        let cfg = Config::default();
        let mut sources: Vec<Box<dyn Source>> =
            vec![Box::new(MemorySource::new("f", "a(\n  b,\n  c,\n);\n"))];
        let labels = vec![Label { message: "call".to_owned(), ..Label::new(0, 0, 14) }];
        let out = run(&cfg, &mut sources, &labels, None);
        assert!(out.contains('\u{256d}')); // LTop rail start
        assert!(out.contains('\u{2570}')); // LBot rail end
        assert!(out.contains("call"));
        // Its message has nonzero width, so the arrow row's turn glyph is
        // MBot, not the single-line LBot or the zero-width-message RBot.
        assert!(out.contains('\u{2534}')); // MBot
    }

    #[test]
    fn single_line_label_arrow_turns_with_lbot_not_rbot() {
        let cfg = Config::default();
        let mut sources: Vec<Box<dyn Source>> =
            vec![Box::new(MemorySource::new("demo.rs", "let x = 1;\n"))];
        let labels = vec![Label { message: "unused".to_owned(), ..Label::new(0, 4, 5) }];
        let out = run(&cfg, &mut sources, &labels, None);
        assert!(out.contains('\u{2570}'), "expected LBot (\u{2570}) turn glyph:\n{out}"); // LBot "╰"
        assert!(!out.contains('\u{256f}'), "RBot (\u{256f}) should not appear:\n{out}"); // RBot "╯"
    }

    #[test]
    fn arrow_row_aligns_under_elided_caret_with_leading_ellipsis() {
        let mut cfg = Config::default();
        cfg.limit_width = 20;
        cfg.color = None;
        let long_line = format!("{}x{};\n", "a".repeat(30), " ".repeat(2));
        let mut sources: Vec<Box<dyn Source>> = vec![Box::new(MemorySource::new("f", long_line))];
        // Anchor the label on the `x` itself, far enough right that the
        // window must skip a prefix to fit `limit_width`.
        let x_pos = 30;
        let labels = vec![Label { message: "here".to_owned(), ..Label::new(0, x_pos, x_pos + 1) }];
        let out = run(&cfg, &mut sources, &labels, None);
        let code_line = out.lines().find(|l| l.contains('x')).expect("code row present");
        let arrow_line = out.lines().find(|l| l.contains("here")).expect("arrow row present");
        let caret_col = code_line.find('x').expect("x present in code row");
        let turn_col = arrow_line.find('\u{2570}').expect("LBot present in arrow row");
        assert_eq!(caret_col, turn_col, "code row:\n{code_line}\narrow row:\n{arrow_line}");
    }

    #[test]
    fn unknown_header_source_is_rejected() {
        let cfg = Config::default();
        let mut sources: Vec<Box<dyn Source>> = vec![Box::new(MemorySource::new("f", "x\n"))];
        let mut out = Vec::new();
        let mut sink = |bytes: &[u8]| {
            out.extend_from_slice(bytes);
            0
        };
        let err = render_report(&cfg, &mut sources, &[], &[], &[], None, None, &mut sink, 9).unwrap_err();
        assert_eq!(err, MusubiError::Source(9));
    }
}
