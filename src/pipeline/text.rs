//! Line-level text passes: standard conversions, fixup, UTF-8 characters
//! and boilerplate.

use crate::pipeline::lines::{is_blank, is_page_break};
use std::path::Path;
use tracing::{debug, info, warn};

const TAB_SIZE: usize = 4;

// ── Standard conversions (always run) ────────────────────────────────────

pub fn remove_trailing_spaces(buf: Vec<String>) -> Vec<String> {
    buf.into_iter()
        .map(|l| l.trim_end_matches([' ', '\t']).to_string())
        .collect()
}

/// A line holding only `<tb>` becomes `.tb`.
pub fn convert_thought_breaks(buf: Vec<String>) -> Vec<String> {
    buf.into_iter()
        .map(|l| if l == "<tb>" { ".tb".to_string() } else { l })
        .collect()
}

pub fn standard_conversions(buf: Vec<String>) -> Vec<String> {
    convert_thought_breaks(remove_trailing_spaces(buf))
}

// ── Fixup ────────────────────────────────────────────────────────────────

pub fn tabs_to_spaces(buf: Vec<String>, tab_size: usize) -> Vec<String> {
    let spaces = " ".repeat(tab_size);
    buf.into_iter().map(|l| l.replace('\t', &spaces)).collect()
}

/// Blank lines directly above a page break are dropped.
pub fn remove_blank_lines_at_page_ends(buf: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(buf.len());
    for line in buf {
        if is_page_break(&line) {
            while out.last().is_some_and(|l| is_blank(l)) {
                out.pop();
            }
        }
        out.push(line);
    }
    out
}

/// Safe subset of the guiguts "fixup" cleanups.
pub fn fixup(buf: Vec<String>) -> Vec<String> {
    info!("Running fixup");
    let buf = tabs_to_spaces(buf, TAB_SIZE);
    let buf = remove_trailing_spaces(buf);
    let buf = convert_thought_breaks(buf);
    remove_blank_lines_at_page_ends(buf)
}

// ── UTF-8 characters ─────────────────────────────────────────────────────

/// `--` → `—`, `----` → `——`, `[oe]` → `œ`, `[OE]` → `Œ`.
///
/// Dash runs of any other length are left for the operator and logged.
/// Page-break lines keep their dashes. Returns the buffer and the number
/// of changed lines.
pub fn convert_utf8(buf: Vec<String>) -> (Vec<String>, usize) {
    info!("Converting characters to UTF-8");
    let mut changed = 0;

    let out: Vec<String> = buf
        .into_iter()
        .enumerate()
        .map(|(i, original)| {
            let mut line = if is_page_break(&original) {
                original.clone()
            } else {
                let converted = convert_dashes(&original);
                if converted.contains("--") {
                    warn!("Unconverted dashes: {}", converted);
                }
                converted
            };
            line = line.replace("[oe]", "œ").replace("[OE]", "Œ");
            if line != original {
                changed += 1;
                debug!("{}: {}", i + 1, original);
                debug!("{}  {}", " ".repeat((i + 1).to_string().len()), line);
            }
            line
        })
        .collect();

    info!("Converted characters on {} lines to UTF-8", changed);
    (out, changed)
}

fn convert_dashes(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut run = 0;
    let flush = |out: &mut String, run: usize| match run {
        2 => out.push('—'),
        4 => out.push_str("——"),
        n => out.extend(std::iter::repeat('-').take(n)),
    };
    for c in line.chars() {
        if c == '-' {
            run += 1;
        } else {
            flush(&mut out, run);
            run = 0;
            out.push(c);
        }
    }
    flush(&mut out, run);
    out
}

// ── Boilerplate ──────────────────────────────────────────────────────────

/// Prepend the header file and append the footer file. A file that cannot
/// be read is skipped with a warning.
pub fn add_boilerplate(
    mut buf: Vec<String>,
    header: Option<&Path>,
    footer: Option<&Path>,
) -> Vec<String> {
    if let Some(lines) = header.and_then(read_boilerplate) {
        buf.splice(0..0, lines);
    }
    if let Some(lines) = footer.and_then(read_boilerplate) {
        buf.extend(lines);
    }
    buf
}

fn read_boilerplate(path: &Path) -> Option<Vec<String>> {
    info!("Adding boilerplate from {}", path.display());
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text.lines().map(|l| l.trim_end().to_string()).collect()),
        Err(e) => {
            warn!("Couldn't load {}, skipping boilerplate: {}", path.display(), e);
            None
        }
    }
}
