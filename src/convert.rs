//! Conversion entry points.
//!
//! [`convert_lines`] runs the pass pipeline over an in-memory buffer;
//! [`convert_file`] and [`convert_bytes`] decode their input first;
//! [`convert_to_file`] also writes the result.
//!
//! The markup validator always runs first. Its errors are fatal unless
//! `force` is set, because every rewriting pass assumes balanced brackets.

use crate::config::ConversionConfig;
use crate::error::{Diagnostics, Dp2PpgenError};
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::{
    footnotes, headings, illustrations, input, markup, pages, sidenotes, spanned, text, validate,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Convert a DP text file to ppgen source.
///
/// # Errors
/// Returns `Err(Dp2PpgenError)` only for fatal errors:
/// - File not found / permission denied / unreadable
/// - Markup errors without `force`
/// - A `[Footnote` block that never closes
pub fn convert_file(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Dp2PpgenError> {
    let path = path.as_ref();
    info!("Processing '{}'", path.display());
    let (lines, encoding) = input::load_file(path)?;
    let mut output = convert_lines(lines, config)?;
    output.stats.encoding = Some(encoding);
    Ok(output)
}

/// Convert raw file contents. The encoding is detected as for files.
pub fn convert_bytes(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Dp2PpgenError> {
    let (text, encoding) = input::decode(bytes);
    let mut output = convert_lines(input::split_lines(&text), config)?;
    output.stats.encoding = Some(encoding);
    Ok(output)
}

/// Run every selected pass over `lines`.
pub fn convert_lines(
    lines: Vec<String>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Dp2PpgenError> {
    let start = Instant::now();
    let passes = &config.passes;
    let keep = config.keep_original;
    let mut diags = Diagnostics::new();
    let mut stats = ConversionStats {
        input_lines: lines.len(),
        ..ConversionStats::default()
    };
    debug!("Passes: {:?}", passes);

    // ── Step 1: Validate ─────────────────────────────────────────────────
    stats.markup_errors = validate::validate_markup(&lines, &mut diags);
    if stats.markup_errors > 0 && !config.force {
        return Err(Dp2PpgenError::MarkupErrors {
            count: stats.markup_errors,
        });
    }

    // ── Step 2: Line-level conversions ───────────────────────────────────
    let mut buf = text::standard_conversions(lines);
    if passes.pages {
        buf = pages::process_blank_pages(buf, keep);
        buf = pages::process_page_numbers(buf, keep);
        stats.pages = buf.iter().filter(|l| l.starts_with(".bn ")).count();
    }
    if passes.fixup {
        buf = text::fixup(buf);
    }
    if passes.utf8 {
        buf = text::convert_utf8(buf).0;
    }

    // ── Step 3: Structure ────────────────────────────────────────────────
    if passes.chapters || passes.sections {
        let (out, counts) = headings::process_headings(&buf, config);
        buf = out;
        stats.chapters = counts.chapters;
        stats.sections = counts.sections;
    }
    if passes.sidenotes {
        let (out, n) = sidenotes::process_sidenotes(buf, config.sidenote_keep_breaks);
        buf = out;
        stats.sidenotes = n;
    }
    if passes.illustrations {
        let (out, n) = illustrations::process_illustrations_in(buf, &config.image_dir, &mut diags);
        buf = out;
        stats.illustrations = n;
    }

    // ── Step 4: Footnotes ────────────────────────────────────────────────
    if passes.footnotes {
        let (out, summary) = footnotes::process_footnotes(buf, config, &mut diags)?;
        buf = out;
        stats.footnotes = summary.footnotes;
        stats.anchors = summary.anchors;
        stats.joined_fragments = summary.joined;
    }

    // ── Step 5: Page-break repair ────────────────────────────────────────
    if passes.join_spanned {
        let (out, blocks) = spanned::join_spanned_formatting(buf);
        let (out, words) = spanned::join_spanned_hyphenations(out, &mut diags);
        buf = out;
        stats.joined_spans = blocks + words;
    }

    // ── Step 6: Out-of-line blocks ───────────────────────────────────────
    if passes.detect_markup {
        buf = markup::detect_markup(buf).0;
    }
    if passes.markup {
        let (out, counts) = markup::process_markup(buf, &mut diags);
        buf = out;
        stats.markup_blocks = counts.values().sum();
    }

    if passes.boilerplate {
        buf = text::add_boilerplate(buf, config.header.as_deref(), config.footer.as_deref());
    }

    stats.output_lines = buf.len();
    stats.diagnostics = diags.len();
    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Conversion complete: {} lines in, {} lines out, {} diagnostics, {}ms",
        stats.input_lines, stats.output_lines, stats.diagnostics, stats.duration_ms
    );

    Ok(ConversionOutput {
        lines: buf,
        diagnostics: diags.into_vec(),
        stats,
    })
}

/// Convert `input` and write the result to `output_path`.
///
/// Uses atomic write (temp file in the target directory + rename) so an
/// interrupted run never leaves a partial file. With `dry_run` nothing is
/// written.
pub fn convert_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Dp2PpgenError> {
    let output = convert_file(input, config)?;
    let path = output_path.as_ref();

    if config.dry_run {
        info!("Dry run; not saving '{}'", path.display());
        return Ok(output);
    }

    info!("Saving output to '{}'", path.display());
    write_atomic(path, &output.text())?;
    Ok(output)
}

/// `<infile up to the first '.'>-out.txt`, next to the input.
pub fn default_output_path(input: impl AsRef<Path>) -> PathBuf {
    let input = input.as_ref();
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.split('.').next().unwrap_or_default();
    input.with_file_name(format!("{stem}-out.txt"))
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), Dp2PpgenError> {
    let write_err = |source: std::io::Error| Dp2PpgenError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Passes;
    use crate::pipeline::lines::to_buffer;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path("book/projectID.txt"),
            PathBuf::from("book/projectID-out.txt")
        );
        assert_eq!(
            default_output_path("my.book.v2.txt"),
            PathBuf::from("my-out.txt")
        );
    }

    #[test]
    fn test_markup_errors_are_fatal_without_force() {
        let config = ConversionConfig::default();
        let err = convert_lines(to_buffer(&["/*", "open"]), &config).unwrap_err();
        assert!(matches!(err, Dp2PpgenError::MarkupErrors { count: 1 }));
    }

    #[test]
    fn test_force_continues_past_markup_errors() {
        let config = ConversionConfig::builder()
            .passes(Passes::none())
            .force(true)
            .build()
            .unwrap();
        let out = convert_lines(to_buffer(&["/*", "open  "]), &config).unwrap();
        assert_eq!(out.lines, to_buffer(&["/*", "open"]));
        assert_eq!(out.stats.markup_errors, 1);
        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn test_text_is_newline_terminated() {
        let config = ConversionConfig::builder()
            .passes(Passes::none())
            .build()
            .unwrap();
        let out = convert_bytes(b"one\ntwo\n", &config).unwrap();
        assert_eq!(out.text(), "one\ntwo\n");
    }
}
