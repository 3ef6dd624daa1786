//! Footnote engine: parse → join → resolve anchors → emit and relocate.
//!
//! ```text
//!  buffer ──▶ parse ──▶ join ──▶ strip blocks ──▶ anchors ──▶ relocate ──▶ buffer
//!               │         │                         │            │
//!          records   merge fragments        numbers, insertion   .fn/.fm
//!                                               points
//! ```
//!
//! Each stage runs to completion before the next starts and state is
//! passed explicitly: the record list out of parse and join, an
//! [`EngineState`] through anchor resolution.

pub mod anchors;
pub mod emit;
pub mod join;
pub mod parse;
pub mod record;
pub mod token;

pub use anchors::EngineState;
pub use emit::{relocate, relocate_by_name, EmitOptions};
pub use record::FootnoteRecord;

use crate::config::{ConversionConfig, FootnoteDestination};
use crate::error::{Diagnostics, Dp2PpgenError};
use serde::Serialize;
use tracing::info;

/// Counts reported by one engine run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FootnoteSummary {
    /// Records after joining.
    pub footnotes: usize,
    /// Distinct anchors resolved.
    pub anchors: usize,
    /// Fragments merged into an earlier record.
    pub joined: usize,
}

impl From<&ConversionConfig> for EmitOptions {
    fn from(config: &ConversionConfig) -> Self {
        Self {
            autonumber: config.footnote_autonumber,
            landing_zone_text: config.landing_zone_text,
            landing_zone_html: config.landing_zone_html,
        }
    }
}

/// Run the engine over a page-tagged buffer.
///
/// A buffer without `[Footnote` blocks comes back unchanged, so running
/// the engine over its own output is a no-op.
pub fn process_footnotes(
    buf: Vec<String>,
    config: &ConversionConfig,
    diags: &mut Diagnostics,
) -> Result<(Vec<String>, FootnoteSummary), Dp2PpgenError> {
    info!("Processing footnotes");

    let buf = parse::remove_blank_lines_before_footnotes(buf);
    let records = parse::parse_footnotes(&buf)?;
    if records.is_empty() {
        return Ok((buf, FootnoteSummary::default()));
    }

    let block_ranges: Vec<(usize, usize)> = records.iter().map(|r| r.source_range).collect();
    let (records, joined) = join::join_fragments(records, diags);

    let dest = config.footnote_destination;
    let (buf, skip) = if dest == FootnoteDestination::InPlace {
        (buf, block_ranges)
    } else {
        (parse::strip_footnote_blocks(&buf), Vec::new())
    };

    let (buf, state) = anchors::resolve_anchors(
        buf,
        EngineState::new(records),
        config.footnote_autonumber,
        &skip,
        diags,
    );

    let opts = EmitOptions::from(config);
    let mut buf = relocate(buf, &state.records, dest, &opts);
    if opts.landing_zone_text.is_some() || opts.landing_zone_html.is_some() {
        buf = emit::add_landing_zones(buf, &opts);
    }

    let summary = FootnoteSummary {
        footnotes: state.records.len(),
        anchors: state.resolved_count,
        joined,
    };
    info!("Processed {} footnotes", summary.footnotes);
    Ok((buf, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostic;
    use crate::pipeline::lines::to_buffer;

    fn config(dest: FootnoteDestination) -> ConversionConfig {
        ConversionConfig::builder()
            .footnote_destination(dest)
            .build()
            .unwrap()
    }

    #[test]
    fn test_book_end_example() {
        let buf = to_buffer(&["[Footnote A: Some note.]", "Reference[A] in text.", "// 010.png"]);
        let mut diags = Diagnostics::new();
        let (out, summary) =
            process_footnotes(buf, &config(FootnoteDestination::BookEnd), &mut diags).unwrap();
        assert_eq!(out[0], "Reference[1] in text.");
        let open = out.iter().position(|l| l.starts_with(".fn 1")).unwrap();
        assert_eq!(out[open + 1], "Some note.");
        assert_eq!(out[open + 2], ".fn-");
        assert_eq!(summary.footnotes, 1);
        assert_eq!(summary.anchors, 1);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_split_footnote_becomes_one() {
        let buf = to_buffer(&[
            "// 001.png",
            "Text[1] here.",
            "",
            "[Footnote 1: The note begins-*]*",
            "// 002.png",
            "More text.",
            "",
            "*[Footnote: *ning and ends.]",
        ]);
        let mut diags = Diagnostics::new();
        let (out, summary) =
            process_footnotes(buf, &config(FootnoteDestination::BookEnd), &mut diags).unwrap();
        assert_eq!(summary.footnotes, 1);
        assert_eq!(summary.joined, 1);
        assert_eq!(out.iter().filter(|l| l.starts_with(".fn ")).count(), 1);
        assert!(out.contains(&"The note beginsning and ends.".to_string()));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_default_destination_with_landing_zones() {
        let buf = to_buffer(&["// 001.png", "Text[1].", "", "More.", "", "[Footnote 1: Note.]"]);
        let mut diags = Diagnostics::new();
        let (out, _) = process_footnotes(buf, &ConversionConfig::default(), &mut diags).unwrap();
        assert_eq!(
            &out[..6],
            &to_buffer(&["// 001.png", "Text[1].", ".fn 1", "Note.", ".fn-", ".fm rend=no"])[..]
        );
        assert!(out.contains(&".fm rend=no lz=h".to_string()));
    }

    #[test]
    fn test_rerun_on_output_is_noop() {
        let buf = to_buffer(&["// 001.png", "Text[1].", "", "[Footnote 1: Note.]", "After."]);
        let cfg = config(FootnoteDestination::InPlace);
        let mut diags = Diagnostics::new();
        let (once, _) = process_footnotes(buf, &cfg, &mut diags).unwrap();
        let (twice, summary) = process_footnotes(once.clone(), &cfg, &mut diags).unwrap();
        assert_eq!(once, twice);
        assert_eq!(summary, FootnoteSummary::default());
    }

    #[test]
    fn test_in_place_keeps_order() {
        let buf = to_buffer(&["// 001.png", "Text[A].", "[Footnote A: Note.]", "After."]);
        let mut diags = Diagnostics::new();
        let (out, _) =
            process_footnotes(buf, &config(FootnoteDestination::InPlace), &mut diags).unwrap();
        assert_eq!(
            out,
            to_buffer(&["// 001.png", "Text[1].", ".fn 1", "Note.", ".fn-", ".fm", "After."])
        );
    }

    #[test]
    fn test_count_mismatch_still_emits() {
        let buf = to_buffer(&["// 001.png", "No anchor here.", "[Footnote 1: Lonely.]"]);
        let mut diags = Diagnostics::new();
        let (out, summary) =
            process_footnotes(buf, &config(FootnoteDestination::ParagraphEnd), &mut diags)
                .unwrap();
        assert_eq!(summary.anchors, 0);
        assert!(out.contains(&"Lonely.".to_string()));
        assert!(diags
            .iter()
            .any(|d| matches!(d, Diagnostic::AnchorCountMismatch { .. })));
    }
}
