//! Footnote block parser.
//!
//! A block opens on a line starting `[Footnote` (or `*[Footnote` for a
//! continuation) and closes on the first line where the running bracket
//! depth is back to zero and the line ends in `]`, optionally followed by
//! `*`. Tracking depth keeps `[Greek: …]` and similar nested notes from
//! closing the block early.

use super::record::FootnoteRecord;
use super::token::{
    bracket_delta, classify, closing_marker, is_footnote_open, strip_closing, strip_label,
    LineToken,
};
use crate::error::Dp2PpgenError;
use crate::pipeline::lines::is_blank;
use tracing::{debug, info};

/// Drop blank lines directly above every footnote block so relocated
/// blocks leave no gap behind.
pub fn remove_blank_lines_before_footnotes(buf: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(buf.len());
    for line in buf {
        if is_footnote_open(&line) {
            while out.last().is_some_and(|l| is_blank(l)) {
                out.pop();
            }
        }
        out.push(line);
    }
    out
}

/// Index of the line closing the block that opens at `start`.
pub fn find_block_end(buf: &[String], start: usize) -> Option<usize> {
    let mut depth = 0isize;
    for (i, line) in buf.iter().enumerate().skip(start) {
        depth += bracket_delta(line);
        if depth == 0 && closing_marker(line).is_some() {
            return Some(i);
        }
    }
    None
}

/// Parse every footnote block in the buffer, in source order.
///
/// The buffer is not modified. An unterminated block is fatal.
pub fn parse_footnotes(buf: &[String]) -> Result<Vec<FootnoteRecord>, Dp2PpgenError> {
    info!("Parsing footnotes");

    let mut records = Vec::new();
    let mut current_page: Option<String> = None;
    let mut i = 0;

    while i < buf.len() {
        match classify(&buf[i]) {
            LineToken::PageMarker(page) => current_page = Some(page.to_string()),
            LineToken::FootnoteOpen { id, .. } => {
                let end =
                    find_block_end(buf, i).ok_or_else(|| Dp2PpgenError::UnterminatedBlock {
                        kind: "Footnote",
                        line: i + 1,
                        text: buf[i].clone(),
                    })?;

                let block_lines = buf[i..=end].to_vec();
                let mut body: Vec<String> = block_lines.iter().map(|l| strip_label(l)).collect();
                if let Some(last) = body.last_mut() {
                    *last = strip_closing(last);
                }

                let record = FootnoteRecord::new(
                    id.map(str::to_string),
                    block_lines,
                    body,
                    (i, end),
                    current_page.clone(),
                );
                if record.joins_previous || record.joins_next {
                    debug!("Footnote requires joining at line {}: {}", i + 1, buf[i]);
                }
                records.push(record);
                i = end;
            }
            _ => {}
        }
        i += 1;
    }

    info!("Parsed {} footnotes", records.len());
    Ok(records)
}

/// Copy the buffer without any footnote blocks.
///
/// A block with no closing line swallows the rest of the buffer; callers
/// parse first, so that only happens on input already reported as fatal.
pub fn strip_footnote_blocks(buf: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(buf.len());
    let mut i = 0;
    while i < buf.len() {
        if is_footnote_open(&buf[i]) {
            i = find_block_end(buf, i).map_or(buf.len(), |end| end + 1);
        } else {
            out.push(buf[i].clone());
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::lines::to_buffer;

    #[test]
    fn test_remove_blank_lines_before_footnotes() {
        let buf = to_buffer(&["Text[1].", "", "", "[Footnote 1: Note.]", "", "More."]);
        let out = remove_blank_lines_before_footnotes(buf);
        assert_eq!(out, to_buffer(&["Text[1].", "[Footnote 1: Note.]", "", "More."]));
    }

    #[test]
    fn test_parse_single_line_block() {
        let buf = to_buffer(&["// 001.png", "Text[A].", "[Footnote A: Some note.]"]);
        let records = parse_footnotes(&buf).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.id.as_deref(), Some("A"));
        assert_eq!(r.body, vec!["Some note."]);
        assert_eq!(r.source_range, (2, 2));
        assert_eq!(r.scan_page.as_deref(), Some("001.png"));
        assert!(!r.joins_previous && !r.joins_next);
    }

    #[test]
    fn test_parse_multi_line_block_with_nested_brackets() {
        let buf = to_buffer(&[
            "[Footnote 2: First line [Greek: logos]",
            "second line [**typo?] still going]",
            "After.",
        ]);
        let records = parse_footnotes(&buf).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_range, (0, 1));
        assert_eq!(
            records[0].body,
            vec!["First line [Greek: logos]", "second line [**typo?] still going"]
        );
    }

    #[test]
    fn test_parse_continuation_flags() {
        let buf = to_buffer(&[
            "// 001.png",
            "[Footnote 1: Begins here]*",
            "// 002.png",
            "*[Footnote: and ends here.]",
        ]);
        let records = parse_footnotes(&buf).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].joins_next && !records[0].joins_previous);
        assert!(records[1].joins_previous && !records[1].joins_next);
        assert_eq!(records[1].id, None);
        assert_eq!(records[1].body, vec!["and ends here."]);
        assert_eq!(records[1].scan_page.as_deref(), Some("002.png"));
    }

    #[test]
    fn test_parse_unterminated_block_is_fatal() {
        let buf = to_buffer(&["Text.", "[Footnote 1: never", "closes"]);
        let err = parse_footnotes(&buf).unwrap_err();
        assert!(matches!(
            err,
            Dp2PpgenError::UnterminatedBlock { line: 2, .. }
        ));
    }

    #[test]
    fn test_strip_footnote_blocks() {
        let buf = to_buffer(&[
            "One[1].",
            "[Footnote 1: a",
            "b [c] d]",
            "Two.",
            "*[Footnote: tail.]",
        ]);
        assert_eq!(strip_footnote_blocks(&buf), to_buffer(&["One[1].", "Two."]));
    }

    #[test]
    fn test_no_blocks_is_empty() {
        let buf = to_buffer(&["Text[1].", ".fn 1", "note", ".fn-"]);
        assert!(parse_footnotes(&buf).unwrap().is_empty());
    }
}
