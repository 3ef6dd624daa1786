//! Pure line classifier for the footnote engine.
//!
//! Recognition is kept apart from the state machines in `parse` and
//! `anchors` so each pattern can be tested on its own line.

use crate::pipeline::lines::parse_scan_page;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static RE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\*)?\[Footnote(?: ([A-Za-z]|\d+):)?").unwrap());

static RE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\](\**)$").unwrap());

static RE_ANCHOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([A-Za-z]|[0-9]{1,2})\]").unwrap());

static RE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\*?\[Footnote(?: [A-Za-z]| \d+)?: ?").unwrap());

static RE_CLOSING_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\]\**$").unwrap());

/// An in-text anchor such as `[2]` or `[B]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorRef<'a> {
    pub id: &'a str,
    /// Byte range of the whole bracketed token.
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineToken<'a> {
    PageMarker(&'a str),
    FootnoteOpen {
        joins_previous: bool,
        id: Option<&'a str>,
    },
    FootnoteClose {
        joins_next: bool,
    },
    Anchors(Vec<AnchorRef<'a>>),
    Plain,
}

/// Classify one line. Precedence: page marker, block opening, anchors,
/// block closing, plain text.
pub fn classify(line: &str) -> LineToken<'_> {
    if let Some(page) = parse_scan_page(line) {
        return LineToken::PageMarker(page);
    }
    if let Some(caps) = RE_OPEN.captures(line) {
        return LineToken::FootnoteOpen {
            joins_previous: caps.get(1).is_some(),
            id: caps.get(2).map(|m| m.as_str()),
        };
    }
    let anchors = find_anchors(line);
    if !anchors.is_empty() {
        return LineToken::Anchors(anchors);
    }
    if let Some(joins_next) = closing_marker(line) {
        return LineToken::FootnoteClose { joins_next };
    }
    LineToken::Plain
}

pub fn is_footnote_open(line: &str) -> bool {
    RE_OPEN.is_match(line)
}

/// `Some(joins_next)` when the line ends in `]` plus optional `*`s.
pub fn closing_marker(line: &str) -> Option<bool> {
    RE_CLOSE
        .captures(line)
        .map(|caps| caps.get(1).is_some_and(|m| !m.as_str().is_empty()))
}

/// Net bracket depth change across the line: `[` count minus `]` count.
pub fn bracket_delta(line: &str) -> isize {
    line.chars().fold(0, |depth, c| match c {
        '[' => depth + 1,
        ']' => depth - 1,
        _ => depth,
    })
}

pub fn find_anchors(line: &str) -> Vec<AnchorRef<'_>> {
    RE_ANCHOR
        .captures_iter(line)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let id = caps.get(1)?;
            Some(AnchorRef {
                id: id.as_str(),
                span: whole.range(),
            })
        })
        .collect()
}

/// Remove the opening `*?[Footnote X: ` label from a block line.
pub fn strip_label(line: &str) -> String {
    RE_LABEL.replace(line, "").into_owned()
}

/// Remove the closing `]` / `]*` from the last line of a block.
pub fn strip_closing(line: &str) -> String {
    RE_CLOSING_SUFFIX.replace(line, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_precedence() {
        assert_eq!(classify("// 012.png"), LineToken::PageMarker("012.png"));
        assert_eq!(
            classify("[Footnote 3: see [A] for details]"),
            LineToken::FootnoteOpen {
                joins_previous: false,
                id: Some("3")
            }
        );
        assert_eq!(
            classify("*[Footnote: continued text"),
            LineToken::FootnoteOpen {
                joins_previous: true,
                id: None
            }
        );
        assert!(matches!(classify("word[1] and[B]"), LineToken::Anchors(a) if a.len() == 2));
        assert_eq!(
            classify("end of a note.]*"),
            LineToken::FootnoteClose { joins_next: true }
        );
        assert_eq!(classify("Just prose."), LineToken::Plain);
    }

    #[test]
    fn test_open_with_letter_label() {
        assert_eq!(
            classify("[Footnote B: A note.]"),
            LineToken::FootnoteOpen {
                joins_previous: false,
                id: Some("B")
            }
        );
    }

    #[test]
    fn test_anchor_pattern_limits() {
        assert_eq!(find_anchors("x[12]")[0].id, "12");
        assert!(find_anchors("x[123]").is_empty());
        assert!(find_anchors("[Footnote A: x]").is_empty());
        assert!(find_anchors("[AB]").is_empty());
        let a = find_anchors("ab[C]d");
        assert_eq!(a[0].span, 2..5);
    }

    #[test]
    fn test_closing_marker() {
        assert_eq!(closing_marker("text]"), Some(false));
        assert_eq!(closing_marker("text]*"), Some(true));
        assert_eq!(closing_marker("text] "), None);
        assert_eq!(closing_marker("text"), None);
    }

    #[test]
    fn test_bracket_delta() {
        assert_eq!(bracket_delta("[Footnote 1: see [Greek: x]"), 1);
        assert_eq!(bracket_delta("done.]"), -1);
        assert_eq!(bracket_delta("none"), 0);
    }

    #[test]
    fn test_strip_label_and_closing() {
        assert_eq!(strip_label("[Footnote 12: Text"), "Text");
        assert_eq!(strip_label("[Footnote A:Text"), "Text");
        assert_eq!(strip_label("*[Footnote: more"), "more");
        assert_eq!(strip_label("plain line"), "plain line");
        assert_eq!(strip_closing("end.]*"), "end.");
        assert_eq!(strip_closing("end.]"), "end.");
    }
}
