use super::token::closing_marker;
use crate::error::Location;
use serde::Serialize;

/// One `[Footnote …]` block, from parse through relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FootnoteRecord {
    /// Label as written in the source (`A`, `3`). `None` for bare
    /// `[Footnote:` and continuation blocks.
    pub id: Option<String>,
    /// Raw source lines, opening marker to closing marker.
    pub block_lines: Vec<String>,
    /// Rendered content with label and closing bracket removed.
    pub body: Vec<String>,
    /// First and last buffer index of the block (inclusive).
    pub source_range: (usize, usize),
    /// Scan page active at the opening line.
    pub scan_page: Option<String>,
    pub joins_previous: bool,
    pub joins_next: bool,
    /// Blank line after the anchor's paragraph.
    pub paragraph_end: Option<usize>,
    /// One past the last text line of the anchor's chapter.
    pub chapter_end: Option<usize>,
    /// Sequence number assigned when the anchor resolved.
    pub number: Option<usize>,
    /// Scan page of the last absorbed fragment.
    #[serde(skip)]
    pub(crate) tail_page: Option<String>,
}

impl FootnoteRecord {
    pub fn new(
        id: Option<String>,
        block_lines: Vec<String>,
        body: Vec<String>,
        source_range: (usize, usize),
        scan_page: Option<String>,
    ) -> Self {
        let joins_previous = block_lines
            .first()
            .is_some_and(|l| l.starts_with("*[Footnote"));
        let joins_next = block_lines
            .last()
            .and_then(|l| closing_marker(l))
            .unwrap_or(false);
        Self {
            id,
            block_lines,
            body,
            source_range,
            tail_page: scan_page.clone(),
            scan_page,
            joins_previous,
            joins_next,
            paragraph_end: None,
            chapter_end: None,
            number: None,
        }
    }

    /// Where the block opened, for diagnostics.
    pub fn location(&self) -> Location {
        Location::new(
            self.scan_page.as_deref(),
            self.source_range.0,
            self.block_lines.first().map(String::as_str).unwrap_or(""),
        )
    }

    pub fn is_resolved(&self) -> bool {
        self.number.is_some()
    }
}
