//! Anchor resolver.
//!
//! Walks the buffer once, tracking the scan page. Every `[A]`/`[12]` token
//! is matched against the unresolved records of that page with the same id
//! and rewritten with the next sequence number. A second token for an id
//! already resolved on the page reuses its number.

use super::record::FootnoteRecord;
use super::token::{find_anchors, AnchorRef};
use crate::error::{Diagnostic, Diagnostics, Location};
use crate::pipeline::lines::{
    find_next_blank, find_next_chapter, find_previous_line_of_text, parse_scan_page,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// State threaded through the anchor stage.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub current_page: Option<String>,
    /// Distinct anchors matched to a record so far.
    pub resolved_count: usize,
    pub records: Vec<FootnoteRecord>,
}

impl EngineState {
    pub fn new(records: Vec<FootnoteRecord>) -> Self {
        Self {
            current_page: None,
            resolved_count: 0,
            records,
        }
    }
}

/// Resolve and renumber anchors.
///
/// Lines inside any of the `skip` ranges (inclusive) are left alone; in
/// place relocation keeps the footnote blocks in the buffer during this
/// stage. Records no anchor reached are numbered after the resolved ones
/// and sent to the end of the document.
pub fn resolve_anchors(
    mut buf: Vec<String>,
    mut state: EngineState,
    autonumber: bool,
    skip: &[(usize, usize)],
    diags: &mut Diagnostics,
) -> (Vec<String>, EngineState) {
    info!("Processing footnote anchors");

    // id → number for anchors already resolved on the current page
    let mut on_page: HashMap<String, usize> = HashMap::new();

    for i in 0..buf.len() {
        if skip.iter().any(|&(s, e)| (s..=e).contains(&i)) {
            continue;
        }
        if let Some(page) = parse_scan_page(&buf[i]) {
            state.current_page = Some(page.to_string());
            on_page.clear();
            continue;
        }

        let anchors = find_anchors(&buf[i]);
        if anchors.is_empty() {
            continue;
        }

        let mut rewritten = String::with_capacity(buf[i].len());
        let mut cursor = 0;
        for AnchorRef { id, span } in anchors {
            rewritten.push_str(&buf[i][cursor..span.start]);
            cursor = span.end;

            let existing = on_page.get(id).copied();
            let number = match existing {
                Some(n) => {
                    if autonumber {
                        diags.push(Diagnostic::DuplicateAnchor {
                            anchor: id.to_string(),
                            page: state.current_page.clone(),
                        });
                    }
                    Some(n)
                }
                None => resolve_one(&buf, i, id, &mut state).inspect(|&n| {
                    on_page.insert(id.to_string(), n);
                }),
            };

            match number {
                Some(_) if autonumber => rewritten.push_str("[#]"),
                Some(n) => rewritten.push_str(&format!("[{n}]")),
                None => {
                    diags.push(Diagnostic::UnmatchedAnchor {
                        anchor: id.to_string(),
                        location: Location::new(state.current_page.as_deref(), i, &buf[i]),
                    });
                    rewritten.push_str(&buf[i][span]);
                }
            }
        }
        rewritten.push_str(&buf[i][cursor..]);
        debug!("{:>5}: {}", i + 1, rewritten);
        buf[i] = rewritten;
    }

    info!("Processed {} footnote anchors", state.resolved_count);

    if state.resolved_count != state.records.len() {
        diags.push(Diagnostic::AnchorCountMismatch {
            anchors: state.resolved_count,
            footnotes: state.records.len(),
        });
    }

    // Unreferenced records still get a place.
    let end = buf.len();
    let mut next = state.resolved_count;
    for record in state.records.iter_mut().filter(|r| !r.is_resolved()) {
        next += 1;
        record.number = Some(next);
        record.paragraph_end = Some(end);
        record.chapter_end = Some(end);
    }

    (buf, state)
}

/// Match `id` on line `line` to the first unresolved record of the current
/// page and assign it the next number.
fn resolve_one(buf: &[String], line: usize, id: &str, state: &mut EngineState) -> Option<usize> {
    let page = state.current_page.clone();
    let record = state
        .records
        .iter_mut()
        .find(|r| !r.is_resolved() && r.id.as_deref() == Some(id) && r.scan_page == page)?;

    state.resolved_count += 1;
    let number = state.resolved_count;
    record.number = Some(number);
    record.paragraph_end = Some(paragraph_end(buf, line));
    record.chapter_end = Some(chapter_end(buf, line));
    Some(number)
}

/// Blank line ending the paragraph that holds `line`.
pub fn paragraph_end(buf: &[String], line: usize) -> usize {
    find_next_blank(buf, line).unwrap_or(buf.len())
}

/// One past the last text line before the next `.h2` after `line`, or
/// one past the last text line of the document.
pub fn chapter_end(buf: &[String], line: usize) -> usize {
    let limit = match find_next_chapter(buf, line) {
        Some(heading) if heading > 0 => heading - 1,
        Some(_) => return 0,
        None => buf.len().saturating_sub(1),
    };
    find_previous_line_of_text(buf, limit).map_or(limit + 1, |text| text + 1)
}
