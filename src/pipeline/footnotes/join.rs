//! Fragment joiner: merge `*[Footnote` continuations into the block they
//! continue on an earlier page.
//!
//! Records are walked forward. A fragment's partner is searched among the
//! already-merged records of the nearest earlier page group (records on the
//! fragment's own page are skipped; a block cannot split and rejoin on one
//! page). Because a merged record takes over the fragment's `joins_next`
//! flag and tail page, a note split over three or more pages keeps joining.

use super::record::FootnoteRecord;
use crate::error::{Diagnostic, Diagnostics};
use crate::pipeline::lines::ends_in_hyphen;
use tracing::{debug, info};

/// Merge fragments. Returns the surviving records and the number of merges.
pub fn join_fragments(
    records: Vec<FootnoteRecord>,
    diags: &mut Diagnostics,
) -> (Vec<FootnoteRecord>, usize) {
    let mut merged: Vec<FootnoteRecord> = Vec::with_capacity(records.len());
    let mut joined = 0;

    for record in records {
        if !record.joins_previous {
            merged.push(record);
            continue;
        }

        if joined == 0 {
            info!("Joining footnotes");
        }

        match find_partner(&merged, &record) {
            Partner::Found(target) => {
                debug!(
                    "Merging footnote at line {} into line {}",
                    record.source_range.0 + 1,
                    merged[target].source_range.0 + 1
                );
                absorb(&mut merged[target], record, diags);
                joined += 1;
            }
            Partner::Missing(candidate) => {
                diags.push(Diagnostic::JoinFailed {
                    fragment: record.location(),
                    candidate: candidate.map(|c| merged[c].location()),
                });
                merged.push(record);
            }
        }
    }

    for record in merged.iter().filter(|r| r.joins_next) {
        diags.push(Diagnostic::UnresolvedJoin {
            location: record.location(),
        });
    }

    if joined > 0 {
        info!("Merged {} broken footnote(s)", joined);
        info!("{} total footnotes after joining", merged.len());
    }
    (merged, joined)
}

enum Partner {
    Found(usize),
    /// No `joins_next` record on the preceding page; carries the nearest
    /// record there, if any, for the report.
    Missing(Option<usize>),
}

fn find_partner(merged: &[FootnoteRecord], fragment: &FootnoteRecord) -> Partner {
    let own_page = fragment.scan_page.as_deref();
    let mut group_page: Option<Option<&str>> = None;
    let mut nearest = None;

    for (i, candidate) in merged.iter().enumerate().rev() {
        let page = candidate.tail_page.as_deref();
        match group_page {
            None if page == own_page => continue,
            None => {
                group_page = Some(page);
                nearest = Some(i);
            }
            Some(group) if group != page => break,
            Some(_) => {}
        }
        if candidate.joins_next {
            return Partner::Found(i);
        }
    }
    Partner::Missing(nearest)
}

fn absorb(target: &mut FootnoteRecord, mut fragment: FootnoteRecord, diags: &mut Diagnostics) {
    if let Some(last) = target.body.last_mut() {
        if ends_in_hyphen(last) {
            match fragment.body.first() {
                Some(first) if first.starts_with('*') => {
                    // `cont-*` + `*inued more` → `continued more`
                    let rest = first.trim_start_matches('*').to_string();
                    let stem = last.trim_end_matches('*');
                    let stem = stem.strip_suffix('-').unwrap_or(stem).to_string();
                    *last = stem + &rest;
                    fragment.body.remove(0);
                }
                first => diags.push(Diagnostic::UnresolvedHyphenation {
                    end: last.clone(),
                    start: first.cloned().unwrap_or_default(),
                }),
            }
        }
    }

    target.block_lines.extend(fragment.block_lines);
    target.body.extend(fragment.body);
    target.joins_next = fragment.joins_next;
    target.tail_page = fragment.scan_page;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(page: &str, start: usize, lines: &[&str], body: &[&str]) -> FootnoteRecord {
        FootnoteRecord::new(
            None,
            lines.iter().map(|s| s.to_string()).collect(),
            body.iter().map(|s| s.to_string()).collect(),
            (start, start + lines.len() - 1),
            Some(page.to_string()),
        )
    }

    #[test]
    fn test_two_page_split_merges_into_one() {
        let mut diags = Diagnostics::new();
        let records = vec![
            record("001.png", 2, &["[Footnote 1: Begins]*"], &["Begins"]),
            record("002.png", 6, &["*[Footnote: ends.]"], &["ends."]),
        ];
        let (merged, joined) = join_fragments(records, &mut diags);
        assert_eq!(joined, 1);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].body, vec!["Begins", "ends."]);
        assert_eq!(merged[0].block_lines.len(), 2);
        assert!(!merged[0].joins_next);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_hyphenated_word_is_spliced() {
        let mut diags = Diagnostics::new();
        let records = vec![
            record("001.png", 0, &["[Footnote 1: word-*]*"], &["word-*"]),
            record(
                "002.png",
                4,
                &["*[Footnote: *inued rest of text]"],
                &["*inued rest of text"],
            ),
        ];
        let (merged, _) = join_fragments(records, &mut diags);
        assert_eq!(merged[0].body, vec!["wordinued rest of text"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_hyphen_without_marker_is_reported() {
        let mut diags = Diagnostics::new();
        let records = vec![
            record("001.png", 0, &["[Footnote 1: some-]*"], &["some-"]),
            record("002.png", 4, &["*[Footnote: thing]"], &["thing"]),
        ];
        let (merged, _) = join_fragments(records, &mut diags);
        assert_eq!(merged[0].body, vec!["some-", "thing"]);
        assert!(matches!(
            diags.iter().next(),
            Some(Diagnostic::UnresolvedHyphenation { .. })
        ));
    }

    #[test]
    fn test_partner_skips_non_continuing_notes_on_previous_page() {
        let mut diags = Diagnostics::new();
        let records = vec![
            record("001.png", 0, &["[Footnote 1: long]*"], &["long"]),
            record("001.png", 1, &["[Footnote 2: short.]"], &["short."]),
            record("002.png", 5, &["*[Footnote: tail.]"], &["tail."]),
        ];
        let (merged, _) = join_fragments(records, &mut diags);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].body, vec!["long", "tail."]);
        assert_eq!(merged[1].body, vec!["short."]);
    }

    #[test]
    fn test_three_page_span() {
        let mut diags = Diagnostics::new();
        let records = vec![
            record("001.png", 0, &["[Footnote 1: one]*"], &["one"]),
            record("002.png", 3, &["*[Footnote: two]*"], &["two"]),
            record("003.png", 6, &["*[Footnote: three.]"], &["three."]),
        ];
        let (merged, joined) = join_fragments(records, &mut diags);
        assert_eq!(joined, 2);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].body, vec!["one", "two", "three."]);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_failed_join_leaves_records_unmerged() {
        let mut diags = Diagnostics::new();
        let records = vec![
            record("001.png", 0, &["[Footnote 1: complete.]"], &["complete."]),
            record("002.png", 4, &["*[Footnote: orphan.]"], &["orphan."]),
        ];
        let (merged, joined) = join_fragments(records, &mut diags);
        assert_eq!(joined, 0);
        assert_eq!(merged.len(), 2);
        let all: Vec<_> = diags.into_vec();
        assert_eq!(all.len(), 1);
        match &all[0] {
            Diagnostic::JoinFailed {
                fragment,
                candidate,
            } => {
                assert_eq!(fragment.page.as_deref(), Some("002.png"));
                assert_eq!(candidate.as_ref().map(|c| c.line), Some(1));
            }
            other => panic!("unexpected diagnostic {other:?}"),
        }
    }

    #[test]
    fn test_dangling_continuation_reported() {
        let mut diags = Diagnostics::new();
        let records = vec![record("001.png", 0, &["[Footnote 1: cut off]*"], &["cut off"])];
        let (merged, _) = join_fragments(records, &mut diags);
        assert!(merged[0].joins_next);
        assert!(matches!(
            diags.iter().next(),
            Some(Diagnostic::UnresolvedJoin { .. })
        ));
    }
}
