//! Span joiner: undo the splits DP leaves at page breaks.
//!
//! Two passes. The first removes out-of-line formatting that was closed
//! at the bottom of one page only to be reopened at the top of the next:
//!
//! ```text
//! */                         // 010.png
//! // 010.png        →
//!
//! /*
//! ```
//!
//! The second moves the first word of the next page onto a line that ends
//! in a marked hyphen or dash (`cont-*`, `then--*`), or pulls a marked
//! leading dash (`*--and`) back onto the previous line. The `*` markers
//! stay in the text for the post-processor to review.

use crate::error::{Diagnostic, Diagnostics};
use crate::pipeline::lines::{
    ends_in_dash, ends_in_hyphen, find_next_line_of_text, find_previous_line_of_text,
    find_previous_non_blank, is_blank, is_dot_command, is_next_original_line_blank,
    is_page_break, is_previous_original_line_blank, starts_with_dash,
};
use tracing::{debug, info, warn};

/// Blank lines allowed between the page break and a reopened block before
/// the split is treated as deliberate.
const MAX_GAP: usize = 4;

pub fn join_spanned_formatting(buf: Vec<String>) -> (Vec<String>, usize) {
    info!("Joining spanned out-of-line formatting markup");
    let mut out = Vec::with_capacity(buf.len());
    let mut count = 0;
    let mut i = 0;

    while i < buf.len() {
        match rejoin_end(&buf, i) {
            Some(reopen) => {
                debug!("Lines {}, {}: Joined spanned markup", i + 1, reopen + 1);
                out.extend_from_slice(&buf[i + 1..reopen]);
                count += 1;
                i = reopen + 1;
            }
            None => {
                out.push(buf[i].clone());
                i += 1;
            }
        }
    }

    info!("Joined {} instances of spanned out-of-line formatting markup", count);
    (out, count)
}

/// If `buf[close]` is a `*/` or `#/` that is reopened across a page break,
/// the index of the reopening line.
fn rejoin_end(buf: &[String], close: usize) -> Option<usize> {
    let kind = match buf[close].as_str() {
        "*/" => '*',
        "#/" => '#',
        _ => return None,
    };

    let mut ln = close + 1;
    while ln < buf.len() && is_blank(&buf[ln]) {
        ln += 1;
    }
    if ln >= buf.len() || !is_page_break(&buf[ln]) {
        return None;
    }
    ln += 1;
    while ln < buf.len()
        && (is_blank(&buf[ln]) || buf[ln].starts_with(".pn") || buf[ln].starts_with("//"))
    {
        ln += 1;
    }

    let reopen = format!("/{kind}");
    if ln >= buf.len() || buf[ln] != reopen {
        return None;
    }
    let gap = (ln - 1) - find_previous_non_blank(buf, ln - 1).unwrap_or(0);
    (gap < MAX_GAP).then_some(ln)
}

pub fn join_spanned_hyphenations(
    mut buf: Vec<String>,
    diags: &mut Diagnostics,
) -> (Vec<String>, usize) {
    info!("Joining spanned hyphenations");
    let mut count = 0;
    let mut nowrap = 0i32;
    let mut i = 0;

    while i < buf.len() {
        let line = buf[i].as_str();
        if line.starts_with("/*") {
            nowrap += 1;
        } else if line.starts_with("*/") {
            nowrap -= 1;
        }

        let mut join: Option<(usize, usize)> = None;

        if ends_in_hyphen(line) && buf.get(i + 1).is_some_and(|l| is_page_break(l)) {
            if line.ends_with('*') {
                match find_next_line_of_text(&buf, i + 1) {
                    Some(from) if buf[from].starts_with('*') => join = Some((i, from)),
                    from => diags.push(Diagnostic::UnresolvedHyphenation {
                        end: line.to_string(),
                        start: from.map(|f| buf[f].clone()).unwrap_or_default(),
                    }),
                }
            } else if !is_dot_command(line) {
                warn!("Line {}: Unmarked end of line hyphenation\n         {}", i + 1, line);
            }
        }

        if ends_in_dash(line) {
            if line.ends_with('*') {
                if let Some(from) = find_next_line_of_text(&buf, i + 1) {
                    join = Some((i, from));
                }
            } else if nowrap == 0 && is_next_original_line_blank(&buf, i + 1) != Some(true) {
                warn!("Line {}: Unclothed end of line dashes\n         {}", i + 1, line);
            }
        }

        if starts_with_dash(line) && i > 0 {
            if line.starts_with('*') {
                if let Some(to) = find_previous_line_of_text(&buf, i - 1) {
                    join = Some((to, i));
                }
            } else if nowrap == 0 && is_previous_original_line_blank(&buf, i - 1) != Some(true) {
                warn!("Line {}: Unclothed start of line dashes\n         {}", i + 1, line);
            }
        }

        if let Some((to, from)) = join {
            let removed = move_first_word(&mut buf, to, from);
            debug!("{}: Resolved hyphenation, {}", to + 1, buf[to]);
            count += 1;
            // the current line was consumed; look at its successor next
            if removed && from == i {
                continue;
            }
        }
        i += 1;
    }

    info!("Joined {} instances of spanned hyphenations", count);
    (buf, count)
}

/// Append the first word of `buf[from]` to `buf[to]`. Returns true when
/// `from` held a single word and was removed.
fn move_first_word(buf: &mut Vec<String>, to: usize, from: usize) -> bool {
    let (word, rest) = match buf[from].split_once(' ') {
        Some((word, rest)) => (word.to_string(), Some(rest.to_string())),
        None => (buf[from].clone(), None),
    };
    buf[to].push_str(&word);
    match rest {
        Some(rest) => {
            buf[from] = rest;
            false
        }
        None => {
            buf.remove(from);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::lines::to_buffer;

    #[test]
    fn test_reopened_block_is_joined() {
        let buf = to_buffer(&["/*", "line one", "*/", "", "// 010.png", "", "/*", "line two", "*/"]);
        let (out, n) = join_spanned_formatting(buf);
        assert_eq!(n, 1);
        assert_eq!(
            out,
            to_buffer(&["/*", "line one", "", "// 010.png", "", "line two", "*/"])
        );
    }

    #[test]
    fn test_different_block_kind_is_kept() {
        let buf = to_buffer(&["/#", "quote", "#/", "// 010.png", "/*", "poem", "*/"]);
        let (out, n) = join_spanned_formatting(buf.clone());
        assert_eq!(n, 0);
        assert_eq!(out, buf);
    }

    #[test]
    fn test_block_after_chapter_gap_is_kept() {
        let buf = to_buffer(&["*/", "// 010.png", "", "", "", "", "/*", "x", "*/"]);
        let (_, n) = join_spanned_formatting(buf);
        assert_eq!(n, 0);
    }

    #[test]
    fn test_marked_hyphen_joins_next_page() {
        let mut diags = Diagnostics::new();
        let buf = to_buffer(&["the word is cont-*", "// 010.png", "*inued on the line"]);
        let (out, n) = join_spanned_hyphenations(buf, &mut diags);
        assert_eq!(n, 1);
        assert_eq!(
            out,
            to_buffer(&["the word is cont-**inued", "// 010.png", "on the line"])
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_marked_hyphen_without_continuation_marker() {
        let mut diags = Diagnostics::new();
        let buf = to_buffer(&["cont-*", "// 010.png", "inued"]);
        let (out, n) = join_spanned_hyphenations(buf.clone(), &mut diags);
        assert_eq!(n, 0);
        assert_eq!(out, buf);
        assert!(matches!(
            diags.iter().next(),
            Some(Diagnostic::UnresolvedHyphenation { .. })
        ));
    }

    #[test]
    fn test_end_of_line_dash_pulls_word() {
        let mut diags = Diagnostics::new();
        let buf = to_buffer(&["and then—*", "// 010.png", "This is next"]);
        let (out, _) = join_spanned_hyphenations(buf, &mut diags);
        assert_eq!(out[0], "and then—*This");
        assert_eq!(out[2], "is next");
    }

    #[test]
    fn test_start_of_line_dash_joins_previous() {
        let mut diags = Diagnostics::new();
        let buf = to_buffer(&["the first word", "// 010.png", "*—single"]);
        let (out, n) = join_spanned_hyphenations(buf, &mut diags);
        assert_eq!(n, 1);
        assert_eq!(out, to_buffer(&["the first word*—single", "// 010.png"]));
    }
}
