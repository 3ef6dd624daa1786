//! `[Sidenote: …]` → `.sn …`.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

static RE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\*?\[Sidenote").unwrap());
static RE_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\*?\[Sidenote: ?").unwrap());
static RE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\]\**$").unwrap());

pub const RELOCATE_COMMENT: &str = "// *** DP2PPGEN: RELOCATE SIDENOTE";

/// Convert every sidenote block. Multi-line notes are joined with a space,
/// or with `|` when `keep_breaks` is set. Returns the buffer and the count.
pub fn process_sidenotes(buf: Vec<String>, keep_breaks: bool) -> (Vec<String>, usize) {
    info!("Processing sidenotes");
    let mut out = Vec::with_capacity(buf.len());
    let mut count = 0;
    let mut i = 0;

    while i < buf.len() {
        if !RE_OPEN.is_match(&buf[i]) {
            out.push(buf[i].clone());
            i += 1;
            continue;
        }

        let start = i;
        while i < buf.len() && !RE_CLOSE.is_match(&buf[i]) {
            i += 1;
        }
        if i == buf.len() {
            warn!("Line {}: Sidenote runs to end of file\n         {}", start + 1, buf[start]);
            i -= 1;
        }

        let text: Vec<String> = buf[start..=i]
            .iter()
            .map(|l| {
                let l = RE_LABEL.replace(l, "");
                RE_CLOSE.replace(&l, "").into_owned()
            })
            .collect();

        if buf[start].starts_with('*') {
            out.push(RELOCATE_COMMENT.to_string());
        }
        let joined = text.join(if keep_breaks { "|" } else { " " });
        debug!("{}: .sn {}", start + 1, joined);
        out.push(format!(".sn {joined}"));
        count += 1;
        i += 1;
    }

    info!("Processed {} sidenotes", count);
    (out, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::lines::to_buffer;

    #[test]
    fn test_single_line_sidenote() {
        let (out, n) = process_sidenotes(to_buffer(&["[Sidenote: The Battle.]", "Text."]), false);
        assert_eq!(n, 1);
        assert_eq!(out, to_buffer(&[".sn The Battle.", "Text."]));
    }

    #[test]
    fn test_multi_line_sidenote() {
        let buf = to_buffer(&["[Sidenote: Death of", "the King.]"]);
        let (out, _) = process_sidenotes(buf.clone(), false);
        assert_eq!(out, to_buffer(&[".sn Death of the King."]));
        let (out, _) = process_sidenotes(buf, true);
        assert_eq!(out, to_buffer(&[".sn Death of|the King."]));
    }

    #[test]
    fn test_continued_sidenote_needs_relocation() {
        let (out, _) = process_sidenotes(to_buffer(&["*[Sidenote: continued]*"]), false);
        assert_eq!(out[0], RELOCATE_COMMENT);
        assert_eq!(out[1], ".sn continued");
    }
}
