//! Line classification helpers shared by every pass.
//!
//! DP text carries no structure beyond line breaks, so every pass asks the
//! same questions of a line: is it blank, is it a page marker, is it a ppgen
//! directive, is it text from the book? The answers live here so the passes
//! agree on them.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_PAGE_BANNER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-----File: (\w+\.(?:png|jpg|jpeg))").unwrap());
static RE_PAGE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^// (\w+\.(?:png|jpg|jpeg))").unwrap());
static RE_PAGE_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\.bn (\w+\.(?:png|jpg|jpeg))").unwrap());

static RE_DOT_COMMAND: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\.[a-z0-9]{2}[ -]").unwrap());

/// Lines that are markup rather than book text: ppgen dot commands, ppgen
/// comments, out-of-line formatting delimiters, bracketed DP tags.
static RE_NOT_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\.[a-z0-9]{2} |[*#]/|/[*#]|\*?\[\w+|//)").unwrap());

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?\w+>").unwrap());
static RE_NON_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_ ]").unwrap());

pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

pub fn is_comment(line: &str) -> bool {
    line.starts_with("//")
}

/// Extract the scan page id (`001.png`) from any of the three page marker
/// forms: the DP file banner, a ppgen comment, or a `.bn` directive.
pub fn parse_scan_page(line: &str) -> Option<&str> {
    [&*RE_PAGE_BANNER, &*RE_PAGE_COMMENT, &*RE_PAGE_DIRECTIVE]
        .iter()
        .find_map(|re| re.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn is_page_break(line: &str) -> bool {
    parse_scan_page(line).is_some()
}

/// A ppgen directive such as `.sp 4` or `.fn-`.
pub fn is_dot_command(line: &str) -> bool {
    RE_DOT_COMMAND.is_match(line)
}

/// True for lines carrying text from the book. Blank lines count as text.
pub fn is_original_text(line: &str) -> bool {
    !RE_NOT_TEXT.is_match(line) && !is_page_break(line)
}

/// Turn a heading into a ppgen id: `CHAPTER <i>IV</i>.` → `chapter_iv`.
pub fn format_as_id(s: &str) -> String {
    let s = RE_TAG.replace_all(s, "");
    let s = RE_NON_ID.replace_all(&s, "");
    s.trim_end().replace(' ', "_").to_lowercase()
}

// ── Buffer searches ──────────────────────────────────────────────────────

pub fn find_next_blank(buf: &[String], start: usize) -> Option<usize> {
    (start..buf.len()).find(|&i| is_blank(&buf[i]))
}

pub fn find_previous_blank(buf: &[String], start: usize) -> Option<usize> {
    let start = start.min(buf.len().checked_sub(1)?);
    (0..=start).rev().find(|&i| is_blank(&buf[i]))
}

pub fn find_next_non_blank(buf: &[String], start: usize) -> Option<usize> {
    (start..buf.len()).find(|&i| !is_blank(&buf[i]))
}

pub fn find_previous_non_blank(buf: &[String], start: usize) -> Option<usize> {
    let start = start.min(buf.len().checked_sub(1)?);
    (0..=start).rev().find(|&i| !is_blank(&buf[i]))
}

/// Previous non-blank line of book text at or before `start`, skipping
/// directives and DP markup.
pub fn find_previous_line_of_text(buf: &[String], start: usize) -> Option<usize> {
    let start = start.min(buf.len().checked_sub(1)?);
    (0..=start)
        .rev()
        .find(|&i| !is_blank(&buf[i]) && is_original_text(&buf[i]))
}

/// Next non-blank line of book text at or after `start`.
pub fn find_next_line_of_text(buf: &[String], start: usize) -> Option<usize> {
    (start..buf.len()).find(|&i| !is_blank(&buf[i]) && is_original_text(&buf[i]))
}

/// Next `.h2` chapter directive at or after `start`.
pub fn find_next_chapter(buf: &[String], start: usize) -> Option<usize> {
    (start..buf.len()).find(|&i| buf[i].starts_with(".h2"))
}

/// Whether the next blank-or-text line after `start` is blank, skipping
/// markup lines. `None` when the buffer runs out first.
pub fn is_next_original_line_blank(buf: &[String], start: usize) -> Option<bool> {
    (start..buf.len()).find_map(|i| {
        if is_blank(&buf[i]) {
            Some(true)
        } else if is_original_text(&buf[i]) {
            Some(false)
        } else {
            None
        }
    })
}

/// Backward counterpart of [`is_next_original_line_blank`].
pub fn is_previous_original_line_blank(buf: &[String], start: usize) -> Option<bool> {
    let start = start.min(buf.len().checked_sub(1)?);
    (0..=start).rev().find_map(|i| {
        if is_blank(&buf[i]) {
            Some(true)
        } else if is_original_text(&buf[i]) {
            Some(false)
        } else {
            None
        }
    })
}

// ── Hyphens and dashes ───────────────────────────────────────────────────

/// `word-` or `word-*`, but not a dash (`--`, `—-`).
pub fn ends_in_hyphen(line: &str) -> bool {
    let stem = line.strip_suffix('*').unwrap_or(line);
    match stem.strip_suffix('-') {
        Some(before) => !matches!(before.chars().last(), Some('-') | Some('—')),
        None => false,
    }
}

fn is_dash_run(run: &str) -> bool {
    matches!(run, "--" | "—" | "----" | "——")
}

/// Line ends in an em-dash (`--`, `—`) or long dash (`----`, `——`),
/// optionally followed by `*`.
pub fn ends_in_dash(line: &str) -> bool {
    let stem = line.strip_suffix('*').unwrap_or(line);
    let body = stem.trim_end_matches(['-', '—']);
    is_dash_run(&stem[body.len()..])
}

/// Line starts with an em-dash or long dash, optionally after `*`.
pub fn starts_with_dash(line: &str) -> bool {
    let stem = line.strip_prefix('*').unwrap_or(line);
    let body = stem.trim_start_matches(['-', '—']);
    is_dash_run(&stem[..stem.len() - body.len()])
}

/// Copy `lines` into owned strings. Test and caller convenience.
pub fn to_buffer<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    lines.iter().map(|l| l.as_ref().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan_page_forms() {
        assert_eq!(
            parse_scan_page("-----File: 001.png---\\sparkle\\swanky\\------"),
            Some("001.png")
        );
        assert_eq!(parse_scan_page("// 010.png"), Some("010.png"));
        assert_eq!(
            parse_scan_page(".bn 042.jpg // -----------( 042.jpg )"),
            Some("042.jpg")
        );
        assert_eq!(parse_scan_page("// a comment"), None);
        assert_eq!(parse_scan_page("see 010.png"), None);
        assert_eq!(parse_scan_page("// 010.gif"), None);
    }

    #[test]
    fn test_original_text() {
        assert!(is_original_text("It was a dark night."));
        assert!(is_original_text(""));
        assert!(!is_original_text(".sp 4"));
        assert!(!is_original_text("// comment"));
        assert!(!is_original_text("/*"));
        assert!(!is_original_text("#/"));
        assert!(!is_original_text("[Footnote 1: text]"));
        assert!(!is_original_text("*[Sidenote: text]"));
        assert!(!is_original_text("-----File: 001.png---"));
    }

    #[test]
    fn test_dot_command() {
        assert!(is_dot_command(".sp 2"));
        assert!(is_dot_command(".fn-"));
        assert!(!is_dot_command(".fn"));
        assert!(!is_dot_command("... and so on"));
    }

    #[test]
    fn test_format_as_id() {
        assert_eq!(format_as_id("CHAPTER <i>IV</i>."), "chapter_iv");
        assert_eq!(format_as_id("The Sea-Rose  "), "the_searose");
    }

    #[test]
    fn test_searches() {
        let buf = to_buffer(&["text", "", ".sp 2", "more", "", ".h2 id=x"]);
        assert_eq!(find_next_blank(&buf, 0), Some(1));
        assert_eq!(find_next_blank(&buf, 2), Some(4));
        assert_eq!(find_previous_blank(&buf, 3), Some(1));
        assert_eq!(find_next_non_blank(&buf, 1), Some(2));
        assert_eq!(find_previous_non_blank(&buf, 4), Some(3));
        assert_eq!(find_previous_line_of_text(&buf, 5), Some(3));
        assert_eq!(find_next_line_of_text(&buf, 1), Some(3));
        assert_eq!(find_next_chapter(&buf, 0), Some(5));
        assert_eq!(find_next_chapter(&buf, 6), None);
        assert_eq!(find_next_blank(&buf, 5), None);
    }

    #[test]
    fn test_searches_on_empty_buffer() {
        let buf: Vec<String> = Vec::new();
        assert_eq!(find_previous_blank(&buf, 3), None);
        assert_eq!(find_previous_line_of_text(&buf, 0), None);
        assert_eq!(is_previous_original_line_blank(&buf, 0), None);
    }

    #[test]
    fn test_hyphen_and_dash_endings() {
        assert!(ends_in_hyphen("word-"));
        assert!(ends_in_hyphen("word-*"));
        assert!(!ends_in_hyphen("word--"));
        assert!(!ends_in_hyphen("word—-*"));
        assert!(!ends_in_hyphen("word"));

        assert!(ends_in_dash("and then--"));
        assert!(ends_in_dash("and then—*"));
        assert!(ends_in_dash("silence----"));
        assert!(!ends_in_dash("rule---"));
        assert!(!ends_in_dash("word-"));

        assert!(starts_with_dash("*--and so"));
        assert!(starts_with_dash("—and so"));
        assert!(!starts_with_dash("-----File: 001.png"));
        assert!(!starts_with_dash("plain"));
    }

    #[test]
    fn test_original_line_blank_probes() {
        let buf = to_buffer(&["word--", "// 002.png", ".pn +1", "", "next"]);
        assert_eq!(is_next_original_line_blank(&buf, 1), Some(true));
        assert_eq!(is_previous_original_line_blank(&buf, 2), Some(false));
    }
}
