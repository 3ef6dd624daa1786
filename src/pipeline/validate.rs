//! Markup validator.
//!
//! Checks balance of out-of-line blocks (`/*` `*/`, `/#` `#/`), square
//! brackets and inline tags before any rewriting pass runs. Every problem
//! becomes a [`Diagnostic::MarkupError`]; the caller decides whether the
//! count is fatal.

use crate::error::{Diagnostic, Diagnostics};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

static RE_BLOCK_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/([*#])").unwrap());
static RE_BLOCK_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([*#])/").unwrap());
static RE_INLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[|\]|</?\w+>").unwrap());
static RE_SINGLE_LINE_FOOTNOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\*?\[Footnote.*\]\*?.*$").unwrap());

#[derive(Debug)]
struct Open {
    line: usize,
    markup: String,
}

/// Validate `buf`, pushing one diagnostic per error. Returns the count.
pub fn validate_markup(buf: &[String], diags: &mut Diagnostics) -> usize {
    info!("Checking input file for markup errors");

    let mut stack: Vec<Open> = Vec::new();
    let mut errors = 0;
    let mut report = |line: usize, detail: String, diags: &mut Diagnostics| {
        errors += 1;
        diags.push(Diagnostic::MarkupError { line, detail });
    };

    for (i, raw) in buf.iter().enumerate() {
        let line_no = i + 1;
        let line = raw.trim_end_matches([' ', '\t']);

        if let Some(caps) = RE_BLOCK_OPEN.captures(line) {
            stack.push(Open {
                line: line_no,
                markup: format!("/{}", &caps[1]),
            });
        }

        if let Some(caps) = RE_BLOCK_CLOSE.captures(line) {
            let kind = &caps[1];
            let expected = format!("/{kind}");
            match stack.last() {
                Some(top) if top.markup == expected => {
                    stack.pop();
                }
                top => report(line_no, unexpected(&format!("{kind}/"), top), diags),
            }
        }

        for m in RE_INLINE.find_iter(line) {
            let v = m.as_str();
            if v == "<tb>" {
                continue;
            }
            let expected = if v == "]" {
                Some("[".to_string())
            } else if v.starts_with("</") {
                Some(v.replacen('/', "", 1))
            } else {
                None
            };
            match expected {
                Some(expected) => match stack.last() {
                    Some(top) if top.markup == expected => {
                        stack.pop();
                    }
                    top => report(line_no, unexpected(v, top), diags),
                },
                None => stack.push(Open {
                    line: line_no,
                    markup: v.to_string(),
                }),
            }
        }

        // [Footnote 1: Duine, <i>Saints</i>, pp. 5-12].
        if RE_SINGLE_LINE_FOOTNOTE.is_match(line)
            && line.matches('[').count() == line.matches(']').count()
            && !(line.ends_with(']') || line.ends_with("]*"))
        {
            report(
                line_no,
                format!("Extra characters found after closing ']' in [Footnote]\n       {line}"),
                diags,
            );
        }
    }

    if let Some(first) = stack.first() {
        let open: Vec<String> = stack
            .iter()
            .map(|o| format!("Line {}: '{}'", o.line, o.markup))
            .collect();
        report(
            first.line,
            format!(
                "Reached end of file with unresolved formatting markup: {}",
                open.join(", ")
            ),
            diags,
        );
    }

    if errors > 0 {
        info!("Found {} markup errors", errors);
    }
    errors
}

fn unexpected(found: &str, top: Option<&Open>) -> String {
    match top {
        Some(top) => format!(
            "Unexpected {found}, previous ({}:{})",
            top.line, top.markup
        ),
        None => format!("Unexpected {found}"),
    }
}
