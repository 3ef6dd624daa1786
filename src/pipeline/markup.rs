//! Out-of-line formatting blocks: type detection and conversion.
//!
//! DP marks no-wrap and block-quote regions with `/*` … `*/` and
//! `/#` … `#/`. A post-processor can tag the opening line with a block
//! type and arguments (`/*ta columns=lr`, `/#bq in=4`); this module turns
//! tagged blocks into the equivalent ppgen directives.

use crate::error::{Diagnostic, Diagnostics};
use crate::pipeline::lines::is_original_text;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::process::Command;
use tracing::{debug, info, warn};

static RE_BLOCK_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/([*#])(.*)$").unwrap());
static RE_PY_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\(\d+)").unwrap());
static RE_LONG_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4,}").unwrap());

static RE_TABLE_RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-=]{8,}").unwrap());
static RE_TABLE_CAPTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"T[aAbBlLeE]").unwrap());
static RE_TOC_ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r" {6,}\d+").unwrap());
static RE_CELL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\|([^|+]+)").unwrap());

const INDEX_PATTERN: &str = r", (\d{1,3})\b";
const INDEX_REPLACEMENT: &str = ", #${1}#";
const DEFAULT_INDENT: &str = "2";

/// ppgen CSS used by every converted table; emitted once at the top of the
/// document.
pub const TABLE_CSS: &[&str] = &[
    "// Tables",
    ".de .tableU1 { page-break-inside: avoid; margin: 1.5em auto; border-collapse: collapse; width: auto; max-width: 97%}",
    ".de .tableU1 td, .tableU1 th { padding: 0.15em 0.5em; border-left: 1px solid black; border-right: 1px solid black; border-bottom: 1px solid black; text-align: center; font-size: small; }",
    ".de .tableU1 th { padding: 0.8em 0.5em; font-weight: normal; font-size: smaller; border: 1px solid black; }",
    ".de .tableU1 td div.lgcurly { font-size:300%;font-weight:lighter;margin:0;line-height:1em;text-indent:0; }",
    "",
    ".de caption { margin-bottom: 0.8em; font-weight: bold; font-size: 0.9em; }",
    ".de td.ybt, th.ybt { border-top: 1px solid black; }",
    ".de td.nbt, th.nbt { border-top-style: none; }",
    ".de td.nbb, th.nbb { border-bottom-style: none; }",
    ".de td.nbl, th.nbl { border-left-style: none; }",
    ".de td.nbr, th.nbr { border-right-style: none; }",
    ".de td.dbt, th.dbt { border-top: double; }",
    ".de td.dbb, th.dbb { border-bottom: double; }",
    ".de td.dbr, th.dbr { border-right: double; }",
    ".de td.valignb, th.valignb { vertical-align: bottom; }",
    ".de td.left { text-align: left; }",
    ".de td.right { text-align: right; }",
    ".de td.hang { text-align: left; padding-left: 1.5em; text-indent: -1.2em; }",
    ".de td.hang2 { text-align: left; padding-left: 3em; text-indent: -1.2em; }",
    ".de .nodecoration { text-decoration: none; }",
    "",
];

/// Block types with a converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockKind {
    Nf,
    Ta,
    Table,
    Toc,
    Title,
    Poetry,
    Index,
    Bq,
    Hang,
}

impl BlockKind {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "nf" => BlockKind::Nf,
            "ta" => BlockKind::Ta,
            "table" => BlockKind::Table,
            "toc" => BlockKind::Toc,
            "title" => BlockKind::Title,
            "poetry" => BlockKind::Poetry,
            "index" => BlockKind::Index,
            "bq" => BlockKind::Bq,
            "hang" => BlockKind::Hang,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Nf => "nf",
            BlockKind::Ta => "ta",
            BlockKind::Table => "table",
            BlockKind::Toc => "toc",
            BlockKind::Title => "title",
            BlockKind::Poetry => "poetry",
            BlockKind::Index => "index",
            BlockKind::Bq => "bq",
            BlockKind::Hang => "hang",
        }
    }
}

pub type MarkupCounts = BTreeMap<BlockKind, usize>;

// ── Block scanning ───────────────────────────────────────────────────────

struct Block<'a> {
    /// `*` or `#`
    delim: char,
    open: &'a str,
    /// Text after the delimiter: `ta columns=lr`.
    header: &'a str,
    body: &'a [String],
    close: Option<&'a str>,
    /// Index of the first line after the block.
    next: usize,
}

impl Block<'_> {
    fn kind_name(&self) -> &str {
        self.header.split(' ').next().unwrap_or("")
    }
}

fn block_at(buf: &[String], start: usize) -> Option<Block<'_>> {
    let caps = RE_BLOCK_OPEN.captures(&buf[start])?;
    let delim = caps.get(1)?.as_str().chars().next()?;
    let header = caps.get(2).map_or("", |m| m.as_str());

    let opener = format!("/{delim}");
    let closer = format!("{delim}/");
    let mut depth = 1;
    let mut end = None;
    for (i, line) in buf.iter().enumerate().skip(start + 1) {
        if line.starts_with(&opener) {
            depth += 1;
        } else if line.starts_with(&closer) {
            depth -= 1;
            if depth == 0 {
                end = Some(i);
                break;
            }
        }
    }

    let (body, close, next) = match end {
        Some(end) => (&buf[start + 1..end], Some(buf[end].as_str()), end + 1),
        None => {
            warn!("Line {}: {} block never closed", start + 1, opener);
            (&buf[start + 1..], None, buf.len())
        }
    };
    Some(Block {
        delim,
        open: &buf[start],
        header,
        body,
        close,
        next,
    })
}

fn push_verbatim(out: &mut Vec<String>, block: &Block<'_>) {
    out.push(block.open.to_string());
    out.extend_from_slice(block.body);
    if let Some(close) = block.close {
        out.push(close.to_string());
    }
}

// ── Arguments ────────────────────────────────────────────────────────────

/// Parse `key=value` arguments after the block type. Values may be single
/// or double quoted; a bare word is recorded as a flag with an empty value.
///
/// `ta columns=lr s='(\d+)'` → `{columns: lr, s: (\d+)}`.
pub fn parse_args(header: &str) -> HashMap<String, String> {
    split_words(header)
        .into_iter()
        .skip(1)
        .map(|word| match word.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (word, String::new()),
        })
        .collect()
}

/// Shell-style word splitting: whitespace separates, quotes group,
/// backslash escapes outside single quotes.
fn split_words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') => quote = None,
            (Some('\''), c) => word.push(c),
            (Some('"'), '"') => quote = None,
            (Some('"'), '\\') => match chars.next() {
                Some(n @ ('"' | '\\')) => word.push(n),
                Some(n) => {
                    word.push('\\');
                    word.push(n);
                }
                None => word.push('\\'),
            },
            (Some(_), c) => word.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, '\\') => {
                if let Some(n) = chars.next() {
                    word.push(n);
                }
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            (None, c) => {
                word.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(word);
    }
    words
}

/// `\1` style group references → `${1}`; literal `$` escaped.
fn replacement_syntax(r: &str) -> String {
    RE_PY_GROUP
        .replace_all(&r.replace('$', "$$"), "$${$1}")
        .into_owned()
}

/// Apply `pattern` → `replacement` to every line of book text in `lines`.
fn substitute(
    lines: &[String],
    pattern: &str,
    replacement: &str,
    diags: &mut Diagnostics,
) -> Vec<String> {
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => {
            diags.push(Diagnostic::InvalidPattern {
                pattern: pattern.to_string(),
                detail: e.to_string(),
            });
            return lines.to_vec();
        }
    };
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if re.is_match(line) {
                debug!("{}: {}", i + 1, line);
            }
            if is_original_text(line) {
                re.replace_all(line, replacement).into_owned()
            } else {
                line.clone()
            }
        })
        .collect()
}

// ── Detection ────────────────────────────────────────────────────────────

/// Guess the type of an untagged block: grid rules with `|` or a
/// `Table` caption → table; right-aligned page numbers → toc.
pub fn detect_block_kind(body: &[String]) -> Option<BlockKind> {
    let text: Vec<&String> = body.iter().filter(|l| is_original_text(l)).collect();
    let rules = text.iter().any(|l| RE_TABLE_RULE.is_match(l));
    let pipes = text.iter().any(|l| l.contains('|'));
    let caption = text.iter().any(|l| RE_TABLE_CAPTION.is_match(l));

    if rules && (pipes || caption) {
        Some(BlockKind::Table)
    } else if text.iter().any(|l| RE_TOC_ENTRY.is_match(l)) {
        Some(BlockKind::Toc)
    } else {
        None
    }
}

/// Tag untyped `/*` and `/#` blocks with a detected type. Returns the
/// buffer and the number of blocks tagged.
pub fn detect_markup(buf: Vec<String>) -> (Vec<String>, usize) {
    info!("Detecting markup types");
    let mut out = Vec::with_capacity(buf.len());
    let mut detected = 0;
    let mut i = 0;

    while i < buf.len() {
        let Some(block) = block_at(&buf, i) else {
            out.push(buf[i].clone());
            i += 1;
            continue;
        };
        match detect_block_kind(block.body).filter(|_| block.kind_name().is_empty()) {
            Some(kind) => {
                info!("Line {}: detected {}", i + 1, kind.as_str());
                out.push(format!("/{}{}", block.delim, kind.as_str()));
                out.extend_from_slice(block.body);
                out.push(format!("{}/", block.delim));
                detected += 1;
            }
            None => push_verbatim(&mut out, &block),
        }
        i = block.next;
    }

    info!("Detected {} markup types", detected);
    (out, detected)
}

// ── Conversion ───────────────────────────────────────────────────────────

/// Convert every tagged block. Untagged blocks pass through unchanged;
/// blocks with an unknown type are kept and reported.
pub fn process_markup(buf: Vec<String>, diags: &mut Diagnostics) -> (Vec<String>, MarkupCounts) {
    info!("Processing out-of-line formatting markup");
    let mut counts = MarkupCounts::new();
    let mut out = convert_blocks(&buf, &mut counts, diags);

    if counts.contains_key(&BlockKind::Table) {
        out.splice(0..0, TABLE_CSS.iter().map(|s| s.to_string()));
    }
    for (kind, n) in &counts {
        info!("Converted {} {} blocks", n, kind.as_str());
    }
    (out, counts)
}

fn convert_blocks(buf: &[String], counts: &mut MarkupCounts, diags: &mut Diagnostics) -> Vec<String> {
    let mut out = Vec::with_capacity(buf.len());
    let mut i = 0;

    while i < buf.len() {
        let Some(block) = block_at(buf, i) else {
            out.push(buf[i].clone());
            i += 1;
            continue;
        };

        let name = block.kind_name();
        if name.is_empty() {
            push_verbatim(&mut out, &block);
        } else if let Some(kind) = BlockKind::parse(name) {
            info!("Found {}, line {}", name, i + 1);
            let args = parse_args(block.header);
            out.extend(convert_block(kind, block.body, &args, counts, diags));
            *counts.entry(kind).or_default() += 1;
        } else {
            diags.push(Diagnostic::UnknownMarkupType {
                line: i + 1,
                name: name.to_string(),
            });
            push_verbatim(&mut out, &block);
        }
        i = block.next;
    }
    out
}

fn convert_block(
    kind: BlockKind,
    body: &[String],
    args: &HashMap<String, String>,
    counts: &mut MarkupCounts,
    diags: &mut Diagnostics,
) -> Vec<String> {
    let arg = |key: &str| args.get(key).map(String::as_str);
    let wrap = |open: Vec<String>, lines: Vec<String>, close: &[&str]| -> Vec<String> {
        let mut out = open;
        out.extend(lines);
        out.extend(close.iter().map(|s| s.to_string()));
        out
    };

    match kind {
        BlockKind::Nf => {
            let align = ["r", "l", "b"]
                .into_iter()
                .find(|flag| args.contains_key(*flag))
                .unwrap_or("c");
            wrap(vec![format!(".nf {align}")], body.to_vec(), &[".nf-"])
        }
        BlockKind::Title => wrap(vec![".nf c".into()], body.to_vec(), &[".nf-"]),
        BlockKind::Poetry => wrap(vec![".nf b".into()], body.to_vec(), &[".nf-"]),
        BlockKind::Ta => {
            let lines = match arg("s") {
                Some(s) => substitute(body, s, &replacement_syntax(arg("r").unwrap_or("")), diags),
                None => body.to_vec(),
            };
            wrap(
                vec![format!(".ta {}", arg("columns").unwrap_or(""))],
                lines,
                &[".ta-"],
            )
        }
        BlockKind::Toc => convert_toc(body, args, diags),
        BlockKind::Index => {
            for m in body.iter().flat_map(|l| RE_LONG_NUMBER.find_iter(l)) {
                warn!("Link not created for digit in index: {}", m.as_str());
            }
            let lines = match arg("s") {
                Some(s) => substitute(body, s, &replacement_syntax(arg("r").unwrap_or("")), diags),
                None => substitute(body, INDEX_PATTERN, INDEX_REPLACEMENT, diags),
            };
            let indent = arg("in").unwrap_or(DEFAULT_INDENT);
            wrap(
                vec![".na".into(), format!(".in {indent}"), ".nf l".into()],
                lines,
                &[".nf-", ".in", ".ad"],
            )
        }
        BlockKind::Bq => {
            let indent = arg("in").unwrap_or(DEFAULT_INDENT);
            let inner = convert_blocks(body, counts, diags);
            wrap(
                vec![format!(".in {indent}"), format!(".ll -{indent}")],
                inner,
                &[".ll", ".in"],
            )
        }
        BlockKind::Hang => {
            let indent = arg("in").unwrap_or(DEFAULT_INDENT);
            let inner = convert_blocks(body, counts, diags);
            let mut lines = Vec::with_capacity(inner.len());
            let mut para_start = true;
            for line in inner {
                let blank = line.trim().is_empty();
                if para_start && !blank && is_original_text(&line) {
                    lines.push(format!(".ti -{indent}"));
                }
                para_start = blank;
                lines.push(line);
            }
            wrap(vec![format!(".in {indent}")], lines, &[".in"])
        }
        BlockKind::Table => convert_table(body, diags),
    }
}

// ── Table of contents ────────────────────────────────────────────────────

struct TocStyle {
    pattern: &'static str,
    replacement: &'static str,
    columns: &'static str,
}

const TOC_STYLES: &[TocStyle] = &[
    // 3. County and Shire. Meaning of the Words      42
    TocStyle {
        pattern: r"^(\d+?\.) (.+?) {6,}(\d+)",
        replacement: "${1}|#${2}:Page_${3}#|#${3}#",
        columns: "rlr",
    },
    // XI. Columbus and the Savages      48
    TocStyle {
        pattern: r"^([XIVLC]+?\.) (.+?) {6,}(\d+)",
        replacement: "${1}|#${2}:Page_${3}#|#${3}#",
        columns: "rlr",
    },
    // SIR CHRISTOPHER WREN      24
    TocStyle {
        pattern: r"^(.+?) {6,}(\d+)",
        replacement: "#${1}:Page_${2}#|#${2}#",
        columns: "lr",
    },
];

fn convert_toc(body: &[String], args: &HashMap<String, String>, diags: &mut Diagnostics) -> Vec<String> {
    let style = TOC_STYLES.iter().find(|style| {
        Regex::new(style.pattern)
            .map(|re| body.iter().any(|l| re.is_match(l)))
            .unwrap_or(false)
    });

    let columns = args
        .get("columns")
        .map(String::as_str)
        .or(style.map(|s| s.columns))
        .unwrap_or("lr");
    let pattern = args.get("s").cloned().or(style.map(|s| s.pattern.to_string()));
    let replacement = match args.get("r") {
        Some(r) => replacement_syntax(r),
        None => style.map(|s| s.replacement.to_string()).unwrap_or_default(),
    };

    let lines = match pattern {
        Some(pattern) => substitute(body, &pattern, &replacement, diags),
        None => {
            warn!("Table of contents matches no known style; left unlinked");
            body.to_vec()
        }
    };

    let mut out = vec![format!(".ta {columns}")];
    out.extend(lines);
    out.push(".ta-".to_string());
    out
}

// ── Tables ───────────────────────────────────────────────────────────────

/// Text rendering from the DP layout, HTML rendering via `rst2html`.
fn convert_table(body: &[String], diags: &mut Diagnostics) -> Vec<String> {
    for line in body {
        debug!("{}", line);
    }
    let rst = dp_table_to_rst(body);
    info!("Generating HTML with rst2html");
    let html = rst_table_to_html(&rst, diags);

    let mut out = vec![".if t".to_string(), ".nf b".to_string()];
    out.extend_from_slice(body);
    out.extend([".nf-", ".if-", ".if h", ".li"].map(String::from));
    out.extend(html);
    out.extend([".li-", ".if-"].map(String::from));
    out
}

/// Close the grid edges of a DP table and left-align cell text so
/// docutils accepts it as an RST grid table.
pub fn dp_table_to_rst(body: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(body.len());
    let mut in_table = false;
    let mut width = 0;

    for raw in body {
        let line = raw.trim_end();
        let mut row = line.to_string();
        let first = line.chars().next();
        let last = line.chars().last();

        if line.starts_with("+-") || line.starts_with("+=") {
            in_table = true;
        } else if matches!(first, Some('-' | '=')) {
            row.insert(0, '+');
            in_table = true;
        } else if in_table && first.is_some_and(|c| c != '|' && c != '+') {
            row.insert(0, '|');
        }

        if matches!(last, Some('-' | '=')) {
            row.push('+');
            width = row.chars().count();
        } else if width > row.chars().count() {
            row = format!("{:<w$}|", row, w = width - 1);
        } else if in_table && last.is_some_and(|c| c != '|' && c != '+') {
            row.push('|');
        }

        let row = RE_CELL
            .replace_all(&row, |caps: &regex::Captures| {
                let cell = &caps[1];
                if cell.trim().is_empty() {
                    caps[0].to_string()
                } else {
                    format!("|{:<w$}", cell.trim_start(), w = cell.chars().count())
                }
            })
            .into_owned();

        if !in_table && !line.is_empty() {
            warn!("Ignoring line outside table:\n{}", line);
            continue;
        }
        out.push(row);
    }
    out
}

fn rst_table_to_html(rst: &[String], diags: &mut Diagnostics) -> Vec<String> {
    let command = "rst2html";
    let mut fail = |detail: String| {
        diags.push(Diagnostic::ExternalCommandFailed {
            command: command.to_string(),
            detail,
        });
        Vec::new()
    };

    let input = match write_temp(rst) {
        Ok(f) => f,
        Err(e) => return fail(format!("cannot write temporary input: {e}")),
    };
    let output = match tempfile::NamedTempFile::new() {
        Ok(f) => f,
        Err(e) => return fail(format!("cannot create temporary output: {e}")),
    };

    debug!("commandLine: {} {:?} {:?}", command, input.path(), output.path());
    match Command::new(command).arg(input.path()).arg(output.path()).output() {
        Ok(result) if result.status.success() => {}
        Ok(result) => return fail(String::from_utf8_lossy(&result.stderr).trim().to_string()),
        Err(e) => return fail(e.to_string()),
    }

    match std::fs::read_to_string(output.path()) {
        Ok(html) => html_table_rows(&html),
        Err(e) => fail(format!("cannot read output: {e}")),
    }
}

fn write_temp(lines: &[String]) -> std::io::Result<tempfile::NamedTempFile> {
    let mut f = tempfile::NamedTempFile::new()?;
    for line in lines {
        writeln!(f, "{line}")?;
    }
    f.flush()?;
    Ok(f)
}

/// Reduce rst2html output to the table: one line per row, no
/// `colgroup`/`tbody`, first row promoted to header cells.
pub fn html_table_rows(html: &str) -> Vec<String> {
    let mut table = Vec::new();
    let mut in_table = false;
    for line in html.lines() {
        if line.contains("<table") {
            table.push(r#"<table class="tableU1">"#.to_string());
            in_table = true;
        } else if line.contains("</table") {
            table.push(line.to_string());
            in_table = false;
        } else if in_table {
            table.push(line.to_string());
        }
    }

    let mut rows = Vec::with_capacity(table.len());
    let mut row_start: Option<usize> = None;
    let mut in_colgroup = false;
    for (i, line) in table.iter().enumerate() {
        if line.contains("<colgroup") {
            in_colgroup = true;
        } else if line.contains("<tr") {
            row_start = Some(i);
        }
        if line.contains("</tr") {
            if let Some(start) = row_start.take() {
                rows.push(table[start..=i].join(" "));
            }
            continue;
        }
        if line.contains("</colgroup") {
            in_colgroup = false;
            continue;
        }
        if row_start.is_none() && !in_colgroup && !line.starts_with("<tbody") && !line.starts_with("</tbody") {
            rows.push(line.clone());
        }
    }

    if let Some(header) = rows.iter_mut().find(|r| r.contains("<tr")) {
        *header = header.replace("<td", "<th").replace("</td>", "</th>");
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::lines::to_buffer;

    fn convert(lines: &[&str]) -> (Vec<String>, Diagnostics) {
        let mut diags = Diagnostics::new();
        let (out, _) = process_markup(to_buffer(lines), &mut diags);
        (out, diags)
    }

    #[test]
    fn test_parse_args() {
        let args = parse_args(r##"ta columns=lr s='(\d+) x' r="#\1#" l"##);
        assert_eq!(args["columns"], "lr");
        assert_eq!(args["s"], r"(\d+) x");
        assert_eq!(args["r"], r"#\1#");
        assert_eq!(args["l"], "");
        assert!(parse_args("nf").is_empty());
    }

    #[test]
    fn test_replacement_syntax() {
        assert_eq!(replacement_syntax(r"#\1#"), "#${1}#");
        assert_eq!(replacement_syntax("$5"), "$$5");
    }

    #[test]
    fn test_nf_alignment() {
        let (out, _) = convert(&["/*nf l", "left", "*/"]);
        assert_eq!(out, to_buffer(&[".nf l", "left", ".nf-"]));
        let (out, _) = convert(&["/*nf", "centred", "*/"]);
        assert_eq!(out[0], ".nf c");
    }

    #[test]
    fn test_poetry_and_title() {
        let (out, _) = convert(&["/*poetry", "verse", "*/", "/*title", "BOOK", "*/"]);
        assert_eq!(out, to_buffer(&[".nf b", "verse", ".nf-", ".nf c", "BOOK", ".nf-"]));
    }

    #[test]
    fn test_blockquote_converts_nested_blocks() {
        let (out, _) = convert(&["/#bq in=4", "quote", "/*poetry", "verse", "*/", "#/"]);
        assert_eq!(
            out,
            to_buffer(&[".in 4", ".ll -4", "quote", ".nf b", "verse", ".nf-", ".ll", ".in"])
        );
    }

    #[test]
    fn test_hanging_indent() {
        let (out, _) = convert(&["/#hang", "First entry", "continues", "", "Second", "#/"]);
        assert_eq!(
            out,
            to_buffer(&[".in 2", ".ti -2", "First entry", "continues", "", ".ti -2", "Second", ".in"])
        );
    }

    #[test]
    fn test_index_links_page_numbers() {
        let (out, _) = convert(&["/*index", "Apples, 12, 15", "Years, 1850", "*/"]);
        assert_eq!(
            out,
            to_buffer(&[
                ".na",
                ".in 2",
                ".nf l",
                "Apples, #12#, #15#",
                "Years, 1850",
                ".nf-",
                ".in",
                ".ad",
            ])
        );
    }

    #[test]
    fn test_ta_with_user_pattern() {
        let (out, _) = convert(&[r"/*ta columns=lr s='^(\w+) +(\d+)$' r='\1|\2'", "Alpha     12", "*/"]);
        assert_eq!(out, to_buffer(&[".ta lr", "Alpha|12", ".ta-"]));
    }

    #[test]
    fn test_invalid_pattern_reported() {
        let (out, diags) = convert(&["/*ta s='(unclosed'", "row", "*/"]);
        assert_eq!(out, to_buffer(&[".ta ", "row", ".ta-"]));
        assert!(matches!(
            diags.iter().next(),
            Some(Diagnostic::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_toc_styles() {
        let (out, _) = convert(&["/*toc", "3. County and Shire      42", "*/"]);
        assert_eq!(
            out,
            to_buffer(&[".ta rlr", "3.|#County and Shire:Page_42#|#42#", ".ta-"])
        );
        let (out, _) = convert(&["/*toc", "SIR CHRISTOPHER WREN      24", "*/"]);
        assert_eq!(
            out,
            to_buffer(&[".ta lr", "#SIR CHRISTOPHER WREN:Page_24#|#24#", ".ta-"])
        );
    }

    #[test]
    fn test_unknown_type_kept() {
        let (out, diags) = convert(&["/*mystery", "text", "*/"]);
        assert_eq!(out, to_buffer(&["/*mystery", "text", "*/"]));
        assert!(matches!(
            diags.iter().next(),
            Some(Diagnostic::UnknownMarkupType { line: 1, name }) if name == "mystery"
        ));
    }

    #[test]
    fn test_untyped_block_passes_through() {
        let (out, diags) = convert(&["/*", "plain", "*/"]);
        assert_eq!(out, to_buffer(&["/*", "plain", "*/"]));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_table_block_adds_css_and_both_renderings() {
        let (out, _) = convert(&["/*table", "------+-----", "a     | b", "------+-----", "*/"]);
        assert_eq!(out[0], "// Tables");
        let body = &out[TABLE_CSS.len()..];
        assert_eq!(&body[..2], &to_buffer(&[".if t", ".nf b"])[..]);
        assert!(body.contains(&".if h".to_string()));
        assert_eq!(body.last().map(String::as_str), Some(".if-"));
    }

    #[test]
    fn test_detect_markup() {
        let buf = to_buffer(&[
            "/*",
            "----------+------",
            "Name      | Value",
            "*/",
            "/*",
            "Chapter One      1",
            "*/",
            "/*",
            "just verse",
            "*/",
            "/*poetry",
            "Tom      12",
            "*/",
        ]);
        let (out, n) = detect_markup(buf);
        assert_eq!(n, 2);
        assert_eq!(out[0], "/*table");
        assert_eq!(out[4], "/*toc");
        assert_eq!(out[7], "/*");
        assert_eq!(out[10], "/*poetry");
    }

    #[test]
    fn test_dp_table_to_rst() {
        let rst = dp_table_to_rst(&to_buffer(&["---------+-------", " Name    | Value", "---------+-------"]));
        assert_eq!(
            rst,
            to_buffer(&["+---------+-------+", "|Name     |Value  |", "+---------+-------+"])
        );
    }

    #[test]
    fn test_html_table_rows() {
        let html = r#"<html><body>
<table border="1" class="docutils">
<colgroup>
<col width="50%" />
</colgroup>
<tbody valign="top">
<tr><td>Name</td>
<td>Value</td>
</tr>
<tr><td>a</td>
<td>1</td>
</tr>
</tbody>
</table>
</body></html>"#;
        assert_eq!(
            html_table_rows(html),
            to_buffer(&[
                r#"<table class="tableU1">"#,
                "<tr><th>Name</th> <th>Value</th> </tr>",
                "<tr><td>a</td> <td>1</td> </tr>",
                "</table>",
            ])
        );
    }
}
