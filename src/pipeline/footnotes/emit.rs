//! Render resolved records as ppgen `.fn` blocks and move them to their
//! destination.
//!
//! Multi-point insertion collects `(point, lines)` pairs first, then applies
//! them from the highest point down so no pending index is shifted by an
//! earlier insert.

use super::parse::strip_footnote_blocks;
use super::record::FootnoteRecord;
use crate::config::{FootnoteDestination, LandingZone};
use crate::error::{Diagnostic, Diagnostics};
use crate::pipeline::lines::{find_next_chapter, find_previous_blank};
use std::collections::BTreeMap;
use tracing::info;

const FOOTNOTES_SECTION_OPEN: [&str; 9] = [
    ".sp 4",
    ".pb",
    ".de div.footnotes { border: dashed 1px #aaaaaa; padding: 1.5em; }",
    ".de div.footnotes h2 { margin-top: 1em; }",
    ".dv class=\"footnotes\"",
    ".sp 2",
    ".h2 id=footnotes nobreak",
    "FOOTNOTES:",
    ".sp 2",
];

const FOOTNOTES_SECTION_CLOSE: &str = ".dv-";

/// Rendering options shared by every destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmitOptions {
    pub autonumber: bool,
    pub landing_zone_text: Option<LandingZone>,
    pub landing_zone_html: Option<LandingZone>,
}

impl EmitOptions {
    /// The `.fm` line closing each footnote group. With a landing zone in
    /// use, the in-text group is suppressed for that format.
    pub fn group_marker(&self) -> &'static str {
        match (self.landing_zone_text, self.landing_zone_html) {
            (Some(_), Some(_)) => ".fm rend=no",
            (Some(_), None) => ".fm rend=h",
            (None, Some(_)) => ".fm rend=t",
            (None, None) => ".fm",
        }
    }
}

/// `.fn N` … `.fn-` for one record.
pub fn footnote_markup(
    record: &FootnoteRecord,
    number: usize,
    with_page: bool,
    opts: &EmitOptions,
) -> Vec<String> {
    let label = if opts.autonumber {
        "#".to_string()
    } else {
        number.to_string()
    };
    let open = match (&record.scan_page, with_page) {
        (Some(page), true) => format!(".fn {label}  // {page}"),
        _ => format!(".fn {label}"),
    };

    let mut lines = Vec::with_capacity(record.body.len() + 2);
    lines.push(open);
    lines.extend(record.body.iter().cloned());
    lines.push(".fn-".to_string());
    lines
}

/// Insert rendered footnotes according to `dest`.
pub fn relocate(
    buf: Vec<String>,
    records: &[FootnoteRecord],
    dest: FootnoteDestination,
    opts: &EmitOptions,
) -> Vec<String> {
    info!("Generating footnote markup ({})", dest);
    match dest {
        FootnoteDestination::BookEnd => to_book_end(buf, records, opts),
        FootnoteDestination::ChapterEnd => {
            to_insertion_points(buf, records, opts, true, |r| r.chapter_end)
        }
        FootnoteDestination::ParagraphEnd => {
            to_insertion_points(buf, records, opts, false, |r| r.paragraph_end)
        }
        FootnoteDestination::InPlace => in_place(buf, records, opts),
    }
}

/// [`relocate`] with the destination given by name. An unknown name is
/// reported and the buffer comes back untouched.
pub fn relocate_by_name(
    buf: Vec<String>,
    records: &[FootnoteRecord],
    name: &str,
    opts: &EmitOptions,
    diags: &mut Diagnostics,
) -> Vec<String> {
    match name.parse::<FootnoteDestination>() {
        Ok(dest) => relocate(buf, records, dest, opts),
        Err(_) => {
            diags.push(Diagnostic::UnknownDestination {
                name: name.to_string(),
            });
            buf
        }
    }
}

fn number_of(record: &FootnoteRecord, fallback: usize) -> usize {
    record.number.unwrap_or(fallback)
}

fn by_number(records: &[FootnoteRecord]) -> Vec<(usize, &FootnoteRecord)> {
    let mut numbered: Vec<_> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (number_of(r, i + 1), r))
        .collect();
    numbered.sort_by_key(|&(n, _)| n);
    numbered
}

fn to_book_end(
    mut buf: Vec<String>,
    records: &[FootnoteRecord],
    opts: &EmitOptions,
) -> Vec<String> {
    info!("Adding footnotes to end of book");
    buf.extend(FOOTNOTES_SECTION_OPEN.iter().map(|s| s.to_string()));
    for (n, record) in by_number(records) {
        buf.extend(footnote_markup(record, n, true, opts));
    }
    buf.push(FOOTNOTES_SECTION_CLOSE.to_string());
    buf
}

fn to_insertion_points<F>(
    mut buf: Vec<String>,
    records: &[FootnoteRecord],
    opts: &EmitOptions,
    with_page: bool,
    point_of: F,
) -> Vec<String>
where
    F: Fn(&FootnoteRecord) -> Option<usize>,
{
    let end = buf.len();
    let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for (n, record) in by_number(records) {
        let point = point_of(record).unwrap_or(end).min(end);
        groups
            .entry(point)
            .or_default()
            .extend(footnote_markup(record, n, with_page, opts));
    }

    // highest point first
    for (point, mut lines) in groups.into_iter().rev() {
        lines.push(opts.group_marker().to_string());
        buf.splice(point..point, lines);
    }
    buf
}

fn in_place(mut buf: Vec<String>, records: &[FootnoteRecord], opts: &EmitOptions) -> Vec<String> {
    info!("Adding footnotes in place");
    let mut ordered: Vec<(usize, &FootnoteRecord)> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (number_of(r, i + 1), r))
        .collect();
    ordered.sort_by_key(|&(_, r)| r.source_range.0);

    let mut replacements = Vec::with_capacity(ordered.len());
    for (i, &(n, record)) in ordered.iter().enumerate() {
        let mut lines = footnote_markup(record, n, false, opts);
        let last_of_page = ordered
            .get(i + 1)
            .map_or(true, |(_, next)| next.scan_page != record.scan_page);
        if last_of_page {
            lines.push(opts.group_marker().to_string());
        }
        replacements.push((record.source_range, lines));
    }

    for ((start, end), lines) in replacements.into_iter().rev() {
        let end = (end + 1).min(buf.len());
        buf.splice(start.min(end)..end, lines);
    }

    // absorbed `*[Footnote` fragments are still in the buffer
    strip_footnote_blocks(&buf)
}

/// Add `.fm lz=` landing zones for the configured formats.
pub fn add_landing_zones(mut buf: Vec<String>, opts: &EmitOptions) -> Vec<String> {
    let zone_formats = |zone: LandingZone| {
        let mut s = String::new();
        if opts.landing_zone_text == Some(zone) {
            s.push('t');
        }
        if opts.landing_zone_html == Some(zone) {
            s.push('h');
        }
        s
    };

    info!(
        "Generating footnote landing zones (text={:?} html={:?})",
        opts.landing_zone_text, opts.landing_zone_html
    );

    // A chapter zone sits on the blank line above its heading, never
    // further back than the previous heading. The last chapter closes at
    // the end of the text, ahead of any book-end section.
    let chapter = zone_formats(LandingZone::ChapterEnd);
    if !chapter.is_empty() {
        let mut floor = 0;
        let mut next = find_next_chapter(&buf, 0);
        while let Some(heading) = next {
            let at = find_previous_blank(&buf, heading)
                .filter(|&blank| blank >= floor)
                .unwrap_or(heading);
            buf.insert(at, format!(".fm lz={chapter}"));
            floor = heading + 2;
            next = find_next_chapter(&buf, floor);
        }
        buf.push(format!(".fm lz={chapter}"));
    }

    let book = zone_formats(LandingZone::BookEnd);
    if !book.is_empty() {
        buf.extend(FOOTNOTES_SECTION_OPEN.iter().map(|s| s.to_string()));
        buf.push(format!(".fm rend=no lz={book}"));
        buf.push(FOOTNOTES_SECTION_CLOSE.to_string());
    }
    buf
}
