//! Page normalizer: blank-page markers and scan-page banners.

use crate::pipeline::lines::parse_scan_page;
use tracing::{debug, info};

const BANNER_WIDTH: usize = 72;

/// Prefix of the comment recording a line a pass rewrote.
pub const ORIGINAL_PREFIX: &str = "// *** DP2PPGEN ORIGINAL: ";

/// `[Blank Page]` → `// [Blank Page]`.
pub fn process_blank_pages(buf: Vec<String>, keep_original: bool) -> Vec<String> {
    info!("Processing blank pages");
    let mut out = Vec::with_capacity(buf.len());
    let mut count = 0;

    for (i, line) in buf.into_iter().enumerate() {
        if line.starts_with("[Blank Page]") {
            if keep_original {
                out.push(format!("{ORIGINAL_PREFIX}{line}"));
            }
            debug!("{}: '{}' to '// [Blank Page]'", i + 1, line);
            out.push("// [Blank Page]".to_string());
            count += 1;
        } else {
            out.push(line);
        }
    }

    info!("Processed {} blank pages", count);
    out
}

/// `-----File: 001.png---…` (or `// 001.png`) →
/// `.bn 001.png // ----( 001.png )----` padded to 72 columns, then `.pn +1`.
///
/// Lines already in `.bn` form are left alone.
pub fn process_page_numbers(buf: Vec<String>, keep_original: bool) -> Vec<String> {
    info!("Processing page numbers");
    let mut out = Vec::with_capacity(buf.len() + buf.len() / 20);
    let mut count = 0;

    for (i, line) in buf.into_iter().enumerate() {
        let page = parse_scan_page(&line)
            .filter(|_| !line.starts_with(".bn "))
            .map(str::to_string);
        let Some(page) = page else {
            out.push(line);
            continue;
        };
        if keep_original {
            out.push(format!("{ORIGINAL_PREFIX}{line}"));
        }
        out.push(page_directive(&page));
        out.push(".pn +1".to_string());
        debug!("{}: Page {}", i + 1, page);
        count += 1;
    }

    info!("Processed {} page numbers", count);
    out
}

fn page_directive(page: &str) -> String {
    let s = format!(".bn {page} // -----------------------( {page} )");
    let pad = BANNER_WIDTH.saturating_sub(s.chars().count());
    format!("{s}{}", "-".repeat(pad))
}
