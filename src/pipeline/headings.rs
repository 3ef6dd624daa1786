//! Heading segmenter.
//!
//! DP formatting marks headings purely with blank lines:
//!
//! ```text
//! (4 blank lines)          (2 blank lines)
//! CHAPTER VI.              Section heading
//! (1 blank line)           (1 blank line)
//! description, quote …
//! (2 blank lines)
//! ```
//!
//! Chapter blocks also end at a page break. Nothing inside `/* */` or
//! `/# #/` is considered.

use crate::config::ConversionConfig;
use crate::pipeline::lines::{format_as_id, is_blank, is_original_text, is_page_break};
use tracing::{info, warn};

const GENERATED_BANNER: &str =
    "// ******** DP2PPGEN GENERATED ****************************************";
const ORIGINAL_OPEN: &str =
    ".ig  // *** DP2PPGEN BEGIN ORIGINAL ***********************************";
const ORIGINAL_CLOSE: &str =
    ".ig- // *** END *****************************************************";

/// Counts from one heading pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadingCounts {
    pub chapters: usize,
    pub sections: usize,
}

pub fn process_headings(buf: &[String], config: &ConversionConfig) -> (Vec<String>, HeadingCounts) {
    let do_chapters = config.passes.chapters;
    let do_sections = config.passes.sections;
    match (do_chapters, do_sections) {
        (true, true) => info!("Processing chapter and section headings"),
        (true, false) => info!("Processing chapter headings"),
        (false, true) => info!("Processing section headings"),
        (false, false) => return (buf.to_vec(), HeadingCounts::default()),
    }

    let mut out: Vec<String> = Vec::with_capacity(buf.len());
    let mut counts = HeadingCounts::default();
    let mut blanks = 0;
    let mut rewrap_depth = 0i32;
    let mut i = 0;

    while i < buf.len() {
        let line = buf[i].as_str();
        if line.starts_with("/*") || line.starts_with("/#") {
            rewrap_depth += 1;
        } else if line.starts_with("*/") || line.starts_with("#/") {
            rewrap_depth -= 1;
        }
        let candidate = !is_blank(line) && rewrap_depth == 0;

        if do_chapters && candidate && blanks == 4 {
            let start = i;
            let mut closed = false;
            blanks = 0;
            let mut block: Vec<String> = Vec::new();
            while i < buf.len() {
                let l = &buf[i];
                blanks = if is_blank(l) { blanks + 1 } else { 0 };
                // chapters don't span pages
                if blanks == 2 || is_page_break(l) {
                    closed = true;
                    break;
                }
                block.push(l.clone());
                i += 1;
            }
            while block.last().is_some_and(|l| is_blank(l)) {
                block.pop();
            }
            // the blank dropped from the block still counts toward the next heading
            blanks = usize::from(closed);

            match render_chapter(&block, start, config) {
                Some(rendered) => {
                    while out.last().is_some_and(|l| is_blank(l)) {
                        out.pop();
                    }
                    out.extend(rendered);
                    counts.chapters += 1;
                }
                None => out.extend(block),
            }
        } else if do_sections && candidate && blanks == 2 {
            blanks = 0;
            let start = i;
            while i < buf.len() && !is_blank(&buf[i]) {
                i += 1;
            }
            let block = &buf[start..i];
            if block.len() > config.section_max_lines {
                tracing::debug!(
                    "Line {}: Disregarding section heading; too many lines ({} > {})",
                    start + 1,
                    block.len(),
                    config.section_max_lines
                );
                out.extend_from_slice(block);
            } else {
                // one of the two blank lines above goes
                out.pop();
                info!(".h3 {}", block[0]);
                out.extend(render_section(block, config.keep_original));
                counts.sections += 1;
            }
        } else {
            blanks = if is_blank(line) { blanks + 1 } else { 0 };
            out.push(line.to_string());
            i += 1;
        }
    }

    if do_chapters {
        info!("Processed {} chapters", counts.chapters);
    }
    if do_sections {
        info!("Processed {} sections", counts.sections);
    }
    (out, counts)
}

fn render_chapter(block: &[String], start: usize, config: &ConversionConfig) -> Option<Vec<String>> {
    let first = block.first()?;

    // Title lines run until the first line of markup; blank lines inside
    // the title become `||`.
    let title_len = block
        .iter()
        .position(|l| !is_original_text(l))
        .unwrap_or(block.len());
    let title = block[..title_len].join("|");
    let title = title.trim_end_matches('|');

    if title.is_empty() {
        warn!(
            "Line {}: Disregarding chapter heading; no text found\n         {}",
            start + 1,
            first
        );
        return None;
    }
    if block.len() > config.chapter_max_lines {
        warn!(
            "Line {}: Disregarding chapter heading; too many lines ({} > {}):\n ---\n{}\n ---",
            start + 1,
            block.len(),
            config.chapter_max_lines,
            block[..block.len().min(6)].join("\n")
        );
        return None;
    }

    let mut out = vec![String::new()];
    if config.keep_original {
        out.push(GENERATED_BANNER.to_string());
    }
    out.push(".sp 4".to_string());
    out.push(format!(".h2 id={}", format_as_id(first)));
    out.push(title.to_string());
    out.extend(block[title_len..].iter().cloned());
    out.push(".sp 2".to_string());

    if config.keep_original {
        out.push(ORIGINAL_OPEN.to_string());
        out.extend(std::iter::repeat(String::new()).take(3));
        out.extend(block.iter().cloned());
        out.push(String::new());
        out.push(ORIGINAL_CLOSE.to_string());
    }

    info!(".h2 {}", title);
    Some(out)
}

fn render_section(block: &[String], keep_original: bool) -> Vec<String> {
    let mut out = Vec::new();
    if keep_original {
        out.push(GENERATED_BANNER.to_string());
    }
    out.push(".sp 2".to_string());
    out.push(format!(
        ".h3 id={}",
        block.first().map(|l| format_as_id(l)).unwrap_or_default()
    ));
    out.push(block.join("|"));
    out.push(".sp 1".to_string());

    if keep_original {
        out.push(ORIGINAL_OPEN.to_string());
        out.push(String::new());
        out.extend(block.iter().cloned());
        out.push(ORIGINAL_CLOSE.to_string());
    }
    out
}
