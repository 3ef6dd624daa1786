//! `[Illustration: caption]` → `.il` / `.ca`.
//!
//! Each illustration is matched to an image file by scan page: the
//! illustration on page `023.png` uses `i_023`, further illustrations on the
//! same page use `i_023a`, `i_023b`, … The width written to `.il` is read
//! from the image file itself.

use crate::error::{Diagnostic, Diagnostics};
use crate::pipeline::lines::parse_scan_page;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

static RE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\*?\[Illustration").unwrap());
static RE_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\*?\[Illustration(?:: )?").unwrap());
static RE_IMAGE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^i_\d{3,4}[a-z]?\.").unwrap());

pub const RELOCATE_COMMENT: &str = "// *** DP2PPGEN *[Illustration] NEEDS RELOCATION ***";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    uses: usize,
}

/// Image files available for illustrations, keyed by file stem.
#[derive(Debug, Clone, Default)]
pub struct ImageInventory {
    images: BTreeMap<String, ImageEntry>,
}

impl ImageInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inventory every readable image in `dir`. A missing directory gives
    /// an empty inventory; unreadable files are skipped with a warning.
    pub fn from_dir(dir: &Path) -> Self {
        info!("Taking inventory of {}", dir.display());
        let mut inventory = Self::new();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read image folder {}: {}", dir.display(), e);
                return inventory;
            }
        };
        let mut paths: Vec<_> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
        paths.sort();

        for path in paths.iter().filter(|p| p.is_file()) {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            match image::image_dimensions(path) {
                Ok((width, height)) => {
                    debug!("Found image fn='{}' size={}x{}", file_name, width, height);
                    if !RE_IMAGE_NAME.is_match(file_name) && file_name != "cover.jpg" {
                        warn!(
                            "File '{}' does not match expected naming convention (i_001, i_001a)",
                            file_name
                        );
                    }
                    inventory.insert(file_name, width, height);
                }
                Err(e) => warn!("Error loading '{}' ... skipping: {}", path.display(), e),
            }
        }

        info!("Found {} images", inventory.len());
        inventory
    }

    pub fn insert(&mut self, file_name: &str, width: u32, height: u32) {
        let id = file_name
            .rsplit_once('.')
            .map_or(file_name, |(stem, _)| stem)
            .to_string();
        self.images.insert(
            id,
            ImageEntry {
                file_name: file_name.to_string(),
                width,
                height,
                uses: 0,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ImageEntry> {
        self.images.get(id)
    }

    /// Pick the image for the next illustration with base id `base`:
    /// the first unused of `base`, `base`a … `base`z, falling back to a
    /// reuse of `base`.
    fn claim(&mut self, base: &str) -> Option<String> {
        let candidates = std::iter::once(base.to_string())
            .chain(('a'..='z').map(|c| format!("{base}{c}")));
        let id = candidates
            .into_iter()
            .find(|id| self.images.get(id).is_some_and(|e| e.uses == 0))
            .or_else(|| self.images.contains_key(base).then(|| base.to_string()))?;
        if let Some(entry) = self.images.get_mut(&id) {
            entry.uses += 1;
        }
        Some(id)
    }
}

/// Rewrite illustration blocks. Returns the buffer and the number of
/// blocks converted.
pub fn process_illustrations(
    buf: Vec<String>,
    inventory: &mut ImageInventory,
    diags: &mut Diagnostics,
) -> (Vec<String>, usize) {
    info!("Processing illustrations");
    let mut out = Vec::with_capacity(buf.len());
    let mut page = String::from("0");
    let mut count = 0;
    let mut relocations = 0;
    let mut i = 0;

    while i < buf.len() {
        if let Some(pn) = parse_scan_page(&buf[i]) {
            page = pn.rsplit_once('.').map_or(pn, |(stem, _)| stem).to_string();
        }
        if !RE_OPEN.is_match(&buf[i]) {
            out.push(buf[i].clone());
            i += 1;
            continue;
        }

        let start = i;
        let end = block_end(&buf, start);
        let block = &buf[start..=end];
        let needs_relocation = block[0].starts_with('*');

        if needs_relocation {
            relocations += 1;
            out.push(RELOCATE_COMMENT.to_string());
        }

        let base = format!("i_{page}");
        match inventory.claim(&base) {
            Some(id) => {
                let entry = &inventory.images[&id];
                out.push(format!(
                    ".il id={} fn={} w={}px alt=''",
                    id, entry.file_name, entry.width
                ));
            }
            None => {
                diags.push(Diagnostic::MissingImage { page: page.clone() });
                out.push(format!(".il id={base} fn={base}.jpg alt=''"));
            }
        }
        out.extend(caption(block));
        debug!("{}: ScanPage {}: converted {:?}", start + 1, page, block);

        count += 1;
        i = end + 1;
    }

    info!("Processed {} [Illustration] tags", count);
    if relocations > 0 {
        warn!(
            "Found {} *[Illustration] tags; ppgen .il/.ca statements have been generated, \
             but relocation to paragraph break must be performed manually.",
            relocations
        );
    }
    (out, count)
}

/// Convenience wrapper reading the inventory from `image_dir`.
pub fn process_illustrations_in(
    buf: Vec<String>,
    image_dir: &Path,
    diags: &mut Diagnostics,
) -> (Vec<String>, usize) {
    let mut inventory = ImageInventory::from_dir(image_dir);
    process_illustrations(buf, &mut inventory, diags)
}

/// Last line of the block opened at `start`: bracket depth back to zero on
/// a line ending in `]`. Runs to the end of the buffer if never closed.
fn block_end(buf: &[String], start: usize) -> usize {
    let mut depth = 0isize;
    for (i, line) in buf.iter().enumerate().skip(start) {
        depth += line.matches('[').count() as isize - line.matches(']').count() as isize;
        if depth == 0 && line.ends_with(']') {
            return i;
        }
    }
    warn!("Line {}: Illustration runs to end of file", start + 1);
    buf.len() - 1
}

fn caption(block: &[String]) -> Vec<String> {
    let lines: Vec<String> = block
        .iter()
        .map(|l| {
            let l = RE_LABEL.replace(l, "");
            l.strip_suffix(']').unwrap_or(&l).to_string()
        })
        .collect();

    match lines.as_slice() {
        [] => Vec::new(),
        [only] if only.is_empty() => Vec::new(),
        [only] => vec![format!(".ca {only}")],
        _ => {
            let mut out = vec![".ca".to_string()];
            out.extend(lines);
            out.push(".ca-".to_string());
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::lines::to_buffer;

    fn inventory() -> ImageInventory {
        let mut inv = ImageInventory::new();
        inv.insert("i_012.jpg", 600, 400);
        inv.insert("i_012a.png", 300, 200);
        inv
    }

    #[test]
    fn test_single_line_caption() {
        let mut diags = Diagnostics::new();
        let buf = to_buffer(&["-----File: 012.png---", "[Illustration: THE BAR.]"]);
        let (out, n) = process_illustrations(buf, &mut inventory(), &mut diags);
        assert_eq!(n, 1);
        assert_eq!(out[1], ".il id=i_012 fn=i_012.jpg w=600px alt=''");
        assert_eq!(out[2], ".ca THE BAR.");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_second_illustration_on_page_uses_suffix() {
        let mut diags = Diagnostics::new();
        let buf = to_buffer(&["// 012.png", "[Illustration]", "", "[Illustration: Two]"]);
        let (out, _) = process_illustrations(buf, &mut inventory(), &mut diags);
        assert_eq!(out[1], ".il id=i_012 fn=i_012.jpg w=600px alt=''");
        assert_eq!(out[3], ".il id=i_012a fn=i_012a.png w=300px alt=''");
        assert_eq!(out[4], ".ca Two");
    }

    #[test]
    fn test_multi_line_caption_and_relocation() {
        let mut diags = Diagnostics::new();
        let buf = to_buffer(&["// 012.png", "*[Illustration: Line one", "line [two]]"]);
        let (out, _) = process_illustrations(buf, &mut inventory(), &mut diags);
        assert_eq!(
            &out[1..],
            &to_buffer(&[
                RELOCATE_COMMENT,
                ".il id=i_012 fn=i_012.jpg w=600px alt=''",
                ".ca",
                "Line one",
                "line [two]",
                ".ca-",
            ])[..]
        );
    }

    #[test]
    fn test_missing_image_reported() {
        let mut diags = Diagnostics::new();
        let buf = to_buffer(&["// 099.png", "[Illustration]"]);
        let (out, _) = process_illustrations(buf, &mut inventory(), &mut diags);
        assert_eq!(out[1], ".il id=i_099 fn=i_099.jpg alt=''");
        assert!(matches!(
            diags.iter().next(),
            Some(Diagnostic::MissingImage { page }) if page == "099"
        ));
    }

    #[test]
    fn test_inventory_reads_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbImage::new(40, 30)
            .save(dir.path().join("i_001.png"))
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let inv = ImageInventory::from_dir(dir.path());
        assert_eq!(inv.len(), 1);
        let entry = inv.get("i_001").unwrap();
        assert_eq!((entry.width, entry.height), (40, 30));
    }
}
