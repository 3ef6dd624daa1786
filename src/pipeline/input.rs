//! Input resolution: read a DP text file into the line buffer.
//!
//! ## Why trial decoding?
//!
//! DP project files arrive as plain ASCII, UTF-8 (sometimes with a BOM) or
//! Latin-1, and nothing in the file says which. Decoding is tried in that
//! order and the first strict success wins; Latin-1 accepts any byte
//! sequence so the trial always terminates.

use crate::error::Dp2PpgenError;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// The encoding the input was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceEncoding {
    Ascii,
    Utf8,
    Latin1,
}

/// Read `path` and return its lines with trailing whitespace trimmed.
pub fn load_file(path: &Path) -> Result<(Vec<String>, SourceEncoding), Dp2PpgenError> {
    if !path.exists() {
        return Err(Dp2PpgenError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Dp2PpgenError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => Dp2PpgenError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => Dp2PpgenError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let (text, encoding) = decode(&bytes);
    info!("Loaded '{}' ({:?})", path.display(), encoding);
    Ok((split_lines(&text), encoding))
}

/// Decode raw bytes: strict ASCII, then strict UTF-8 (BOM removed), then
/// Latin-1.
pub fn decode(bytes: &[u8]) -> (String, SourceEncoding) {
    if bytes.is_ascii() {
        // ASCII is valid UTF-8 byte for byte.
        let text = String::from_utf8_lossy(bytes).into_owned();
        return (text, SourceEncoding::Ascii);
    }

    let (text, malformed) = encoding_rs::UTF_8.decode_with_bom_removal(bytes);
    if !malformed {
        return (text.into_owned(), SourceEncoding::Utf8);
    }

    debug!("Input is not valid UTF-8; decoding as Latin-1");
    // WINDOWS_1252 is the WHATWG "latin1" decoder: a superset of ISO-8859-1
    // that maps 0x80-0x9F to the printable characters DP files mean there.
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    (text.into_owned(), SourceEncoding::Latin1)
}

/// Split decoded text into lines, trimming trailing whitespace from each.
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text
        .split('\n')
        .map(|line| line.trim_end().to_string())
        .collect();
    // A terminating newline is not an extra empty line.
    if text.ends_with('\n') {
        lines.pop();
    }
    lines
}
