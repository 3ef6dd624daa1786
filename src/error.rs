//! Error types for the dp2ppgen library.
//!
//! Failures come in two kinds:
//!
//! * [`Dp2PpgenError`]: **fatal**, the conversion cannot proceed at all
//!   (missing input file, markup errors without `--force`, a footnote block
//!   that never closes). Returned as `Err(Dp2PpgenError)` from the top-level
//!   `convert*` functions.
//!
//! * [`Diagnostic`]: **non-fatal**, one construct could not be converted
//!   (an anchor with no footnote, a fragment with no partner on the previous
//!   page) but the rest of the document is fine. Diagnostics accumulate in a
//!   [`Diagnostics`] collector and are returned inside
//!   [`crate::output::ConversionOutput`] so the operator gets the partial
//!   result together with every location that needs a manual fix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the dp2ppgen library.
#[derive(Debug, Error)]
pub enum Dp2PpgenError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure while reading the input.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Markup errors ─────────────────────────────────────────────────────
    /// The validator found markup errors and `force` was not set.
    #[error(
        "Found {count} markup errors.\n\
Correct markup issues then re-run operation, or use --force to ignore markup errors"
    )]
    MarkupErrors { count: usize },

    /// A bracketed block (`[Footnote …`) was still open at end of file.
    #[error("Line {line}: {kind} block never closed before end of file\n       {text}")]
    UnterminatedBlock {
        kind: &'static str,
        line: usize,
        text: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation or option parsing failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A position in the document buffer, used to point the operator at the
/// text that needs attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Scan page active at this line, if any page marker preceded it.
    pub page: Option<String>,
    /// 1-indexed line number in the buffer the pass was working on.
    pub line: usize,
    /// The text of that line.
    pub text: String,
}

impl Location {
    pub fn new(page: Option<&str>, index: usize, text: &str) -> Self {
        Self {
            page: page.map(str::to_string),
            line: index + 1,
            text: text.to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ScanPg {} ({}): {}",
            self.page.as_deref().unwrap_or("-"),
            self.line,
            self.text
        )
    }
}

/// A non-fatal error found by one of the passes.
///
/// The conversion continues after any of these; the caller decides whether
/// a non-empty diagnostic list is acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Diagnostic {
    /// Unbalanced or malformed DP markup found by the validator.
    #[error("Line {line}: {detail}")]
    MarkupError { line: usize, detail: String },

    /// A continuation fragment (`*[Footnote`) found no partner ending in
    /// `]*` on the preceding page.
    #[error("Attempt to join footnote failed!\n       {fragment}\n       candidate: {}",
        .candidate.as_ref().map(ToString::to_string).unwrap_or_else(|| "none".into()))]
    JoinFailed {
        fragment: Location,
        candidate: Option<Location>,
    },

    /// A footnote ending in `]*` was never continued.
    #[error("Unresolved join detected\n       {location}")]
    UnresolvedJoin { location: Location },

    /// A spanned hyphenation inside a joined footnote has no `*` marker on
    /// the continuation.
    #[error("Unresolved hyphenation\n       {end}\n       {start}")]
    UnresolvedHyphenation { end: String, start: String },

    /// An in-text anchor with no footnote of that id on its scan page.
    #[error("No matching footnote for anchor [{anchor}] on scan page {} (line {} in output file):\n       {}",
        .location.page.as_deref().unwrap_or("-"), .location.line, .location.text)]
    UnmatchedAnchor { anchor: String, location: Location },

    /// The same anchor id appears twice on a page while auto-numbering.
    #[error("Duplicate anchors ([{anchor}]) detected ({}); ppgen autonumbering may not function correctly",
        .page.as_deref().unwrap_or("-"))]
    DuplicateAnchor {
        anchor: String,
        page: Option<String>,
    },

    /// Resolved anchors and footnotes disagree in number.
    #[error("Footnote anchor count ({anchors}) does not match footnote count ({footnotes})")]
    AnchorCountMismatch { anchors: usize, footnotes: usize },

    /// A footnote relocation destination name that is not recognised.
    #[error("Unrecognized footnote destination '{name}'")]
    UnknownDestination { name: String },

    /// An illustration with no image file on its scan page.
    #[error("No image file for illustration located on scan page {page}")]
    MissingImage { page: String },

    /// An out-of-line block type that has no converter.
    #[error("Line {line}: Unknown markup type '{name}' found")]
    UnknownMarkupType { line: usize, name: String },

    /// A regex supplied through block arguments (`s=…`) does not compile.
    #[error("Invalid search pattern '{pattern}': {detail}")]
    InvalidPattern { pattern: String, detail: String },

    /// An external helper program (rst2html) failed.
    #[error("Command failed: {command}: {detail}")]
    ExternalCommandFailed { command: String, detail: String },
}

/// Accumulates [`Diagnostic`]s across passes.
///
/// Every push is also logged at ERROR level so the terminal shows the
/// problem at the moment the pass finds it.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::error!("{}", diagnostic);
        self.items.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_errors_display() {
        let e = Dp2PpgenError::MarkupErrors { count: 3 };
        let msg = e.to_string();
        assert!(msg.contains("3 markup errors"), "got: {msg}");
        assert!(msg.contains("--force"));
    }

    #[test]
    fn unterminated_block_display() {
        let e = Dp2PpgenError::UnterminatedBlock {
            kind: "Footnote",
            line: 12,
            text: "[Footnote 1: never closed".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Line 12"));
        assert!(msg.contains("Footnote block"));
    }

    #[test]
    fn unmatched_anchor_display() {
        let d = Diagnostic::UnmatchedAnchor {
            anchor: "B".into(),
            location: Location::new(Some("012.png"), 4, "see[B] here"),
        };
        let msg = d.to_string();
        assert!(msg.contains("[B]"));
        assert!(msg.contains("012.png"));
        assert!(msg.contains("line 5"));
    }

    #[test]
    fn join_failed_display_without_candidate() {
        let d = Diagnostic::JoinFailed {
            fragment: Location::new(Some("002.png"), 9, "*[Footnote: rest"),
            candidate: None,
        };
        let msg = d.to_string();
        assert!(msg.contains("002.png"));
        assert!(msg.contains("candidate: none"));
    }

    #[test]
    fn diagnostics_collects_in_order() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());
        diags.push(Diagnostic::UnknownDestination { name: "x".into() });
        diags.push(Diagnostic::AnchorCountMismatch {
            anchors: 1,
            footnotes: 2,
        });
        assert_eq!(diags.len(), 2);
        assert!(matches!(
            diags.into_vec()[0],
            Diagnostic::UnknownDestination { .. }
        ));
    }
}
