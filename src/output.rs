//! Conversion results.

use crate::error::Diagnostic;
use crate::pipeline::input::SourceEncoding;
use serde::Serialize;

/// The full result of a conversion.
///
/// A conversion that reports diagnostics still produces a complete buffer;
/// the diagnostics point at the places that need a manual fix.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    /// The converted document, one entry per line, without terminators.
    pub lines: Vec<String>,
    /// Every non-fatal problem found, in the order the passes found them.
    pub diagnostics: Vec<Diagnostic>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// The document as text, each line `\n` terminated.
    pub fn text(&self) -> String {
        let mut s = String::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum());
        for line in &self.lines {
            s.push_str(line);
            s.push('\n');
        }
        s
    }
}

/// Counters collected across all passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    /// `None` when the conversion started from an in-memory buffer.
    pub encoding: Option<SourceEncoding>,
    pub input_lines: usize,
    pub output_lines: usize,
    pub markup_errors: usize,
    pub pages: usize,
    pub chapters: usize,
    pub sections: usize,
    pub sidenotes: usize,
    pub illustrations: usize,
    /// Footnotes after joining.
    pub footnotes: usize,
    pub anchors: usize,
    pub joined_fragments: usize,
    pub joined_spans: usize,
    pub markup_blocks: usize,
    pub diagnostics: usize,
    pub duration_ms: u64,
}
