//! # dp2ppgen
//!
//! Convert proofread Distributed Proofreaders (DP) text into ppgen source.
//!
//! ## Why this crate?
//!
//! A DP project leaves the proofing rounds as plain text with light markup:
//! page separators, blank-line spaced headings, `[Footnote …]`,
//! `[Sidenote …]` and `[Illustration …]` tags, `/* */` no-wrap blocks.
//! Turning that into ppgen by hand is slow and error prone, especially the
//! footnotes: they are split across pages, keyed by anchors that restart on
//! every page, and must move to wherever the book wants them. This crate
//! performs those rewrites mechanically and reports every spot it could not
//! resolve.
//!
//! ## Pipeline Overview
//!
//! ```text
//! DP text
//!  │
//!  ├─ 1. Input      trial-decode (ASCII / UTF-8 / Latin-1), split lines
//!  ├─ 2. Validate   bracket, tag and block balance (fatal unless forced)
//!  ├─ 3. Pages      [Blank Page], page separators → .bn / .pn
//!  ├─ 4. Text       fixup, UTF-8 characters
//!  ├─ 5. Structure  chapter and section headings, sidenotes, illustrations
//!  ├─ 6. Footnotes  parse → join → anchor-resolve → relocate
//!  ├─ 7. Spans      rejoin markup and words split by page breaks
//!  ├─ 8. Markup     /*nf, /*ta, /*table, /#bq … → ppgen blocks
//!  └─ 9. Output     converted lines + diagnostics + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dp2ppgen::{convert_file, ConversionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert_file("projectID.txt", &config)?;
//!     print!("{}", output.text());
//!     for d in &output.diagnostics {
//!         eprintln!("{d}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `dp2ppgen` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, FootnoteDestination, LandingZone, Passes};
pub use convert::{convert_bytes, convert_file, convert_lines, convert_to_file, default_output_path};
pub use error::{Diagnostic, Diagnostics, Dp2PpgenError, Location};
pub use output::{ConversionOutput, ConversionStats};
pub use pipeline::footnotes::{process_footnotes, EngineState, FootnoteRecord, FootnoteSummary};
pub use pipeline::input::SourceEncoding;
