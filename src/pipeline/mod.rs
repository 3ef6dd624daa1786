//! Pipeline passes for DP-to-ppgen conversion.
//!
//! Each submodule implements one rewriting pass over the document buffer
//! (`Vec<String>`, one entry per line). Passes share nothing but the
//! buffer, so each is independently testable and the driver in
//! [`crate::convert`] decides which run and in what order.
//!
//! ## Data Flow
//!
//! ```text
//! input ─▶ validate ─▶ pages ─▶ text ─▶ headings ─▶ sidenotes ─▶ illustrations
//!                                                                      │
//!              boilerplate ◀─ markup ◀─ spanned ◀─ footnotes ◀────────┘
//! ```
//!
//! 1. [`input`]: load the file, detect its encoding, split into lines
//! 2. [`validate`]: check bracket, tag and block balance before rewriting
//! 3. [`pages`]: `[Blank Page]` and scan page markers
//! 4. [`text`]: fixup, UTF-8 characters and boilerplate
//! 5. [`headings`]: chapter and section headings from blank-line spacing
//! 6. [`sidenotes`], [`illustrations`]: bracketed DP tags to `.sn`, `.il`
//! 7. [`footnotes`]: parse, join, anchor and relocate footnotes
//! 8. [`spanned`]: rejoin formatting and words split by page breaks
//! 9. [`markup`]: `/*` and `/#` blocks to ppgen directives
//!
//! [`lines`] holds the line predicates and buffer searches every pass uses.

pub mod footnotes;
pub mod headings;
pub mod illustrations;
pub mod input;
pub mod lines;
pub mod markup;
pub mod pages;
pub mod sidenotes;
pub mod spanned;
pub mod text;
pub mod validate;
