//! Configuration types for DP-to-ppgen conversion.
//!
//! [`ConversionConfig`] selects the passes and carries their options: heading
//! limits, footnote destination and landing zones, sidenote line breaks, the
//! image folder and boilerplate files. Construct it with
//! [`ConversionConfigBuilder`].

use crate::error::Dp2PpgenError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Configuration for a DP-to-ppgen conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use dp2ppgen::{ConversionConfig, FootnoteDestination, Passes};
///
/// let config = ConversionConfig::builder()
///     .passes(Passes { footnotes: true, ..Passes::none() })
///     .footnote_destination(FootnoteDestination::BookEnd)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Which rewriting passes run. Default: [`Passes::default()`].
    pub passes: Passes,

    /// Emit the original text as ppgen comments next to generated markup.
    /// Default: false.
    pub keep_original: bool,

    /// Proceed even when the validator reports markup errors. Default: false.
    ///
    /// The rewriting passes assume balanced brackets; forcing past errors
    /// usually produces output that needs manual repair around the reported
    /// lines.
    pub force: bool,

    /// Run every pass but do not write the output file. Default: false.
    pub dry_run: bool,

    /// A chapter heading block longer than this is left alone. Default: 16.
    pub chapter_max_lines: usize,

    /// A section heading block longer than this is left alone. Default: 3.
    pub section_max_lines: usize,

    /// Where rendered footnotes are relocated. Default: paragraph end.
    pub footnote_destination: FootnoteDestination,

    /// Use ppgen auto-numbering (`[#]`, `.fn #`) instead of explicit numbers.
    pub footnote_autonumber: bool,

    /// Landing zone for footnotes in text output.
    pub landing_zone_text: Option<LandingZone>,

    /// Landing zone for footnotes in HTML output.
    pub landing_zone_html: Option<LandingZone>,

    /// Keep the source line breaks of multi-line sidenotes (`|` joined).
    pub sidenote_keep_breaks: bool,

    /// Directory holding the illustration image files. Default: `images`.
    pub image_dir: PathBuf,

    /// File prepended by the boilerplate pass.
    pub header: Option<PathBuf>,

    /// File appended by the boilerplate pass.
    pub footer: Option<PathBuf>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            passes: Passes::default(),
            keep_original: false,
            force: false,
            dry_run: false,
            chapter_max_lines: 16,
            section_max_lines: 3,
            footnote_destination: FootnoteDestination::default(),
            footnote_autonumber: false,
            landing_zone_text: Some(LandingZone::ChapterEnd),
            landing_zone_html: Some(LandingZone::BookEnd),
            sidenote_keep_breaks: false,
            image_dir: PathBuf::from("images"),
            header: None,
            footer: None,
        }
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn passes(mut self, passes: Passes) -> Self {
        self.config.passes = passes;
        self
    }

    pub fn keep_original(mut self, v: bool) -> Self {
        self.config.keep_original = v;
        self
    }

    pub fn force(mut self, v: bool) -> Self {
        self.config.force = v;
        self
    }

    pub fn dry_run(mut self, v: bool) -> Self {
        self.config.dry_run = v;
        self
    }

    pub fn chapter_max_lines(mut self, n: usize) -> Self {
        self.config.chapter_max_lines = n;
        self
    }

    pub fn section_max_lines(mut self, n: usize) -> Self {
        self.config.section_max_lines = n;
        self
    }

    /// Set the relocation destination.
    ///
    /// An explicit destination drops the default landing zones; set them
    /// again afterwards if they are wanted.
    pub fn footnote_destination(mut self, dest: FootnoteDestination) -> Self {
        self.config.footnote_destination = dest;
        self.config.landing_zone_text = None;
        self.config.landing_zone_html = None;
        self
    }

    pub fn footnote_autonumber(mut self, v: bool) -> Self {
        self.config.footnote_autonumber = v;
        self
    }

    pub fn landing_zone_text(mut self, lz: Option<LandingZone>) -> Self {
        self.config.landing_zone_text = lz;
        self
    }

    pub fn landing_zone_html(mut self, lz: Option<LandingZone>) -> Self {
        self.config.landing_zone_html = lz;
        self
    }

    pub fn sidenote_keep_breaks(mut self, v: bool) -> Self {
        self.config.sidenote_keep_breaks = v;
        self
    }

    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.image_dir = dir.into();
        self
    }

    pub fn header(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.header = Some(path.into());
        self
    }

    pub fn footer(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.footer = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Dp2PpgenError> {
        let c = &self.config;
        if c.chapter_max_lines == 0 {
            return Err(Dp2PpgenError::InvalidConfig(
                "chapter_max_lines must be ≥ 1".into(),
            ));
        }
        if c.section_max_lines == 0 {
            return Err(Dp2PpgenError::InvalidConfig(
                "section_max_lines must be ≥ 1".into(),
            ));
        }
        if c.passes.boilerplate && c.header.is_none() && c.footer.is_none() {
            return Err(Dp2PpgenError::InvalidConfig(
                "boilerplate requires a header or footer file".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Passes ───────────────────────────────────────────────────────────────

/// Selects the optional rewriting passes.
///
/// Validation and the standard conversions (trailing whitespace, `<tb>`)
/// always run. The default set is the one DP post-processors use for a
/// first pass over a fresh project: pages, chapters, footnotes, sidenotes,
/// illustrations, UTF-8 and spanned-markup joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passes {
    pub pages: bool,
    pub fixup: bool,
    pub utf8: bool,
    pub chapters: bool,
    pub sections: bool,
    pub sidenotes: bool,
    pub illustrations: bool,
    pub footnotes: bool,
    pub join_spanned: bool,
    pub detect_markup: bool,
    pub markup: bool,
    pub boilerplate: bool,
}

impl Passes {
    /// No optional pass enabled.
    pub fn none() -> Self {
        Self {
            pages: false,
            fixup: false,
            utf8: false,
            chapters: false,
            sections: false,
            sidenotes: false,
            illustrations: false,
            footnotes: false,
            join_spanned: false,
            detect_markup: false,
            markup: false,
            boilerplate: false,
        }
    }

    /// True when none of the content passes is selected.
    ///
    /// `detect_markup` and `boilerplate` are modifiers and do not count.
    pub fn is_empty(&self) -> bool {
        !(self.pages
            || self.fixup
            || self.utf8
            || self.chapters
            || self.sections
            || self.sidenotes
            || self.illustrations
            || self.footnotes
            || self.join_spanned
            || self.markup)
    }
}

impl Default for Passes {
    fn default() -> Self {
        Self {
            pages: true,
            chapters: true,
            footnotes: true,
            sidenotes: true,
            illustrations: true,
            utf8: true,
            join_spanned: true,
            ..Self::none()
        }
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Where rendered footnote bodies are moved to.
///
/// | Destination | Insertion point |
/// |-------------|-----------------|
/// | `paragraphend` | the blank line after the paragraph holding the anchor |
/// | `chapterend` | after the last text line of the anchor's chapter |
/// | `bookend` | a generated FOOTNOTES section at the end of the book |
/// | `inplace` | where the `[Footnote …]` block was |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FootnoteDestination {
    #[default]
    ParagraphEnd,
    ChapterEnd,
    BookEnd,
    InPlace,
}

impl FootnoteDestination {
    pub fn as_str(&self) -> &'static str {
        match self {
            FootnoteDestination::ParagraphEnd => "paragraphend",
            FootnoteDestination::ChapterEnd => "chapterend",
            FootnoteDestination::BookEnd => "bookend",
            FootnoteDestination::InPlace => "inplace",
        }
    }
}

impl fmt::Display for FootnoteDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FootnoteDestination {
    type Err = Dp2PpgenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "paragraphend" => Ok(FootnoteDestination::ParagraphEnd),
            "chapterend" => Ok(FootnoteDestination::ChapterEnd),
            "bookend" => Ok(FootnoteDestination::BookEnd),
            "inplace" => Ok(FootnoteDestination::InPlace),
            other => Err(Dp2PpgenError::InvalidConfig(format!(
                "unrecognized footnote destination '{other}' \
                 (expected paragraphend, chapterend, bookend or inplace)"
            ))),
        }
    }
}

/// Where ppgen collects footnotes for one output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LandingZone {
    ChapterEnd,
    BookEnd,
}

impl FromStr for LandingZone {
    type Err = Dp2PpgenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chapterend" => Ok(LandingZone::ChapterEnd),
            "bookend" => Ok(LandingZone::BookEnd),
            other => Err(Dp2PpgenError::InvalidConfig(format!(
                "unrecognized landing zone '{other}' (expected chapterend or bookend)"
            ))),
        }
    }
}
