//! CLI binary for dp2ppgen.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and reports results.

use anyhow::{Context, Result};
use clap::Parser;
use dp2ppgen::{
    convert_to_file, default_output_path, ConversionConfig, ConversionOutput, FootnoteDestination,
    LandingZone, Passes,
};
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Default first pass: pages, chapters, footnotes, sidenotes,
  # illustrations, UTF-8 and spanned joins → book-out.txt
  dp2ppgen book.txt

  # Explicit output file
  dp2ppgen book.txt book-src.txt

  # Footnotes only, collected at the end of the book
  dp2ppgen -f --fndest bookend book.txt

  # Detect and convert tables / tocs, keep the source as comments
  dp2ppgen --detectmarkup -m -k book.txt

  # Check everything, write nothing, print diagnostics as JSON
  dp2ppgen -d --json book.txt

FOOTNOTE DESTINATIONS:
  paragraphend   after the paragraph holding the anchor (default)
  chapterend     after the last paragraph of the chapter
  bookend        in a FOOTNOTES section at the end of the book
  inplace        where the [Footnote] block was

  Without --fndest, text output lands footnotes at chapter ends and HTML
  output at the book end (--lzdestt chapterend --lzdesth bookend).

ENVIRONMENT VARIABLES:
  RUST_LOG            Override the log filter (e.g. dp2ppgen=debug)
  DP2PPGEN_IMAGES     Folder holding illustration images (default images)
"#;

/// Translate pgdp.org formatted text files into ppgen syntax.
#[derive(Parser, Debug)]
#[command(
    name = "dp2ppgen",
    version,
    about = "Translate pgdp.org formatted text files into ppgen syntax",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// DP text file to convert.
    infile: PathBuf,

    /// Output file. Default: <infile up to the first '.'>-out.txt.
    outfile: Option<PathBuf>,

    /// Paste the header and footer files at the start and end.
    #[arg(long)]
    boilerplate: bool,

    /// Header file for --boilerplate.
    #[arg(long, default_value = "header.txt")]
    header: PathBuf,

    /// Footer file for --boilerplate.
    #[arg(long, default_value = "footer.txt")]
    footer: PathBuf,

    /// Convert chapter headings into ppgen style chapter headings.
    #[arg(short = 'c', long)]
    chapters: bool,

    /// Max lines a chapter can be; anything larger is not a chapter.
    #[arg(long = "chaptermaxlines", default_value_t = 16)]
    chapter_max_lines: usize,

    /// Run through conversions but do not write out the result.
    #[arg(short = 'd', long = "dryrun")]
    dry_run: bool,

    /// Convert section headings into ppgen style section headings.
    #[arg(short = 'e', long)]
    sections: bool,

    /// Max lines a section can be; anything larger is not a section.
    #[arg(long = "sectionmaxlines", default_value_t = 3)]
    section_max_lines: usize,

    /// Convert footnotes into ppgen format.
    #[arg(short = 'f', long)]
    footnotes: bool,

    /// Use ppgen autonumbering for generated anchors and .fn statements.
    #[arg(long = "fnautonum")]
    fn_autonum: bool,

    /// Where to relocate footnotes: paragraphend, chapterend, bookend, inplace.
    #[arg(long = "fndest")]
    fn_dest: Option<FootnoteDestination>,

    /// Footnote landing zones for text output: chapterend, bookend.
    #[arg(long = "lzdestt")]
    lz_dest_text: Option<LandingZone>,

    /// Footnote landing zones for HTML output: chapterend, bookend.
    #[arg(long = "lzdesth")]
    lz_dest_html: Option<LandingZone>,

    /// Perform guiguts style fixup operations.
    #[arg(long)]
    fixup: bool,

    /// Ignore markup errors and force operation.
    #[arg(long)]
    force: bool,

    /// Convert raw [Illustration] tags into ppgen .il/.ca markup.
    #[arg(short = 'i', long)]
    illustrations: bool,

    /// Folder holding illustration images.
    #[arg(long = "images-dir", env = "DP2PPGEN_IMAGES", default_value = "images")]
    images_dir: PathBuf,

    /// Join hyphenations (-* *-) and formatting markup (/* */ /# #/) that
    /// span page breaks.
    #[arg(short = 'j', long = "joinspanned")]
    join_spanned: bool,

    /// On any conversion keep original text as a comment.
    #[arg(short = 'k', long = "keeporiginal")]
    keep_original: bool,

    /// Convert page breaks into .bn/.pn statements and comment out
    /// [Blank Page] lines.
    #[arg(short = 'p', long)]
    pages: bool,

    /// Convert sidenotes into ppgen format.
    #[arg(short = 's', long)]
    sidenotes: bool,

    /// Keep exact line endings for multi-line sidenotes.
    #[arg(long = "snkeepbreaks")]
    sn_keep_breaks: bool,

    /// Best guess what untyped /* */ blocks represent (table, toc).
    #[arg(long = "detectmarkup")]
    detect_markup: bool,

    /// Convert out of line markup /* */ /# #/ into ppgen format.
    #[arg(short = 'm', long)]
    markup: bool,

    /// Convert characters to UTF-8.
    #[arg(long)]
    utf8: bool,

    /// Print the conversion result (stats and diagnostics) as JSON.
    #[arg(long)]
    json: bool,

    /// Print more text.
    #[arg(short, long, env = "DP2PPGEN_VERBOSE")]
    verbose: bool,

    /// Print less text.
    #[arg(short, long, env = "DP2PPGEN_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let config = build_config(&cli)?;
    let outfile = cli
        .outfile
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.infile));

    let output = convert_to_file(&cli.infile, &outfile, &config).context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&Report {
            stats: &output.stats,
            diagnostics: &output.diagnostics,
        })
        .context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output, (!config.dry_run).then_some(&outfile));
    }

    Ok(())
}

#[derive(serde::Serialize)]
struct Report<'a> {
    stats: &'a dp2ppgen::ConversionStats,
    diagnostics: &'a [dp2ppgen::Diagnostic],
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut passes = Passes {
        pages: cli.pages,
        fixup: cli.fixup,
        utf8: cli.utf8,
        chapters: cli.chapters,
        sections: cli.sections,
        sidenotes: cli.sidenotes,
        illustrations: cli.illustrations,
        footnotes: cli.footnotes,
        join_spanned: cli.join_spanned,
        detect_markup: cli.detect_markup,
        markup: cli.markup,
        boilerplate: cli.boilerplate,
    };
    if passes.is_empty() {
        info!(
            "No processing options were given, using default set of options -pcfjis --utf8\n      \
             Run 'dp2ppgen -h' for a full list of options"
        );
        passes = Passes {
            detect_markup: passes.detect_markup,
            boilerplate: passes.boilerplate,
            ..Passes::default()
        };
    }

    let mut builder = ConversionConfig::builder()
        .passes(passes)
        .keep_original(cli.keep_original)
        .force(cli.force)
        .dry_run(cli.dry_run)
        .chapter_max_lines(cli.chapter_max_lines)
        .section_max_lines(cli.section_max_lines)
        .footnote_autonumber(cli.fn_autonum)
        .sidenote_keep_breaks(cli.sn_keep_breaks)
        .image_dir(&cli.images_dir);

    // An explicit destination drops the default landing zones; explicit
    // landing zones apply on top of either.
    if let Some(dest) = cli.fn_dest {
        builder = builder.footnote_destination(dest);
    }
    if let Some(lz) = cli.lz_dest_text {
        builder = builder.landing_zone_text(Some(lz));
    }
    if let Some(lz) = cli.lz_dest_html {
        builder = builder.landing_zone_html(Some(lz));
    }
    if cli.boilerplate {
        builder = builder.header(&cli.header).footer(&cli.footer);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(output: &ConversionOutput, written: Option<&PathBuf>) {
    let s = &output.stats;
    let mark = if output.diagnostics.is_empty() {
        green("✔")
    } else {
        yellow("⚠")
    };
    let target = match written {
        Some(path) => bold(&path.display().to_string()),
        None => "(dry run)".to_string(),
    };
    eprintln!(
        "{}  {} → {} lines  {}ms  →  {}",
        mark, s.input_lines, s.output_lines, s.duration_ms, target
    );
    eprintln!(
        "   {} footnotes ({} joined), {} chapters, {} sections, {} illustrations, {} sidenotes",
        s.footnotes, s.joined_fragments, s.chapters, s.sections, s.illustrations, s.sidenotes
    );
    if !output.diagnostics.is_empty() {
        eprintln!(
            "   {} issues need attention (see ERROR lines above)",
            output.diagnostics.len()
        );
    }
}
