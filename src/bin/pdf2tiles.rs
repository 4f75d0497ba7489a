//! CLI binary for edgequake-pdf2tiles.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2tiles::{
    convert_with_history, inspect, package_conversion, ConversionConfig,
    ConversionProgressCallback, ConversionRecord, HistoryStore, JsonHistoryStore, PageSelection,
    ProgressCallback, SharedHistoryStore,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` reports the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Tiling");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Tiling {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, kept: usize, filtered: usize) {
        let elapsed = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {:<10}  {}",
            green("✓"),
            page_num,
            total,
            format!("{kept:>4} tiles"),
            dim(&format!("{filtered:>4} blank")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep one line per page.
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize, tile_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages tiled, {} tiles kept",
                green("✔"),
                bold(&success_count.to_string()),
                bold(&tile_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages tiled  ({} failed), {} tiles kept",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
                tile_count,
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Tile every page into ./tiles/<conversion-id>/
  pdf2tiles drawing.pdf -o tiles

  # Smaller tiles with more overlap, first ten pages only
  pdf2tiles --tile-size 640 --overlap 160 --pages 1-10 drawing.pdf -o tiles

  # Keep more near-empty tiles
  pdf2tiles --blank-threshold 0.995 drawing.pdf -o tiles

  # Record the run and also write drawing_tiles.zip next to the tiles
  pdf2tiles --history tiles/history.json --zip drawing.pdf -o tiles

  # List recorded conversions
  pdf2tiles --list-history --history tiles/history.json

  # Inspect PDF metadata
  pdf2tiles --inspect-only drawing.pdf

OUTPUT:
  Tiles are written as <output>/<conversion-id>/page_{p}_tile_r{row}_c{col}.jpg
  (page is 1-indexed, row and column 0-indexed). Every tile is exactly
  tile-size × tile-size pixels; windows that run past the page edge are
  padded with white.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH    Path to libpdfium (otherwise ./ and the system path are searched)
  RUST_LOG           Override the log filter (e.g. edgequake_pdf2tiles=debug)
  PDF2TILES_*        Every flag can also be set from the environment
"#;

/// Cut PDF pages into overlapping JPEG tiles for object-detection datasets.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2tiles",
    version,
    about = "Cut PDF pages into overlapping JPEG tiles for object-detection datasets",
    long_about = "Render each PDF page at 300–400 DPI, cut it into fixed-size overlapping \
tiles, drop the tiles that are blank or contain only a border frame, and write the rest \
as JPEG files ready for annotation tools such as Roboflow.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    #[arg(required_unless_present = "list_history")]
    input: Option<PathBuf>,

    /// Root directory for conversion output.
    #[arg(short, long, env = "PDF2TILES_OUTPUT", default_value = "outputs")]
    output: PathBuf,

    /// Rendering DPI (300–400).
    #[arg(long, env = "PDF2TILES_DPI", default_value_t = 350,
          value_parser = clap::value_parser!(u32).range(300..=400))]
    dpi: u32,

    /// Tile edge length in pixels.
    #[arg(long, env = "PDF2TILES_TILE_SIZE", default_value_t = 1024)]
    tile_size: u32,

    /// Pixels shared by adjacent tiles (must be < tile size).
    #[arg(long, env = "PDF2TILES_OVERLAP", default_value_t = 128)]
    overlap: u32,

    /// Near-white pixel fraction above which a tile is dropped (0.0–1.0).
    #[arg(long, env = "PDF2TILES_BLANK_THRESHOLD", default_value_t = 0.98)]
    blank_threshold: f64,

    /// JPEG quality for written tiles (1–100).
    #[arg(long, env = "PDF2TILES_JPEG_QUALITY", default_value_t = 95,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2TILES_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2TILES_PASSWORD")]
    password: Option<String>,

    /// JSON file recording past conversions.
    #[arg(long, env = "PDF2TILES_HISTORY")]
    history: Option<PathBuf>,

    /// Also write all kept tiles as a ZIP archive into the output root.
    #[arg(long, env = "PDF2TILES_ZIP")]
    zip: bool,

    /// Output structured JSON instead of a summary.
    #[arg(long, env = "PDF2TILES_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2TILES_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long, env = "PDF2TILES_INSPECT_ONLY")]
    inspect_only: bool,

    /// Print the conversion history (requires --history).
    #[arg(long, env = "PDF2TILES_LIST_HISTORY")]
    list_history: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2TILES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2TILES_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list_history;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let history: Option<SharedHistoryStore> = cli
        .history
        .as_ref()
        .map(|path| Arc::new(JsonHistoryStore::new(path)) as SharedHistoryStore);

    // ── History listing ──────────────────────────────────────────────────
    if cli.list_history {
        let store = history
            .as_deref()
            .context("--list-history needs --history <FILE>")?;
        let records = store.list().context("Failed to read conversion history")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&records).context("Failed to serialize history")?
            );
        } else {
            print_history(&records);
        }
        return Ok(());
    }

    let input = cli
        .input
        .clone()
        .context("An input PDF is required")?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&input, cli.password.as_deref())
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert_with_history(&input, &cli.output, &config, history.clone())
        .await
        .context("Conversion failed")?;

    let archive_path = if cli.zip {
        let archive = package_conversion(&cli.output, &output.record.id, history.as_deref())
            .context("Failed to package tiles")?;
        let path = cli.output.join(&archive.name);
        tokio::fs::write(&path, &archive.bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Some(path)
    } else {
        None
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        let stats = &output.stats;
        let selected = stats.processed_pages + stats.failed_pages;
        if !show_progress {
            eprintln!(
                "Tiled {}/{} pages in {}ms: {} tiles kept, {} blank",
                stats.processed_pages,
                selected,
                stats.total_duration_ms,
                stats.tile_count,
                stats.blank_filtered
            );
            if stats.failed_pages > 0 {
                eprintln!("  {} pages failed", stats.failed_pages);
            }
        }
        eprintln!(
            "   {} blank tiles dropped :  {}ms total  →  {}",
            dim(&stats.blank_filtered.to_string()),
            stats.total_duration_ms,
            bold(&output.output_dir.display().to_string()),
        );
        if let Some(path) = archive_path {
            eprintln!("   archive  →  {}", bold(&path.display().to_string()));
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .tile_size(cli.tile_size)
        .overlap(cli.overlap)
        .blank_threshold(cli.blank_threshold)
        .jpeg_quality(cli.jpeg_quality)
        .pages(pages);

    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_history(records: &[ConversionRecord]) {
    if records.is_empty() {
        println!("No conversions yet");
        return;
    }
    println!(
        "{:<36}  {:<19}  {:>5}  {:>6}  {:>6}  {}",
        "ID", "DATE", "PAGES", "TILES", "BLANK", "FILE"
    );
    for r in records {
        println!(
            "{:<36}  {:<19}  {:>5}  {:>6}  {:>6}  {}",
            r.id,
            r.timestamp.format("%Y-%m-%d %H:%M:%S"),
            r.page_count,
            r.tile_count,
            r.blank_filtered,
            r.original_filename
        );
    }
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}
