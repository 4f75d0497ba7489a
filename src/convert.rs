//! Conversion entry points: PDF in, a directory of kept tiles out.
//!
//! Every page goes through render → tile → classify → write before the next
//! page is rendered, so peak memory is one page raster plus its tiles no
//! matter how long the document is. The whole loop runs on a blocking
//! thread because pdfium is not async-safe.
//!
//! A failing page (render glitch, degenerate raster, disk error) is recorded
//! as a [`PageError`] in its [`PageResult`] and the loop moves on; only a
//! document where every selected page fails is an error.

use crate::config::ConversionConfig;
use crate::error::{PageError, Pdf2TilesError};
use crate::history::{ConversionRecord, HistoryStore, SharedHistoryStore};
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata, PageResult, TileRecord};
use crate::pipeline::blank::BlankClassifier;
use crate::pipeline::encode;
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::page::process_page;
use crate::pipeline::raster::PageRaster;
use crate::pipeline::render::{self, PdfRenderer};
use crate::pipeline::tile::TileGrid;
use crate::progress::ConversionProgressCallback;
use chrono::Utc;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Convert a local PDF into tiles under `<output_root>/<conversion id>/`.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ConversionOutput)` on success, even if some pages failed
/// (check `output.stats.failed_pages`).
///
/// # Errors
/// Returns `Err(Pdf2TilesError)` only for fatal errors:
/// - invalid configuration
/// - file not found / permission denied / not a PDF
/// - the page selection matches no page
/// - all selected pages failed
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2tiles::{convert, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConversionConfig::default();
/// let output = convert("scan.pdf", "tiles", &config).await?;
/// println!("{} tiles in {}", output.stats.tile_count, output.output_dir.display());
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    input: impl AsRef<Path>,
    output_root: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2TilesError> {
    convert_with_history(input, output_root, config, None).await
}

/// [`convert`], then append the resulting [`ConversionRecord`] to `history`.
pub async fn convert_with_history(
    input: impl AsRef<Path>,
    output_root: impl AsRef<Path>,
    config: &ConversionConfig,
    history: Option<SharedHistoryStore>,
) -> Result<ConversionOutput, Pdf2TilesError> {
    let resolved = input::resolve_local(input.as_ref())?;
    let original_filename = display_name(resolved.path());
    convert_resolved(resolved, original_filename, output_root.as_ref(), config, history).await
}

/// Convert PDF bytes held in memory (an upload, a blob from a database).
///
/// The bytes are spooled to a managed temp file that is removed when the
/// conversion returns. `original_filename` is only used for the history
/// record and the archive name.
pub async fn convert_from_bytes(
    bytes: &[u8],
    original_filename: &str,
    output_root: impl AsRef<Path>,
    config: &ConversionConfig,
    history: Option<SharedHistoryStore>,
) -> Result<ConversionOutput, Pdf2TilesError> {
    let resolved = input::resolve_bytes(bytes)?;
    convert_resolved(
        resolved,
        original_filename.to_string(),
        output_root.as_ref(),
        config,
        history,
    )
    .await
}

/// Blocking variant of [`convert_with_history`].
///
/// Runs on the calling thread; no tokio runtime is needed.
pub fn convert_sync(
    input: impl AsRef<Path>,
    output_root: impl AsRef<Path>,
    config: &ConversionConfig,
    history: Option<&dyn HistoryStore>,
) -> Result<ConversionOutput, Pdf2TilesError> {
    let resolved = input::resolve_local(input.as_ref())?;
    let original_filename = display_name(resolved.path());
    run_conversion(
        resolved.path(),
        &original_filename,
        output_root.as_ref(),
        config,
        history,
    )
}

/// Extract PDF metadata without rendering any page.
pub async fn inspect(
    input: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<DocumentMetadata, Pdf2TilesError> {
    let resolved = input::resolve_local(input.as_ref())?;
    let password = password.map(str::to_string);
    tokio::task::spawn_blocking(move || {
        render::extract_metadata(resolved.path(), password.as_deref())
    })
    .await
    .map_err(|e| Pdf2TilesError::Internal(format!("Task join error: {}", e)))?
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn convert_resolved(
    resolved: ResolvedInput,
    original_filename: String,
    output_root: &Path,
    config: &ConversionConfig,
    history: Option<SharedHistoryStore>,
) -> Result<ConversionOutput, Pdf2TilesError> {
    let output_root = output_root.to_path_buf();
    let config = config.clone();

    // `resolved` moves into the task so a spooled temp file outlives pdfium.
    tokio::task::spawn_blocking(move || {
        run_conversion(
            resolved.path(),
            &original_filename,
            &output_root,
            &config,
            history.as_deref(),
        )
    })
    .await
    .map_err(|e| Pdf2TilesError::Internal(format!("Task join error: {}", e)))?
}

/// Name recorded in history for a local input.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// The blocking conversion loop shared by every entry point.
fn run_conversion(
    pdf_path: &Path,
    original_filename: &str,
    output_root: &Path,
    config: &ConversionConfig,
    history: Option<&dyn HistoryStore>,
) -> Result<ConversionOutput, Pdf2TilesError> {
    let total_start = Instant::now();

    // ── Step 1: Validate parameters ──────────────────────────────────────
    config.validate()?;
    let grid = TileGrid::new(config.tile_size, config.overlap)?;
    let classifier = BlankClassifier::new(config.blank_threshold)?;

    // ── Step 2: Open the document ────────────────────────────────────────
    let pdfium = render::bind_pdfium()?;
    let renderer = PdfRenderer::open(&pdfium, pdf_path, config.password.as_deref(), config.dpi)?;
    let total_pages = renderer.page_count();

    // ── Step 3: Compute page indices ─────────────────────────────────────
    let page_indices = config.pages.to_indices(total_pages);
    if page_indices.is_empty() {
        return Err(Pdf2TilesError::PageOutOfRange {
            page: 0,
            total: total_pages,
        });
    }
    let selected = page_indices.len();

    // ── Step 4: Allocate the conversion directory ────────────────────────
    let id = Uuid::new_v4().to_string();
    let output_dir = output_root.join(&id);
    std::fs::create_dir_all(&output_dir).map_err(|e| Pdf2TilesError::OutputWriteFailed {
        path: output_dir.clone(),
        source: e,
    })?;
    info!(
        "Converting '{}': {} of {} pages at {} DPI → {}",
        original_filename,
        selected,
        total_pages,
        config.dpi,
        output_dir.display()
    );

    let callback = config.progress_callback.as_deref();
    if let Some(cb) = callback {
        cb.on_conversion_start(selected);
    }

    // ── Step 5: Render, tile and write page by page ──────────────────────
    let mut pages = Vec::with_capacity(selected);
    let mut files = Vec::new();
    let mut blank_filtered = 0;
    let mut render_duration_ms = 0;

    for idx in page_indices {
        let page_num = idx + 1;
        if let Some(cb) = callback {
            cb.on_page_start(page_num, selected);
        }
        let page_start = Instant::now();

        let render_start = Instant::now();
        let rendered = renderer.render_page(idx);
        render_duration_ms += render_start.elapsed().as_millis() as u64;

        let outcome = rendered
            .map_err(|e| page_error_from_render(page_num, e))
            .and_then(|raster| write_page_tiles(&raster, &grid, &classifier, &output_dir, config));
        let duration_ms = page_start.elapsed().as_millis() as u64;

        match outcome {
            Ok(written) => {
                let kept = written.records.len();
                info!(
                    "Page {}/{}: {} tiles kept, {} blank ({}ms)",
                    page_num, total_pages, kept, written.filtered, duration_ms
                );
                if let Some(cb) = callback {
                    cb.on_page_complete(page_num, selected, kept, written.filtered);
                }
                blank_filtered += written.filtered;
                pages.push(PageResult {
                    page_num,
                    width: written.width,
                    height: written.height,
                    kept_tiles: kept,
                    filtered_tiles: written.filtered,
                    duration_ms,
                    error: None,
                });
                files.extend(written.records);
            }
            Err(e) => {
                warn!("Skipping page {}: {}", page_num, e);
                if let Some(cb) = callback {
                    cb.on_page_error(page_num, selected, &e.to_string());
                }
                pages.push(PageResult::failed(page_num, e, duration_ms));
            }
        }
    }

    // ── Step 6: Compute stats ────────────────────────────────────────────
    let processed = finish_pages(&pages, files.len(), &output_dir, callback)?;
    let failed = pages.len() - processed;

    let stats = ConversionStats {
        total_pages,
        processed_pages: processed,
        failed_pages: failed,
        tile_count: files.len(),
        blank_filtered,
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    // ── Step 7: Record history ───────────────────────────────────────────
    let record = ConversionRecord {
        id,
        original_filename: original_filename.to_string(),
        timestamp: Utc::now(),
        page_count: selected,
        tile_count: stats.tile_count,
        blank_filtered,
        files,
    };
    if let Some(store) = history {
        store.append(record.clone())?;
    }

    info!(
        "Conversion complete: {}/{} pages, {} tiles kept, {} blank, {}ms total",
        processed, selected, stats.tile_count, stats.blank_filtered, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        record,
        output_dir,
        pages,
        stats,
    })
}

/// Fail the conversion when no page survived, otherwise report completion.
///
/// Returns the number of processed pages. On failure the conversion
/// directory is removed and no completion event fires.
fn finish_pages(
    pages: &[PageResult],
    tile_count: usize,
    output_dir: &Path,
    callback: Option<&dyn ConversionProgressCallback>,
) -> Result<usize, Pdf2TilesError> {
    let processed = pages.iter().filter(|p| p.error.is_none()).count();

    if processed == 0 {
        if let Err(e) = std::fs::remove_dir_all(output_dir) {
            debug!("Could not remove {}: {}", output_dir.display(), e);
        }
        let first_error = pages
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(Pdf2TilesError::AllPagesFailed {
            total: pages.len(),
            first_error,
        });
    }

    if let Some(cb) = callback {
        cb.on_conversion_complete(pages.len(), processed, tile_count);
    }
    Ok(processed)
}

/// A page whose kept tiles are all on disk.
#[derive(Debug)]
struct WrittenPage {
    width: u32,
    height: u32,
    records: Vec<TileRecord>,
    filtered: usize,
}

/// Tile one rendered page and write the kept tiles into `output_dir`.
///
/// JPEG encoding is the expensive part, so tiles are written in parallel;
/// the returned records stay in row-major order. A page is all or nothing:
/// if any tile fails to write, the tiles already written for it are removed.
fn write_page_tiles(
    raster: &PageRaster,
    grid: &TileGrid,
    classifier: &BlankClassifier,
    output_dir: &Path,
    config: &ConversionConfig,
) -> Result<WrittenPage, PageError> {
    let tiles = process_page(raster, grid, classifier);
    let (quality, dpi) = (config.jpeg_quality, config.dpi);

    // Every write runs to completion before the page is judged.
    let outcomes: Vec<Result<TileRecord, PageError>> = tiles
        .kept
        .par_iter()
        .map(|tile| {
            let filename = tile.filename();
            let path: PathBuf = output_dir.join(&filename);
            let size = encode::save_tile(&path, &tile.image, quality, dpi).map_err(|e| {
                if path.is_file() {
                    discard_tile(&path);
                }
                PageError::WriteFailed {
                    page: tile.page,
                    row: tile.row,
                    col: tile.col,
                    detail: format!("{}: {}", path.display(), e),
                }
            })?;
            debug!("Wrote {} ({} bytes)", filename, size);
            Ok(TileRecord {
                filename,
                path,
                size,
                page: tile.page,
                tile_row: tile.row,
                tile_col: tile.col,
            })
        })
        .collect();

    let (written, failed): (Vec<_>, Vec<_>) = outcomes.into_iter().partition(Result::is_ok);
    let records: Vec<TileRecord> = written.into_iter().filter_map(Result::ok).collect();
    if let Some(err) = failed.into_iter().find_map(Result::err) {
        for record in &records {
            discard_tile(&record.path);
        }
        return Err(err);
    }

    Ok(WrittenPage {
        width: raster.width(),
        height: raster.height(),
        records,
        filtered: tiles.filtered,
    })
}

/// Best-effort removal of a tile that will not be recorded.
fn discard_tile(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!("Could not remove {}: {}", path.display(), e);
    }
}

/// Demote a fatal render error for one page to a [`PageError`].
fn page_error_from_render(page: usize, err: Pdf2TilesError) -> PageError {
    match err {
        Pdf2TilesError::RasterisationFailed { detail, .. } => PageError::RenderFailed { page, detail },
        Pdf2TilesError::InvalidRaster { reason, .. } => PageError::InvalidRaster {
            page,
            detail: reason,
        },
        e @ Pdf2TilesError::UnsupportedChannels { .. } => PageError::InvalidRaster {
            page,
            detail: e.to_string(),
        },
        other => PageError::RenderFailed {
            page,
            detail: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// 2x1 grid of 64 px tiles: text-like strokes on the left, white on the right.
    fn half_busy_page() -> PageRaster {
        let img = RgbImage::from_fn(128, 64, |x, y| {
            if x < 64 && (8..56).contains(&y) && (x / 3 + y / 4) % 2 == 0 {
                Rgb([10, 10, 10])
            } else {
                Rgb([255, 255, 255])
            }
        });
        PageRaster::new(2, img).unwrap()
    }

    #[test]
    fn write_page_tiles_keeps_content_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConversionConfig::builder()
            .tile_size(64)
            .overlap(0)
            .build()
            .unwrap();
        let grid = TileGrid::new(64, 0).unwrap();
        let classifier = BlankClassifier::default();

        let written =
            write_page_tiles(&half_busy_page(), &grid, &classifier, dir.path(), &config).unwrap();

        assert_eq!((written.width, written.height), (128, 64));
        assert_eq!(written.filtered, 1);
        assert_eq!(written.records.len(), 1);
        let record = &written.records[0];
        assert_eq!(record.filename, "page_2_tile_r0_c0.jpg");
        assert_eq!((record.page, record.tile_row, record.tile_col), (2, 0, 0));
        assert!(record.path.exists());
        assert_eq!(std::fs::metadata(&record.path).unwrap().len(), record.size);
        assert!(!dir.path().join("page_2_tile_r0_c1.jpg").exists());
    }

    #[test]
    fn write_failure_is_a_page_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not").join("there");
        let config = ConversionConfig::builder()
            .tile_size(64)
            .overlap(0)
            .build()
            .unwrap();
        let grid = TileGrid::new(64, 0).unwrap();

        let err = write_page_tiles(
            &half_busy_page(),
            &grid,
            &BlankClassifier::default(),
            &missing,
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, PageError::WriteFailed { page: 2, row: 0, col: 0, .. }));
    }

    #[test]
    fn failed_write_leaves_no_partial_page() {
        let dir = tempfile::tempdir().unwrap();
        // Both 64 px tiles carry strokes.
        let img = RgbImage::from_fn(128, 64, |x, y| {
            if (8..56).contains(&y) && (x / 3 + y / 4) % 2 == 0 {
                Rgb([10, 10, 10])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let page = PageRaster::new(1, img).unwrap();
        let config = ConversionConfig::builder()
            .tile_size(64)
            .overlap(0)
            .build()
            .unwrap();
        let grid = TileGrid::new(64, 0).unwrap();
        // A directory where the second tile should go makes that write fail.
        std::fs::create_dir(dir.path().join("page_1_tile_r0_c1.jpg")).unwrap();

        let err = write_page_tiles(&page, &grid, &BlankClassifier::default(), dir.path(), &config)
            .unwrap_err();
        assert!(matches!(err, PageError::WriteFailed { page: 1, row: 0, col: 1, .. }));

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.is_file())
            .collect();
        assert!(files.is_empty(), "tiles left behind: {files:?}");
        assert!(!dir.path().join("page_1_tile_r0_c0.jpg").exists());

        let cursor = crate::archive::write_zip(dir.path(), std::io::Cursor::new(Vec::new())).unwrap();
        let zip = zip::ZipArchive::new(cursor).unwrap();
        assert_eq!(zip.len(), 0);
    }

    /// Counts completion events.
    #[derive(Default)]
    struct CompletionCounter(std::sync::atomic::AtomicUsize);

    impl ConversionProgressCallback for CompletionCounter {
        fn on_conversion_complete(&self, _total: usize, _success: usize, _tiles: usize) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    fn render_failure(page_num: usize) -> PageResult {
        PageResult::failed(
            page_num,
            PageError::RenderFailed {
                page: page_num,
                detail: "bitmap alloc".into(),
            },
            3,
        )
    }

    #[test]
    fn all_failed_pages_skip_completion_event() {
        let root = tempfile::tempdir().unwrap();
        let output_dir = root.path().join("conversion");
        std::fs::create_dir(&output_dir).unwrap();
        let counter = CompletionCounter::default();

        let err = finish_pages(
            &[render_failure(1), render_failure(2)],
            0,
            &output_dir,
            Some(&counter),
        )
        .unwrap_err();

        assert!(matches!(err, Pdf2TilesError::AllPagesFailed { total: 2, .. }));
        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert!(!output_dir.exists());
    }

    #[test]
    fn partial_success_reports_completion_once() {
        let root = tempfile::tempdir().unwrap();
        let counter = CompletionCounter::default();
        let ok = PageResult {
            page_num: 2,
            width: 64,
            height: 64,
            kept_tiles: 1,
            filtered_tiles: 0,
            duration_ms: 1,
            error: None,
        };

        let processed =
            finish_pages(&[render_failure(1), ok], 1, root.path(), Some(&counter)).unwrap();

        assert_eq!(processed, 1);
        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(root.path().exists());
    }

    #[test]
    fn render_errors_become_page_errors() {
        let e = page_error_from_render(
            3,
            Pdf2TilesError::RasterisationFailed {
                page: 3,
                detail: "bitmap alloc".into(),
            },
        );
        assert!(matches!(e, PageError::RenderFailed { page: 3, ref detail } if detail == "bitmap alloc"));

        let e = page_error_from_render(
            1,
            Pdf2TilesError::UnsupportedChannels {
                page: 1,
                channels: 2,
            },
        );
        assert!(matches!(e, PageError::InvalidRaster { page: 1, .. }));
    }

    #[test]
    fn display_name_uses_file_name() {
        assert_eq!(display_name(Path::new("/data/in/report.pdf")), "report.pdf");
    }

    #[tokio::test]
    async fn missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = convert("/no/such/file.pdf", dir.path(), &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2TilesError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn non_pdf_bytes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = convert_from_bytes(
            b"GIF89a....",
            "a.gif",
            dir.path(),
            &ConversionConfig::default(),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Pdf2TilesError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn invalid_config_rejected_before_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConversionConfig {
            overlap: 2048,
            ..ConversionConfig::default()
        };
        let err = convert_from_bytes(b"%PDF-1.4\n%%EOF", "x.pdf", dir.path(), &config, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2TilesError::InvalidConfig(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
