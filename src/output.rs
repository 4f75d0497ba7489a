//! Result types returned by the conversion entry points.

use crate::error::PageError;
use crate::history::ConversionRecord;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Document-level metadata read without rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// One tile written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRecord {
    /// `page_{page}_tile_r{row}_c{col}.jpg`
    pub filename: String,
    /// Full path of the written file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// 1-indexed page.
    pub page: usize,
    pub tile_row: u32,
    pub tile_col: u32,
}

/// Outcome of one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Rendered raster width in pixels (0 if rendering failed).
    pub width: u32,
    /// Rendered raster height in pixels (0 if rendering failed).
    pub height: u32,
    /// Tiles written.
    pub kept_tiles: usize,
    /// Tiles dropped as blank.
    pub filtered_tiles: usize,
    /// Wall-clock time for render + tile + write.
    pub duration_ms: u64,
    /// Set when the page failed; counts above are then partial.
    pub error: Option<PageError>,
}

impl PageResult {
    pub(crate) fn failed(page_num: usize, error: PageError, duration_ms: u64) -> Self {
        Self {
            page_num,
            width: 0,
            height: 0,
            kept_tiles: 0,
            filtered_tiles: 0,
            duration_ms,
            error: Some(error),
        }
    }
}

/// Aggregate numbers for a conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Selected pages tiled without error.
    pub processed_pages: usize,
    /// Selected pages that failed.
    pub failed_pages: usize,
    /// Tiles written.
    pub tile_count: usize,
    /// Tiles dropped as blank.
    pub blank_filtered: usize,
    /// Time spent inside pdfium.
    pub render_duration_ms: u64,
    /// End-to-end time.
    pub total_duration_ms: u64,
}

/// Everything a conversion produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The record appended to the history store.
    pub record: ConversionRecord,
    /// Directory holding this conversion's tiles.
    pub output_dir: PathBuf,
    /// Per-page outcomes, in page order.
    pub pages: Vec<PageResult>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Errors of the pages that failed, in page order.
    pub fn page_errors(&self) -> impl Iterator<Item = &PageError> {
        self.pages.iter().filter_map(|p| p.error.as_ref())
    }
}
