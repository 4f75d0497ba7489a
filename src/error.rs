//! Error types for the edgequake-pdf2tiles library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2TilesError`]: **Fatal**: the conversion cannot proceed at all
//!   (bad input file, wrong password, invalid tiling parameters). Returned as
//!   `Err(Pdf2TilesError)` from the top-level `convert*` functions.
//!
//! * [`PageError`]: **Non-fatal**: a single page failed (render glitch,
//!   degenerate raster, disk write error) but the other pages are fine.
//!   Stored inside [`crate::output::PageResult`] so callers can inspect
//!   partial success rather than losing the whole document to one bad page.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2tiles library.
#[derive(Debug, Error)]
pub enum Pdf2TilesError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Raster errors ─────────────────────────────────────────────────────
    /// A page raster has a zero dimension or a sample buffer of the wrong size.
    #[error("Invalid raster for page {page}: {reason}")]
    InvalidRaster { page: usize, reason: String },

    /// A page raster uses a channel layout that cannot be flattened to RGB.
    #[error("Unsupported channel layout for page {page}: {channels} channels (expected 1, 3 or 4)")]
    UnsupportedChannels { page: usize, channels: usize },

    /// Every selected page failed; no tile was produced.
    #[error("All {total} pages failed.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file or directory.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The history store could not be read or written.
    #[error("Conversion history error: {0}")]
    HistoryFailed(String),

    /// No conversion directory exists for this id.
    #[error("Conversion '{id}' not found")]
    ConversionNotFound { id: String },

    /// The requested tile does not exist (or the name is not a plain file name).
    #[error("Tile '{filename}' not found in conversion '{id}'")]
    TileNotFound { id: String, filename: String },

    /// Building the ZIP archive failed.
    #[error("Failed to build archive: {0}")]
    ArchiveFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or tiling parameter validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place libpdfium next to the binary,\n\
or install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored alongside [`crate::output::PageResult`] when a page fails.
/// The overall conversion continues unless ALL pages fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The rendered raster could not be tiled.
    #[error("Page {page}: invalid raster: {detail}")]
    InvalidRaster { page: usize, detail: String },

    /// A kept tile could not be encoded or written.
    #[error("Page {page}: failed to write tile r{row} c{col}: {detail}")]
    WriteFailed {
        page: usize,
        row: u32,
        col: u32,
        detail: String,
    },
}

impl PageError {
    /// 1-indexed page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. }
            | PageError::InvalidRaster { page, .. }
            | PageError::WriteFailed { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pages_failed_display() {
        let e = Pdf2TilesError::AllPagesFailed {
            total: 3,
            first_error: "Page 1: rasterisation failed: boom".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 3 pages"), "got: {msg}");
        assert!(msg.contains("boom"));
    }

    #[test]
    fn unsupported_channels_display() {
        let e = Pdf2TilesError::UnsupportedChannels {
            page: 2,
            channels: 2,
        };
        assert!(e.to_string().contains("2 channels"));
        assert!(e.to_string().contains("page 2"));
    }

    #[test]
    fn tile_not_found_display() {
        let e = Pdf2TilesError::TileNotFound {
            id: "abc".into(),
            filename: "page_1_tile_r0_c0.jpg".into(),
        };
        assert!(e.to_string().contains("page_1_tile_r0_c0.jpg"));
        assert!(e.to_string().contains("abc"));
    }

    #[test]
    fn page_error_reports_page() {
        let e = PageError::WriteFailed {
            page: 4,
            row: 1,
            col: 2,
            detail: "disk full".into(),
        };
        assert_eq!(e.page(), 4);
        assert!(e.to_string().contains("r1 c2"));
    }
}
