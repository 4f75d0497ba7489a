//! Configuration types for PDF-to-tiles conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Every knob lives in one struct so a
//! config can be shared across threads, logged, and diffed between runs.
//!
//! Validation happens once, in [`ConversionConfigBuilder::build`], before any
//! page is rendered: a bad overlap or threshold is rejected up front instead
//! of failing halfway through a document.

use crate::error::Pdf2TilesError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default rasterisation DPI.
pub const DEFAULT_DPI: u32 = 350;
/// Lowest accepted rasterisation DPI.
pub const MIN_DPI: u32 = 300;
/// Highest accepted rasterisation DPI.
pub const MAX_DPI: u32 = 400;
/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 1024;
/// Default overlap between neighbouring tiles (12.5 % of the default tile).
pub const DEFAULT_OVERLAP: u32 = 128;
/// Default near-white fraction above which a tile is blank.
pub const DEFAULT_BLANK_THRESHOLD: f64 = 0.98;
/// Default JPEG quality for written tiles.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Configuration for a PDF-to-tiles conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2tiles::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .dpi(300)
///     .tile_size(640)
///     .overlap(64)
///     .build()
///     .unwrap();
/// assert_eq!(config.tile_size, 640);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 300–400. Default: 350.
    ///
    /// Detection models train on small glyphs and thin rulings; below 300 DPI
    /// those features blur into a couple of pixels.
    pub dpi: u32,

    /// Edge length of every emitted tile in pixels. Default: 1024.
    pub tile_size: u32,

    /// Pixels shared between horizontally or vertically adjacent tiles. Default: 128.
    ///
    /// Must be strictly smaller than `tile_size`. An object cut by one tile
    /// boundary appears whole in the neighbour as long as it is narrower
    /// than the overlap.
    pub overlap: u32,

    /// Near-white pixel fraction above which a tile is dropped. Range: 0.0–1.0. Default: 0.98.
    pub blank_threshold: f64,

    /// JPEG quality (1–100) for written tiles. Default: 95.
    pub jpeg_quality: u8,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Receives per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            tile_size: DEFAULT_TILE_SIZE,
            overlap: DEFAULT_OVERLAP,
            blank_threshold: DEFAULT_BLANK_THRESHOLD,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            pages: PageSelection::default(),
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("tile_size", &self.tile_size)
            .field("overlap", &self.overlap)
            .field("blank_threshold", &self.blank_threshold)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check every constraint on the tiling and output parameters.
    ///
    /// Called by the builder; also useful for configs assembled by hand.
    pub fn validate(&self) -> Result<(), Pdf2TilesError> {
        if !(MIN_DPI..=MAX_DPI).contains(&self.dpi) {
            return Err(Pdf2TilesError::InvalidConfig(format!(
                "DPI must be {MIN_DPI}–{MAX_DPI}, got {}",
                self.dpi
            )));
        }
        if self.tile_size == 0 {
            return Err(Pdf2TilesError::InvalidConfig(
                "Tile size must be ≥ 1".into(),
            ));
        }
        if self.overlap >= self.tile_size {
            return Err(Pdf2TilesError::InvalidConfig(format!(
                "Overlap ({}) must be smaller than tile size ({})",
                self.overlap, self.tile_size
            )));
        }
        if !(0.0..=1.0).contains(&self.blank_threshold) {
            return Err(Pdf2TilesError::InvalidConfig(format!(
                "Blank threshold must be within 0.0–1.0, got {}",
                self.blank_threshold
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Pdf2TilesError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn tile_size(mut self, px: u32) -> Self {
        self.config.tile_size = px;
        self
    }

    pub fn overlap(mut self, px: u32) -> Self {
        self.config.overlap = px;
        self
    }

    pub fn blank_threshold(mut self, threshold: f64) -> Self {
        self.config.blank_threshold = threshold;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2TilesError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to tile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Tile all pages (default).
    #[default]
    All,
    /// Tile a single page (1-indexed).
    Single(usize),
    /// Tile a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Tile specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    ///
    /// Pages beyond `total_pages` are silently dropped.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if (1..=total_pages).contains(p) {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| (1..=total_pages).contains(&p))
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dataset_settings() {
        let c = ConversionConfig::default();
        assert_eq!(c.dpi, 350);
        assert_eq!(c.tile_size, 1024);
        assert_eq!(c.overlap, 128);
        assert!((c.blank_threshold - 0.98).abs() < f64::EPSILON);
        assert_eq!(c.jpeg_quality, 95);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn overlap_must_be_below_tile_size() {
        let err = ConversionConfig::builder()
            .tile_size(256)
            .overlap(256)
            .build()
            .unwrap_err();
        assert!(matches!(err, Pdf2TilesError::InvalidConfig(_)));
        assert!(err.to_string().contains("Overlap"));
    }

    #[test]
    fn zero_tile_size_rejected() {
        let err = ConversionConfig::builder()
            .tile_size(0)
            .overlap(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Tile size"));
    }

    #[test]
    fn dpi_outside_range_rejected() {
        assert!(ConversionConfig::builder().dpi(299).build().is_err());
        assert!(ConversionConfig::builder().dpi(401).build().is_err());
        assert!(ConversionConfig::builder().dpi(300).build().is_ok());
        assert!(ConversionConfig::builder().dpi(400).build().is_ok());
    }

    #[test]
    fn threshold_outside_unit_interval_rejected() {
        assert!(ConversionConfig::builder().blank_threshold(-0.01).build().is_err());
        assert!(ConversionConfig::builder().blank_threshold(1.01).build().is_err());
        assert!(ConversionConfig::builder().blank_threshold(f64::NAN).build().is_err());
        assert!(ConversionConfig::builder().blank_threshold(0.0).build().is_ok());
        assert!(ConversionConfig::builder().blank_threshold(1.0).build().is_ok());
    }

    #[test]
    fn jpeg_quality_zero_rejected() {
        assert!(ConversionConfig::builder().jpeg_quality(0).build().is_err());
        assert!(ConversionConfig::builder().jpeg_quality(101).build().is_err());
    }

    #[test]
    fn zero_overlap_is_valid() {
        let c = ConversionConfig::builder().overlap(0).build().unwrap();
        assert_eq!(c.overlap, 0);
        assert_eq!(c.tile_size, 1024);
    }

    #[test]
    fn debug_redacts_password() {
        let c = ConversionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(5), vec![0, 1, 2, 3, 4]);
        assert_eq!(PageSelection::Single(3).to_indices(5), vec![2]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Single(0).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 4).to_indices(5), vec![1, 2, 3]);
        assert_eq!(PageSelection::Range(4, 9).to_indices(5), vec![3, 4]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3, 9]).to_indices(5),
            vec![0, 2]
        );
    }
}
