//! # edgequake-pdf2tiles
//!
//! Turn PDF documents into overlapping, fixed-size JPEG tiles for training
//! object-detection models, dropping the tiles that carry no content.
//!
//! ## Why this crate?
//!
//! Detection models train on small square inputs, while a page rendered at
//! 350 DPI is roughly 3000×4000 pixels. Downscaling the page destroys thin
//! rulings and small glyphs; cutting it into overlapping 1024 px tiles keeps
//! full resolution and guarantees every object narrower than the overlap
//! appears whole in at least one tile. Most tiles of a typical page are
//! margin, so a statistical classifier discards white, uniform, edge-free
//! and border-only tiles before they reach the dataset.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     check local file, or spool uploaded bytes
//!  ├─ 2. Render    rasterise one page at a time via pdfium (spawn_blocking)
//!  ├─ 3. Tile      overlapping tile_size windows, white-padded at the edges
//!  ├─ 4. Classify  white → uniform → edge density → border frame (rayon)
//!  ├─ 5. Write     JPEG tiles page_{p}_tile_r{row}_c{col}.jpg
//!  └─ 6. Record    ConversionRecord appended to the history store
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2tiles::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert("document.pdf", "tiles", &config).await?;
//!     eprintln!("{} tiles kept, {} blank",
//!         output.stats.tile_count,
//!         output.stats.blank_filtered);
//!     Ok(())
//! }
//! ```
//!
//! The tiling core needs no PDF at all:
//!
//! ```rust
//! use edgequake_pdf2tiles::{process_page, BlankClassifier, PageRaster, TileGrid};
//! use image::{Rgb, RgbImage};
//!
//! let page = PageRaster::new(1, RgbImage::from_pixel(2000, 1500, Rgb([255, 255, 255]))).unwrap();
//! let grid = TileGrid::new(1024, 128).unwrap();
//! let tiles = process_page(&page, &grid, &BlankClassifier::default());
//! assert_eq!(tiles.kept.len(), 0);
//! assert_eq!(tiles.filtered, 6);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2tiles` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-pdf2tiles = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod archive;
pub mod config;
pub mod convert;
pub mod error;
pub mod history;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use archive::{archive_name, package_conversion, tile_path, Archive};
pub use config::{ConversionConfig, ConversionConfigBuilder, PageSelection};
pub use convert::{convert, convert_from_bytes, convert_sync, convert_with_history, inspect};
pub use error::{PageError, Pdf2TilesError};
pub use history::{
    ConversionRecord, HistoryStore, JsonHistoryStore, MemoryHistoryStore, SharedHistoryStore,
};
pub use output::{ConversionOutput, ConversionStats, DocumentMetadata, PageResult, TileRecord};
pub use pipeline::blank::{classify, is_blank, BlankClassifier, BlankVerdict};
pub use pipeline::page::{process_page, PageTiles};
pub use pipeline::raster::{PageRaster, Tile};
pub use pipeline::tile::{tile, TileGrid, TileWindow};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
