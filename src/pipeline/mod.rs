//! Pipeline stages for PDF-to-tiles conversion.
//!
//! Each submodule implements exactly one transformation step, so the pixel
//! work can be tested on synthetic rasters without a PDF or pdfium.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ tile ──▶ blank ──▶ encode
//! (path/bytes) (pdfium)  (grid)   (filter)  (JPEG)
//! ```
//!
//! 1. [`input`] : check the user-supplied path, or spool bytes to a temp file
//! 2. [`render`]: rasterise one page at a time; blocking, because pdfium is
//!    not async-safe
//! 3. [`tile`]  : cut a [`raster::PageRaster`] into overlapping fixed-size
//!    windows, padding short edge windows with white
//! 4. [`blank`] : four-stage blank / border-frame classifier built on the
//!    primitives in [`stats`]
//! 5. [`encode`]: JPEG-encode kept tiles with the render DPI as density
//!
//! [`page`] glues 3 and 4 together for one page.

pub mod blank;
pub mod encode;
pub mod input;
pub mod page;
pub mod raster;
pub mod render;
pub mod stats;
pub mod tile;
