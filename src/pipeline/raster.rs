//! Page rasters and tiles: the pixel containers the core works on.
//!
//! Both wrap an [`RgbImage`], a flat row-major buffer of 8-bit RGB samples
//! with explicit width and height. Everything downstream (tiling, blank
//! detection, JPEG encoding) reads that buffer directly.

use crate::error::Pdf2TilesError;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

/// A full-resolution RGB raster of one document page.
///
/// Immutable once built; guaranteed non-empty.
#[derive(Debug, Clone)]
pub struct PageRaster {
    page: usize,
    image: RgbImage,
}

impl PageRaster {
    /// Wrap an RGB image rendered for the 1-indexed `page`.
    pub fn new(page: usize, image: RgbImage) -> Result<Self, Pdf2TilesError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Pdf2TilesError::InvalidRaster {
                page,
                reason: format!("empty raster {}x{}", image.width(), image.height()),
            });
        }
        Ok(Self { page, image })
    }

    /// Flatten any decoded/rendered image to RGB. Alpha is dropped, not
    /// composited.
    pub fn from_dynamic(page: usize, image: DynamicImage) -> Result<Self, Pdf2TilesError> {
        let rgb = match image {
            DynamicImage::ImageRgb8(rgb) => rgb,
            other => other.to_rgb8(),
        };
        Self::new(page, rgb)
    }

    /// Build a raster from raw interleaved samples.
    ///
    /// `channels` must be 1 (grey), 3 (RGB) or 4 (RGBA); any other layout is
    /// rejected with [`Pdf2TilesError::UnsupportedChannels`].
    pub fn from_raw(
        page: usize,
        width: u32,
        height: u32,
        channels: usize,
        samples: Vec<u8>,
    ) -> Result<Self, Pdf2TilesError> {
        let expected = width as usize * height as usize * channels;
        if !matches!(channels, 1 | 3 | 4) {
            return Err(Pdf2TilesError::UnsupportedChannels { page, channels });
        }
        if samples.len() != expected {
            return Err(Pdf2TilesError::InvalidRaster {
                page,
                reason: format!(
                    "expected {expected} samples for {width}x{height}x{channels}, got {}",
                    samples.len()
                ),
            });
        }

        let mismatch = || Pdf2TilesError::InvalidRaster {
            page,
            reason: "sample buffer does not match dimensions".into(),
        };
        let image = match channels {
            1 => DynamicImage::ImageLuma8(
                GrayImage::from_raw(width, height, samples).ok_or_else(mismatch)?,
            ),
            3 => DynamicImage::ImageRgb8(
                RgbImage::from_raw(width, height, samples).ok_or_else(mismatch)?,
            ),
            _ => DynamicImage::ImageRgba8(
                RgbaImage::from_raw(width, height, samples).ok_or_else(mismatch)?,
            ),
        };
        Self::from_dynamic(page, image)
    }

    /// 1-indexed page number.
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

/// One fixed-size square window cut from a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    /// 1-indexed page the tile came from.
    pub page: usize,
    /// 0-indexed grid row.
    pub row: u32,
    /// 0-indexed grid column.
    pub col: u32,
    /// `tile_size × tile_size` pixels, white-padded at page edges.
    pub image: RgbImage,
}

impl Tile {
    /// Output file name: `page_{page}_tile_r{row}_c{col}.jpg`.
    pub fn filename(&self) -> String {
        tile_filename(self.page, self.row, self.col)
    }
}

/// Deterministic tile file name for a `(page, row, col)` triple.
pub fn tile_filename(page: usize, row: u32, col: u32) -> String {
    format!("page_{page}_tile_r{row}_c{col}.jpg")
}
