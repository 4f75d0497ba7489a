//! Tiling geometry: cut a page raster into overlapping fixed-size windows.
//!
//! ## Grid
//!
//! With `step = tile_size − overlap`, the grid has
//! `max(1, ceil((width − overlap) / step))` columns and the same formula over
//! the height for rows. Cell `(row, col)` starts at `(col·step, row·step)`.
//!
//! ## Edges
//!
//! A window is clamped to the page. If clamping leaves a non-first column
//! narrower than a tile, the window slides left until it is full width again
//! (likewise upwards for rows), so the last strip overlaps its neighbour more
//! instead of producing a sliver. Only a page smaller than one tile yields a
//! short window; that window is pasted on a white canvas, top-left anchored.
//!
//! Tiles come out in row-major order. Output filenames encode `(row, col)`,
//! so the order is part of the contract.

use crate::error::Pdf2TilesError;
use crate::pipeline::raster::{PageRaster, Tile};
use image::{imageops, Rgb, RgbImage};

/// Padding colour for windows smaller than a tile.
pub const PAD_COLOUR: Rgb<u8> = Rgb([255, 255, 255]);

/// Validated tile size and overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    tile_size: u32,
    overlap: u32,
}

impl TileGrid {
    /// `tile_size` must be positive and `overlap` strictly smaller.
    pub fn new(tile_size: u32, overlap: u32) -> Result<Self, Pdf2TilesError> {
        if tile_size == 0 {
            return Err(Pdf2TilesError::InvalidConfig(
                "Tile size must be ≥ 1".into(),
            ));
        }
        if overlap >= tile_size {
            return Err(Pdf2TilesError::InvalidConfig(format!(
                "Overlap ({overlap}) must be smaller than tile size ({tile_size})"
            )));
        }
        Ok(Self { tile_size, overlap })
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn overlap(&self) -> u32 {
        self.overlap
    }

    pub fn step(&self) -> u32 {
        self.tile_size - self.overlap
    }

    /// Number of tiles along an axis of `len` pixels.
    fn count(&self, len: u32) -> u32 {
        len.saturating_sub(self.overlap).div_ceil(self.step()).max(1)
    }

    /// Grid shape `(cols, rows)` for a `width × height` page.
    pub fn dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        (self.count(width), self.count(height))
    }

    /// Crop windows for a `width × height` page, in row-major order.
    pub fn windows(&self, width: u32, height: u32) -> Windows {
        let (cols, rows) = self.dimensions(width, height);
        Windows {
            grid: *self,
            width,
            height,
            cols,
            rows,
            next: 0,
        }
    }

    /// Cut `raster` into tiles, in row-major order.
    pub fn tiles<'a>(&self, raster: &'a PageRaster) -> Tiles<'a> {
        Tiles {
            windows: self.windows(raster.width(), raster.height()),
            raster,
        }
    }

    /// Start and length of cell `index` along an axis of `len` pixels.
    fn span(&self, index: u32, len: u32) -> (u32, u32) {
        let mut start = index * self.step();
        let end = start.saturating_add(self.tile_size).min(len);
        if end - start < self.tile_size && index > 0 {
            start = end.saturating_sub(self.tile_size);
        }
        (start, end - start)
    }
}

/// The crop rectangle of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileWindow {
    pub row: u32,
    pub col: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TileWindow {
    /// Whether the crop is smaller than a full tile and needs white padding.
    pub fn needs_padding(&self, tile_size: u32) -> bool {
        self.width < tile_size || self.height < tile_size
    }
}

/// Iterator over the crop windows of one page.
#[derive(Debug, Clone)]
pub struct Windows {
    grid: TileGrid,
    width: u32,
    height: u32,
    cols: u32,
    rows: u32,
    next: u64,
}

impl Iterator for Windows {
    type Item = TileWindow;

    fn next(&mut self) -> Option<TileWindow> {
        let total = u64::from(self.cols) * u64::from(self.rows);
        if self.next >= total {
            return None;
        }
        let row = (self.next / u64::from(self.cols)) as u32;
        let col = (self.next % u64::from(self.cols)) as u32;
        self.next += 1;

        let (x, width) = self.grid.span(col, self.width);
        let (y, height) = self.grid.span(row, self.height);
        Some(TileWindow {
            row,
            col,
            x,
            y,
            width,
            height,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let total = u64::from(self.cols) * u64::from(self.rows);
        let left = total.saturating_sub(self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Windows {}

/// Iterator over the tiles of one page.
pub struct Tiles<'a> {
    windows: Windows,
    raster: &'a PageRaster,
}

impl Iterator for Tiles<'_> {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        let window = self.windows.next()?;
        Some(extract(self.raster, &window, self.windows.grid.tile_size))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.windows.size_hint()
    }
}

impl ExactSizeIterator for Tiles<'_> {}

/// Cut `raster` into `tile_size` squares overlapping by `overlap` pixels.
pub fn tile(raster: &PageRaster, tile_size: u32, overlap: u32) -> Result<Tiles<'_>, Pdf2TilesError> {
    Ok(TileGrid::new(tile_size, overlap)?.tiles(raster))
}

/// Copy one window out of the page, padding to a full tile when short.
fn extract(raster: &PageRaster, window: &TileWindow, tile_size: u32) -> Tile {
    let crop = imageops::crop_imm(raster.image(), window.x, window.y, window.width, window.height)
        .to_image();
    let image = if window.needs_padding(tile_size) {
        let mut canvas = RgbImage::from_pixel(tile_size, tile_size, PAD_COLOUR);
        imageops::replace(&mut canvas, &crop, 0, 0);
        canvas
    } else {
        crop
    };
    Tile {
        page: raster.page(),
        row: window.row,
        col: window.col,
        image,
    }
}
