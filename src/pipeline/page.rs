//! Per-page tiling: cut a raster into tiles and drop the blank ones.
//!
//! Classification of independent tiles runs on the rayon pool. Results are
//! collected through an indexed parallel iterator, so the kept tiles keep the
//! tiler's row-major order no matter which worker finishes first.

use crate::pipeline::blank::{BlankClassifier, BlankVerdict};
use crate::pipeline::raster::{PageRaster, Tile};
use crate::pipeline::tile::TileGrid;
use rayon::prelude::*;
use tracing::debug;

/// Tiles of one page that survived blank filtering.
#[derive(Debug, Clone)]
pub struct PageTiles {
    /// 1-indexed page number.
    pub page: usize,
    /// Non-blank tiles in row-major order.
    pub kept: Vec<Tile>,
    /// Number of tiles dropped as blank.
    pub filtered: usize,
}

impl PageTiles {
    /// Tiles produced by the grid before filtering.
    pub fn total(&self) -> usize {
        self.kept.len() + self.filtered
    }
}

/// Tile `raster` with `grid` and keep the tiles `classifier` judges non-blank.
pub fn process_page(raster: &PageRaster, grid: &TileGrid, classifier: &BlankClassifier) -> PageTiles {
    let tiles: Vec<Tile> = grid.tiles(raster).collect();

    let verdicts: Vec<(Tile, BlankVerdict)> = tiles
        .into_par_iter()
        .map(|tile| {
            let verdict = classifier.classify(&tile.image);
            (tile, verdict)
        })
        .collect();

    let mut kept = Vec::with_capacity(verdicts.len());
    let mut filtered = 0;
    for (tile, verdict) in verdicts {
        if verdict.is_blank() {
            debug!(
                "Page {} tile r{} c{}: dropped ({:?})",
                tile.page, tile.row, tile.col, verdict
            );
            filtered += 1;
        } else {
            kept.push(tile);
        }
    }

    PageTiles {
        page: raster.page(),
        kept,
        filtered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// 3x2 grid of 32 px tiles (no overlap) with content only in cells (0,1) and (1,2).
    fn page() -> PageRaster {
        let img = RgbImage::from_fn(96, 64, |x, y| {
            let cell = (y / 32, x / 32);
            let busy = cell == (0, 1) || cell == (1, 2);
            if busy && (x / 2 + y / 3) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        PageRaster::new(5, img).unwrap()
    }

    #[test]
    fn keeps_content_in_row_major_order() {
        let grid = TileGrid::new(32, 0).unwrap();
        let result = process_page(&page(), &grid, &BlankClassifier::default());
        assert_eq!(result.page, 5);
        assert_eq!(result.total(), 6);
        assert_eq!(result.filtered, 4);
        let cells: Vec<_> = result.kept.iter().map(|t| (t.row, t.col)).collect();
        assert_eq!(cells, vec![(0, 1), (1, 2)]);
        assert!(result.kept.iter().all(|t| t.page == 5));
    }

    #[test]
    fn blank_page_keeps_nothing() {
        let raster = PageRaster::new(1, RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]))).unwrap();
        let grid = TileGrid::new(40, 8).unwrap();
        let result = process_page(&raster, &grid, &BlankClassifier::default());
        assert!(result.kept.is_empty());
        assert_eq!(result.filtered, 9);
    }
}
