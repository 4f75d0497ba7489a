//! Property-Based Tests
//!
//! Tiling geometry invariants over arbitrary page sizes, tile sizes and
//! overlaps:
//! - windows cover the page with no gaps
//! - every window stays inside the page and every tile is a full square
//! - strict row-major order
//! - neighbours share at least `overlap` pixels
//! - tile pixels are exactly the page pixels, white beyond the page

use edgequake_pdf2tiles::{PageRaster, TileGrid, TileWindow};
use image::{Rgb, RgbImage};
use proptest::prelude::*;

/// `(tile_size, overlap)` with `overlap < tile_size`.
fn grid_params(max_tile: u32) -> impl Strategy<Value = (u32, u32)> {
    (1..=max_tile).prop_flat_map(|tile| (Just(tile), 0..tile))
}

/// Spans along one axis: a page one pixel high has exactly one row.
fn axis_spans(grid: &TileGrid, len: u32) -> Vec<(u32, u32)> {
    grid.windows(len, 1).map(|w| (w.x, w.width)).collect()
}

// ============================================================================
// Geometry
// ============================================================================

/// Property: per-axis spans start at 0, leave no gap and end at the page edge
#[test]
fn proptest_spans_cover_axis() {
    proptest!(|(len in 1u32..6000, (tile, overlap) in grid_params(2048))| {
        let grid = TileGrid::new(tile, overlap).unwrap();
        let spans = axis_spans(&grid, len);

        prop_assert!(!spans.is_empty());
        prop_assert_eq!(spans[0].0, 0);
        for pair in spans.windows(2) {
            let (x0, w0) = pair[0];
            let (x1, _) = pair[1];
            prop_assert!(x1 > x0, "starts must increase: {:?}", pair);
            prop_assert!(x1 <= x0 + w0, "gap between {:?}", pair);
        }
        let (last_x, last_w) = spans[spans.len() - 1];
        prop_assert_eq!(last_x + last_w, len);
    });
}

/// Property: windows never leave the page and are full-size unless the page is smaller
#[test]
fn proptest_spans_within_page() {
    proptest!(|(len in 1u32..6000, (tile, overlap) in grid_params(2048))| {
        let grid = TileGrid::new(tile, overlap).unwrap();
        for (x, width) in axis_spans(&grid, len) {
            prop_assert!(x + width <= len);
            prop_assert_eq!(width, tile.min(len));
        }
    });
}

/// Property: adjacent windows share at least `overlap` pixels
#[test]
fn proptest_neighbours_share_overlap() {
    proptest!(|(len in 1u32..6000, (tile, overlap) in grid_params(2048))| {
        let grid = TileGrid::new(tile, overlap).unwrap();
        let spans = axis_spans(&grid, len);
        for pair in spans.windows(2) {
            let shared = (pair[0].0 + pair[0].1) - pair[1].0;
            prop_assert!(shared >= overlap, "shared {} < overlap {}", shared, overlap);
        }
    });
}

/// Property: the grid is the product of the axes, emitted in row-major order
#[test]
fn proptest_row_major_order() {
    proptest!(|(w in 1u32..300, h in 1u32..300, (tile, overlap) in grid_params(256))| {
        let grid = TileGrid::new(tile, overlap).unwrap();
        let (cols, rows) = grid.dimensions(w, h);
        let windows: Vec<TileWindow> = grid.windows(w, h).collect();

        prop_assert_eq!(windows.len(), (cols * rows) as usize);
        prop_assert_eq!(grid.windows(w, h).len(), windows.len());

        let xs = axis_spans(&grid, w);
        let ys = axis_spans(&grid, h);
        for (i, win) in windows.iter().enumerate() {
            let i = i as u32;
            prop_assert_eq!((win.row, win.col), (i / cols, i % cols));
            prop_assert_eq!((win.x, win.width), xs[win.col as usize]);
            prop_assert_eq!((win.y, win.height), ys[win.row as usize]);
        }
    });
}

// ============================================================================
// Pixels
// ============================================================================

fn page_pixel(x: u32, y: u32) -> Rgb<u8> {
    Rgb([x as u8, y as u8, (x * 7 + y * 13) as u8])
}

/// Property: each tile holds the page pixels of its window, padded white
#[test]
fn proptest_tile_pixels_match_page() {
    proptest!(
        ProptestConfig::with_cases(64),
        |(w in 1u32..48, h in 1u32..48, (tile, overlap) in grid_params(24))| {
            let page = PageRaster::new(1, RgbImage::from_fn(w, h, page_pixel)).unwrap();
            let grid = TileGrid::new(tile, overlap).unwrap();

            for (win, t) in grid.windows(w, h).zip(grid.tiles(&page)) {
                prop_assert_eq!((t.row, t.col), (win.row, win.col));
                prop_assert_eq!(t.image.dimensions(), (tile, tile));
                for (i, j, px) in t.image.enumerate_pixels() {
                    let expected = if i < win.width && j < win.height {
                        page_pixel(win.x + i, win.y + j)
                    } else {
                        Rgb([255, 255, 255])
                    };
                    prop_assert_eq!(*px, expected, "tile r{} c{} at ({}, {})", t.row, t.col, i, j);
                }
            }
        }
    );
}
