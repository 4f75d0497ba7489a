//! Blank-tile detection.
//!
//! A tile is dropped when it carries nothing a detector could learn from.
//! Four tests run in order of cost and stop at the first positive:
//!
//! 1. **Mostly white**: the fraction of pixels with every channel above 240
//!    exceeds the configured threshold.
//! 2. **Uniform**: the standard deviation of all channel samples is below 5
//!    (a flat fill of any colour).
//! 3. **Few edges**: fewer than 0.1 % significant luminance gradients
//!    (absolute neighbour difference above 30) per pixel.
//! 4. **Border frame**: the only structure is a rectangular ruling around an
//!    empty interior, common on scanned forms.
//!
//! None of the tests subsumes another: a framed empty box passes 1–3 and is
//! caught only by 4.

use crate::error::Pdf2TilesError;
use crate::pipeline::stats::{self, Gradient};
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

/// Channel value a pixel must exceed on all channels to count as white.
pub const WHITE_CUTOFF: u8 = 240;
/// Global standard deviation below which a tile is a flat fill.
pub const MIN_STD_DEV: f64 = 5.0;
/// Gradient magnitude a neighbour difference must exceed to be an edge.
pub const EDGE_MAGNITUDE: u8 = 30;
/// Edges per pixel below which a tile is blank.
pub const MIN_EDGE_DENSITY: f64 = 0.001;
/// Share of edges inside the border band that marks a frame.
pub const BORDER_EDGE_RATIO: f64 = 0.8;
/// Maximum center edges, as a fraction of the tile area, for a frame.
pub const MAX_CENTER_EDGE_FRACTION: f64 = 0.002;
/// Minimum mean strip standard deviation for a drawn border.
pub const MIN_BORDER_STRIP_STD: f64 = 15.0;
/// Maximum interior standard deviation for an empty frame.
pub const MAX_CENTER_STD: f64 = 8.0;
/// Minimum interior mean luminance for an empty frame.
pub const MIN_CENTER_MEAN: f64 = 240.0;
/// Smallest border band, in pixels.
pub const MIN_BORDER_THICKNESS: u32 = 10;

/// Why a tile was kept or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlankVerdict {
    /// The tile has content worth keeping.
    Content,
    /// Near-white fraction above the threshold.
    MostlyWhite,
    /// Near-constant colour.
    Uniform,
    /// Too few luminance edges.
    FewEdges,
    /// Only a rectangular border around an empty interior.
    BorderFrame,
}

impl BlankVerdict {
    pub fn is_blank(self) -> bool {
        self != BlankVerdict::Content
    }
}

/// Stateless blank-tile classifier bound to a near-white threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlankClassifier {
    threshold: f64,
}

impl Default for BlankClassifier {
    fn default() -> Self {
        Self {
            threshold: crate::config::DEFAULT_BLANK_THRESHOLD,
        }
    }
}

impl BlankClassifier {
    /// Create a classifier; `threshold` must lie in `[0, 1]`.
    pub fn new(threshold: f64) -> Result<Self, Pdf2TilesError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Pdf2TilesError::InvalidConfig(format!(
                "Blank threshold must be within 0.0–1.0, got {threshold}"
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Run the four tests on `tile` and report the first that fires.
    pub fn classify(&self, tile: &RgbImage) -> BlankVerdict {
        classify(tile, self.threshold)
    }

    pub fn is_blank(&self, tile: &RgbImage) -> bool {
        self.classify(tile).is_blank()
    }
}

/// `true` if `tile` carries no useful content at the given near-white `threshold`.
pub fn is_blank(tile: &RgbImage, threshold: f64) -> bool {
    classify(tile, threshold).is_blank()
}

/// Run the four blank tests on `tile`, cheapest first.
pub fn classify(tile: &RgbImage, threshold: f64) -> BlankVerdict {
    debug_assert!(
        tile.width() > 0 && tile.height() > 0,
        "tiler never emits empty tiles"
    );

    if stats::white_fraction(tile, WHITE_CUTOFF) > threshold {
        return BlankVerdict::MostlyWhite;
    }

    let global = stats::moments(tile.as_raw().iter().copied());
    if global.is_none_or(|m| m.std_dev < MIN_STD_DEV) {
        return BlankVerdict::Uniform;
    }

    let gray = stats::luma(tile);
    let across_rows = Gradient::across_rows(&gray);
    let across_cols = Gradient::across_cols(&gray);

    let area = f64::from(tile.width()) * f64::from(tile.height());
    let edges = across_rows.count_above(EDGE_MAGNITUDE) + across_cols.count_above(EDGE_MAGNITUDE);
    if (edges as f64) / area < MIN_EDGE_DENSITY {
        return BlankVerdict::FewEdges;
    }

    if is_border_frame(&gray, &across_rows, &across_cols) {
        return BlankVerdict::BorderFrame;
    }

    BlankVerdict::Content
}

/// Width of the band treated as "border": 10 % of the short side, at least 10 px.
pub fn border_thickness(width: u32, height: u32) -> u32 {
    let short = f64::from(width.min(height));
    ((short * 0.1).round() as u32).max(MIN_BORDER_THICKNESS)
}

/// A tile whose structure is confined to a perimeter band.
///
/// Two independent checks; either one is enough:
/// * almost all edges lie in the band and the interior is nearly edge-free;
/// * the band strips vary while the interior is flat and white.
fn is_border_frame(gray: &GrayImage, across_rows: &Gradient, across_cols: &Gradient) -> bool {
    let (width, height) = gray.dimensions();
    let thickness = border_thickness(width, height);

    let (rows_border, rows_center) = across_rows.count_border_center(thickness, EDGE_MAGNITUDE);
    let (cols_border, cols_center) = across_cols.count_border_center(thickness, EDGE_MAGNITUDE);
    let border = rows_border + cols_border;
    let center = rows_center + cols_center;
    let total = border + center;

    if total > 0 {
        let ratio = border as f64 / total as f64;
        let area = f64::from(width) * f64::from(height);
        if ratio > BORDER_EDGE_RATIO && (center as f64) < area * MAX_CENTER_EDGE_FRACTION {
            return true;
        }
    }

    has_rectangular_border(gray, thickness)
}

/// Strip statistics: a varied perimeter around a flat, white interior.
fn has_rectangular_border(gray: &GrayImage, thickness: u32) -> bool {
    let (width, height) = gray.dimensions();
    if thickness.saturating_mul(2) >= width || thickness.saturating_mul(2) >= height {
        return false;
    }

    let band_h = thickness.min(height);
    let band_w = thickness.min(width);
    let strips = [
        stats::region_moments(gray, 0, 0, width, band_h),
        stats::region_moments(gray, 0, height - band_h, width, band_h),
        stats::region_moments(gray, 0, 0, band_w, height),
        stats::region_moments(gray, width - band_w, 0, band_w, height),
    ];
    let border_std = strips.iter().flatten().map(|m| m.std_dev).sum::<f64>() / strips.len() as f64;

    let Some(center) = stats::region_moments(
        gray,
        thickness,
        thickness,
        width - 2 * thickness,
        height - 2 * thickness,
    ) else {
        return false;
    };

    border_std > MIN_BORDER_STRIP_STD && center.std_dev < MAX_CENTER_STD && center.mean > MIN_CENTER_MEAN
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    /// Deterministic xorshift noise.
    fn noise(size: u32, seed: u64) -> RgbImage {
        let mut state = seed;
        RgbImage::from_fn(size, size, |_, _| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let b = state.to_le_bytes();
            Rgb([b[0], b[1], b[2]])
        })
    }

    /// White tile with a black rectangular ruling `line` px wide, `inset` px from each side.
    fn framed(size: u32, inset: u32, line: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            let outer = x >= inset && y >= inset && x < size - inset && y < size - inset;
            let inner = x >= inset + line
                && y >= inset + line
                && x < size - inset - line
                && y < size - inset - line;
            if outer && !inner {
                BLACK
            } else {
                WHITE
            }
        })
    }

    #[test]
    fn border_thickness_formula() {
        assert_eq!(border_thickness(1024, 1024), 102);
        assert_eq!(border_thickness(1024, 515), 52);
        assert_eq!(border_thickness(1024, 525), 53); // 52.5 rounds up
        assert_eq!(border_thickness(50, 50), 10);
    }

    #[test]
    fn white_tile_is_mostly_white() {
        let tile = RgbImage::from_pixel(256, 256, WHITE);
        assert_eq!(classify(&tile, 0.98), BlankVerdict::MostlyWhite);
        assert!(is_blank(&tile, 0.98));
    }

    #[test]
    fn flat_grey_is_uniform() {
        let tile = RgbImage::from_pixel(128, 128, Rgb([120, 120, 120]));
        assert_eq!(classify(&tile, 0.98), BlankVerdict::Uniform);
    }

    #[test]
    fn threshold_one_disables_white_test_only() {
        let tile = RgbImage::from_pixel(64, 64, WHITE);
        // Fraction 1.0 is not > 1.0, but the variance test still fires.
        assert_eq!(classify(&tile, 1.0), BlankVerdict::Uniform);
    }

    #[test]
    fn soft_gradient_has_few_edges() {
        // Smooth ramp: plenty of variance, no neighbour jump above 30.
        let tile = RgbImage::from_fn(200, 200, |x, _| {
            let v = (x + 20) as u8;
            Rgb([v, v, v])
        });
        assert_eq!(classify(&tile, 0.98), BlankVerdict::FewEdges);
    }

    #[test]
    fn thick_frame_is_border_frame() {
        let tile = framed(256, 10, 12);
        let white = stats::white_fraction(&tile, WHITE_CUTOFF);
        assert!(white < 0.98, "white fraction {white}");
        assert_eq!(classify(&tile, 0.98), BlankVerdict::BorderFrame);
    }

    #[test]
    fn noise_is_content() {
        let tile = noise(256, 0x9E37_79B9_7F4A_7C15);
        assert_eq!(classify(&tile, 0.98), BlankVerdict::Content);
        assert!(!BlankClassifier::default().is_blank(&tile));
    }

    #[test]
    fn text_block_in_center_is_content() {
        // Black horizontal bars (text lines) in the middle of a white tile.
        let tile = RgbImage::from_fn(256, 256, |x, y| {
            if (64..192).contains(&x) && (64..192).contains(&y) && (y / 6) % 2 == 0 {
                BLACK
            } else {
                WHITE
            }
        });
        assert!(stats::white_fraction(&tile, WHITE_CUTOFF) < 0.98);
        assert_eq!(classify(&tile, 0.98), BlankVerdict::Content);
    }

    #[test]
    fn frame_with_content_inside_is_kept() {
        let mut tile = framed(256, 10, 12);
        for y in 100..156 {
            for x in 60..196 {
                if (x / 4 + y / 4) % 2 == 0 {
                    tile.put_pixel(x, y, BLACK);
                }
            }
        }
        assert_eq!(classify(&tile, 0.98), BlankVerdict::Content);
    }

    #[test]
    fn strip_check_skipped_when_interior_empty() {
        let gray = GrayImage::new(20, 20);
        assert!(!has_rectangular_border(&gray, 10));
    }

    #[test]
    fn strip_check_on_thin_ruling() {
        // 1 px ruling inside the band, white interior.
        let gray = GrayImage::from_fn(100, 100, |x, y| {
            let on_line = x == 3 || y == 3 || x == 96 || y == 96;
            image::Luma([if on_line { 0 } else { 255 }])
        });
        assert!(has_rectangular_border(&gray, 10));
    }

    #[test]
    fn classifier_rejects_bad_threshold() {
        assert!(BlankClassifier::new(1.5).is_err());
        assert!(BlankClassifier::new(-0.1).is_err());
        assert_eq!(BlankClassifier::new(0.5).unwrap().threshold(), 0.5);
    }

    #[test]
    fn verdict_blankness() {
        assert!(!BlankVerdict::Content.is_blank());
        for v in [
            BlankVerdict::MostlyWhite,
            BlankVerdict::Uniform,
            BlankVerdict::FewEdges,
            BlankVerdict::BorderFrame,
        ] {
            assert!(v.is_blank());
        }
    }
}
