//! Pixel-statistics primitives shared by the blank classifier.
//!
//! All functions work on flat row-major buffers (`RgbImage`, `GrayImage`) and
//! accumulate in integers, so results are exact and independent of the
//! iteration order.

use image::{GrayImage, RgbImage};

/// Mean and population standard deviation of a set of 8-bit samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub mean: f64,
    pub std_dev: f64,
}

/// Mean and population standard deviation of `samples`.
///
/// Returns `None` for an empty input.
pub fn moments<I>(samples: I) -> Option<Moments>
where
    I: IntoIterator<Item = u8>,
{
    let (mut n, mut sum, mut sum_sq) = (0u64, 0u64, 0u64);
    for s in samples {
        let s = u64::from(s);
        n += 1;
        sum += s;
        sum_sq += s * s;
    }
    if n == 0 {
        return None;
    }
    let n = n as f64;
    let mean = sum as f64 / n;
    let variance = (sum_sq as f64 / n - mean * mean).max(0.0);
    Some(Moments {
        mean,
        std_dev: variance.sqrt(),
    })
}

/// Moments of the `width × height` rectangle of `gray` whose top-left corner
/// is `(x, y)`. The rectangle is clipped to the image; `None` if it is empty.
pub fn region_moments(gray: &GrayImage, x: u32, y: u32, width: u32, height: u32) -> Option<Moments> {
    let x_end = x.saturating_add(width).min(gray.width());
    let y_end = y.saturating_add(height).min(gray.height());
    if x >= x_end || y >= y_end {
        return None;
    }
    let row_len = gray.width() as usize;
    let raw = gray.as_raw();
    moments((y..y_end).flat_map(|row| {
        let start = row as usize * row_len;
        raw[start + x as usize..start + x_end as usize].iter().copied()
    }))
}

/// Fraction of pixels whose three channels all exceed `cutoff`.
pub fn white_fraction(img: &RgbImage, cutoff: u8) -> f64 {
    let total = img.width() as u64 * img.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let white = img
        .pixels()
        .filter(|p| p.0.iter().all(|&c| c > cutoff))
        .count();
    white as f64 / total as f64
}

/// ITU-R 601-2 luma: `L = 0.299 R + 0.587 G + 0.114 B`, rounded.
///
/// Fixed-point with 16 fractional bits; the same transform most imaging
/// libraries use for "convert to greyscale".
pub fn luma(img: &RgbImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b] = img.get_pixel(x, y).0;
        let l = (u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000) >> 16;
        image::Luma([l as u8])
    })
}

/// Absolute first differences of a greyscale image along one axis.
///
/// [`Gradient::across_rows`] compares each pixel with the one below it
/// (`width × (height − 1)` values); [`Gradient::across_cols`] compares each
/// pixel with its right neighbour (`(width − 1) × height` values).
#[derive(Debug, Clone)]
pub struct Gradient {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Gradient {
    pub fn across_rows(gray: &GrayImage) -> Self {
        let (w, h) = gray.dimensions();
        let raw = gray.as_raw();
        let row_len = w as usize;
        let data = (1..h as usize)
            .flat_map(|y| {
                let above = &raw[(y - 1) * row_len..y * row_len];
                let below = &raw[y * row_len..(y + 1) * row_len];
                above.iter().zip(below).map(|(&a, &b)| a.abs_diff(b))
            })
            .collect();
        Self {
            width: w,
            height: h.saturating_sub(1),
            data,
        }
    }

    pub fn across_cols(gray: &GrayImage) -> Self {
        let (w, h) = gray.dimensions();
        let raw = gray.as_raw();
        let row_len = w as usize;
        let data = raw
            .chunks_exact(row_len.max(1))
            .take(h as usize)
            .flat_map(|row| row.windows(2).map(|pair| pair[0].abs_diff(pair[1])))
            .collect();
        Self {
            width: w.saturating_sub(1),
            height: h,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of gradient magnitudes strictly above `threshold`.
    pub fn count_above(&self, threshold: u8) -> u64 {
        self.data.iter().filter(|&&g| g > threshold).count() as u64
    }

    /// Significant-gradient counts split into `(border, center)`.
    ///
    /// The border is the band of `thickness` cells along each side of this
    /// map; the center is everything else. A band wider than the map covers
    /// the whole map.
    pub fn count_border_center(&self, thickness: u32, threshold: u8) -> (u64, u64) {
        let right = self.width.saturating_sub(thickness);
        let bottom = self.height.saturating_sub(thickness);
        let (mut border, mut center) = (0u64, 0u64);
        if self.width == 0 {
            return (0, 0);
        }
        for (i, &g) in self.data.iter().enumerate() {
            if g <= threshold {
                continue;
            }
            let x = (i % self.width as usize) as u32;
            let y = (i / self.width as usize) as u32;
            if x < thickness || y < thickness || x >= right || y >= bottom {
                border += 1;
            } else {
                center += 1;
            }
        }
        (border, center)
    }
}
