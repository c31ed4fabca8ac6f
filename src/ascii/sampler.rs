//! Photometric statistics over rectangular pixel regions.
//!
//! Every function takes a nominal region `(x, y, width, height)` and clips
//! it against the image bounds before reading pixels. A region that clips
//! down to nothing is a defined case for everything except
//! [`color_variance`].

use image::{Rgba, RgbaImage};

use super::error::RenderError;

/// ITU-R BT.601 luma weights.
pub const LUMA_R: f64 = 0.299;
pub const LUMA_G: f64 = 0.587;
pub const LUMA_B: f64 = 0.114;

/// Average RGBA color of a cell. Alpha is always opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl CellColor {
    pub const BLACK: CellColor = CellColor::opaque(0, 0, 0);
    pub const WHITE: CellColor = CellColor::opaque(255, 255, 255);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Luma of this color, normalized to [0, 1].
    pub fn luma(&self) -> f64 {
        luma(self.r, self.g, self.b)
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

impl Default for CellColor {
    fn default() -> Self {
        CellColor::BLACK
    }
}

/// Statistics measured over one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellStatistic {
    /// Mean per-pixel luma in [0, 1]
    pub brightness: f64,
    pub average_color: CellColor,
    /// Spread between the brightest and darkest pixel, in [0, 1]
    pub contrast: f64,
    /// Summed per-channel variance of normalized channel values
    pub color_variance: f64,
}

impl CellStatistic {
    /// Statistic reported for a region with no pixels.
    pub const EMPTY: CellStatistic = CellStatistic {
        brightness: 0.0,
        average_color: CellColor::BLACK,
        contrast: 0.0,
        color_variance: 0.0,
    };

    /// Measure every statistic of a region.
    ///
    /// Empty regions yield [`CellStatistic::EMPTY`]; variance is only
    /// computed when the region holds at least one pixel.
    pub fn measure(img: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> Self {
        let Some(region) = Region::clip(img, x, y, width, height) else {
            return CellStatistic::EMPTY;
        };

        let mut sum_luma = 0.0;
        let mut min_luma = f64::MAX;
        let mut max_luma = f64::MIN;
        let mut sums = [0u64; 3];

        for px in region.pixels(img) {
            let l = luma(px[0], px[1], px[2]);
            sum_luma += l;
            min_luma = min_luma.min(l);
            max_luma = max_luma.max(l);
            sums[0] += px[0] as u64;
            sums[1] += px[1] as u64;
            sums[2] += px[2] as u64;
        }

        let count = region.pixel_count();
        Self {
            brightness: sum_luma / count as f64,
            average_color: mean_color(sums, count),
            contrast: max_luma - min_luma,
            color_variance: region.variance(img),
        }
    }
}

/// Luma of an 8-bit RGB triple, normalized to [0, 1].
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> f64 {
    (LUMA_R * r as f64 + LUMA_G * g as f64 + LUMA_B * b as f64) / 255.0
}

/// Average luma over the clipped region, `0.0` when it has no pixels.
pub fn brightness(img: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> f64 {
    let Some(region) = Region::clip(img, x, y, width, height) else {
        return 0.0;
    };

    let sum: f64 = region.pixels(img).map(|px| luma(px[0], px[1], px[2])).sum();
    sum / region.pixel_count() as f64
}

/// Per-channel mean color over the clipped region.
///
/// Returns opaque black when the region has no pixels.
pub fn average_color(img: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> CellColor {
    let Some(region) = Region::clip(img, x, y, width, height) else {
        return CellColor::BLACK;
    };

    let mut sums = [0u64; 3];
    for px in region.pixels(img) {
        sums[0] += px[0] as u64;
        sums[1] += px[1] as u64;
        sums[2] += px[2] as u64;
    }
    mean_color(sums, region.pixel_count())
}

/// Difference between the brightest and darkest pixel luma in the region.
pub fn contrast(img: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> f64 {
    let Some(region) = Region::clip(img, x, y, width, height) else {
        return 0.0;
    };

    let (min, max) = region
        .pixels(img)
        .map(|px| luma(px[0], px[1], px[2]))
        .fold((f64::MAX, f64::MIN), |(lo, hi), l| (lo.min(l), hi.max(l)));
    max - min
}

/// Mean squared deviation of each channel from its regional mean, summed
/// over R, G and B. Channels are normalized to [0, 1].
///
/// # Errors
/// [`RenderError::EmptyRegion`] if the clipped region contains no pixels.
pub fn color_variance(
    img: &RgbaImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Result<f64, RenderError> {
    Region::clip(img, x, y, width, height)
        .map(|region| region.variance(img))
        .ok_or(RenderError::EmptyRegion {
            x,
            y,
            width,
            height,
        })
}

fn mean_color(sums: [u64; 3], count: u64) -> CellColor {
    CellColor::opaque(
        (sums[0] / count) as u8,
        (sums[1] / count) as u8,
        (sums[2] / count) as u8,
    )
}

/// A region already clipped to the image, guaranteed non-empty.
#[derive(Debug, Clone, Copy)]
struct Region {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl Region {
    fn clip(img: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> Option<Self> {
        let x1 = x.saturating_add(width).min(img.width());
        let y1 = y.saturating_add(height).min(img.height());
        if x >= x1 || y >= y1 {
            return None;
        }
        Some(Self { x0: x, y0: y, x1, y1 })
    }

    fn pixel_count(&self) -> u64 {
        (self.x1 - self.x0) as u64 * (self.y1 - self.y0) as u64
    }

    fn pixels<'a>(&self, img: &'a RgbaImage) -> impl Iterator<Item = &'a Rgba<u8>> + 'a {
        let Region { x0, y0, x1, y1 } = *self;
        (y0..y1).flat_map(move |py| (x0..x1).map(move |px| img.get_pixel(px, py)))
    }

    fn variance(&self, img: &RgbaImage) -> f64 {
        let count = self.pixel_count() as f64;
        let mut means = [0.0f64; 3];
        for px in self.pixels(img) {
            for (mean, &c) in means.iter_mut().zip(px.0.iter()) {
                *mean += c as f64 / 255.0;
            }
        }
        for mean in &mut means {
            *mean /= count;
        }

        let mut variance = 0.0;
        for px in self.pixels(img) {
            for (mean, &c) in means.iter().zip(px.0.iter()) {
                let d = c as f64 / 255.0 - mean;
                variance += d * d;
            }
        }
        variance / count
    }
}
