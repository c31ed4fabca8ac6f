//! Unit tests for the ASCII engine's building blocks.
//!
//! These tests verify:
//! - Photometric sampling (brightness, color, contrast, variance)
//! - Glyph ramps and brightness-to-glyph mapping
//! - Tile grid geometry

use ascii_generator::ascii::*;
use image::{Rgba, RgbaImage};

fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ==================== Sampling Tests ====================

#[test]
fn test_brightness_extremes() {
    assert!(approx(brightness(&solid(4, 4, [255, 255, 255]), 0, 0, 4, 4), 1.0));
    assert!(approx(brightness(&solid(4, 4, [0, 0, 0]), 0, 0, 4, 4), 0.0));
}

#[test]
fn test_brightness_pure_channels() {
    // Luma weights 0.299 / 0.587 / 0.114
    assert!(approx(brightness(&solid(2, 2, [255, 0, 0]), 0, 0, 2, 2), 0.299));
    assert!(approx(brightness(&solid(2, 2, [0, 255, 0]), 0, 0, 2, 2), 0.587));
    assert!(approx(brightness(&solid(2, 2, [0, 0, 255]), 0, 0, 2, 2), 0.114));
}

#[test]
fn test_brightness_clips_to_image() {
    let img = solid(10, 10, [255, 255, 255]);
    // Region hangs off the bottom-right corner
    assert!(approx(brightness(&img, 8, 8, 50, 50), 1.0));
    // Region entirely outside
    assert_eq!(brightness(&img, 20, 20, 5, 5), 0.0);
    // Zero-sized region
    assert_eq!(brightness(&img, 0, 0, 0, 5), 0.0);
}

#[test]
fn test_average_color_of_split_region() {
    let img = RgbaImage::from_fn(4, 2, |x, _| {
        if x < 2 {
            Rgba([200, 0, 0, 255])
        } else {
            Rgba([0, 0, 100, 255])
        }
    });
    assert_eq!(average_color(&img, 0, 0, 4, 2), CellColor::opaque(100, 0, 50));
    assert_eq!(average_color(&img, 50, 50, 4, 2), CellColor::BLACK);
}

#[test]
fn test_contrast_checkerboard() {
    let img = RgbaImage::from_fn(4, 4, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    });
    assert!(approx(contrast(&img, 0, 0, 4, 4), 1.0));
    assert_eq!(contrast(&solid(4, 4, [90, 90, 90]), 0, 0, 4, 4), 0.0);
}

#[test]
fn test_color_variance() {
    assert_eq!(color_variance(&solid(3, 3, [10, 20, 30]), 0, 0, 3, 3).unwrap(), 0.0);

    // Half black, half white: each channel has variance 0.25
    let img = RgbaImage::from_fn(2, 1, |x, _| {
        if x == 0 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });
    assert!(approx(color_variance(&img, 0, 0, 2, 1).unwrap(), 0.75));
}

#[test]
fn test_color_variance_empty_region() {
    let err = color_variance(&solid(3, 3, [0, 0, 0]), 5, 5, 2, 2).unwrap_err();
    assert!(matches!(err, RenderError::EmptyRegion { x: 5, y: 5, .. }));
}

#[test]
fn test_measure_agrees_with_individual_samplers() {
    let img = RgbaImage::from_fn(16, 16, |x, y| Rgba([(x * 16) as u8, (y * 16) as u8, 77, 255]));
    let stat = CellStatistic::measure(&img, 2, 3, 8, 6);
    assert!(approx(stat.brightness, brightness(&img, 2, 3, 8, 6)));
    assert_eq!(stat.average_color, average_color(&img, 2, 3, 8, 6));
    assert!(approx(stat.contrast, contrast(&img, 2, 3, 8, 6)));
    assert!(approx(stat.color_variance, color_variance(&img, 2, 3, 8, 6).unwrap()));
}

// ==================== Glyph Ramp Tests ====================

#[test]
fn test_simple_ramp_endpoints() {
    let ramp = GlyphRamp::resolve("simple").ramp;
    assert_eq!(ramp.len(), 10);
    assert_eq!(ramp.select(0.0), '@');
    assert_eq!(ramp.select(1.0), ' ');
}

#[test]
fn test_ramp_index_floor_and_clamp() {
    let ramp = GlyphRamp::resolve("simple").ramp;
    // floor(0.5 * 9) = 4
    assert_eq!(ramp.index_for(0.5), 4);
    assert_eq!(ramp.select(0.5), '+');
    assert_eq!(ramp.index_for(-0.3), 0);
    assert_eq!(ramp.index_for(1.7), 9);
    assert_eq!(ramp.index_for(f64::NAN), 0);
}

#[test]
fn test_ramp_is_monotone() {
    let ramp = GlyphRamp::default();
    let mut last = 0;
    for step in 0..=1000 {
        let index = ramp.index_for(step as f64 / 1000.0);
        assert!(index >= last);
        last = index;
    }
    assert_eq!(last, ramp.len() - 1);
}

#[test]
fn test_single_glyph_ramp() {
    let ramp = GlyphRamp::new("dot", ".").unwrap();
    assert_eq!(ramp.select(0.0), '.');
    assert_eq!(ramp.select(1.0), '.');
}

#[test]
fn test_empty_ramp_rejected() {
    assert!(matches!(
        GlyphRamp::new("empty", ""),
        Err(RenderError::Configuration(_))
    ));
}

#[test]
fn test_unknown_ramp_falls_back_to_complex() {
    let resolution = GlyphRamp::resolve("does-not-exist");
    assert!(resolution.is_fallback());
    assert_eq!(resolution.ramp.name(), "complex");
    assert_eq!(resolution.ramp.len(), COMPLEX_RAMP.chars().count());
    assert!(resolution.diagnostic().unwrap().contains("does-not-exist"));
}

#[test]
fn test_language_ramps_are_multibyte_safe() {
    let ramp = GlyphRamp::resolve("korean").ramp;
    assert_eq!(ramp.len(), KOREAN_RAMP.chars().count());
    assert_eq!(ramp.select(0.0), 'ㄱ');
    assert_eq!(ramp.select(1.0), 'ㅣ');
}

// ==================== Tile Grid Tests ====================

#[test]
fn test_grid_dimensions() {
    let grid = TileGrid::compute(100, 100, 10).unwrap();
    assert_eq!(grid.cell_width, 10.0);
    assert_eq!(grid.cell_height, 20.0);
    assert_eq!(grid.num_rows, 5);
    assert_eq!(grid.cell_count(), 50);
}

#[test]
fn test_grid_fractional_cells() {
    // 103 / 10 = 10.3 wide, 20.6 tall, floor(50 / 20.6) = 2 rows
    let grid = TileGrid::compute(103, 50, 10).unwrap();
    assert_eq!(grid.num_rows, 2);
    let cell = grid.cell(1, 9);
    assert_eq!(cell.x, 92);
    assert_eq!(cell.y, 20);
    // Last column runs to the right edge; row 1 ends at floor(41.2)
    assert_eq!(cell.width, 11);
    assert_eq!(cell.height, 21);
}

#[test]
fn test_last_pixel_column_is_sampled() {
    // Only x = 9 is white; 3 columns of 3.33 px must still see it
    let image = std::sync::Arc::new(RgbaImage::from_fn(10, 40, |x, _| {
        if x == 9 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    }));
    let pipeline = RenderPipeline::new(RenderOptions {
        columns: 3,
        ramp: GlyphRamp::resolve("simple").ramp,
        mode: RenderMode::Text,
        workers: 2,
    })
    .unwrap();
    let grid = pipeline.render(image).unwrap();
    // Last cell spans x in [6, 10): brightness 0.25, index floor(2.25) = 2
    assert!(grid.lines().iter().all(|l| l == "@@#"), "{:?}", grid.lines());
}

#[test]
fn test_grid_too_short_for_a_row() {
    let grid = TileGrid::compute(100, 10, 10).unwrap();
    assert!(grid.is_empty());
    assert_eq!(grid.cells().count(), 0);
}

#[test]
fn test_grid_zero_columns_rejected() {
    assert!(matches!(
        TileGrid::compute(100, 100, 0),
        Err(RenderError::Configuration(_))
    ));
}

#[test]
fn test_grid_cells_row_major() {
    let grid = TileGrid::compute(40, 40, 4).unwrap();
    let order: Vec<(u32, u32)> = grid.cells().map(|c| (c.row, c.column)).collect();
    assert_eq!(order[0], (0, 0));
    assert_eq!(order[1], (0, 1));
    assert_eq!(order[4], (1, 0));
    assert_eq!(order.len(), grid.cell_count());
}

#[test]
fn test_grid_anchor_is_vertical_center() {
    let grid = TileGrid::compute(100, 100, 10).unwrap();
    assert_eq!(grid.anchor(0, 0), (0.0, 10.0));
    assert_eq!(grid.anchor(2, 3), (30.0, 50.0));
}
