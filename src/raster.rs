//! Drawing positioned glyphs onto an RGBA canvas.

use image::RgbaImage;
use imageproc::drawing::draw_text_mut;
use rusttype::{Font, Scale};

use crate::ascii::{CellColor, GlyphPlacement, RenderError};
use crate::fonts::{FontError, FontSpec};

/// Canvas background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Background {
    #[default]
    Black,
    White,
}

impl Background {
    /// Parse `black` / `white`. Case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "black" => Some(Background::Black),
            "white" => Some(Background::White),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Background::Black => "black",
            Background::White => "white",
        }
    }

    pub fn fill(&self) -> CellColor {
        match self {
            Background::Black => CellColor::BLACK,
            Background::White => CellColor::WHITE,
        }
    }

    /// Ink for glyphs without their own color.
    pub fn ink(&self) -> CellColor {
        match self {
            Background::Black => CellColor::WHITE,
            Background::White => CellColor::BLACK,
        }
    }
}

/// Turns positioned glyphs into a raster.
pub trait Rasterizer {
    fn rasterize(
        &self,
        width: u32,
        height: u32,
        background: CellColor,
        placements: &[GlyphPlacement],
    ) -> Result<RgbaImage, RenderError>;
}

/// Rasterizer backed by a TrueType font.
pub struct FontRasterizer {
    font: Font<'static>,
    scale: Scale,
}

impl std::fmt::Debug for FontRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontRasterizer")
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

impl FontRasterizer {
    pub fn new(font: Font<'static>, size: f32) -> Self {
        Self {
            font,
            scale: Scale::uniform(size),
        }
    }

    /// Load the font described by `spec`.
    pub fn from_spec(spec: &FontSpec) -> Result<Self, FontError> {
        let font = spec.load()?;
        log::info!("Loaded font {} at {:.1}px", spec.path.display(), spec.size);
        Ok(Self::new(font, spec.size))
    }
}

impl Rasterizer for FontRasterizer {
    fn rasterize(
        &self,
        width: u32,
        height: u32,
        background: CellColor,
        placements: &[GlyphPlacement],
    ) -> Result<RgbaImage, RenderError> {
        let mut canvas = RgbaImage::from_pixel(width, height, background.to_rgba());

        // draw_text_mut takes the top of the line box; placements give its center
        let metrics = self.font.v_metrics(self.scale);
        let half_line = f64::from(metrics.ascent - metrics.descent) / 2.0;

        let mut buf = [0u8; 4];
        for placement in placements {
            if placement.glyph.is_whitespace() {
                continue;
            }
            let text = placement.glyph.encode_utf8(&mut buf);
            draw_text_mut(
                &mut canvas,
                placement.color.to_rgba(),
                placement.x.round() as i32,
                (placement.y - half_line).round() as i32,
                self.scale,
                &self.font,
                text,
            );
        }

        Ok(canvas)
    }
}
