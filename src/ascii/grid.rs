//! Row/column decomposition of an image into glyph cells.

use super::error::RenderError;

/// Glyph aspect ratio (height / width) of typical monospace fonts.
/// Cells are this many times taller than wide so the output is not
/// vertically stretched.
pub const DEFAULT_CHAR_ASPECT_RATIO: f64 = 2.0;

/// Cell geometry of one render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    pub image_width: u32,
    pub image_height: u32,
    pub num_columns: u32,
    pub num_rows: u32,
    /// Nominal cell width in pixels (real-valued)
    pub cell_width: f64,
    /// Nominal cell height in pixels (real-valued)
    pub cell_height: f64,
}

/// A cell's position in the grid and its nominal pixel bounds.
///
/// Bounds may extend past the image; the sampler clips them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub row: u32,
    pub column: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TileGrid {
    /// Compute the grid for an image and a target column count.
    ///
    /// - `cell_width = image_width / num_columns`
    /// - `cell_height = 2 * cell_width`
    /// - `num_rows = floor(image_height / cell_height)`
    ///
    /// A zero-sized image yields an empty grid rather than an error.
    ///
    /// # Errors
    /// [`RenderError::Configuration`] if `num_columns` is zero.
    pub fn compute(image_width: u32, image_height: u32, num_columns: u32) -> Result<Self, RenderError> {
        Self::compute_with_aspect(
            image_width,
            image_height,
            num_columns,
            DEFAULT_CHAR_ASPECT_RATIO,
        )
    }

    /// Compute the grid with a custom glyph aspect ratio.
    pub fn compute_with_aspect(
        image_width: u32,
        image_height: u32,
        num_columns: u32,
        char_aspect: f64,
    ) -> Result<Self, RenderError> {
        if num_columns == 0 {
            return Err(RenderError::Configuration(
                "column count must be at least 1".to_string(),
            ));
        }
        if !(char_aspect.is_finite() && char_aspect > 0.0) {
            return Err(RenderError::Configuration(format!(
                "character aspect ratio must be positive, got {}",
                char_aspect
            )));
        }

        let cell_width = image_width as f64 / num_columns as f64;
        let cell_height = char_aspect * cell_width;
        let num_rows = if image_width == 0 || image_height == 0 {
            0
        } else {
            (image_height as f64 / cell_height).floor() as u32
        };

        Ok(Self {
            image_width,
            image_height,
            num_columns,
            num_rows,
            cell_width,
            cell_height,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// Total number of cells, i.e. jobs per pass.
    pub fn cell_count(&self) -> usize {
        self.num_rows as usize * self.num_columns as usize
    }

    /// Pixel bounds of the cell at `(row, column)`.
    ///
    /// Edges are taken from the real-valued grid and truncated, so each
    /// cell ends where its neighbour starts and no pixel column or row in
    /// the covered area is skipped. The last column always ends at the
    /// image's right edge.
    pub fn cell(&self, row: u32, column: u32) -> Cell {
        let x = (column as f64 * self.cell_width) as u32;
        let y = (row as f64 * self.cell_height) as u32;
        let x_end = if column + 1 >= self.num_columns {
            self.image_width
        } else {
            (((column + 1) as f64 * self.cell_width) as u32).min(self.image_width)
        };
        let y_end = (((row + 1) as f64 * self.cell_height) as u32).min(self.image_height);

        Cell {
            row,
            column,
            x,
            y,
            width: x_end.saturating_sub(x),
            height: y_end.saturating_sub(y),
        }
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.num_rows).flat_map(move |row| (0..self.num_columns).map(move |col| self.cell(row, col)))
    }

    /// Anchor point for drawing the glyph of a cell: left edge, vertical center.
    pub fn anchor(&self, row: u32, column: u32) -> (f64, f64) {
        (
            column as f64 * self.cell_width,
            row as f64 * self.cell_height + self.cell_height / 2.0,
        )
    }
}
