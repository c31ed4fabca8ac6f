//! Tile sampling and glyph mapping engine.
//!
//! Turns one decoded image into a grid of glyphs:
//!
//! 1. **Gridding** - split the image into cells twice as tall as wide ([`TileGrid`])
//! 2. **Sampling** - measure each cell on a bounded worker pool ([`WorkerPool`])
//! 3. **Assembly** - place results by their `(row, column)` tag
//! 4. **Mapping** - pick a glyph per cell from a brightness ramp ([`GlyphRamp`])
//!
//! # Character ramps
//!
//! Ramps are selected by name via [`GlyphRamp::resolve`]:
//! - `simple` - 10-level ramp
//! - `complex` - 70-level ramp (default, and the fallback for unknown names)
//! - `english`, `chinese`, `japanese`, `korean` - language character sets

mod charset;
mod error;
mod grid;
mod pipeline;
mod pool;
mod sampler;

pub use charset::{
    GlyphRamp, RampPreset, RampResolution, CHINESE_RAMP, COMPLEX_RAMP, DEFAULT_RAMP_NAME,
    ENGLISH_RAMP, JAPANESE_RAMP, KOREAN_RAMP, SIMPLE_RAMP,
};
pub use error::RenderError;
pub use grid::{Cell, TileGrid, DEFAULT_CHAR_ASPECT_RATIO};
pub use pipeline::{
    CancelFlag, GlyphCell, GlyphPlacement, PassState, RenderMode, RenderOptions, RenderPipeline,
    RenderedGrid,
};
pub use pool::{measure_cell, CellResult, Job, SampleFn, WorkerPool, QUEUE_DEPTH_PER_WORKER};
pub use sampler::{
    average_color, brightness, color_variance, contrast, luma, CellColor, CellStatistic, LUMA_B,
    LUMA_G, LUMA_R,
};
