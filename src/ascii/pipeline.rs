//! One render pass: grid → concurrent sampling → assembly → glyphs.
//!
//! ```text
//! Decoded ──► Gridded ──► Sampling ──► Assembling ──► Rendered
//! ```
//!
//! Sampling submits every cell of the grid to a fresh [`WorkerPool`] from a
//! dedicated submitter thread while the calling thread drains results into
//! a grid pre-sized to `rows × columns`. Results are placed by their
//! `(row, column)` tag, so output is identical no matter which worker
//! finishes first.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use image::RgbaImage;

use super::charset::GlyphRamp;
use super::error::RenderError;
use super::grid::TileGrid;
use super::pool::{measure_cell, CellResult, Job, SampleFn, WorkerPool};
use super::sampler::{CellColor, CellStatistic};

/// Whether glyphs carry their cell's average color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Brightness is the mean per-pixel luma; glyphs only
    #[default]
    Text,
    /// Brightness is the luma of the average color; glyphs paired with that color
    Color,
}

/// States a render pass moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Decoded,
    Gridded,
    Sampling,
    Assembling,
    Rendered,
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PassState::Decoded => "decoded",
            PassState::Gridded => "gridded",
            PassState::Sampling => "sampling",
            PassState::Assembling => "assembling",
            PassState::Rendered => "rendered",
        };
        f.write_str(name)
    }
}

/// Shared flag for aborting in-progress passes (e.g. from a Ctrl-C handler).
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-pass settings.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub columns: u32,
    pub ramp: GlyphRamp,
    pub mode: RenderMode,
    pub workers: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            columns: 100,
            ramp: GlyphRamp::default(),
            mode: RenderMode::Text,
            workers: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

/// A glyph and, in color mode, the color to draw it with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphCell {
    pub glyph: char,
    pub color: Option<CellColor>,
}

/// A glyph positioned for rasterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphPlacement {
    /// Left edge of the cell in pixels
    pub x: f64,
    /// Vertical center of the cell in pixels
    pub y: f64,
    pub glyph: char,
    pub color: CellColor,
}

/// Output of one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedGrid {
    pub geometry: TileGrid,
    pub mode: RenderMode,
    pub rows: Vec<Vec<GlyphCell>>,
}

impl RenderedGrid {
    fn empty(geometry: TileGrid, mode: RenderMode) -> Self {
        Self {
            geometry,
            mode,
            rows: Vec::new(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Each row's glyphs as a string, without terminators.
    pub fn lines(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.glyph).collect())
            .collect()
    }

    /// The grid as text, every row terminated by `\n`.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.rows.len() * (self.num_columns() + 1));
        for row in &self.rows {
            out.extend(row.iter().map(|cell| cell.glyph));
            out.push('\n');
        }
        out
    }

    /// Positioned glyphs for a rasterizer.
    ///
    /// Cells without a color (text mode) are drawn with `ink`.
    pub fn placements(&self, ink: CellColor) -> Vec<GlyphPlacement> {
        let mut placements = Vec::with_capacity(self.geometry.cell_count());
        for (row, cells) in self.rows.iter().enumerate() {
            for (column, cell) in cells.iter().enumerate() {
                let (x, y) = self.geometry.anchor(row as u32, column as u32);
                placements.push(GlyphPlacement {
                    x,
                    y,
                    glyph: cell.glyph,
                    color: cell.color.unwrap_or(ink),
                });
            }
        }
        placements
    }
}

/// Turns decoded images into glyph grids.
#[derive(Clone)]
pub struct RenderPipeline {
    options: RenderOptions,
    cancel: CancelFlag,
    sampler: SampleFn,
}

impl fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("options", &self.options)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl RenderPipeline {
    /// Create a pipeline, rejecting invalid options before any work starts.
    pub fn new(options: RenderOptions) -> Result<Self, RenderError> {
        if options.columns == 0 {
            return Err(RenderError::Configuration(
                "column count must be at least 1".to_string(),
            ));
        }
        if options.workers == 0 {
            return Err(RenderError::Configuration(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            options,
            cancel: CancelFlag::new(),
            sampler: Arc::new(measure_cell),
        })
    }

    /// Observe `cancel` between job submissions.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace the per-cell sampler run by workers.
    pub fn with_sampler(mut self, sampler: SampleFn) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Run one full pass over `image`.
    pub fn render(&self, image: Arc<RgbaImage>) -> Result<RenderedGrid, RenderError> {
        let mut state = PassState::Decoded;
        if self.cancel.is_cancelled() {
            return Err(RenderError::Aborted);
        }

        let grid = TileGrid::compute(image.width(), image.height(), self.options.columns)?;
        advance(&mut state, PassState::Gridded);
        log::debug!(
            "Grid for {}x{}: {} rows x {} columns, cell {:.2}x{:.2}",
            grid.image_width,
            grid.image_height,
            grid.num_rows,
            grid.num_columns,
            grid.cell_width,
            grid.cell_height
        );

        if grid.is_empty() {
            advance(&mut state, PassState::Rendered);
            return Ok(RenderedGrid::empty(grid, self.options.mode));
        }

        advance(&mut state, PassState::Sampling);
        let assembly = self.sample(&grid, image)?;

        advance(&mut state, PassState::Assembling);
        let stats = assembly.finish()?;

        let grid_out = self.map_glyphs(grid, &stats);
        advance(&mut state, PassState::Rendered);
        Ok(grid_out)
    }

    fn sample(&self, grid: &TileGrid, image: Arc<RgbaImage>) -> Result<GridAssembly, RenderError> {
        // More workers than cells would only idle.
        let workers = self.options.workers.min(grid.cell_count()).max(1);
        let mut pool = WorkerPool::with_sampler(workers, Arc::clone(&self.sampler))?;
        pool.start()?;
        let results = pool.results();
        let cancel = self.cancel.clone();

        let (submitted, assembly) = thread::scope(|scope| {
            let submitter = scope.spawn(move || -> Result<Submission, RenderError> {
                let mut count = 0;
                for cell in grid.cells() {
                    if cancel.is_cancelled() {
                        pool.stop();
                        return Ok(Submission::Cancelled { submitted: count });
                    }
                    pool.submit(Job::new(Arc::clone(&image), cell))?;
                    count += 1;
                }
                pool.stop();
                Ok(Submission::Complete { submitted: count })
            });

            let mut assembly = GridAssembly::new(grid.num_rows, grid.num_columns);
            for result in results.iter() {
                assembly.insert(result);
            }

            match submitter.join() {
                Ok(submitted) => (submitted, assembly),
                Err(payload) => std::panic::resume_unwind(payload),
            }
        });

        match submitted? {
            Submission::Complete { submitted } => {
                log::debug!("Submitted {} jobs to {} workers", submitted, workers);
                Ok(assembly)
            }
            Submission::Cancelled { submitted } => {
                log::info!(
                    "Pass cancelled after {} of {} jobs",
                    submitted,
                    grid.cell_count()
                );
                Err(RenderError::Aborted)
            }
        }
    }

    fn map_glyphs(&self, grid: TileGrid, stats: &[CellStatistic]) -> RenderedGrid {
        let ramp = &self.options.ramp;
        let mode = self.options.mode;
        let rows = stats
            .chunks(grid.num_columns as usize)
            .map(|row| {
                row.iter()
                    .map(|stat| match mode {
                        RenderMode::Text => GlyphCell {
                            glyph: ramp.select(stat.brightness),
                            color: None,
                        },
                        RenderMode::Color => GlyphCell {
                            glyph: ramp.select(stat.average_color.luma()),
                            color: Some(stat.average_color),
                        },
                    })
                    .collect()
            })
            .collect();

        RenderedGrid {
            geometry: grid,
            mode,
            rows,
        }
    }
}

fn advance(state: &mut PassState, next: PassState) {
    log::debug!("Render pass {} -> {}", state, next);
    *state = next;
}

enum Submission {
    Complete { submitted: usize },
    Cancelled { submitted: usize },
}

/// Results keyed by grid position, sized up front.
struct GridAssembly {
    columns: u32,
    cells: Vec<Option<CellStatistic>>,
    received: usize,
    fault: Option<(u32, u32, String)>,
}

impl GridAssembly {
    fn new(rows: u32, columns: u32) -> Self {
        Self {
            columns,
            cells: vec![None; rows as usize * columns as usize],
            received: 0,
            fault: None,
        }
    }

    fn insert(&mut self, result: CellResult) {
        let index = result.row as usize * self.columns as usize + result.column as usize;
        if result.column >= self.columns || index >= self.cells.len() {
            log::warn!(
                "Discarding result for cell outside grid (row {}, column {})",
                result.row,
                result.column
            );
            return;
        }

        match result.outcome {
            Ok(stat) => {
                if self.cells[index].replace(stat).is_some() {
                    log::warn!(
                        "Duplicate result for cell (row {}, column {})",
                        result.row,
                        result.column
                    );
                    return;
                }
            }
            Err(detail) => {
                // Keep the first failing cell in grid order so errors are stable.
                let earlier = self
                    .fault
                    .as_ref()
                    .is_some_and(|(r, c, _)| (*r, *c) <= (result.row, result.column));
                if !earlier {
                    self.fault = Some((result.row, result.column, detail));
                }
            }
        }
        self.received += 1;
    }

    fn finish(self) -> Result<Vec<CellStatistic>, RenderError> {
        if let Some((row, column, detail)) = self.fault {
            return Err(RenderError::WorkerFault {
                row,
                column,
                detail,
            });
        }

        let expected = self.cells.len();
        if self.received < expected {
            return Err(RenderError::IncompleteAssembly {
                expected,
                received: self.received,
            });
        }

        self.cells
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or(RenderError::IncompleteAssembly {
                expected,
                received: self.received,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ascii::charset::RampPreset;
    use image::Rgba;

    fn options(columns: u32, mode: RenderMode, workers: usize) -> RenderOptions {
        RenderOptions {
            columns,
            ramp: RampPreset::Simple.ramp(),
            mode,
            workers,
        }
    }

    fn stat(brightness: f64) -> CellStatistic {
        CellStatistic {
            brightness,
            ..CellStatistic::EMPTY
        }
    }

    #[test]
    fn test_assembly_orders_by_position() {
        let mut assembly = GridAssembly::new(2, 2);
        for (row, column, b) in [(1, 1, 0.4), (0, 0, 0.1), (1, 0, 0.3), (0, 1, 0.2)] {
            assembly.insert(CellResult {
                row,
                column,
                outcome: Ok(stat(b)),
            });
        }
        let stats = assembly.finish().unwrap();
        let brightness: Vec<f64> = stats.iter().map(|s| s.brightness).collect();
        assert_eq!(brightness, vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_assembly_detects_missing_results() {
        let mut assembly = GridAssembly::new(1, 3);
        assembly.insert(CellResult {
            row: 0,
            column: 0,
            outcome: Ok(stat(0.0)),
        });
        assert!(matches!(
            assembly.finish(),
            Err(RenderError::IncompleteAssembly {
                expected: 3,
                received: 1
            })
        ));
    }

    #[test]
    fn test_assembly_ignores_duplicates() {
        let mut assembly = GridAssembly::new(1, 2);
        for _ in 0..2 {
            assembly.insert(CellResult {
                row: 0,
                column: 0,
                outcome: Ok(stat(0.0)),
            });
        }
        assert!(matches!(
            assembly.finish(),
            Err(RenderError::IncompleteAssembly { received: 1, .. })
        ));
    }

    #[test]
    fn test_assembly_reports_first_fault_in_grid_order() {
        let mut assembly = GridAssembly::new(2, 2);
        for (row, column) in [(1, 1), (0, 1)] {
            assembly.insert(CellResult {
                row,
                column,
                outcome: Err(format!("fault {}{}", row, column)),
            });
        }
        match assembly.finish() {
            Err(RenderError::WorkerFault { row, column, detail }) => {
                assert_eq!((row, column), (0, 1));
                assert_eq!(detail, "fault 01");
            }
            other => panic!("expected worker fault, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_options_fail_fast() {
        assert!(RenderPipeline::new(options(0, RenderMode::Text, 2)).is_err());
        assert!(RenderPipeline::new(options(10, RenderMode::Text, 0)).is_err());
    }

    #[test]
    fn test_color_mode_pairs_glyph_with_average_color() {
        let image = Arc::new(RgbaImage::from_pixel(40, 40, Rgba([0, 255, 0, 255])));
        let pipeline = RenderPipeline::new(options(4, RenderMode::Color, 2)).unwrap();
        let grid = pipeline.render(image).unwrap();

        assert_eq!(grid.num_rows(), 2);
        assert_eq!(grid.num_columns(), 4);
        for cell in grid.rows.iter().flatten() {
            // 0.587 * 9 = 5.28 -> index 5
            assert_eq!(cell.glyph, '=');
            assert_eq!(cell.color, Some(CellColor::opaque(0, 255, 0)));
        }
    }

    #[test]
    fn test_text_and_color_mode_agree_on_uniform_cells() {
        let image = Arc::new(RgbaImage::from_pixel(60, 60, Rgba([120, 30, 200, 255])));
        let text = RenderPipeline::new(options(6, RenderMode::Text, 3))
            .unwrap()
            .render(Arc::clone(&image))
            .unwrap();
        let color = RenderPipeline::new(options(6, RenderMode::Color, 3))
            .unwrap()
            .render(image)
            .unwrap();
        assert_eq!(text.lines(), color.lines());
    }

    #[test]
    fn test_pre_cancelled_pass_aborts() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let pipeline = RenderPipeline::new(options(10, RenderMode::Text, 2))
            .unwrap()
            .with_cancel_flag(cancel);
        let image = Arc::new(RgbaImage::new(100, 100));
        assert!(matches!(pipeline.render(image), Err(RenderError::Aborted)));
    }

    #[test]
    fn test_placements_use_ink_for_text_cells() {
        let image = Arc::new(RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255])));
        let grid = RenderPipeline::new(options(2, RenderMode::Text, 1))
            .unwrap()
            .render(image)
            .unwrap();
        let placements = grid.placements(CellColor::BLACK);
        assert_eq!(placements.len(), 2);
        assert_eq!((placements[1].x, placements[1].y), (10.0, 10.0));
        assert!(placements.iter().all(|p| p.color == CellColor::BLACK && p.glyph == ' '));
    }
}
