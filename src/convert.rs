//! Decoding inputs, writing outputs, and the four conversion modes.
//!
//! Each mode drives one [`RenderPipeline`] pass per image or video frame.
//! Frames are converted one at a time, in playback order.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::ascii::{CancelFlag, RenderError, RenderPipeline, RenderedGrid};
use crate::config::{Mode, Settings};
use crate::raster::{Background, FontRasterizer, Rasterizer};
use crate::video::{FrameSource, FrameWriter};

/// Resolve `path` against the working directory if it is relative.
pub fn resolve_path(path: &Path) -> Result<PathBuf, RenderError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|source| RenderError::Sink {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(cwd.join(path))
}

/// Decode an image file into RGBA pixels.
pub fn decode_image(path: &Path) -> Result<RgbaImage, RenderError> {
    let image = image::open(path).map_err(|source| RenderError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!(
        "Decoded {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image.to_rgba8())
}

/// Create the parent directory of `path` if it is missing.
pub fn ensure_parent(path: &Path) -> Result<(), RenderError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|source| RenderError::Sink {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

fn create_output(path: &Path) -> Result<BufWriter<File>, RenderError> {
    ensure_parent(path)?;
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| RenderError::Sink {
            path: path.to_path_buf(),
            source,
        })
}

/// Write text to `path`, replacing any existing file.
pub fn write_text(path: &Path, text: &str) -> Result<(), RenderError> {
    let mut out = create_output(path)?;
    out.write_all(text.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|source| RenderError::Sink {
            path: path.to_path_buf(),
            source,
        })
}

/// Output format for an image path: `.jpg`, `.jpeg` or `.png`.
pub fn output_format(path: &Path) -> Result<ImageFormat, RenderError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => Ok(ImageFormat::Jpeg),
        Some("png") => Ok(ImageFormat::Png),
        other => Err(RenderError::Sink {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "unsupported output format {:?}, use .jpg, .jpeg or .png",
                    other.unwrap_or("")
                ),
            ),
        }),
    }
}

/// Encode `image` by the extension of `path`.
pub fn save_image(path: &Path, image: &RgbaImage) -> Result<(), RenderError> {
    let format = output_format(path)?;
    ensure_parent(path)?;

    let result = match format {
        // JPEG has no alpha channel
        ImageFormat::Jpeg => DynamicImage::ImageRgba8(image.clone())
            .to_rgb8()
            .save_with_format(path, format),
        _ => image.save_with_format(path, format),
    };
    result.map_err(|source| RenderError::Encode {
        path: path.to_path_buf(),
        source,
    })
}

/// Draw a rendered grid onto a canvas of the source size.
///
/// Color-mode cells keep their sampled color; text-mode cells take the ink
/// that contrasts with `background`.
pub fn draw_grid(
    grid: &RenderedGrid,
    rasterizer: &dyn Rasterizer,
    background: Background,
) -> Result<RgbaImage, RenderError> {
    let placements = grid.placements(background.ink());
    rasterizer.rasterize(
        grid.geometry.image_width,
        grid.geometry.image_height,
        background.fill(),
        &placements,
    )
}

/// Text block for one video frame: header, rows, blank line.
pub fn frame_text(index: usize, grid: &RenderedGrid) -> String {
    format!("Frame {}:\n{}\n", index, grid.to_text())
}

/// `image2text`: one text pass written as lines.
pub fn image_to_text(
    pipeline: &RenderPipeline,
    input: &Path,
    output: &Path,
) -> Result<RenderedGrid, RenderError> {
    let image = Arc::new(decode_image(input)?);
    let grid = pipeline.render(image)?;
    write_text(output, &grid.to_text())?;
    log::info!(
        "Wrote {}x{} glyphs to {}",
        grid.num_columns(),
        grid.num_rows(),
        output.display()
    );
    Ok(grid)
}

/// `image2image`: one pass drawn onto a canvas and encoded by extension.
pub fn image_to_image(
    pipeline: &RenderPipeline,
    rasterizer: &dyn Rasterizer,
    background: Background,
    input: &Path,
    output: &Path,
) -> Result<(), RenderError> {
    // Reject an unwritable format before doing any work
    output_format(output)?;

    let image = Arc::new(decode_image(input)?);
    let grid = pipeline.render(image)?;
    let canvas = draw_grid(&grid, rasterizer, background)?;
    save_image(output, &canvas)?;
    log::info!("Wrote {}x{} image to {}", canvas.width(), canvas.height(), output.display());
    Ok(())
}

/// `video2text`: every frame as a text block, in order.
pub fn video_to_text(
    pipeline: &RenderPipeline,
    frames: &FrameSource,
    output: &Path,
) -> Result<(), RenderError> {
    let mut out = create_output(output)?;
    let sink_error = |source| RenderError::Sink {
        path: output.to_path_buf(),
        source,
    };

    for (index, frame) in frames.frames().enumerate() {
        if pipeline.cancel_flag().is_cancelled() {
            return Err(RenderError::Aborted);
        }
        let grid = pipeline.render(Arc::new(decode_image(frame)?))?;
        out.write_all(frame_text(index, &grid).as_bytes())
            .map_err(sink_error)?;
        log::debug!("Frame {} of {} converted", index + 1, frames.len());
    }
    out.flush().map_err(sink_error)?;

    log::info!("Wrote {} frames to {}", frames.len(), output.display());
    Ok(())
}

/// `video2video`: every frame drawn and muxed at the source sampling rate.
pub fn video_to_video(
    pipeline: &RenderPipeline,
    rasterizer: &dyn Rasterizer,
    background: Background,
    frames: &FrameSource,
    output: &Path,
) -> Result<(), RenderError> {
    ensure_parent(output)?;
    let mut writer = FrameWriter::new(frames.fps())?;

    for (index, frame) in frames.frames().enumerate() {
        if pipeline.cancel_flag().is_cancelled() {
            return Err(RenderError::Aborted);
        }
        let grid = pipeline.render(Arc::new(decode_image(frame)?))?;
        let canvas = draw_grid(&grid, rasterizer, background)?;
        save_image(&writer.next_frame_path(), &canvas)?;
        log::debug!("Frame {} of {} drawn", index + 1, frames.len());
    }

    writer.finish(output, pipeline.cancel_flag())
}

/// Run the conversion `settings.mode` names from `input` to `output`.
pub fn run(
    settings: &Settings,
    input: &Path,
    output: &Path,
    cancel: CancelFlag,
) -> Result<(), RenderError> {
    let input = resolve_path(input)?;
    let output = resolve_path(output)?;
    let draws_image = matches!(settings.mode, Mode::Image2Image | Mode::Video2Video);

    let pipeline =
        RenderPipeline::new(settings.render_options(draws_image))?.with_cancel_flag(cancel);
    log::info!(
        "{}: {} -> {} ({} columns, ramp {}, {} workers)",
        settings.mode,
        input.display(),
        output.display(),
        settings.columns,
        settings.ramp,
        settings.workers
    );

    let rasterizer = if draws_image {
        let spec = settings.fonts.spec_for(&settings.language, settings.scale);
        Some(FontRasterizer::from_spec(&spec)?)
    } else {
        None
    };

    match (settings.mode, rasterizer.as_ref()) {
        (Mode::Image2Text, _) => image_to_text(&pipeline, &input, &output).map(|_| ()),
        (Mode::Image2Image, Some(r)) => {
            image_to_image(&pipeline, r, settings.background, &input, &output)
        }
        (Mode::Video2Text, _) => {
            let frames = FrameSource::extract(&input, settings.fps, pipeline.cancel_flag())?;
            video_to_text(&pipeline, &frames, &output)
        }
        (Mode::Video2Video, Some(r)) => {
            let frames = FrameSource::extract(&input, settings.fps, pipeline.cancel_flag())?;
            video_to_video(&pipeline, r, settings.background, &frames, &output)
        }
        (mode, None) => Err(RenderError::Configuration(format!(
            "{} needs a font rasterizer",
            mode
        ))),
    }
}
