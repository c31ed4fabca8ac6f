//! Frame extraction and video muxing through an external FFmpeg process.
//!
//! Frames are exchanged with FFmpeg as numbered image files in a temporary
//! directory (`frame-1.jpg`, `frame-2.jpg`, ...). Frame order is always the
//! numeric index, never the file name's lexical order.

use std::ffi::{OsStr, OsString};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::ascii::{CancelFlag, RenderError};

/// Sampling rate used when none is configured.
pub const DEFAULT_FPS: u32 = 10;

const FRAME_PREFIX: &str = "frame-";
const INPUT_FRAME_EXT: &str = "jpg";
const OUTPUT_FRAME_EXT: &str = "png";

/// Errors that can occur while running FFmpeg
#[derive(Debug)]
pub enum VideoError {
    /// FFmpeg executable not found
    FfmpegNotFound,
    /// Failed to spawn FFmpeg process
    SpawnFailed(std::io::Error),
    /// FFmpeg process exited with non-zero status
    ProcessFailed { exit_code: Option<i32>, stderr: String },
    /// FFmpeg succeeded but produced no frames
    NoFrames { input: PathBuf },
    /// I/O error around the frame directory
    IoError(std::io::Error),
}

impl std::fmt::Display for VideoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoError::FfmpegNotFound => {
                write!(
                    f,
                    "FFmpeg not found. Install it and make sure `ffmpeg` is on your PATH."
                )
            }
            VideoError::SpawnFailed(e) => write!(f, "Failed to spawn FFmpeg: {}", e),
            VideoError::ProcessFailed { exit_code, stderr } => {
                write!(f, "FFmpeg exited with code {:?}\n{}", exit_code, stderr)
            }
            VideoError::NoFrames { input } => {
                write!(f, "No frames could be extracted from '{}'", input.display())
            }
            VideoError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for VideoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VideoError::SpawnFailed(e) | VideoError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

/// A running FFmpeg process.
struct FfmpegProcess {
    child: Child,
    /// Collects stderr so the pipe never fills up
    stderr_thread: Option<JoinHandle<Vec<String>>>,
}

impl FfmpegProcess {
    fn spawn(args: &[OsString]) -> Result<Self, VideoError> {
        log::debug!("Spawning ffmpeg {:?}", args);
        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    VideoError::FfmpegNotFound
                } else {
                    VideoError::SpawnFailed(e)
                }
            })?;

        let stderr_thread = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                BufReader::new(stderr)
                    .lines()
                    .map_while(Result::ok)
                    .inspect(|line| log::debug!("[ffmpeg] {}", line))
                    .collect()
            })
        });

        Ok(Self {
            child,
            stderr_thread,
        })
    }

    /// Wait for FFmpeg to exit, interrupting it if `cancel` is raised.
    fn wait(mut self, cancel: &CancelFlag) -> Result<(), RenderError> {
        loop {
            if let Some(status) = self.child.try_wait().map_err(VideoError::IoError)? {
                let stderr = self.collect_stderr();
                if status.success() {
                    return Ok(());
                }
                return Err(VideoError::ProcessFailed {
                    exit_code: status.code(),
                    stderr,
                }
                .into());
            }

            if cancel.is_cancelled() {
                self.interrupt();
                return Err(RenderError::Aborted);
            }
            thread::sleep(Duration::from_millis(50));
        }
    }

    /// Send SIGINT and give FFmpeg up to two seconds before killing it.
    fn interrupt(&mut self) {
        #[cfg(unix)]
        {
            // SAFETY: plain signal delivery to our own child process.
            unsafe {
                libc::kill(self.child.id() as libc::pid_t, libc::SIGINT);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = self.child.kill();
        }

        let start = Instant::now();
        let timeout = Duration::from_secs(2);
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if start.elapsed() <= timeout => {
                    thread::sleep(Duration::from_millis(50));
                }
                _ => {
                    let _ = self.child.kill();
                    let _ = self.child.wait();
                    break;
                }
            }
        }
        self.collect_stderr();
    }

    fn collect_stderr(&mut self) -> String {
        self.stderr_thread
            .take()
            .and_then(|handle| handle.join().ok())
            .map(|lines| lines.join("\n"))
            .unwrap_or_default()
    }
}

/// FFmpeg arguments that sample `input` at `fps` into numbered images.
pub fn extract_args(input: &Path, fps: u32, pattern: &Path) -> Vec<OsString> {
    vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-i".into(),
        input.as_os_str().to_owned(),
        "-vf".into(),
        format!("fps={}", fps).into(),
        pattern.as_os_str().to_owned(),
    ]
}

/// FFmpeg arguments that encode numbered images at `fps` into `output`.
pub fn mux_args(pattern: &Path, fps: u32, output: &Path) -> Vec<OsString> {
    vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-framerate".into(),
        fps.to_string().into(),
        "-start_number".into(),
        "1".into(),
        "-i".into(),
        pattern.as_os_str().to_owned(),
        "-c:v".into(),
        "libx264".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        output.as_os_str().to_owned(),
    ]
}

fn frame_pattern(dir: &Path, ext: &str) -> PathBuf {
    dir.join(format!("{}%d.{}", FRAME_PREFIX, ext))
}

/// Numeric index of a `frame-N.ext` file.
pub fn frame_index(path: &Path) -> Option<u64> {
    path.file_stem()
        .and_then(OsStr::to_str)
        .and_then(|stem| stem.strip_prefix(FRAME_PREFIX))
        .and_then(|n| n.parse().ok())
}

/// All `frame-N` files in `dir`, ordered by N.
pub fn list_frames(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut frames: Vec<(u64, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter_map(|path| frame_index(&path).map(|index| (index, path)))
        .collect();
    frames.sort_by_key(|(index, _)| *index);
    Ok(frames.into_iter().map(|(_, path)| path).collect())
}

/// Finite, ordered sequence of frames sampled from a video.
///
/// Frames live in a temporary directory removed when the source is dropped.
#[derive(Debug)]
pub struct FrameSource {
    dir: TempDir,
    frames: Vec<PathBuf>,
    fps: u32,
}

impl FrameSource {
    /// Sample `input` at `fps` frames per second.
    pub fn extract(input: &Path, fps: u32, cancel: &CancelFlag) -> Result<Self, RenderError> {
        let dir = tempfile::Builder::new()
            .prefix("ascii-frames-")
            .tempdir()
            .map_err(VideoError::IoError)?;

        let pattern = frame_pattern(dir.path(), INPUT_FRAME_EXT);
        FfmpegProcess::spawn(&extract_args(input, fps, &pattern))?.wait(cancel)?;

        let source = Self::from_dir(dir, fps)?;
        if source.is_empty() {
            return Err(VideoError::NoFrames {
                input: input.to_path_buf(),
            }
            .into());
        }
        log::info!(
            "Extracted {} frames from {} at {} fps",
            source.len(),
            input.display(),
            fps
        );
        Ok(source)
    }

    /// Wrap a directory that already holds `frame-N` files.
    pub fn from_dir(dir: TempDir, fps: u32) -> Result<Self, VideoError> {
        let frames = list_frames(dir.path()).map_err(VideoError::IoError)?;
        Ok(Self { dir, frames, fps })
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Frame files in playback order. Can be iterated any number of times.
    pub fn frames(&self) -> impl Iterator<Item = &Path> {
        self.frames.iter().map(PathBuf::as_path)
    }
}

/// Collects rendered frames and encodes them into a video.
#[derive(Debug)]
pub struct FrameWriter {
    dir: TempDir,
    written: u64,
    fps: u32,
}

impl FrameWriter {
    pub fn new(fps: u32) -> Result<Self, VideoError> {
        let dir = tempfile::Builder::new()
            .prefix("ascii-output-")
            .tempdir()
            .map_err(VideoError::IoError)?;
        Ok(Self {
            dir,
            written: 0,
            fps,
        })
    }

    /// Path for the next frame. Frames must be written in playback order.
    pub fn next_frame_path(&mut self) -> PathBuf {
        self.written += 1;
        self.dir
            .path()
            .join(format!("{}{}.{}", FRAME_PREFIX, self.written, OUTPUT_FRAME_EXT))
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Encode all written frames into `output`.
    pub fn finish(self, output: &Path, cancel: &CancelFlag) -> Result<(), RenderError> {
        if self.written == 0 {
            return Err(VideoError::NoFrames {
                input: self.dir.path().to_path_buf(),
            }
            .into());
        }
        let pattern = frame_pattern(self.dir.path(), OUTPUT_FRAME_EXT);
        FfmpegProcess::spawn(&mux_args(&pattern, self.fps, output))?.wait(cancel)?;
        log::info!(
            "Encoded {} frames into {} at {} fps",
            self.written,
            output.display(),
            self.fps
        );
        Ok(())
    }
}
