//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::{BackgroundArg, ModeArg};
use crate::config::Overrides;

/// Convert images and videos into ASCII art
#[derive(Parser, Debug)]
#[command(name = "ascii-generator")]
#[command(version, about = "Convert images and videos into ASCII art", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Input image or video
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output file (.txt for text modes, .png/.jpg or video for image modes)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Conversion mode
    #[arg(long)]
    pub mode: Option<ModeArg>,

    /// Number of glyph columns
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub cols: Option<u32>,

    /// Background for image output
    #[arg(long)]
    pub bg: Option<BackgroundArg>,

    /// Character set: simple, complex or english
    #[arg(long)]
    pub char_mode: Option<String>,

    /// Language character set: english, chinese, japanese or korean
    #[arg(long)]
    pub lang: Option<String>,

    /// Font scale for image output
    #[arg(long, value_parser = parse_scale)]
    pub scale: Option<f32>,

    /// Frames sampled per second of video
    #[arg(long, value_parser = parse_fps)]
    pub fps: Option<u32>,

    /// Draw glyphs in the background's contrast color instead of the cell color
    #[arg(long)]
    pub no_color: bool,

    /// Sampling threads (default: number of CPUs)
    #[arg(long, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Directory for log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

impl Args {
    /// Values given on the command line, layered over the config file.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            mode: self.mode.map(Into::into),
            background: self.bg.map(Into::into),
            columns: self.cols,
            charset: self.char_mode.clone(),
            language: self.lang.clone(),
            scale: self.scale,
            fps: self.fps,
            no_color: self.no_color,
            workers: self.workers,
            log_dir: self.log_dir.clone(),
        }
    }
}

/// Parse and validate font scale (> 0)
pub fn parse_scale(s: &str) -> Result<f32, String> {
    let scale: f32 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(format!("Scale must be greater than 0, got {}", scale));
    }
    Ok(scale)
}

/// Parse and validate sampling rate (>= 1 fps)
pub fn parse_fps(s: &str) -> Result<u32, String> {
    let fps: u32 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid framerate", s))?;
    if fps == 0 {
        return Err("Framerate must be at least 1 fps".to_string());
    }
    Ok(fps)
}

/// Parse and validate worker count (>= 1)
pub fn parse_workers(s: &str) -> Result<usize, String> {
    let workers: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid worker count", s))?;
    if workers == 0 {
        return Err("At least one worker is required".to_string());
    }
    Ok(workers)
}
