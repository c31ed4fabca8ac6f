//! CLI value enums for conversion mode and background.

use clap::ValueEnum;

use crate::config::Mode;
use crate::raster::Background;

/// Conversion mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ModeArg {
    /// Image to a text file
    #[default]
    #[value(name = "image2text")]
    Image2Text,
    /// Image to a rendered glyph image
    #[value(name = "image2image")]
    Image2Image,
    /// Video to a text file, one block per frame
    #[value(name = "video2text")]
    Video2Text,
    /// Video to a rendered glyph video
    #[value(name = "video2video")]
    Video2Video,
}

impl From<ModeArg> for Mode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Image2Text => Mode::Image2Text,
            ModeArg::Image2Image => Mode::Image2Image,
            ModeArg::Video2Text => Mode::Video2Text,
            ModeArg::Video2Video => Mode::Video2Video,
        }
    }
}

/// Canvas background for image output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BackgroundArg {
    #[default]
    Black,
    White,
}

impl From<BackgroundArg> for Background {
    fn from(b: BackgroundArg) -> Self {
        match b {
            BackgroundArg::Black => Background::Black,
            BackgroundArg::White => Background::White,
        }
    }
}
