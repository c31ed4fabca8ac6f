//! Font selection per language and font file loading.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusttype::Font;

/// Base glyph size in points before scaling.
pub const DEFAULT_BASE_SIZE: f32 = 10.0;

pub const DEFAULT_FONT_DIR: &str = "fonts";

/// Errors that can occur when loading a font.
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("Failed to read font '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{}' is not a usable TrueType/OpenType font", path.display())]
    Invalid { path: PathBuf },
}

/// Font family needed to draw a language's glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFamily {
    Latin,
    Chinese,
    /// Japanese and Korean
    Cjk,
}

impl FontFamily {
    pub fn for_language(language: &str) -> Self {
        match language.trim().to_ascii_lowercase().as_str() {
            "chinese" => FontFamily::Chinese,
            "japanese" | "korean" => FontFamily::Cjk,
            _ => FontFamily::Latin,
        }
    }

    /// Key used in the `[fonts.files]` config table.
    pub fn key(&self) -> &'static str {
        match self {
            FontFamily::Latin => "latin",
            FontFamily::Chinese => "chinese",
            FontFamily::Cjk => "cjk",
        }
    }

    pub fn default_file(&self) -> &'static str {
        match self {
            FontFamily::Latin => "DejaVuSansMono-Bold.ttf",
            FontFamily::Chinese => "simsun.ttc",
            FontFamily::Cjk => "arial-unicode.ttf",
        }
    }

    /// Latin glyphs are drawn at twice the base size; CJK glyphs are
    /// already full-width.
    fn size_factor(&self) -> f32 {
        match self {
            FontFamily::Latin => 2.0,
            FontFamily::Chinese | FontFamily::Cjk => 1.0,
        }
    }
}

/// Resolved font file and pixel size.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub path: PathBuf,
    pub size: f32,
}

impl FontSpec {
    /// Read and parse the font file.
    pub fn load(&self) -> Result<Font<'static>, FontError> {
        load_font(&self.path)
    }
}

/// Where font files live and which file serves which family.
#[derive(Debug, Clone, PartialEq)]
pub struct FontLibrary {
    pub base_path: PathBuf,
    pub base_size: f32,
    /// Overrides keyed by [`FontFamily::key`]
    pub files: HashMap<String, String>,
}

impl Default for FontLibrary {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(DEFAULT_FONT_DIR),
            base_size: DEFAULT_BASE_SIZE,
            files: HashMap::new(),
        }
    }
}

impl FontLibrary {
    /// Font for `language`, sized by `scale`.
    pub fn spec_for(&self, language: &str, scale: f32) -> FontSpec {
        let family = FontFamily::for_language(language);
        let file = self
            .files
            .get(family.key())
            .map(String::as_str)
            .unwrap_or_else(|| family.default_file());

        FontSpec {
            path: self.base_path.join(file),
            size: self.base_size * family.size_factor() * scale,
        }
    }
}

/// Load a font from disk.
pub fn load_font(path: &Path) -> Result<Font<'static>, FontError> {
    let bytes = std::fs::read(path).map_err(|source| FontError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Font::try_from_vec(bytes).ok_or_else(|| FontError::Invalid {
        path: path.to_path_buf(),
    })
}
