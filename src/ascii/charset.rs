//! Glyph ramps for mapping brightness to characters.
//!
//! Ramps are ordered from index 0 (darkest cell) to N-1 (brightest cell).
//! The built-in presets follow the ink-on-paper convention: dense glyphs
//! for dark cells, a space for the brightest ones.

use std::fmt;

use super::error::RenderError;

/// 10-level ramp.
pub const SIMPLE_RAMP: &str = "@%#*+=-:. ";

/// 70-level ramp.
pub const COMPLEX_RAMP: &str =
    "$@B%8&WM#*oahkbdpqwmZO0QLCJUYXzcvunxrjft/\\|()1{}[]?-_+~<>i!lI;:,\"^`'. ";

pub const ENGLISH_RAMP: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub const CHINESE_RAMP: &str = "永和九年，岁在癸丑。暮春之初，会于会稽山阴之兰亭，修禊事也。";

pub const JAPANESE_RAMP: &str =
    "あいうえおかきくけこさしすせそたちつてとなにぬねのはひふへほまみむめもやゆよらりるれろわをん";

pub const KOREAN_RAMP: &str = "ㄱㄴㄷㄹㅁㅂㅅㅇㅈㅊㅋㅌㅍㅎㅏㅑㅓㅕㅗㅛㅜㅠㅡㅣ";

/// Ramp used when a selector cannot be resolved.
pub const DEFAULT_RAMP_NAME: &str = "complex";

/// Named ramp presets and language character sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RampPreset {
    Simple,
    #[default]
    Complex,
    English,
    Chinese,
    Japanese,
    Korean,
}

impl RampPreset {
    pub const ALL: [RampPreset; 6] = [
        RampPreset::Simple,
        RampPreset::Complex,
        RampPreset::English,
        RampPreset::Chinese,
        RampPreset::Japanese,
        RampPreset::Korean,
    ];

    /// Parse a preset name or language id. Case-insensitive.
    ///
    /// `standard` is accepted as an alias for `simple`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "simple" | "standard" => Some(RampPreset::Simple),
            "complex" => Some(RampPreset::Complex),
            "english" => Some(RampPreset::English),
            "chinese" => Some(RampPreset::Chinese),
            "japanese" => Some(RampPreset::Japanese),
            "korean" => Some(RampPreset::Korean),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RampPreset::Simple => "simple",
            RampPreset::Complex => "complex",
            RampPreset::English => "english",
            RampPreset::Chinese => "chinese",
            RampPreset::Japanese => "japanese",
            RampPreset::Korean => "korean",
        }
    }

    pub fn glyphs(&self) -> &'static str {
        match self {
            RampPreset::Simple => SIMPLE_RAMP,
            RampPreset::Complex => COMPLEX_RAMP,
            RampPreset::English => ENGLISH_RAMP,
            RampPreset::Chinese => CHINESE_RAMP,
            RampPreset::Japanese => JAPANESE_RAMP,
            RampPreset::Korean => KOREAN_RAMP,
        }
    }

    pub fn ramp(&self) -> GlyphRamp {
        GlyphRamp {
            name: self.name().to_string(),
            glyphs: self.glyphs().chars().collect(),
        }
    }
}

/// An ordered, non-empty glyph sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphRamp {
    name: String,
    glyphs: Vec<char>,
}

impl GlyphRamp {
    /// Build a custom ramp.
    ///
    /// # Errors
    /// [`RenderError::Configuration`] if `glyphs` is empty.
    pub fn new(name: impl Into<String>, glyphs: &str) -> Result<Self, RenderError> {
        let name = name.into();
        let glyphs: Vec<char> = glyphs.chars().collect();
        if glyphs.is_empty() {
            return Err(RenderError::Configuration(format!(
                "glyph ramp '{}' has no glyphs",
                name
            )));
        }
        Ok(Self { name, glyphs })
    }

    /// Resolve a preset name or language id.
    ///
    /// Unknown selectors fall back to the complex ramp; the returned
    /// [`RampResolution`] records the fallback so callers can surface it.
    pub fn resolve(selector: &str) -> RampResolution {
        match RampPreset::from_name(selector) {
            Some(preset) => RampResolution {
                ramp: preset.ramp(),
                fallback_from: None,
            },
            None => RampResolution {
                ramp: RampPreset::default().ramp(),
                fallback_from: Some(selector.to_string()),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    pub fn darkest(&self) -> char {
        self.glyphs[0]
    }

    pub fn brightest(&self) -> char {
        self.glyphs[self.glyphs.len() - 1]
    }

    /// Index of the glyph for a brightness in [0, 1].
    ///
    /// `floor(brightness * (N - 1))`, clamped to the ramp. NaN maps to 0.
    pub fn index_for(&self, brightness: f64) -> usize {
        let last = self.glyphs.len() - 1;
        let scaled = (brightness * last as f64).floor();
        if scaled.is_nan() || scaled <= 0.0 {
            0
        } else {
            (scaled as usize).min(last)
        }
    }

    /// Glyph for a brightness in [0, 1].
    pub fn select(&self, brightness: f64) -> char {
        self.glyphs[self.index_for(brightness)]
    }
}

impl Default for GlyphRamp {
    fn default() -> Self {
        RampPreset::default().ramp()
    }
}

impl fmt::Display for GlyphRamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} glyphs)", self.name, self.glyphs.len())
    }
}

/// Outcome of resolving a ramp selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RampResolution {
    pub ramp: GlyphRamp,
    /// The unrecognized selector, when the default ramp was substituted
    pub fallback_from: Option<String>,
}

impl RampResolution {
    pub fn is_fallback(&self) -> bool {
        self.fallback_from.is_some()
    }

    /// Human-readable note describing the fallback, if one happened.
    pub fn diagnostic(&self) -> Option<String> {
        self.fallback_from.as_ref().map(|selector| {
            format!(
                "unknown character set '{}', using '{}'",
                selector, DEFAULT_RAMP_NAME
            )
        })
    }
}
