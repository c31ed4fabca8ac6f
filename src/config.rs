//! Configuration file handling for ascii-generator.
//!
//! Loads configuration from `<config_dir>/ascii-generator/config.toml` or a
//! custom path, then merges it with command-line overrides into [`Settings`].

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::ascii::{GlyphRamp, RampPreset, RenderError, RenderMode, RenderOptions};
use crate::fonts::{FontLibrary, DEFAULT_BASE_SIZE, DEFAULT_FONT_DIR};
use crate::raster::Background;
use crate::video::DEFAULT_FPS;

pub const DEFAULT_COLUMNS: u32 = 100;
pub const DEFAULT_LANGUAGE: &str = "english";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub fonts: FontsConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// `[defaults]`: fallbacks for every command-line option.
#[derive(Debug, Deserialize, Default)]
pub struct DefaultsConfig {
    pub mode: Option<String>,
    pub background: Option<String>,
    pub columns: Option<u32>,
    pub charset: Option<String>,
    pub language: Option<String>,
    pub scale: Option<f32>,
    pub fps: Option<u32>,
    pub color: Option<bool>,
    pub workers: Option<usize>,
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
pub struct FontsConfig {
    pub base_path: Option<PathBuf>,
    pub default_size: Option<f32>,
    #[serde(default)]
    pub files: HashMap<String, String>,
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            path: path.clone(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError { path, source: e })
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("ascii-generator").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/ascii-generator/config.toml")
        })
}

/// Conversion mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Image2Text,
    Image2Image,
    Video2Text,
    Video2Video,
}

impl Mode {
    pub const ALL: [Mode; 4] = [
        Mode::Image2Text,
        Mode::Image2Image,
        Mode::Video2Text,
        Mode::Video2Video,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Image2Text => "image2text",
            Mode::Image2Image => "image2image",
            Mode::Video2Text => "video2text",
            Mode::Video2Video => "video2video",
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Mode::Video2Text | Mode::Video2Video)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub mode: Option<Mode>,
    pub background: Option<Background>,
    pub columns: Option<u32>,
    pub charset: Option<String>,
    pub language: Option<String>,
    pub scale: Option<f32>,
    pub fps: Option<u32>,
    pub no_color: bool,
    pub workers: Option<usize>,
    pub log_dir: Option<PathBuf>,
}

/// A setting that could not be honored and was replaced by a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub setting: &'static str,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.setting, self.message)
    }
}

/// Fully resolved run settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: Mode,
    pub background: Background,
    pub columns: u32,
    pub ramp: GlyphRamp,
    pub language: String,
    pub scale: f32,
    pub fps: u32,
    pub color: bool,
    pub workers: usize,
    pub log_dir: PathBuf,
    pub fonts: FontLibrary,
}

impl Settings {
    /// Pass options for this run. Color sampling only matters when drawing.
    pub fn render_options(&self, draws_image: bool) -> RenderOptions {
        let mode = if draws_image && self.color {
            RenderMode::Color
        } else {
            RenderMode::Text
        };
        RenderOptions {
            columns: self.columns,
            ramp: self.ramp.clone(),
            mode,
            workers: self.workers,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Merge `overrides` over `config` over built-in defaults.
///
/// Unknown names fall back to defaults and are reported as diagnostics.
/// Out-of-range numbers are errors.
pub fn resolve(
    config: &Config,
    overrides: &Overrides,
) -> Result<(Settings, Vec<Diagnostic>), RenderError> {
    let file = &config.defaults;
    let mut diagnostics = Vec::new();

    let mode = match overrides.mode {
        Some(mode) => mode,
        None => match file.mode.as_deref() {
            None => Mode::default(),
            Some(name) => Mode::from_name(name).unwrap_or_else(|| {
                diagnostics.push(Diagnostic {
                    setting: "mode",
                    message: format!("unknown mode '{}', using '{}'", name, Mode::default()),
                });
                Mode::default()
            }),
        },
    };

    let background = match overrides.background {
        Some(bg) => bg,
        None => match file.background.as_deref() {
            None => Background::default(),
            Some(name) => Background::from_name(name).unwrap_or_else(|| {
                diagnostics.push(Diagnostic {
                    setting: "background",
                    message: format!(
                        "unknown background '{}', using '{}'",
                        name,
                        Background::default().name()
                    ),
                });
                Background::default()
            }),
        },
    };

    let columns = overrides.columns.or(file.columns).unwrap_or(DEFAULT_COLUMNS);
    if columns < 1 {
        return Err(RenderError::Configuration(
            "columns must be at least 1".to_string(),
        ));
    }

    let scale = overrides.scale.or(file.scale).unwrap_or(1.0);
    if !scale.is_finite() || scale <= 0.0 {
        return Err(RenderError::Configuration(format!(
            "scale must be a positive number, got {}",
            scale
        )));
    }

    let fps = overrides.fps.or(file.fps).unwrap_or(DEFAULT_FPS);
    if fps == 0 {
        return Err(RenderError::Configuration(
            "fps must be at least 1".to_string(),
        ));
    }

    let workers = overrides.workers.or(file.workers).unwrap_or_else(default_workers);
    if workers == 0 {
        return Err(RenderError::Configuration(
            "workers must be at least 1".to_string(),
        ));
    }

    let language = overrides
        .language
        .clone()
        .or_else(|| file.language.clone())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
        .trim()
        .to_ascii_lowercase();
    let charset = overrides.charset.as_deref().or(file.charset.as_deref());
    let ramp = select_ramp(&language, charset, &mut diagnostics);

    let color = if overrides.no_color {
        false
    } else {
        file.color.unwrap_or(true)
    };

    let log_dir = overrides
        .log_dir
        .clone()
        .or_else(|| file.log_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));

    let fonts = FontLibrary {
        base_path: config
            .fonts
            .base_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FONT_DIR)),
        base_size: config.fonts.default_size.unwrap_or(DEFAULT_BASE_SIZE),
        files: config.fonts.files.clone(),
    };

    let settings = Settings {
        mode,
        background,
        columns,
        ramp,
        language,
        scale,
        fps,
        color,
        workers,
        log_dir,
        fonts,
    };
    Ok((settings, diagnostics))
}

/// A non-English language brings its own character set; otherwise the
/// charset name decides.
fn select_ramp(
    language: &str,
    charset: Option<&str>,
    diagnostics: &mut Vec<Diagnostic>,
) -> GlyphRamp {
    match language {
        "" | "english" => {}
        "chinese" | "japanese" | "korean" => {
            if let Some(preset) = RampPreset::from_name(language) {
                return preset.ramp();
            }
        }
        other => {
            diagnostics.push(Diagnostic {
                setting: "language",
                message: format!(
                    "unsupported language '{}', using the '{}' character set",
                    other,
                    RampPreset::default().name()
                ),
            });
            return GlyphRamp::default();
        }
    }

    let resolution = GlyphRamp::resolve(charset.unwrap_or(RampPreset::default().name()));
    if let Some(message) = resolution.diagnostic() {
        diagnostics.push(Diagnostic {
            setting: "charset",
            message,
        });
    }
    resolution.ramp
}

/// Commented template written by `config init`.
pub const DEFAULT_CONFIG: &str = r#"# ascii-generator configuration

[app]
name = "ascii-generator"
version = "0.1.0"

[defaults]
# image2text, image2image, video2text or video2video
# mode = "image2text"
# Canvas background for image output: black or white
# background = "black"
# Number of glyph columns
# columns = 100
# simple, complex or english
# charset = "complex"
# english, chinese, japanese or korean
# language = "english"
# Font scale for image output
# scale = 1.0
# Frames sampled per second of video
# fps = 10
# Draw glyphs in the average cell color
# color = true
# Sampling threads (default: number of CPUs)
# workers = 8
# log_dir = "logs"

[fonts]
# base_path = "fonts"
# default_size = 10.0

[fonts.files]
# latin = "DejaVuSansMono-Bold.ttf"
# chinese = "simsun.ttc"
# cjk = "arial-unicode.ttf"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ascii::SIMPLE_RAMP;

    fn parse(toml_src: &str) -> Config {
        toml::from_str(toml_src).unwrap()
    }

    #[test]
    fn test_builtin_defaults() {
        let (settings, diagnostics) = resolve(&Config::default(), &Overrides::default()).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(settings.mode, Mode::Image2Text);
        assert_eq!(settings.background, Background::Black);
        assert_eq!(settings.columns, 100);
        assert_eq!(settings.ramp.name(), "complex");
        assert_eq!(settings.language, "english");
        assert_eq!(settings.scale, 1.0);
        assert_eq!(settings.fps, 10);
        assert!(settings.color);
        assert!(settings.workers >= 1);
        assert_eq!(settings.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn test_default_template_parses() {
        let config = parse(DEFAULT_CONFIG);
        assert_eq!(config.app.name.as_deref(), Some("ascii-generator"));
        assert!(config.defaults.mode.is_none());
    }

    #[test]
    fn test_file_values_apply() {
        let config = parse(
            r#"
            [defaults]
            mode = "video2text"
            background = "white"
            columns = 40
            charset = "simple"
            fps = 5
            color = false
            workers = 3

            [fonts]
            base_path = "/usr/share/fonts"
            [fonts.files]
            latin = "Mono.ttf"
            "#,
        );
        let (settings, diagnostics) = resolve(&config, &Overrides::default()).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(settings.mode, Mode::Video2Text);
        assert_eq!(settings.background, Background::White);
        assert_eq!(settings.columns, 40);
        assert_eq!(settings.ramp.glyphs().iter().collect::<String>(), SIMPLE_RAMP);
        assert_eq!(settings.fps, 5);
        assert!(!settings.color);
        assert_eq!(settings.workers, 3);
        assert_eq!(
            settings.fonts.spec_for("english", 1.0).path,
            PathBuf::from("/usr/share/fonts/Mono.ttf")
        );
    }

    #[test]
    fn test_overrides_win() {
        let config = parse("[defaults]\ncolumns = 40\nmode = \"video2video\"\n");
        let overrides = Overrides {
            columns: Some(120),
            mode: Some(Mode::Image2Image),
            no_color: true,
            ..Overrides::default()
        };
        let (settings, _) = resolve(&config, &overrides).unwrap();
        assert_eq!(settings.columns, 120);
        assert_eq!(settings.mode, Mode::Image2Image);
        assert!(!settings.color);
    }

    #[test]
    fn test_unknown_names_fall_back_with_diagnostics() {
        let config = parse(
            "[defaults]\nmode = \"gif2text\"\nbackground = \"grey\"\ncharset = \"braille\"\n",
        );
        let (settings, diagnostics) = resolve(&config, &Overrides::default()).unwrap();
        assert_eq!(settings.mode, Mode::Image2Text);
        assert_eq!(settings.background, Background::Black);
        assert_eq!(settings.ramp.name(), "complex");

        let settings_named: Vec<&str> = diagnostics.iter().map(|d| d.setting).collect();
        assert_eq!(settings_named, vec!["mode", "background", "charset"]);
        assert!(diagnostics[2].message.contains("braille"));
    }

    #[test]
    fn test_language_selects_ramp() {
        let overrides = Overrides {
            language: Some("Japanese".to_string()),
            charset: Some("simple".to_string()),
            ..Overrides::default()
        };
        let (settings, diagnostics) = resolve(&Config::default(), &overrides).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(settings.language, "japanese");
        assert_eq!(settings.ramp.name(), "japanese");
    }

    #[test]
    fn test_unsupported_language_falls_back() {
        let overrides = Overrides {
            language: Some("klingon".to_string()),
            ..Overrides::default()
        };
        let (settings, diagnostics) = resolve(&Config::default(), &overrides).unwrap();
        assert_eq!(settings.ramp.name(), "complex");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].setting, "language");
    }

    #[test]
    fn test_out_of_range_numbers_are_errors() {
        for overrides in [
            Overrides {
                columns: Some(0),
                ..Overrides::default()
            },
            Overrides {
                scale: Some(0.0),
                ..Overrides::default()
            },
            Overrides {
                scale: Some(f32::NAN),
                ..Overrides::default()
            },
            Overrides {
                fps: Some(0),
                ..Overrides::default()
            },
            Overrides {
                workers: Some(0),
                ..Overrides::default()
            },
        ] {
            let err = resolve(&Config::default(), &overrides).unwrap_err();
            assert!(matches!(err, RenderError::Configuration(_)), "{:?}", overrides);
        }
    }

    #[test]
    fn test_render_options_color_only_for_images() {
        let (settings, _) = resolve(&Config::default(), &Overrides::default()).unwrap();
        assert_eq!(settings.render_options(false).mode, RenderMode::Text);
        assert_eq!(settings.render_options(true).mode, RenderMode::Color);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert!(config.defaults.columns.is_none());
    }

    #[test]
    fn test_load_invalid_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults\ncolumns = ").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_mode_names() {
        for mode in Mode::ALL {
            assert_eq!(Mode::from_name(mode.name()), Some(mode));
        }
        assert_eq!(Mode::from_name("VIDEO2TEXT"), Some(Mode::Video2Text));
        assert!(Mode::Video2Video.is_video());
        assert!(!Mode::Image2Image.is_video());
    }
}
