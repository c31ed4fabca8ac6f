//! Subcommand handlers for config actions.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use super::args::ConfigAction;
use crate::config::{Settings, DEFAULT_CONFIG};

/// Human-readable summary of the merged settings.
pub fn render_settings(settings: &Settings, config_path: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Current configuration:");
    let _ = writeln!(out, "  Mode: {}", settings.mode);
    let _ = writeln!(out, "  Background: {}", settings.background.name());
    let _ = writeln!(out, "  Columns: {}", settings.columns);
    let _ = writeln!(out, "  Character set: {}", settings.ramp);
    let _ = writeln!(out, "  Language: {}", settings.language);
    let _ = writeln!(out, "  Scale: {}", settings.scale);
    let _ = writeln!(out, "  FPS: {}", settings.fps);
    let _ = writeln!(out, "  Color: {}", if settings.color { "yes" } else { "no" });
    let _ = writeln!(out, "  Workers: {}", settings.workers);
    let _ = writeln!(out, "  Log directory: {}", settings.log_dir.display());
    let _ = writeln!(out, "  Font directory: {}", settings.fonts.base_path.display());
    let _ = writeln!(out);

    let state = if config_path.exists() {
        "exists"
    } else {
        "not found"
    };
    let _ = writeln!(out, "Config file: {} ({})", config_path.display(), state);
    out
}

/// Write the default config to `path`. Never overwrites an existing file.
pub fn init_config(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(DEFAULT_CONFIG.as_bytes())
}

/// Handle config subcommand actions.
///
/// # Returns
/// Process exit code
pub fn handle_config_action(action: ConfigAction, settings: &Settings, config_path: &Path) -> i32 {
    match action {
        ConfigAction::Show => {
            print!("{}", render_settings(settings, config_path));
            0
        }
        ConfigAction::Init => match init_config(config_path) {
            Ok(()) => {
                println!("Created config file: {}", config_path.display());
                0
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                eprintln!("Config file already exists: {}", config_path.display());
                eprintln!("Use 'ascii-generator config show' to view current settings.");
                1
            }
            Err(e) => {
                eprintln!("Error writing config file: {}", e);
                1
            }
        },
    }
}
