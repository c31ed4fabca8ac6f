//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing, enums, and subcommand handlers.

mod args;
mod commands;
mod enums;

pub use args::{parse_fps, parse_scale, parse_workers, Args, Command, ConfigAction};
pub use commands::{handle_config_action, init_config, render_settings};
pub use enums::{BackgroundArg, ModeArg};
