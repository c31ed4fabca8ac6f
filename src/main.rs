use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use ascii_generator::ascii::{CancelFlag, RenderError};
use ascii_generator::cli::{handle_config_action, Args, Command};
use ascii_generator::config::{self, Config};
use ascii_generator::{convert, logging};
use clap::Parser;

/// Raise `cancel` on Ctrl+C.
fn setup_ctrlc_handler(cancel: CancelFlag) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        cancel.cancel();
        eprintln!("\nReceived Ctrl+C, stopping...");
    })
}

/// Print an error and its sources to stderr.
fn report(err: &RenderError) {
    log::error!("{}", err);
    eprintln!("Error: {}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
}

fn main() {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(config::default_path);
    let file_config = match Config::load(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // CLI args > config file > built-in defaults
    let (settings, diagnostics) = match config::resolve(&file_config, &args.overrides()) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(Command::Config { action }) = args.command {
        std::process::exit(handle_config_action(action, &settings, &config_path));
    }

    let (input, output): (PathBuf, PathBuf) = match (args.input, args.output) {
        (Some(input), Some(output)) => (input, output),
        _ => {
            eprintln!("Error: both --input and --output are required");
            eprintln!("Run 'ascii-generator --help' for usage.");
            std::process::exit(2);
        }
    };

    let verbose = args.verbose || logging::verbose_from_env();
    let session = match logging::init(&settings.log_dir, verbose) {
        Ok(session) => Some(session),
        Err(e) => {
            eprintln!("Warning: {}", e);
            eprintln!("Continuing without a log file.\n");
            None
        }
    };

    for diagnostic in &diagnostics {
        log::warn!("{}", diagnostic);
        eprintln!("Warning: {}", diagnostic);
    }

    let cancel = CancelFlag::new();
    if let Err(e) = setup_ctrlc_handler(cancel.clone()) {
        log::warn!("Failed to install Ctrl+C handler: {}", e);
    }

    let started = Instant::now();
    let code = match convert::run(&settings, &input, &output, cancel) {
        Ok(()) => {
            log::info!(
                "{} finished in {:.2?}",
                settings.mode,
                started.elapsed()
            );
            println!("Saved {}", output.display());
            0
        }
        Err(RenderError::Aborted) => {
            log::warn!("{} aborted", settings.mode);
            eprintln!("Aborted.");
            1
        }
        Err(e) => {
            report(&e);
            1
        }
    };

    if let Some(session) = session {
        session.finish();
    }
    std::process::exit(code);
}
