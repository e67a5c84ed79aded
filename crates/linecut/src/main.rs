//! linecut: convert line drawings and SVG files into G-code.
//!
//! Reads one raster image or SVG document, runs the conversion pipeline,
//! scales the paths onto the material, and writes a G-code program.
//! Output files are written atomically, so a failed run never leaves a
//! partial program behind.
//!
//! # Usage
//!
//! ```text
//! linecut drawing.png -o drawing.nc --use-skeleton --material-width 200
//! linecut logo.svg -o logo.nc --config machine.json --svg-preview logo.preview.svg
//! ```

mod cli;
mod error;
mod run;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is `info`, or `debug`
/// with `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
