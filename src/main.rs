//! cmdexec - run allowlisted commands without a shell
//!
//! Thin binary entry point: load configuration, set up tracing and hand the
//! subcommand to the CLI handlers.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use cmdexec_config::ConfigBuilder;

mod cli;
mod main_helpers;

use cli::Cli;
use main_helpers::initialize_tracing;

fn main() -> Result<ExitCode> {
    let args = Cli::parse();

    let mut builder = ConfigBuilder::new().cli_overrides(&args.overrides);
    if let Some(path) = &args.config {
        builder = builder.config_file(path.clone());
    }
    let manager = builder.build().context("Failed to load configuration")?;

    initialize_tracing(manager.config(), args.verbose)?;
    if let Some(path) = manager.config_path() {
        tracing::debug!(path = %path.display(), "configuration loaded");
    }

    cli::dispatch(args.command, manager.config())
}
