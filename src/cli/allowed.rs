use std::io::{self, Write};

use anyhow::{Context, Result};
use cmdexec_core::CommandEngine;

pub fn handle_allowed_command(engine: &CommandEngine) -> Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", engine.tool_description()).context("Failed to write allowed commands")
}
