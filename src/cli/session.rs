use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use cmdexec_core::{CommandExecutor, ExecOptions};

use crate::cli::render::render;

/// Execute each non-blank input line against the same executor, so `cd`
/// carries over between lines. Returns the exit code of the last command.
pub fn run_session<E, R, W>(
    executor: &mut E,
    input: R,
    output: &mut W,
    json: bool,
    show_working_dir: bool,
) -> Result<i32>
where
    E: CommandExecutor + ?Sized,
    R: BufRead,
    W: Write,
{
    let mut last_exit_code = 0;

    for line in input.lines() {
        let line = line.context("Failed to read command from stdin")?;
        let command = line.trim();
        if command.is_empty() {
            continue;
        }

        let result = executor
            .execute(command, ExecOptions::default())
            .unwrap_or_else(|failure| failure.into_result());
        last_exit_code = result.exit_code;

        output
            .write_all(render(&result, json, show_working_dir)?.as_bytes())
            .and_then(|()| output.flush())
            .context("Failed to write command output")?;
    }

    Ok(last_exit_code)
}
