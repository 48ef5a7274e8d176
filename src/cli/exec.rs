use std::collections::HashMap;
use std::io::{self, Write};

use anyhow::{Context, Result};
use cmdexec_core::{CommandEngine, ExecOptions};
use tracing::debug;

use crate::cli::args::ExecArgs;
use crate::cli::render::{exit_status_byte, render};

/// Run one command and print its result. Returns the process exit status.
pub fn handle_exec_command(
    engine: &mut CommandEngine,
    args: ExecArgs,
    show_working_dir: bool,
) -> Result<u8> {
    let command = args.command.join(" ");
    let mut options = ExecOptions::new();
    if let Some(dir) = args.working_dir {
        options = options.working_dir(dir);
    }
    if !args.env.is_empty() {
        options = options.envs(args.env.into_iter().collect::<HashMap<_, _>>());
    }

    let result = match engine.execute(&command, options) {
        Ok(result) => result,
        Err(failure) => {
            let (error, result) = failure.into_parts();
            debug!(
                error = %error,
                rejected_before_spawn = error.is_validation(),
                "command did not succeed"
            );
            result
        }
    };

    let rendered = render(&result, args.json, show_working_dir)?;
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(rendered.as_bytes())
        .and_then(|()| stdout.flush())
        .context("Failed to write command output")?;

    Ok(exit_status_byte(result.exit_code))
}
