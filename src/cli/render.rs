use std::fmt::Write as _;

use anyhow::{Context, Result};
use cmdexec_core::ExecutionResult;

/// Plain-text rendering: optional `[dir]` header, stdout, stderr, then the error.
pub fn render_text(result: &ExecutionResult, show_working_dir: bool) -> String {
    let mut out = String::new();

    if show_working_dir {
        let _ = writeln!(out, "[{}]", result.working_dir.display());
    }

    for stream in [&result.stdout, &result.stderr] {
        if stream.is_empty() {
            continue;
        }
        out.push_str(stream);
        if !stream.ends_with('\n') {
            out.push('\n');
        }
    }

    if result.truncated {
        out.push_str("[output truncated]\n");
    }

    if let Some(error) = &result.error {
        let _ = writeln!(out, "error: {error}");
    }

    out
}

pub fn render_json(result: &ExecutionResult) -> Result<String> {
    serde_json::to_string(result).context("Failed to serialize execution result")
}

pub fn render(result: &ExecutionResult, json: bool, show_working_dir: bool) -> Result<String> {
    if json {
        let mut line = render_json(result)?;
        line.push('\n');
        Ok(line)
    } else {
        Ok(render_text(result, show_working_dir))
    }
}

/// Map a result exit code onto a process exit status byte.
pub fn exit_status_byte(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
