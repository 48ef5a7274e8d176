use std::fmt::Write as _;
use std::io::{self, Write};

use anyhow::{Context, Result};
use cmdexec_core::CommandEngine;

const BUILTINS: &[&str] = &["cd", "pwd"];

/// Describe how `command` would be handled without running it.
pub fn describe_check(engine: &CommandEngine, command: &str) -> (String, bool) {
    let mut report = String::new();
    let _ = writeln!(report, "command: {command}");

    if !engine.is_command_allowed(command) {
        let _ = writeln!(report, "allowed: no");
        return (report, false);
    }
    let _ = writeln!(report, "allowed: yes");

    let program = command.split_whitespace().next().unwrap_or_default();
    if BUILTINS.contains(&program) {
        let _ = writeln!(report, "binary: builtin");
        return (report, true);
    }

    match engine.resolve_binary(command) {
        Ok(path) => {
            let _ = writeln!(report, "binary: {}", path.display());
            (report, true)
        }
        Err(err) => {
            let _ = writeln!(report, "error: {err}");
            (report, false)
        }
    }
}

pub fn handle_check_command(engine: &CommandEngine, command: &[String]) -> Result<u8> {
    let (report, ok) = describe_check(engine, &command.join(" "));
    io::stdout()
        .lock()
        .write_all(report.as_bytes())
        .context("Failed to write check report")?;
    Ok(if ok { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdexec_core::EngineConfig;
    use std::collections::HashMap;

    fn engine(commands: &[&str]) -> CommandEngine {
        CommandEngine::builder(EngineConfig {
            allowed_commands: commands.iter().map(|c| (*c).to_string()).collect(),
            path_behavior: "replace".into(),
            ..EngineConfig::default()
        })
        .inherited_env(HashMap::<String, String>::new())
        .home_dir(None)
        .build()
    }

    #[test]
    fn reports_disallowed_and_builtin() {
        let engine = engine(&["pwd", "ghost"]);

        let (report, ok) = describe_check(&engine, "rm -rf /");
        assert!(!ok);
        assert!(report.contains("allowed: no"));

        let (report, ok) = describe_check(&engine, "pwd");
        assert!(ok);
        assert!(report.contains("binary: builtin"));

        let (report, ok) = describe_check(&engine, "ghost --boo");
        assert!(!ok);
        assert!(report.contains("error: command not found: ghost"));
    }
}
