use std::collections::HashMap;
use std::io;
use std::process::ExitCode;

use anyhow::Result;
use cmdexec_config::{CmdExecConfig, CommandExecConfig, DirMatchMode};
use cmdexec_core::{CommandEngine, DirectoryMatch, EngineConfig};

pub mod args;

mod allowed;
mod check;
mod exec;
mod render;
mod session;

pub use allowed::handle_allowed_command;
pub use args::{Cli, Commands};
pub use check::handle_check_command;
pub use exec::handle_exec_command;
pub use session::run_session;

/// Translate the `command_exec` section into engine settings.
pub fn engine_config(config: &CommandExecConfig) -> EngineConfig {
    EngineConfig {
        allowed_commands: config.allowed_commands.clone(),
        default_working_dir: config.default_working_dir(),
        allowed_dirs: config.allowed_dirs.clone(),
        allowed_dirs_match: match config.allowed_dirs_match {
            DirMatchMode::Prefix => DirectoryMatch::Prefix,
            DirMatchMode::Segment => DirectoryMatch::Segment,
        },
        search_paths: config.search_paths.clone(),
        path_behavior: config.path_behavior.clone(),
        environment: config
            .environment
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<HashMap<_, _>>(),
        max_output_bytes: config.max_output_bytes,
    }
}

/// Run the selected subcommand against an engine built from `config`.
pub fn dispatch(command: Commands, config: &CmdExecConfig) -> Result<ExitCode> {
    let show_working_dir = config.command_exec.show_working_dir;
    let mut engine = CommandEngine::new(engine_config(&config.command_exec));

    let status = match command {
        Commands::Exec(args) => handle_exec_command(&mut engine, args, show_working_dir)?,
        Commands::Session(args) => {
            let stdin = io::stdin().lock();
            let mut stdout = io::stdout().lock();
            let code = run_session(&mut engine, stdin, &mut stdout, args.json, show_working_dir)?;
            render::exit_status_byte(code)
        }
        Commands::Allowed => {
            handle_allowed_command(&engine)?;
            0
        }
        Commands::Check(args) => handle_check_command(&engine, &args.command)?,
    };

    Ok(ExitCode::from(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_carries_every_setting() {
        let mut config = CommandExecConfig {
            allowed_commands: vec!["ls".into()],
            default_working_dir: " /srv ".into(),
            allowed_dirs: vec!["/srv".into()],
            allowed_dirs_match: DirMatchMode::Segment,
            max_output_bytes: 10,
            path_behavior: "append".into(),
            ..CommandExecConfig::default()
        };
        config.environment.insert("A".into(), "1".into());

        let engine = engine_config(&config);
        assert_eq!(engine.allowed_commands, vec!["ls"]);
        assert_eq!(engine.default_working_dir, Some("/srv".into()));
        assert_eq!(engine.allowed_dirs_match, DirectoryMatch::Segment);
        assert_eq!(engine.path_behavior, "append");
        assert_eq!(engine.environment.get("A").map(String::as_str), Some("1"));
        assert_eq!(engine.max_output_bytes, 10);
    }
}
