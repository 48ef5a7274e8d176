use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cmdexec_config::parse_key_value;

#[derive(Debug, Parser)]
#[command(name = "cmdexec")]
#[command(about = "Run allowlisted commands without a shell")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to CMDEXEC_CONFIG_PATH, then ./config.yml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override a configuration key, e.g. command_exec.path_behavior=append
    #[arg(long = "set", global = true, value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub overrides: Vec<(String, String)>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute a single command
    Exec(ExecArgs),
    /// Execute commands read line by line from stdin against one engine
    Session(SessionArgs),
    /// Print the allowed commands
    Allowed,
    /// Report whether a command is allowed and which binary it resolves to
    Check(CheckArgs),
}

#[derive(Debug, Args)]
pub struct ExecArgs {
    /// Working directory for this command only
    #[arg(long, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Extra environment variable for this command only
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Program and arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Print one JSON result per line
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}
