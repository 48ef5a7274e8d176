use std::path::PathBuf;

use anyhow::{Result, ensure};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::defaults;
use crate::core::lenient;

/// How `allowed_dirs` entries are compared with a candidate directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirMatchMode {
    /// Literal string prefix
    #[default]
    Prefix,
    /// Whole path components
    Segment,
}

/// Command execution configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommandExecConfig {
    /// Program names that may be executed; a comma separated string is also accepted
    #[serde(
        default = "default_allowed_commands",
        deserialize_with = "lenient::command_list"
    )]
    pub allowed_commands: Vec<String>,

    /// Initial working directory; empty means the home directory
    #[serde(default, deserialize_with = "lenient::string")]
    pub default_working_dir: String,

    /// Directory prefixes usable as working directories; empty allows all
    #[serde(default)]
    pub allowed_dirs: Vec<String>,

    #[serde(default)]
    pub allowed_dirs_match: DirMatchMode,

    /// Prefix rendered output with the working directory
    #[serde(default)]
    pub show_working_dir: bool,

    /// Directories searched before the system PATH
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    /// prepend, append or replace
    #[serde(default = "default_path_behavior", deserialize_with = "lenient::string")]
    pub path_behavior: String,

    /// Variables set for every command; scalar values are taken as strings
    #[serde(default, deserialize_with = "lenient::string_map")]
    pub environment: IndexMap<String, String>,

    /// Per-stream capture limit
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

fn default_allowed_commands() -> Vec<String> {
    defaults::ALLOWED_COMMANDS
        .iter()
        .map(|command| (*command).to_string())
        .collect()
}

fn default_path_behavior() -> String {
    defaults::PATH_BEHAVIOR.to_string()
}

fn default_max_output_bytes() -> usize {
    defaults::MAX_OUTPUT_BYTES
}

impl Default for CommandExecConfig {
    fn default() -> Self {
        Self {
            allowed_commands: default_allowed_commands(),
            default_working_dir: String::new(),
            allowed_dirs: Vec::new(),
            allowed_dirs_match: DirMatchMode::default(),
            show_working_dir: false,
            search_paths: Vec::new(),
            path_behavior: default_path_behavior(),
            environment: IndexMap::new(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

impl CommandExecConfig {
    /// Configured default directory, if any.
    pub fn default_working_dir(&self) -> Option<PathBuf> {
        let trimmed = self.default_working_dir.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    pub fn validate(&self) -> Result<()> {
        for command in &self.allowed_commands {
            ensure!(
                !command.trim().is_empty(),
                "command_exec.allowed_commands must not contain empty entries"
            );
            ensure!(
                command.split_whitespace().count() == 1,
                "command_exec.allowed_commands entries must be a single program name (got '{command}')"
            );
        }
        ensure!(
            self.max_output_bytes > 0,
            "command_exec.max_output_bytes must be greater than 0"
        );
        Ok(())
    }
}

/// Split a comma separated command list, trimming entries and dropping empties.
pub fn parse_command_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|command| !command.is_empty())
        .map(str::to_string)
        .collect()
}
