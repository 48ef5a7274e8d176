use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::CommandExecConfig;
use crate::logging::LogConfig;

/// Root of `config.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CmdExecConfig {
    /// Force debug logging
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub command_exec: CommandExecConfig,
}

impl CmdExecConfig {
    pub fn validate(&self) -> Result<()> {
        self.log.validate().context("Invalid log configuration")?;

        self.command_exec
            .validate()
            .context("Invalid command_exec configuration")?;

        Ok(())
    }
}
