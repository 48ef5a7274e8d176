//! Configuration for cmdexec: the YAML model, defaults and a layered loader
//! that merges the config file, environment overrides and runtime `--set`
//! overrides before validating the result.

pub mod constants;
pub mod core;
pub mod loader;
pub mod logging;

pub use crate::core::{CommandExecConfig, DirMatchMode};
pub use loader::layers::{ConfigLayerEntry, ConfigLayerSource, ConfigLayerStack};
pub use loader::{CmdExecConfig, ConfigBuilder, ConfigManager, ProcessEnv, parse_key_value};
pub use logging::{LogConfig, LogLevel};
