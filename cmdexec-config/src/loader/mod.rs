pub mod layers;

mod builder;
mod config;
mod env;
mod manager;
mod merge;


pub use builder::{ConfigBuilder, parse_key_value};
pub use config::CmdExecConfig;
pub use env::{ProcessEnv, env_overrides, process_env};
pub use manager::ConfigManager;
pub use merge::merge_yaml_values;
