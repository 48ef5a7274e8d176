pub mod commands;
mod lenient;

pub use commands::{CommandExecConfig, DirMatchMode, parse_command_list};
