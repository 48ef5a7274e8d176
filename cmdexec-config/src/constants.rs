/// Default configuration file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "config.yml";

/// Environment variable names consulted while loading configuration.
pub mod env_vars {
    pub const CONFIG_PATH: &str = "CMDEXEC_CONFIG_PATH";
    /// Comma separated list replacing `command_exec.allowed_commands`.
    pub const ALLOWED_COMMANDS: &str = "ALLOWED_COMMANDS";
    pub const LOG_LEVEL: &str = "CMDEXEC_LOG_LEVEL";
    pub const PATH_BEHAVIOR: &str = "CMDEXEC_PATH_BEHAVIOR";
}

pub mod defaults {
    pub const ALLOWED_COMMANDS: &[&str] = &["git", "ls", "echo", "pwd", "cd"];
    pub const PATH_BEHAVIOR: &str = "prepend";
    pub const LOG_LEVEL: &str = "info";
    pub const MAX_OUTPUT_BYTES: usize = 1024 * 1024;
}
