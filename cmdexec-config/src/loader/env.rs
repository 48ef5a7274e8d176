use std::collections::HashMap;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::constants::env_vars;
use crate::core::parse_command_list;
use crate::loader::layers::{ConfigLayerEntry, ConfigLayerSource};

/// Snapshot of environment variables consulted while loading.
pub type ProcessEnv = HashMap<String, String>;

/// Capture the current process environment, skipping non UTF-8 entries.
pub fn process_env() -> ProcessEnv {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

fn non_empty<'a>(env: &'a ProcessEnv, key: &str) -> Option<&'a str> {
    env.get(key).map(|value| value.trim()).filter(|value| !value.is_empty())
}

/// Build the environment override layer, or `None` when nothing is set.
pub fn env_overrides(env: &ProcessEnv) -> Option<ConfigLayerEntry> {
    let mut command_exec = Mapping::new();
    let mut log = Mapping::new();
    let mut variables = Vec::new();

    if let Some(raw) = non_empty(env, env_vars::ALLOWED_COMMANDS) {
        variables.push(env_vars::ALLOWED_COMMANDS.to_string());
        let commands = parse_command_list(raw);
        debug!(?commands, "allowed commands overridden from environment");
        command_exec.insert(
            Value::from("allowed_commands"),
            Value::Sequence(commands.into_iter().map(Value::from).collect()),
        );
    }

    if let Some(behavior) = non_empty(env, env_vars::PATH_BEHAVIOR) {
        variables.push(env_vars::PATH_BEHAVIOR.to_string());
        command_exec.insert(Value::from("path_behavior"), Value::from(behavior));
    }

    if let Some(level) = non_empty(env, env_vars::LOG_LEVEL) {
        variables.push(env_vars::LOG_LEVEL.to_string());
        log.insert(Value::from("level"), Value::from(level));
    }

    let mut root = Mapping::new();
    if !command_exec.is_empty() {
        root.insert(Value::from("command_exec"), Value::Mapping(command_exec));
    }
    if !log.is_empty() {
        root.insert(Value::from("log"), Value::Mapping(log));
    }

    (!variables.is_empty()).then(|| {
        ConfigLayerEntry::new(
            ConfigLayerSource::Environment { variables },
            Value::Mapping(root),
        )
    })
}
