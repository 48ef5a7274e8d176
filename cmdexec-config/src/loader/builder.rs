use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::loader::env::{ProcessEnv, process_env};
use crate::loader::layers::{ConfigLayerEntry, ConfigLayerSource};
use crate::loader::manager::ConfigManager;

/// Builder for creating a [`ConfigManager`] with custom overrides.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    workspace: Option<PathBuf>,
    config_file: Option<PathBuf>,
    env: Option<ProcessEnv>,
    cli_overrides: Vec<(String, Value)>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory searched for `config.yml`.
    pub fn workspace(mut self, path: PathBuf) -> Self {
        self.workspace = Some(path);
        self
    }

    /// Load this file instead of searching the default locations.
    pub fn config_file(mut self, path: PathBuf) -> Self {
        self.config_file = Some(path);
        self
    }

    /// Read environment overrides from this snapshot instead of the process.
    pub fn environment(mut self, env: ProcessEnv) -> Self {
        self.env = Some(env);
        self
    }

    /// Add a CLI override (e.g., "command_exec.path_behavior", "append").
    pub fn cli_override(mut self, key: String, value: Value) -> Self {
        self.cli_overrides.push((key, value));
        self
    }

    /// Add multiple CLI overrides from string pairs.
    ///
    /// Values are parsed as YAML. If parsing fails, they are treated as strings.
    /// String-valued settings accept any scalar, so `environment.LEVEL=2`
    /// yields `"2"` and `allowed_commands=ls` yields `[ls]`.
    pub fn cli_overrides(mut self, overrides: &[(String, String)]) -> Self {
        for (key, value) in overrides {
            let yaml_value = serde_yaml::from_str::<Value>(value)
                .unwrap_or_else(|_| Value::String(value.clone()));
            self.cli_overrides.push((key.clone(), yaml_value));
        }
        self
    }

    /// Build the [`ConfigManager`].
    pub fn build(self) -> Result<ConfigManager> {
        let env = self.env.unwrap_or_else(process_env);

        let mut manager = if let Some(config_file) = self.config_file {
            ConfigManager::load_from_file_with_env(config_file, &env)?
        } else {
            let workspace = match self.workspace {
                Some(workspace) => workspace,
                None => std::env::current_dir().context("Failed to resolve current directory")?,
            };
            ConfigManager::load_with_env(workspace, &env)?
        };

        if !self.cli_overrides.is_empty() {
            let mut runtime = Mapping::new();
            let mut keys = Vec::with_capacity(self.cli_overrides.len());
            for (key, value) in self.cli_overrides {
                Self::insert_dotted_key(&mut runtime, &key, value);
                keys.push(key);
            }

            let source = ConfigLayerSource::Runtime { keys };
            debug!(source = %source, "applying runtime configuration layer");
            manager
                .layer_stack
                .push(ConfigLayerEntry::new(source, Value::Mapping(runtime)));

            manager.config = ConfigManager::resolve(&manager.layer_stack)
                .context("Configuration failed validation after runtime overrides")?;
        }

        Ok(manager)
    }

    fn insert_dotted_key(mapping: &mut Mapping, key: &str, value: Value) {
        let Some((head, rest)) = key.split_once('.') else {
            mapping.insert(Value::from(key), value);
            return;
        };

        if !mapping.get(head).is_some_and(Value::is_mapping) {
            mapping.insert(Value::from(head), Value::Mapping(Mapping::new()));
        }
        if let Some(Value::Mapping(child)) = mapping.get_mut(head) {
            Self::insert_dotted_key(child, rest, value);
        }
    }
}

/// Split a `KEY=VALUE` override argument.
pub fn parse_key_value(raw: &str) -> Result<(String, String)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected KEY=VALUE, got '{raw}'");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("override key must not be empty in '{raw}'");
    }
    Ok((key.to_string(), value.to_string()))
}
