use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::constants::{CONFIG_FILE_NAME, env_vars};
use crate::loader::config::CmdExecConfig;
use crate::loader::env::{ProcessEnv, env_overrides, process_env};
use crate::loader::layers::{ConfigLayerEntry, ConfigLayerSource, ConfigLayerStack};

/// Configuration manager for loading and validating configurations
#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub(crate) config: CmdExecConfig,
    config_path: Option<PathBuf>,
    pub(crate) layer_stack: ConfigLayerStack,
}

impl ConfigManager {
    /// Load configuration from the default locations
    pub fn load() -> Result<Self> {
        let workspace = std::env::current_dir().context("Failed to resolve current directory")?;
        Self::load_with_env(workspace, &process_env())
    }

    /// Load from `CMDEXEC_CONFIG_PATH`, else `config.yml` in `workspace`,
    /// else defaults, reading overrides from `env`.
    pub fn load_with_env(workspace: impl AsRef<Path>, env: &ProcessEnv) -> Result<Self> {
        if let Some(config_path) = env.get(env_vars::CONFIG_PATH) {
            let trimmed = config_path.trim();
            if !trimmed.is_empty() {
                return Self::load_from_file_with_env(trimmed, env).with_context(|| {
                    format!(
                        "Failed to load configuration from {}={}",
                        env_vars::CONFIG_PATH,
                        trimmed
                    )
                });
            }
        }

        let workspace_config = workspace.as_ref().join(CONFIG_FILE_NAME);
        if workspace_config.is_file() {
            return Self::load_from_file_with_env(&workspace_config, env);
        }

        debug!("no configuration file found, using defaults");
        Self::from_layers(ConfigLayerStack::default(), None, env)
            .context("Default configuration failed validation")
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_from_file_with_env(path, &process_env())
    }

    pub fn load_from_file_with_env(path: impl AsRef<Path>, env: &ProcessEnv) -> Result<Self> {
        let path = path.as_ref();
        let yaml = Self::load_yaml_from_file(path)?;

        let mut layer_stack = ConfigLayerStack::default();
        layer_stack.push(ConfigLayerEntry::new(
            ConfigLayerSource::File {
                file: path.to_path_buf(),
            },
            yaml,
        ));

        Self::from_layers(layer_stack, Some(path.to_path_buf()), env).with_context(|| {
            format!(
                "Failed to build effective config with file: {}",
                path.display()
            )
        })
    }

    fn from_layers(
        mut layer_stack: ConfigLayerStack,
        config_path: Option<PathBuf>,
        env: &ProcessEnv,
    ) -> Result<Self> {
        if let Some(layer) = env_overrides(env) {
            layer_stack.push(layer);
        }

        let config = Self::resolve(&layer_stack)?;
        for layer in layer_stack.layers() {
            debug!(source = %layer.source, "configuration layer applied");
        }
        Ok(Self {
            config,
            config_path,
            layer_stack,
        })
    }

    /// Deserialize and validate the merged layers.
    pub(crate) fn resolve(layer_stack: &ConfigLayerStack) -> Result<CmdExecConfig> {
        let config: CmdExecConfig = serde_yaml::from_value(layer_stack.effective_config())
            .context("Failed to deserialize effective configuration")?;
        config
            .validate()
            .context("Configuration failed validation")?;
        Ok(config)
    }

    fn load_yaml_from_file(path: &Path) -> Result<Value> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let value: Value = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        // An empty document parses as null.
        Ok(match value {
            Value::Null => Value::Mapping(Mapping::new()),
            other => other,
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &CmdExecConfig {
        &self.config
    }

    /// Get the configuration file path (if loaded from file)
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn layer_stack(&self) -> &ConfigLayerStack {
        &self.layer_stack
    }
}
