use std::fmt;
use std::path::PathBuf;

use serde_yaml::{Mapping, Value};

use crate::loader::merge_yaml_values;

/// Source of a configuration layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// YAML configuration file
    File { file: PathBuf },
    /// Process environment overrides, with the variables that were set
    Environment { variables: Vec<String> },
    /// Runtime `--set` overrides, with their dotted keys
    Runtime { keys: Vec<String> },
}

impl fmt::Display for ConfigLayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { file } => write!(f, "file {}", file.display()),
            Self::Environment { variables } => write!(f, "environment ({})", variables.join(", ")),
            Self::Runtime { keys } => write!(f, "runtime overrides ({})", keys.join(", ")),
        }
    }
}

/// A single layer of configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLayerEntry {
    pub source: ConfigLayerSource,
    pub config: Value,
}

impl ConfigLayerEntry {
    pub fn new(source: ConfigLayerSource, config: Value) -> Self {
        Self { source, config }
    }
}

/// Configuration layers ordered from lowest to highest precedence.
#[derive(Debug, Clone, Default)]
pub struct ConfigLayerStack {
    layers: Vec<ConfigLayerEntry>,
}

impl ConfigLayerStack {
    pub fn push(&mut self, layer: ConfigLayerEntry) {
        self.layers.push(layer);
    }

    /// Merge all layers into a single effective configuration.
    pub fn effective_config(&self) -> Value {
        let mut merged = Value::Mapping(Mapping::new());
        for layer in &self.layers {
            merge_yaml_values(&mut merged, &layer.config);
        }
        merged
    }

    pub fn layers(&self) -> &[ConfigLayerEntry] {
        &self.layers
    }
}
