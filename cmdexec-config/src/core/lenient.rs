//! Deserializers that accept any YAML scalar where a string is expected.
//!
//! `environment: {DEBUG: 1}` and `--set command_exec.environment.LEVEL=2`
//! both produce numbers; settings that end up as strings take them as-is.

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

use crate::core::commands::parse_command_list;

fn scalar_to_string<E: serde::de::Error>(value: Value, what: &str) -> Result<String, E> {
    match value {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Null => Ok(String::new()),
        Value::Tagged(tagged) => scalar_to_string(tagged.value, what),
        Value::Sequence(_) | Value::Mapping(_) => {
            Err(E::custom(format!("{what} must be a scalar value")))
        }
    }
}

pub(crate) fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    scalar_to_string(Value::deserialize(deserializer)?, "value")
}

pub(crate) fn string_map<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IndexMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    raw.into_iter()
        .map(|(key, value)| {
            let value = scalar_to_string::<D::Error>(value, &format!("environment variable {key}"))?;
            Ok((key, value))
        })
        .collect()
}

/// A sequence of scalars, or a single comma separated string.
pub(crate) fn command_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| scalar_to_string(item, "command entry"))
            .collect(),
        Value::Mapping(_) => Err(D::Error::custom(
            "expected a list of commands or a comma separated string",
        )),
        other => Ok(parse_command_list(&scalar_to_string::<D::Error>(
            other,
            "command list",
        )?)),
    }
}
