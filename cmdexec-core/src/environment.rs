//! Child process environment assembly.
//!
//! Precedence is `inherited < global configuration < per-call`, after which
//! `PATH` is recomputed from the configured search paths according to the
//! [`PathBehavior`].

use std::collections::{BTreeMap, HashMap};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const PATH_VAR: &str = "PATH";

#[cfg(windows)]
pub const PATH_LIST_SEPARATOR: &str = ";";
#[cfg(not(windows))]
pub const PATH_LIST_SEPARATOR: &str = ":";

/// How configured search paths combine with the inherited `PATH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathBehavior {
    #[default]
    Prepend,
    Append,
    Replace,
}

impl PathBehavior {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "prepend" => Some(Self::Prepend),
            "append" => Some(Self::Append),
            "replace" => Some(Self::Replace),
            _ => None,
        }
    }

    /// Parse a configured value, falling back to [`PathBehavior::Prepend`]
    /// for anything unrecognized.
    pub fn from_config_value(value: &str) -> Self {
        Self::parse(value).unwrap_or_else(|| {
            warn!(
                value,
                "invalid path_behavior setting, using default 'prepend'"
            );
            Self::Prepend
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prepend => "prepend",
            Self::Append => "append",
            Self::Replace => "replace",
        }
    }

    /// Whether the ambient `PATH` may still be consulted.
    pub fn allows_system_lookup(self) -> bool {
        self != Self::Replace
    }

    /// Combine the configured entries with an existing `PATH` value.
    pub fn merge(self, configured: impl AsRef<OsStr>, existing: impl AsRef<OsStr>) -> OsString {
        let (configured, existing) = (configured.as_ref(), existing.as_ref());
        let (first, second) = match self {
            Self::Replace => return configured.to_os_string(),
            _ if existing.is_empty() => return configured.to_os_string(),
            Self::Prepend => (configured, existing),
            Self::Append => (existing, configured),
        };
        let mut merged = OsString::with_capacity(first.len() + second.len() + 1);
        merged.push(first);
        merged.push(PATH_LIST_SEPARATOR);
        merged.push(second);
        merged
    }
}

impl fmt::Display for PathBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully merged environment handed to a child process.
///
/// Names and values are kept as raw OS strings so inherited entries that
/// are not valid UTF-8 reach the child unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildEnvironment {
    vars: BTreeMap<OsString, OsString>,
}

impl ChildEnvironment {
    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }
}

/// Builds [`ChildEnvironment`]s from an inherited snapshot plus configuration.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentBuilder {
    inherited: HashMap<OsString, OsString>,
    global: HashMap<String, String>,
    search_paths: Vec<PathBuf>,
    behavior: PathBehavior,
}

impl EnvironmentBuilder {
    /// Start from the current process environment, byte for byte.
    pub fn from_process() -> Self {
        Self::with_inherited(std::env::vars_os())
    }

    pub fn with_inherited<K, V>(inherited: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            inherited: inherited
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn global(mut self, global: HashMap<String, String>) -> Self {
        self.global = global;
        self
    }

    pub fn search_paths(mut self, paths: Vec<PathBuf>, behavior: PathBehavior) -> Self {
        self.search_paths = paths;
        self.behavior = behavior;
        self
    }

    /// Value of `PATH` in the inherited snapshot.
    pub fn inherited_path(&self) -> Option<&OsStr> {
        self.inherited.get(OsStr::new(PATH_VAR)).map(OsString::as_os_str)
    }

    fn configured_path(&self) -> OsString {
        let mut joined = OsString::new();
        for (index, path) in self.search_paths.iter().enumerate() {
            if index > 0 {
                joined.push(PATH_LIST_SEPARATOR);
            }
            joined.push(path.as_os_str());
        }
        joined
    }

    pub fn build(&self, additional: Option<&HashMap<String, String>>) -> ChildEnvironment {
        let mut vars: BTreeMap<OsString, OsString> = self
            .inherited
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let overlays = self.global.iter().chain(additional.into_iter().flatten());
        for (key, value) in overlays {
            vars.insert(OsString::from(key), OsString::from(value));
        }

        if !self.search_paths.is_empty() {
            let existing = vars.get(OsStr::new(PATH_VAR)).cloned().unwrap_or_default();
            let merged = self.behavior.merge(self.configured_path(), existing);
            vars.insert(OsString::from(PATH_VAR), merged);
        }

        debug!(
            path = ?vars.get(OsStr::new(PATH_VAR)),
            path_behavior = %self.behavior,
            custom_env_count = additional.map_or(0, HashMap::len),
            "environment variables set"
        );

        ChildEnvironment { vars }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn joined(parts: &[&str]) -> OsString {
        OsString::from(parts.join(PATH_LIST_SEPARATOR))
    }

    fn builder_with_path(behavior: PathBehavior) -> EnvironmentBuilder {
        EnvironmentBuilder::with_inherited(vars(&[("PATH", "C")]))
            .search_paths(vec![PathBuf::from("A"), PathBuf::from("B")], behavior)
    }

    #[test]
    fn path_behaviors_merge_in_order() {
        let prepend = builder_with_path(PathBehavior::Prepend).build(None);
        assert_eq!(prepend.get("PATH"), Some(joined(&["A", "B", "C"]).as_os_str()));

        let append = builder_with_path(PathBehavior::Append).build(None);
        assert_eq!(append.get("PATH"), Some(joined(&["C", "A", "B"]).as_os_str()));

        let replace = builder_with_path(PathBehavior::Replace).build(None);
        assert_eq!(replace.get("PATH"), Some(joined(&["A", "B"]).as_os_str()));
    }

    #[test]
    fn replace_discards_inherited_entries() {
        let builder = EnvironmentBuilder::with_inherited(vars(&[("PATH", "/usr/bin:/bin")]))
            .search_paths(
                vec![PathBuf::from("/test/path1"), PathBuf::from("/test/path2")],
                PathBehavior::Replace,
            );
        let env = builder.build(None);
        assert_eq!(
            env.get("PATH"),
            Some(joined(&["/test/path1", "/test/path2"]).as_os_str())
        );
    }

    #[test]
    fn empty_search_paths_leave_path_untouched() {
        let builder = EnvironmentBuilder::with_inherited(vars(&[("PATH", "/usr/bin")]))
            .search_paths(Vec::new(), PathBehavior::Replace);
        let per_call = vars(&[("PATH", "/opt/bin")]);
        assert_eq!(builder.build(None).get("PATH"), Some(OsStr::new("/usr/bin")));
        assert_eq!(
            builder.build(Some(&per_call)).get("PATH"),
            Some(OsStr::new("/opt/bin"))
        );
    }

    #[test]
    fn missing_path_does_not_leave_dangling_separator() {
        let builder = EnvironmentBuilder::with_inherited(HashMap::<String, String>::new())
            .search_paths(vec![PathBuf::from("/opt/tools")], PathBehavior::Append);
        assert_eq!(builder.build(None).get("PATH"), Some(OsStr::new("/opt/tools")));
    }

    #[test]
    fn per_call_overrides_global_overrides_inherited() {
        let builder = EnvironmentBuilder::with_inherited(vars(&[("MODE", "inherited")]))
            .global(vars(&[("MODE", "global"), ("ONLY_GLOBAL", "g")]));
        let per_call = vars(&[("MODE", "call"), ("ONLY_CALL", "c")]);
        let env = builder.build(Some(&per_call));

        assert_eq!(env.get("MODE"), Some(OsStr::new("call")));
        assert_eq!(env.get("ONLY_GLOBAL"), Some(OsStr::new("g")));
        assert_eq!(env.get("ONLY_CALL"), Some(OsStr::new("c")));
    }

    #[test]
    fn path_merge_sees_overlaid_value() {
        let builder = EnvironmentBuilder::with_inherited(vars(&[("PATH", "C")]))
            .global(vars(&[("PATH", "G")]))
            .search_paths(vec![PathBuf::from("A")], PathBehavior::Prepend);
        assert_eq!(builder.build(None).get("PATH"), Some(joined(&["A", "G"]).as_os_str()));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_inherited_entries_survive() {
        use std::os::unix::ffi::OsStringExt;

        let raw_value = OsString::from_vec(b"f\xff".to_vec());
        let raw_key = OsString::from_vec(b"K\xfe".to_vec());
        let builder = EnvironmentBuilder::with_inherited([
            (OsString::from("RAW_BYTES"), raw_value.clone()),
            (raw_key.clone(), OsString::from("v")),
        ]);
        let env = builder.build(None);

        assert_eq!(env.get("RAW_BYTES"), Some(raw_value.as_os_str()));
        assert_eq!(env.get(&raw_key), Some(OsStr::new("v")));
        assert_eq!(env.iter().count(), 2);
    }

    #[test]
    fn unknown_behavior_falls_back_to_prepend() {
        assert_eq!(PathBehavior::from_config_value("sideways"), PathBehavior::Prepend);
        assert_eq!(PathBehavior::from_config_value(" Replace "), PathBehavior::Replace);
        assert_eq!(PathBehavior::parse(""), None);
        assert!(!PathBehavior::Replace.allows_system_lookup());
        assert!(PathBehavior::Append.allows_system_lookup());
    }
}
