use std::path::Path;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Split a command line into whitespace-delimited tokens. No quoting or
/// shell metacharacter handling is applied.
pub fn tokenize(command: &str) -> Vec<&str> {
    command.split_whitespace().collect()
}

/// First whitespace-delimited token of a command line.
pub fn program_name(command: &str) -> Option<&str> {
    command.split_whitespace().next()
}

/// Exact-match allowlist over program names.
///
/// Only the first token of a command is inspected, so `"ls"` admits
/// `"ls -la"` but never `"lsof"`. Arguments are not filtered.
#[derive(Debug, Clone, Default)]
pub struct AllowlistGuard {
    programs: IndexSet<String>,
}

impl AllowlistGuard {
    pub fn new(programs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let programs = programs
            .into_iter()
            .map(Into::into)
            .map(|program: String| program.trim().to_string())
            .filter(|program| !program.is_empty())
            .collect();
        Self { programs }
    }

    pub fn is_allowed(&self, command: &str) -> bool {
        program_name(command).is_some_and(|program| self.programs.contains(program))
    }

    /// Allowed programs in configuration order.
    pub fn programs(&self) -> Vec<String> {
        self.programs.iter().cloned().collect()
    }
}

/// How configured directory prefixes are compared against a candidate path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryMatch {
    /// Literal string prefix. `/tmp` admits `/tmp2`.
    #[default]
    Prefix,
    /// Whole path components. `/tmp` admits `/tmp/a` but not `/tmp2`.
    Segment,
}

/// Restricts which directories may become a working directory.
///
/// An empty prefix list places no restriction at all.
#[derive(Debug, Clone, Default)]
pub struct DirectoryGuard {
    prefixes: Vec<String>,
    mode: DirectoryMatch,
}

impl DirectoryGuard {
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(Into::into)
                .filter(|prefix: &String| !prefix.is_empty())
                .collect(),
            mode: DirectoryMatch::default(),
        }
    }

    pub fn with_mode(mut self, mode: DirectoryMatch) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> DirectoryMatch {
        self.mode
    }

    pub fn is_unrestricted(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn is_allowed(&self, path: &Path) -> bool {
        if self.prefixes.is_empty() {
            return true;
        }

        match self.mode {
            DirectoryMatch::Prefix => {
                let candidate = path.to_string_lossy();
                self.prefixes
                    .iter()
                    .any(|prefix| candidate.starts_with(prefix.as_str()))
            }
            DirectoryMatch::Segment => self
                .prefixes
                .iter()
                .any(|prefix| path.starts_with(Path::new(prefix))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tokenize_collapses_whitespace() {
        assert_eq!(tokenize("  git   status\t-s "), vec!["git", "status", "-s"]);
        assert!(tokenize("   ").is_empty());
        assert_eq!(program_name("\tls -la"), Some("ls"));
        assert_eq!(program_name(""), None);
    }

    #[test]
    fn allowlist_rejects_empty_and_unknown() {
        let guard = AllowlistGuard::new(["ls", "git"]);
        assert!(!guard.is_allowed(""));
        assert!(!guard.is_allowed("   "));
        assert!(!guard.is_allowed("rm -rf /"));
        assert!(guard.is_allowed("git push --force"));
    }

    #[test]
    fn allowlist_is_exact_token() {
        let guard = AllowlistGuard::new(["ls"]);
        assert!(guard.is_allowed("ls -la"));
        assert!(!guard.is_allowed("lsof -p 1"));
        assert!(!guard.is_allowed("/bin/ls"));
    }

    #[test]
    fn allowlist_keeps_config_order_without_duplicates() {
        let guard = AllowlistGuard::new(["git", "ls", "git", " ", "echo"]);
        assert_eq!(guard.programs(), vec!["git", "ls", "echo"]);
    }

    #[test]
    fn empty_directory_guard_is_fail_open() {
        let guard = DirectoryGuard::new(Vec::<String>::new());
        assert!(guard.is_unrestricted());
        assert!(guard.is_allowed(Path::new("/etc")));
    }

    #[test]
    fn prefix_mode_compares_strings() {
        let guard = DirectoryGuard::new(["/tmp"]);
        assert!(guard.is_allowed(Path::new("/tmp")));
        assert!(guard.is_allowed(Path::new("/tmp/work")));
        assert!(guard.is_allowed(Path::new("/tmp2")));
        assert!(!guard.is_allowed(Path::new("/var/tmp")));
    }

    #[test]
    fn segment_mode_compares_components() {
        let guard = DirectoryGuard::new(["/tmp"]).with_mode(DirectoryMatch::Segment);
        assert!(guard.is_allowed(Path::new("/tmp")));
        assert!(guard.is_allowed(Path::new("/tmp/work")));
        assert!(!guard.is_allowed(Path::new("/tmp2")));
    }

    proptest! {
        #[test]
        fn prop_extended_program_names_are_rejected(
            program in "[a-z]{1,8}",
            suffix in "[a-z0-9_-]{1,6}",
            args in prop::collection::vec("[a-zA-Z0-9_./-]+", 0..4)
        ) {
            let guard = AllowlistGuard::new([program.clone()]);
            let mut allowed = vec![program.clone()];
            allowed.extend(args.iter().cloned());
            prop_assert!(guard.is_allowed(&allowed.join(" ")));

            let mut extended = vec![format!("{program}{suffix}")];
            extended.extend(args.iter().cloned());
            prop_assert!(!guard.is_allowed(&extended.join(" ")));
        }
    }
}
