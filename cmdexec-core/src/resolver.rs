use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::environment::PathBehavior;
use crate::error::ExecError;
use crate::policy::program_name;

/// Maps a program name to the executable that will be spawned.
///
/// Lookup order: explicit path, configured search paths, then the system
/// `PATH` unless the behavior is [`PathBehavior::Replace`].
#[derive(Debug, Clone, Default)]
pub struct BinaryResolver {
    search_paths: Vec<PathBuf>,
    behavior: PathBehavior,
    system_path: Option<OsString>,
}

impl BinaryResolver {
    pub fn new(search_paths: Vec<PathBuf>, behavior: PathBehavior) -> Self {
        Self {
            search_paths,
            behavior,
            system_path: std::env::var_os("PATH"),
        }
    }

    /// Replace the `PATH` value used for the system fallback.
    pub fn with_system_path(mut self, system_path: Option<OsString>) -> Self {
        self.system_path = system_path;
        self
    }

    pub fn behavior(&self) -> PathBehavior {
        self.behavior
    }

    pub fn resolve(&self, command: &str, cwd: &Path) -> Result<PathBuf, ExecError> {
        let program = program_name(command).ok_or(ExecError::EmptyCommand)?;
        let candidate = Path::new(program);

        if candidate.is_absolute() {
            return check_explicit(program, candidate.to_path_buf());
        }

        if has_separator(program) {
            return check_explicit(program, cwd.join(candidate));
        }

        for dir in &self.search_paths {
            let path = dir.join(program);
            if is_executable_file(&path) {
                debug!(program, path = %path.display(), "resolved from search path");
                return Ok(path);
            }
        }

        if self.behavior.allows_system_lookup()
            && let Ok(path) = which::which_in(program, self.system_path.as_ref(), cwd)
        {
            debug!(program, path = %path.display(), "resolved from system PATH");
            return Ok(path);
        }

        debug!(
            program,
            path_behavior = %self.behavior,
            "executable not found"
        );
        Err(ExecError::BinaryNotFound(program.to_string()))
    }
}

fn has_separator(program: &str) -> bool {
    program.contains('/') || (cfg!(windows) && program.contains('\\'))
}

fn check_explicit(program: &str, path: PathBuf) -> Result<PathBuf, ExecError> {
    let metadata =
        fs::metadata(&path).map_err(|_| ExecError::BinaryNotFound(program.to_string()))?;
    if metadata.is_dir() || !has_exec_bits(&metadata) {
        return Err(ExecError::NotExecutable(path));
    }
    Ok(path)
}

/// Regular file with at least one executable permission bit.
pub fn is_executable_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|metadata| metadata.is_file() && has_exec_bits(&metadata))
}

#[cfg(unix)]
fn has_exec_bits(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_exec_bits(metadata: &fs::Metadata) -> bool {
    metadata.is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, mode: u32) -> std::io::Result<PathBuf> {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\necho stub\n")?;
        fs::set_permissions(&path, fs::Permissions::from_mode(mode))?;
        Ok(path)
    }

    #[test]
    fn absolute_paths_are_checked_not_searched() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        let tool = write_file(dir.path(), "tool", 0o755)?;
        let plain = write_file(dir.path(), "plain", 0o644)?;
        let resolver = BinaryResolver::new(Vec::new(), PathBehavior::Replace);

        assert_eq!(resolver.resolve(&tool.to_string_lossy(), dir.path()), Ok(tool));
        assert_eq!(
            resolver.resolve(&plain.to_string_lossy(), dir.path()),
            Err(ExecError::NotExecutable(plain))
        );
        assert_eq!(
            resolver.resolve(&dir.path().to_string_lossy(), dir.path()),
            Err(ExecError::NotExecutable(dir.path().to_path_buf()))
        );
        assert_eq!(
            resolver.resolve("/definitely/missing/bin", dir.path()),
            Err(ExecError::BinaryNotFound("/definitely/missing/bin".into()))
        );
        Ok(())
    }

    #[test]
    fn relative_paths_join_the_working_directory() -> std::io::Result<()> {
        let dir = TempDir::new()?;
        fs::create_dir(dir.path().join("bin"))?;
        let tool = write_file(&dir.path().join("bin"), "tool", 0o755)?;
        let resolver = BinaryResolver::new(Vec::new(), PathBehavior::Replace);

        assert_eq!(resolver.resolve("bin/tool --flag", dir.path()), Ok(tool.clone()));
        assert_eq!(
            resolver.resolve("./bin/tool", dir.path()),
            Ok(dir.path().join("./bin/tool"))
        );
        Ok(())
    }

    #[test]
    fn first_search_path_wins_and_skips_non_executables() -> std::io::Result<()> {
        let first = TempDir::new()?;
        let second = TempDir::new()?;
        write_file(first.path(), "tool", 0o644)?;
        let winner = write_file(second.path(), "tool", 0o755)?;
        let shadowed = TempDir::new()?;
        write_file(shadowed.path(), "tool", 0o755)?;

        let resolver = BinaryResolver::new(
            vec![
                first.path().to_path_buf(),
                second.path().to_path_buf(),
                shadowed.path().to_path_buf(),
            ],
            PathBehavior::Prepend,
        )
        .with_system_path(None);

        assert_eq!(resolver.resolve("tool --version", first.path()), Ok(winner));
        Ok(())
    }

    #[test]
    fn replace_disables_system_lookup() -> std::io::Result<()> {
        let system = TempDir::new()?;
        let tool = write_file(system.path(), "systool", 0o755)?;
        let system_path = Some(system.path().as_os_str().to_os_string());

        let prepend = BinaryResolver::new(Vec::new(), PathBehavior::Prepend)
            .with_system_path(system_path.clone());
        assert_eq!(prepend.resolve("systool", system.path()), Ok(tool));

        let replace =
            BinaryResolver::new(Vec::new(), PathBehavior::Replace).with_system_path(system_path);
        assert_eq!(
            replace.resolve("systool", system.path()),
            Err(ExecError::BinaryNotFound("systool".into()))
        );
        Ok(())
    }

    #[test]
    fn empty_command_is_rejected() {
        let resolver = BinaryResolver::default();
        assert_eq!(
            resolver.resolve("  ", Path::new("/")),
            Err(ExecError::EmptyCommand)
        );
    }
}
