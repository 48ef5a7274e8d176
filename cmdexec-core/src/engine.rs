//! The command engine: allowlist, directory state, resolution and spawning.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::capture::DEFAULT_MAX_OUTPUT_BYTES;
use crate::environment::{EnvironmentBuilder, PATH_VAR, PathBehavior};
use crate::error::{ExecError, ExecutionFailure};
use crate::executor::{
    CommandExecutor, ExecOptions, ExecOutcome, ExecutionResult, LaunchSpec, ProcessLauncher,
    SystemLauncher,
};
use crate::policy::{AllowlistGuard, DirectoryGuard, DirectoryMatch, tokenize};
use crate::resolver::BinaryResolver;

const CHANGE_DIRECTORY: &str = "cd";
const PRINT_DIRECTORY: &str = "pwd";

/// Settings an engine is created from.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub allowed_commands: Vec<String>,
    pub default_working_dir: Option<PathBuf>,
    pub allowed_dirs: Vec<String>,
    pub allowed_dirs_match: DirectoryMatch,
    pub search_paths: Vec<PathBuf>,
    /// `prepend`, `append` or `replace`; anything else is treated as `prepend`.
    pub path_behavior: String,
    pub environment: HashMap<String, String>,
    pub max_output_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allowed_commands: Vec::new(),
            default_working_dir: None,
            allowed_dirs: Vec::new(),
            allowed_dirs_match: DirectoryMatch::default(),
            search_paths: Vec::new(),
            path_behavior: PathBehavior::default().as_str().to_string(),
            environment: HashMap::new(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// Builder for [`CommandEngine`] with injectable process context.
#[derive(Debug)]
pub struct EngineBuilder {
    config: EngineConfig,
    inherited_env: Option<HashMap<OsString, OsString>>,
    home_dir: Option<Option<PathBuf>>,
    launcher: Option<Arc<dyn ProcessLauncher>>,
}

impl EngineBuilder {
    /// Use this snapshot instead of the current process environment.
    pub fn inherited_env<K, V>(mut self, env: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<OsString>,
        V: Into<OsString>,
    {
        self.inherited_env = Some(
            env.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    /// Override the home directory used by bare `cd` and initial placement.
    pub fn home_dir(mut self, home: Option<PathBuf>) -> Self {
        self.home_dir = Some(home);
        self
    }

    pub fn launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn build(self) -> CommandEngine {
        let EngineConfig {
            allowed_commands,
            default_working_dir,
            allowed_dirs,
            allowed_dirs_match,
            search_paths,
            path_behavior,
            environment,
            max_output_bytes,
        } = self.config;

        let behavior = PathBehavior::from_config_value(&path_behavior);
        let home_dir = self.home_dir.unwrap_or_else(dirs::home_dir);
        let environment_builder = match self.inherited_env {
            Some(env) => EnvironmentBuilder::with_inherited(env),
            None => EnvironmentBuilder::from_process(),
        };
        let system_path = environment_builder.inherited_path().map(OsString::from);
        let environment_builder = environment_builder
            .global(environment)
            .search_paths(search_paths.clone(), behavior);

        let current_dir = initial_working_dir(default_working_dir, home_dir.as_deref());
        let allowlist = AllowlistGuard::new(allowed_commands);
        let directories =
            DirectoryGuard::new(with_canonical_forms(allowed_dirs)).with_mode(allowed_dirs_match);

        info!(
            allowed_commands = ?allowlist.programs(),
            working_dir = %current_dir.display(),
            path_behavior = %behavior,
            dirs_restricted = !directories.is_unrestricted(),
            dirs_match = ?directories.mode(),
            "creating command engine"
        );

        CommandEngine {
            allowlist,
            directories,
            resolver: BinaryResolver::new(search_paths, behavior).with_system_path(system_path),
            environment: environment_builder,
            current_dir,
            home_dir,
            max_output_bytes: max_output_bytes.max(1),
            launcher: self.launcher.unwrap_or_else(|| Arc::new(SystemLauncher::new())),
        }
    }
}

/// Add the canonical spelling of each existing allowed directory, so a
/// prefix configured through a symlink still admits canonicalized targets.
fn with_canonical_forms(dirs: Vec<String>) -> Vec<String> {
    let mut expanded = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let canonical = dunce::canonicalize(&dir)
            .ok()
            .map(|path| path.to_string_lossy().into_owned())
            .filter(|canonical| canonical != &dir);
        expanded.push(dir);
        if let Some(canonical) = canonical {
            debug!(canonical = %canonical, "allowed directory resolves through a link");
            expanded.push(canonical);
        }
    }
    expanded
}

fn initial_working_dir(configured: Option<PathBuf>, home: Option<&Path>) -> PathBuf {
    let fallback = std::env::temp_dir();
    let candidate = configured
        .filter(|dir| !dir.as_os_str().is_empty())
        .or_else(|| home.map(Path::to_path_buf));

    match candidate {
        Some(dir) if dir.is_dir() => dunce::canonicalize(&dir).unwrap_or(dir),
        Some(dir) => {
            warn!(
                original_dir = %dir.display(),
                fallback = %fallback.display(),
                "default working directory does not exist, falling back to temp dir"
            );
            fallback
        }
        None => fallback,
    }
}

/// Executes allowlisted commands and tracks a persistent working directory.
#[derive(Debug)]
pub struct CommandEngine {
    allowlist: AllowlistGuard,
    directories: DirectoryGuard,
    resolver: BinaryResolver,
    environment: EnvironmentBuilder,
    current_dir: PathBuf,
    home_dir: Option<PathBuf>,
    max_output_bytes: usize,
    launcher: Arc<dyn ProcessLauncher>,
}

impl CommandEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            inherited_env: None,
            home_dir: None,
            launcher: None,
        }
    }

    pub fn execute(&mut self, command: &str, options: ExecOptions) -> ExecOutcome {
        let tokens = tokenize(command);
        let Some((&program, args)) = tokens.split_first() else {
            return Err(failure(command, &self.current_dir, ExecError::EmptyCommand));
        };

        if !self.allowlist.is_allowed(command) {
            warn!(command, "command not allowed");
            return Err(failure(
                command,
                &self.current_dir,
                ExecError::CommandNotAllowed(command.to_string()),
            ));
        }

        let scoped_dir = options
            .working_dir
            .filter(|dir| !dir.as_os_str().is_empty());

        match scoped_dir {
            Some(dir) => self.execute_scoped(command, program, args, &dir, options.env.as_ref()),
            None => match program {
                CHANGE_DIRECTORY => self.change_directory(command, args.first().copied()),
                PRINT_DIRECTORY => Ok(print_directory(command, &self.current_dir)),
                _ => self.run(command, args, &self.current_dir, options.env.as_ref()),
            },
        }
    }

    fn execute_scoped(
        &self,
        command: &str,
        program: &str,
        args: &[&str],
        requested: &Path,
        env: Option<&HashMap<String, String>>,
    ) -> ExecOutcome {
        let dir = self
            .validate_directory(requested)
            .map_err(|error| failure(command, &self.current_dir, error))?;

        match program {
            CHANGE_DIRECTORY => Err(failure(
                command,
                &dir,
                ExecError::UnsupportedInScope(CHANGE_DIRECTORY.to_string()),
            )),
            PRINT_DIRECTORY => Ok(print_directory(command, &dir)),
            _ => self.run(command, args, &dir, env),
        }
    }

    fn change_directory(&mut self, command: &str, target: Option<&str>) -> ExecOutcome {
        let new_dir = match target {
            None => self
                .home_dir
                .clone()
                .ok_or(ExecError::HomeNotSet)
                .map_err(|error| failure(command, &self.current_dir, error))?,
            Some(target) => self
                .validate_directory(Path::new(target))
                .map_err(|error| failure(command, &self.current_dir, error))?,
        };

        debug!(from = %self.current_dir.display(), to = %new_dir.display(), "changing directory");
        self.current_dir = new_dir;

        Ok(ExecutionResult::new(command, &self.current_dir)
            .with_stdout(format!("Changed directory to {}", self.current_dir.display())))
    }

    /// Resolve `target` against the ambient directory and check it may be used.
    fn validate_directory(&self, target: &Path) -> Result<PathBuf, ExecError> {
        let joined = self.current_dir.join(target);
        let dir = dunce::canonicalize(&joined).unwrap_or(joined);

        if !dir.exists() {
            return Err(ExecError::DirectoryNotFound(dir));
        }
        if !dir.is_dir() {
            return Err(ExecError::NotADirectory(dir));
        }
        if !self.directories.is_allowed(&dir) {
            warn!(dir = %dir.display(), "access to directory not allowed");
            return Err(ExecError::DirectoryNotAllowed(dir));
        }
        Ok(dir)
    }

    fn run(
        &self,
        command: &str,
        args: &[&str],
        dir: &Path,
        env: Option<&HashMap<String, String>>,
    ) -> ExecOutcome {
        let program = self
            .resolver
            .resolve(command, dir)
            .map_err(|error| failure(command, dir, error))?;

        let spec = LaunchSpec {
            program,
            args: args.iter().map(|arg| (*arg).to_string()).collect(),
            working_dir: dir.to_path_buf(),
            env: self.environment.build(env),
            max_output_bytes: self.max_output_bytes,
        };

        debug!(
            program = %spec.program.display(),
            args = ?spec.args,
            working_dir = %dir.display(),
            "spawning command"
        );

        let output = match self.launcher.launch(&spec) {
            Ok(output) => output,
            Err(err) => {
                warn!(command, error = %err, "failed to start command");
                return Err(failure(
                    command,
                    dir,
                    ExecError::ProcessExecutionFailed {
                        message: err.to_string(),
                        exit_code: None,
                    },
                ));
            }
        };

        let truncated = output.stdout.truncated || output.stderr.truncated;
        let mut result = ExecutionResult {
            truncated,
            stdout: output.stdout.into_lossy_string(),
            stderr: output.stderr.into_lossy_string(),
            ..ExecutionResult::new(command, dir)
        };

        if output.status.success() {
            return Ok(result);
        }

        let error = ExecError::ProcessExecutionFailed {
            message: output.status.to_string(),
            exit_code: output.status.code(),
        };
        debug!(command, status = %output.status, "command failed");
        result.exit_code = error.exit_code();
        result.error = Some(error.to_string());
        Err(ExecutionFailure::new(error, result))
    }

    pub fn is_command_allowed(&self, command: &str) -> bool {
        self.allowlist.is_allowed(command)
    }

    pub fn allowed_commands(&self) -> Vec<String> {
        self.allowlist.programs()
    }

    pub fn current_working_dir(&self) -> &Path {
        &self.current_dir
    }

    pub fn is_directory_allowed(&self, path: &Path) -> bool {
        self.directories.is_allowed(path)
    }

    pub fn path_behavior(&self) -> PathBehavior {
        self.resolver.behavior()
    }

    /// Resolve the program of `command` relative to the ambient directory
    /// without running it.
    pub fn resolve_binary(&self, command: &str) -> Result<PathBuf, ExecError> {
        self.resolver.resolve(command, &self.current_dir)
    }

    /// `PATH` a child would receive with no per-call overrides.
    pub fn effective_path(&self) -> Option<OsString> {
        self.environment
            .build(None)
            .get(PATH_VAR)
            .map(OsStr::to_os_string)
    }

    /// Human-readable summary of what this engine may run.
    pub fn tool_description(&self) -> String {
        format!(
            "Execute a system command from a predefined allowed list. \
             Recommended to specify the directory to execute the command in using the `working_dir` parameter. \
             Allowed commands: {}",
            self.allowed_commands().join(", ")
        )
    }
}

impl CommandExecutor for CommandEngine {
    fn execute(&mut self, command: &str, options: ExecOptions) -> ExecOutcome {
        CommandEngine::execute(self, command, options)
    }

    fn is_command_allowed(&self, command: &str) -> bool {
        CommandEngine::is_command_allowed(self, command)
    }

    fn allowed_commands(&self) -> Vec<String> {
        CommandEngine::allowed_commands(self)
    }

    fn current_working_dir(&self) -> PathBuf {
        self.current_dir.clone()
    }

    fn is_directory_allowed(&self, path: &Path) -> bool {
        CommandEngine::is_directory_allowed(self, path)
    }
}

fn failure(command: &str, working_dir: &Path, error: ExecError) -> ExecutionFailure {
    let result = ExecutionResult {
        exit_code: error.exit_code(),
        error: Some(error.to_string()),
        ..ExecutionResult::new(command, working_dir)
    };
    ExecutionFailure::new(error, result)
}

fn print_directory(command: &str, dir: &Path) -> ExecutionResult {
    ExecutionResult::new(command, dir).with_stdout(dir.display().to_string())
}

/// A [`CommandEngine`] shared between callers.
///
/// Each call holds the lock from reading the working directory until the
/// child has exited, so concurrent callers are serialized.
#[derive(Debug, Clone)]
pub struct SharedCommandEngine {
    inner: Arc<Mutex<CommandEngine>>,
}

impl SharedCommandEngine {
    pub fn new(engine: CommandEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn execute(&self, command: &str, options: ExecOptions) -> ExecOutcome {
        self.inner.lock().execute(command, options)
    }

    pub fn tool_description(&self) -> String {
        self.inner.lock().tool_description()
    }
}

impl From<CommandEngine> for SharedCommandEngine {
    fn from(engine: CommandEngine) -> Self {
        Self::new(engine)
    }
}

impl CommandExecutor for SharedCommandEngine {
    fn execute(&mut self, command: &str, options: ExecOptions) -> ExecOutcome {
        SharedCommandEngine::execute(self, command, options)
    }

    fn is_command_allowed(&self, command: &str) -> bool {
        self.inner.lock().is_command_allowed(command)
    }

    fn allowed_commands(&self) -> Vec<String> {
        self.inner.lock().allowed_commands()
    }

    fn current_working_dir(&self) -> PathBuf {
        self.inner.lock().current_working_dir().to_path_buf()
    }

    fn is_directory_allowed(&self, path: &Path) -> bool {
        self.inner.lock().is_directory_allowed(path)
    }
}
