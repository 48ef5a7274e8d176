use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use serde::Serialize;

use crate::capture::{CapturedStream, read_bounded};
use crate::environment::ChildEnvironment;
use crate::error::ExecutionFailure;

/// Per-call options. Neither field survives past the call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    pub working_dir: Option<PathBuf>,
    pub env: Option<HashMap<String, String>>,
}

impl ExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn envs(mut self, vars: HashMap<String, String>) -> Self {
        self.env.get_or_insert_with(HashMap::new).extend(vars);
        self
    }
}

/// Structured outcome of one `execute` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub command: String,
    pub working_dir: PathBuf,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub truncated: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ExecutionResult {
    pub fn new(command: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            working_dir: working_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.error.is_none()
    }
}

pub type ExecOutcome = Result<ExecutionResult, ExecutionFailure>;

/// Capability surface shared by the engine and its thread-safe wrapper.
pub trait CommandExecutor {
    fn execute(&mut self, command: &str, options: ExecOptions) -> ExecOutcome;

    fn is_command_allowed(&self, command: &str) -> bool;

    fn allowed_commands(&self) -> Vec<String>;

    fn current_working_dir(&self) -> PathBuf;

    fn is_directory_allowed(&self, path: &Path) -> bool;
}

/// Fully resolved process launch.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env: ChildEnvironment,
    pub max_output_bytes: usize,
}

/// How a launched process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchStatus {
    code: Option<i32>,
    signal: Option<i32>,
}

impl LaunchStatus {
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn signaled(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn signal(&self) -> Option<i32> {
        self.signal
    }
}

impl fmt::Display for LaunchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit status {code}"),
            (None, Some(signal)) => write!(f, "terminated by signal {signal}"),
            (None, None) => f.write_str("terminated abnormally"),
        }
    }
}

impl From<ExitStatus> for LaunchStatus {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LaunchOutput {
    pub status: LaunchStatus,
    pub stdout: CapturedStream,
    pub stderr: CapturedStream,
}

/// Spawns resolved programs. Swappable so callers can observe or stub spawns.
pub trait ProcessLauncher: Send + Sync + fmt::Debug {
    fn launch(&self, spec: &LaunchSpec) -> io::Result<LaunchOutput>;
}

/// Runs programs directly via [`std::process::Command`], without a shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, spec: &LaunchSpec) -> io::Result<LaunchOutput> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .env_clear()
            .envs(spec.env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn()?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let limit = spec.max_output_bytes;

        let (stdout, stderr) = thread::scope(|scope| {
            let stdout = scope.spawn(move || capture(stdout, limit));
            let stderr = scope.spawn(move || capture(stderr, limit));
            (join_capture(stdout), join_capture(stderr))
        });

        let status = child.wait()?;

        Ok(LaunchOutput {
            status: LaunchStatus::from(status),
            stdout: stdout?,
            stderr: stderr?,
        })
    }
}

fn capture<R: Read>(stream: Option<R>, limit: usize) -> io::Result<CapturedStream> {
    match stream {
        Some(mut reader) => read_bounded(&mut reader, limit),
        None => Ok(CapturedStream::default()),
    }
}

fn join_capture(
    handle: thread::ScopedJoinHandle<'_, io::Result<CapturedStream>>,
) -> io::Result<CapturedStream> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("output capture thread panicked")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_omits_absent_error_and_truncation() -> serde_json::Result<()> {
        let ok = ExecutionResult::new("echo hi", "/tmp").with_stdout("hi\n");
        let value = serde_json::to_value(&ok)?;
        assert_eq!(
            value,
            serde_json::json!({
                "command": "echo hi",
                "working_dir": "/tmp",
                "stdout": "hi\n",
                "stderr": "",
                "exit_code": 0,
            })
        );

        let failed = ExecutionResult {
            exit_code: 1,
            error: Some("empty command".into()),
            truncated: true,
            ..ExecutionResult::new("", "/tmp")
        };
        let value = serde_json::to_value(&failed)?;
        assert_eq!(value["error"], "empty command");
        assert_eq!(value["truncated"], true);
        assert!(!failed.success());
        Ok(())
    }

    #[test]
    fn status_messages() {
        assert_eq!(LaunchStatus::exited(3).to_string(), "exit status 3");
        assert_eq!(LaunchStatus::signaled(9).to_string(), "terminated by signal 9");
        assert!(LaunchStatus::exited(0).success());
        assert!(!LaunchStatus::signaled(15).success());
    }

    #[test]
    fn options_accumulate_env() {
        let options = ExecOptions::new()
            .working_dir("/tmp")
            .env("A", "1")
            .env("B", "2");
        assert_eq!(options.working_dir.as_deref(), Some(Path::new("/tmp")));
        assert_eq!(options.env.map(|env| env.len()), Some(2));
    }

    #[cfg(unix)]
    #[test]
    fn system_launcher_runs_without_shell() -> io::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let spec = LaunchSpec {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".into(), "printf out; printf err >&2; exit 4".into()],
            working_dir: dir.path().to_path_buf(),
            env: ChildEnvironment::default(),
            max_output_bytes: 1024,
        };
        let output = SystemLauncher::new().launch(&spec)?;
        assert_eq!(output.status.code(), Some(4));
        assert_eq!(output.stdout.into_lossy_string(), "out");
        assert_eq!(output.stderr.into_lossy_string(), "err");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn system_launcher_caps_each_stream() -> io::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let spec = LaunchSpec {
            program: PathBuf::from("/bin/sh"),
            args: vec![
                "-c".into(),
                "i=0; while [ $i -lt 2000 ]; do printf 0123456789; i=$((i+1)); done".into(),
            ],
            working_dir: dir.path().to_path_buf(),
            env: ChildEnvironment::default(),
            max_output_bytes: 100,
        };
        let output = SystemLauncher::new().launch(&spec)?;
        assert!(output.status.success());
        assert_eq!(output.stdout.bytes.len(), 100);
        assert!(output.stdout.truncated);
        assert!(!output.stderr.truncated);
        Ok(())
    }
}
