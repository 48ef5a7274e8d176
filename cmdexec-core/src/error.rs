use std::path::PathBuf;

use crate::executor::ExecutionResult;

/// Exit code reported when a failure carries no process exit code of its own.
pub const DEFAULT_FAILURE_CODE: i32 = 1;

/// Reasons a single `execute` call can fail. None of them are fatal to the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    #[error("empty command")]
    EmptyCommand,

    #[error("command not allowed: {0}")]
    CommandNotAllowed(String),

    #[error("Directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Access to directory not allowed: {}", .0.display())]
    DirectoryNotAllowed(PathBuf),

    #[error("command not found: {0}")]
    BinaryNotFound(String),

    #[error("not executable: {}", .0.display())]
    NotExecutable(PathBuf),

    #[error("home directory is not available")]
    HomeNotSet,

    #[error("{0} command is not supported when using a temporary working directory")]
    UnsupportedInScope(String),

    #[error("{message}")]
    ProcessExecutionFailed {
        message: String,
        exit_code: Option<i32>,
    },
}

impl ExecError {
    /// Exit code to record in the [`ExecutionResult`] for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ProcessExecutionFailed {
                exit_code: Some(code),
                ..
            } => *code,
            _ => DEFAULT_FAILURE_CODE,
        }
    }

    /// True for failures detected before any process was spawned.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::ProcessExecutionFailed { .. })
    }
}

/// A failed call: the typed error plus the structured result describing it.
///
/// Callers branch on [`ExecutionFailure::error`] and still get a complete
/// result (working directory, captured output, readable error string).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{error}")]
pub struct ExecutionFailure {
    #[source]
    error: ExecError,
    result: Box<ExecutionResult>,
}

impl ExecutionFailure {
    pub(crate) fn new(error: ExecError, result: ExecutionResult) -> Self {
        Self {
            error,
            result: Box::new(result),
        }
    }

    pub fn error(&self) -> &ExecError {
        &self.error
    }

    pub fn result(&self) -> &ExecutionResult {
        &self.result
    }

    pub fn into_result(self) -> ExecutionResult {
        *self.result
    }

    pub fn into_parts(self) -> (ExecError, ExecutionResult) {
        (self.error, *self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_reported_errors() {
        assert_eq!(ExecError::EmptyCommand.to_string(), "empty command");
        assert_eq!(
            ExecError::CommandNotAllowed("rm -rf /".into()).to_string(),
            "command not allowed: rm -rf /"
        );
        assert_eq!(
            ExecError::UnsupportedInScope("cd".into()).to_string(),
            "cd command is not supported when using a temporary working directory"
        );
        assert_eq!(
            ExecError::DirectoryNotAllowed(PathBuf::from("/etc")).to_string(),
            "Access to directory not allowed: /etc"
        );
    }

    #[test]
    fn exit_code_prefers_process_code() {
        let failed = ExecError::ProcessExecutionFailed {
            message: "exit status 3".into(),
            exit_code: Some(3),
        };
        assert_eq!(failed.exit_code(), 3);
        assert!(!failed.is_validation());

        let spawn = ExecError::ProcessExecutionFailed {
            message: "No such file or directory".into(),
            exit_code: None,
        };
        assert_eq!(spawn.exit_code(), DEFAULT_FAILURE_CODE);
        assert_eq!(ExecError::HomeNotSet.exit_code(), DEFAULT_FAILURE_CODE);
        assert!(ExecError::HomeNotSet.is_validation());
    }
}
