//! Allowlist-guarded command execution without a shell. The crate exposes
//! a [`CommandExecutor`] trait implemented by a single-owner
//! [`CommandEngine`] and a lock-protected [`SharedCommandEngine`], plus the
//! guards, resolver and environment builder the engine is assembled from.

pub mod capture;
pub mod engine;
pub mod environment;
pub mod error;
pub mod executor;
pub mod policy;
pub mod resolver;

pub use capture::{CapturedStream, DEFAULT_MAX_OUTPUT_BYTES};
pub use engine::{CommandEngine, EngineBuilder, EngineConfig, SharedCommandEngine};
pub use environment::{ChildEnvironment, EnvironmentBuilder, PathBehavior};
pub use error::{ExecError, ExecutionFailure};
pub use executor::{
    CommandExecutor, ExecOptions, ExecOutcome, ExecutionResult, LaunchOutput, LaunchSpec,
    LaunchStatus, ProcessLauncher, SystemLauncher,
};
pub use policy::{AllowlistGuard, DirectoryGuard, DirectoryMatch};
pub use resolver::BinaryResolver;
