use std::fs::OpenOptions;
use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use cmdexec_config::{CmdExecConfig, LogLevel};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const LOG_TARGETS: &[&str] = &["cmdexec", "cmdexec_core", "cmdexec_config"];

fn effective_level(config: &CmdExecConfig, verbose: bool) -> LogLevel {
    if verbose || config.debug {
        LogLevel::Debug
    } else {
        config.log.level()
    }
}

fn default_filter(level: LogLevel) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level; logs go to `log.file` when set, otherwise stderr.
pub(crate) fn initialize_tracing(config: &CmdExecConfig, verbose: bool) -> Result<()> {
    let level = effective_level(config, verbose);
    let filter_str = default_filter(level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let init_result = match &config.log.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
        }
        None => {
            let fmt_layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
        }
    };

    match init_result {
        Ok(()) => tracing::debug!(level = %level, "tracing initialized"),
        Err(err) => {
            tracing::warn!(error = %err, "tracing already initialized; skipping setup");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_and_debug_force_debug_level() {
        let mut config = CmdExecConfig::default();
        assert_eq!(effective_level(&config, false), LogLevel::Info);
        assert_eq!(effective_level(&config, true), LogLevel::Debug);

        config.log.level = "error".into();
        assert_eq!(effective_level(&config, false), LogLevel::Error);
        config.debug = true;
        assert_eq!(effective_level(&config, false), LogLevel::Debug);
    }

    #[test]
    fn filter_covers_every_crate() {
        assert_eq!(
            default_filter(LogLevel::Warn),
            "cmdexec=warn,cmdexec_core=warn,cmdexec_config=warn"
        );
    }
}
