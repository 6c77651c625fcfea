//! Shared dependencies and the CLI error type.

use std::fmt::{self, Display, Formatter};

use anyhow::anyhow;
use savetier_config::SaveConfig;
use savetier_events::EventBus;
use savetier_fsops::{LocalFs, TieredWriter, WriterSettings};
use savetier_telemetry::Metrics;

use crate::cli::OutputFormat;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Everything a command handler needs, built once per invocation.
pub(crate) struct AppContext {
    pub(crate) config: SaveConfig,
    pub(crate) writer: TieredWriter,
    pub(crate) events: EventBus,
    pub(crate) metrics: Metrics,
    pub(crate) env: LocalFs,
    pub(crate) output: OutputFormat,
}

impl AppContext {
    pub(crate) fn from_config(config: SaveConfig, output: OutputFormat) -> CliResult<Self> {
        let events = EventBus::new();
        let metrics = Metrics::new()
            .map_err(|err| CliError::failure(anyhow!("failed to build metrics registry: {err}")))?;
        let writer = TieredWriter::new(
            WriterSettings::from(&config),
            events.clone(),
            metrics.clone(),
        );
        let env = LocalFs::from_config(&config.local);
        Ok(Self {
            config,
            writer,
            events,
            metrics,
            env,
            output,
        })
    }
}
