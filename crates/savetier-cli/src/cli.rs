//! Argument parsing and command dispatch.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use savetier_config::{CONFIG_PATH_ENV, ConfigLoader, SaveConfig};
use savetier_fsops::render_chain;
use savetier_telemetry::{LoggingConfig, init_logging, log_format_from_str};

use crate::commands::{handle_config, handle_prepare, handle_press, handle_save};
use crate::context::{AppContext, CliError, CliResult};
use crate::output::emit_events;

const BUILD_SHA: &str = env!("CARGO_PKG_VERSION");

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };

    let logging = LoggingConfig {
        level: &config.telemetry.log_level,
        format: log_format_from_str(config.telemetry.log_format.as_deref()),
        build_sha: BUILD_SHA,
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: logging disabled: {err}");
    }

    let emit_metrics = cli.emit_metrics;
    let emit_event_trail = cli.emit_events;
    let ctx = match AppContext::from_config(config, cli.output) {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };

    let exit_code = match dispatch(cli.command, &ctx).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    };

    if emit_event_trail {
        emit_events(&ctx.events).await;
    }
    if emit_metrics {
        match ctx.metrics.render() {
            Ok(text) => eprint!("{text}"),
            Err(err) => eprintln!("warning: failed to render metrics: {err}"),
        }
    }

    exit_code
}

pub(crate) async fn dispatch(command: Command, ctx: &AppContext) -> CliResult<()> {
    match command {
        Command::Save(args) => handle_save(ctx, args).await,
        Command::Prepare => handle_prepare(ctx).await,
        Command::Press(args) => handle_press(ctx, args).await,
        Command::Config => handle_config(ctx).await,
    }
}

fn load_config(cli: &Cli) -> CliResult<SaveConfig> {
    let mut loader = ConfigLoader::new().with_process_env();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let mut config = loader
        .load()
        .map_err(|err| {
            CliError::validation(format!("invalid configuration: {}", render_chain(&err)))
        })?;
    if let Some(root) = &cli.root {
        config.local.root.clone_from(root);
    }
    Ok(config)
}

#[derive(Parser)]
#[command(
    name = "savetier",
    about = "Save content through the first storage tier the environment permits"
)]
pub(crate) struct Cli {
    #[arg(long, global = true, env = CONFIG_PATH_ENV, help = "JSON configuration file")]
    pub(crate) config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the local storage root")]
    pub(crate) root: Option<PathBuf>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(long, global = true, help = "Print Prometheus metrics to stderr on exit")]
    pub(crate) emit_metrics: bool,
    #[arg(long, global = true, help = "Print the event trail to stderr as JSON lines on exit")]
    pub(crate) emit_events: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Save content through the tiered chain.
    Save(SaveArgs),
    /// Stage an empty selection file for share delegation.
    Prepare,
    /// Simulate holding the save trigger for a given duration.
    Press(PressArgs),
    /// Show the effective configuration and storage capabilities.
    Config,
}

#[derive(Args)]
pub(crate) struct ContentArgs {
    #[arg(long, conflicts_with = "file", help = "Inline content to save")]
    pub(crate) content: Option<String>,
    #[arg(long, help = "Read the content to save from a file")]
    pub(crate) file: Option<PathBuf>,
}

impl ContentArgs {
    pub(crate) async fn read(&self) -> CliResult<Vec<u8>> {
        match (&self.content, &self.file) {
            (Some(text), _) => Ok(text.clone().into_bytes()),
            (None, Some(path)) => tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))
                .map_err(CliError::failure),
            (None, None) => Err(CliError::validation(
                "content is required (pass --content or --file)",
            )),
        }
    }
}

#[derive(Args)]
pub(crate) struct SaveArgs {
    /// Logical destination, `/`-separated.
    pub(crate) path: String,
    #[command(flatten)]
    pub(crate) content: ContentArgs,
    #[arg(long, help = "Prepare a selection first so the share tier can run")]
    pub(crate) select: bool,
}

#[derive(Args)]
pub(crate) struct PressArgs {
    /// Logical destination used if the press resolves short.
    pub(crate) path: String,
    #[command(flatten)]
    pub(crate) content: ContentArgs,
    #[arg(long, help = "How long the trigger is held, in milliseconds")]
    pub(crate) hold_ms: u64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_command_parses_content_and_selection() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from([
            "savetier",
            "save",
            "Documents/timestamps.txt",
            "--content",
            "00:01",
            "--select",
            "--output",
            "json",
        ])?;
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Command::Save(args) => {
                assert_eq!(args.path, "Documents/timestamps.txt");
                assert_eq!(args.content.content.as_deref(), Some("00:01"));
                assert!(args.select);
            }
            _ => panic!("expected save command"),
        }
        Ok(())
    }

    #[test]
    fn content_and_file_conflict() {
        let result = Cli::try_parse_from([
            "savetier",
            "save",
            "a.txt",
            "--content",
            "x",
            "--file",
            "a.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn press_requires_hold_duration() {
        assert!(Cli::try_parse_from(["savetier", "press", "a.txt", "--content", "x"]).is_err());
        assert!(
            Cli::try_parse_from([
                "savetier",
                "press",
                "a.txt",
                "--content",
                "x",
                "--hold-ms",
                "3500"
            ])
            .is_ok()
        );
    }

    #[tokio::test]
    async fn missing_content_is_a_validation_error() {
        let args = ContentArgs {
            content: None,
            file: None,
        };
        let err = args.read().await.err();
        assert!(matches!(err, Some(CliError::Validation(message)) if message.contains("--content")));
    }
}
