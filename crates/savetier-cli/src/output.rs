//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use savetier_config::SaveConfig;
use savetier_events::{EventBus, EventEnvelope};
use savetier_fsops::{
    PermissionState, SaveReport, SelectionHandle, StorageCapabilities, StrategyOutcome,
    render_chain,
};
use serde::Serialize;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::cli::OutputFormat;
use crate::context::{CliError, CliResult};

#[derive(Debug, Serialize)]
pub(crate) struct AttemptView {
    pub(crate) strategy: &'static str,
    pub(crate) succeeded: bool,
    pub(crate) resolved_path: String,
    pub(crate) error: Option<String>,
}

impl From<&StrategyOutcome> for AttemptView {
    fn from(outcome: &StrategyOutcome) -> Self {
        Self {
            strategy: outcome.strategy.as_str(),
            succeeded: outcome.succeeded,
            resolved_path: outcome.resolved_path.clone(),
            error: outcome.error.as_ref().map(|error| render_chain(error)),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ReportView {
    pub(crate) save_id: Uuid,
    pub(crate) permission: Option<String>,
    pub(crate) outcome: AttemptView,
    pub(crate) attempts: Vec<AttemptView>,
}

impl From<&SaveReport> for ReportView {
    fn from(report: &SaveReport) -> Self {
        let permission = report.permission.as_ref().map(|resolution| {
            let state = resolution
                .state
                .map_or("unconfirmed", |state| match state {
                    PermissionState::Granted => "granted",
                    PermissionState::Denied => "denied",
                });
            if resolution.prompted {
                format!("{state} (prompted)")
            } else {
                state.to_string()
            }
        });
        Self {
            save_id: report.save_id,
            permission,
            outcome: AttemptView::from(&report.outcome),
            attempts: report.attempts().map(AttemptView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ConfigView<'a> {
    config: &'a SaveConfig,
    capabilities: Option<StorageCapabilities>,
}

pub(crate) fn render_report(report: &SaveReport, format: OutputFormat) -> CliResult<()> {
    let view = ReportView::from(report);
    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            println!("save: {}", view.save_id);
            if let Some(permission) = &view.permission {
                println!("permission: {permission}");
            }
            println!("{:<22} {:<10} PATH", "TIER", "STATUS");
            for attempt in &view.attempts {
                let status = if attempt.succeeded { "ok" } else { "failed" };
                println!(
                    "{:<22} {:<10} {}",
                    attempt.strategy, status, attempt.resolved_path
                );
                if let Some(error) = &attempt.error {
                    println!("  reason: {error}");
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn render_selection(handle: &SelectionHandle, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(handle)?,
        OutputFormat::Table => {
            println!("name: {}", handle.name());
            println!("location: {}", handle.location());
        }
    }
    Ok(())
}

pub(crate) fn render_config(
    config: &SaveConfig,
    capabilities: Option<StorageCapabilities>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&ConfigView {
            config,
            capabilities,
        })?,
        OutputFormat::Table => {
            println!("default_dir: {}", config.default_dir);
            println!("share_title: {}", config.share_title);
            println!("selection_file_name: {}", config.selection_file_name);
            println!("long_press_ms: {}", config.long_press_ms);
            println!("local_root: {}", config.local.root.display());
            println!("platform: {}", config.local.platform);
            if let Some(capabilities) = capabilities {
                println!(
                    "public_storage_permission: {}",
                    capabilities.has_public_storage_permission
                );
                println!(
                    "can_prompt_for_permission: {}",
                    capabilities.can_prompt_for_permission
                );
            }
        }
    }
    Ok(())
}

/// Envelopes published so far, read back through a replaying subscription.
pub(crate) async fn event_trail(events: &EventBus) -> Vec<EventEnvelope> {
    let Some(last) = events.last_event_id() else {
        return Vec::new();
    };
    let mut stream = events.subscribe(Some(0));
    let mut trail = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(envelope) => {
                let caught_up = envelope.id >= last;
                trail.push(envelope);
                if caught_up {
                    break;
                }
            }
            Err(err) => eprintln!("warning: event trail lagged: {err}"),
        }
    }
    trail
}

/// Print each envelope as one JSON line on stderr.
pub(crate) async fn emit_events(events: &EventBus) {
    for envelope in event_trail(events).await {
        match serde_json::to_string(&envelope) {
            Ok(line) => eprintln!("{line}"),
            Err(err) => eprintln!("warning: failed to format event {}: {err}", envelope.id),
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}
