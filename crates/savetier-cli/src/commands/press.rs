use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use savetier_events::{Event, EventBus};
use savetier_fsops::{SaveRequest, StorageCapabilities};
use savetier_gesture::{Classification, GestureClassifier, GestureObserver};
use savetier_telemetry::Metrics;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::cli::PressArgs;
use crate::commands::save::save_request;
use crate::context::{AppContext, CliError, CliResult};
use crate::output::render_config;

/// What the trigger asked for.
enum Decision {
    Save(SaveRequest),
    Configure,
}

/// Bridges classifier callbacks onto the command's async flow.
struct TriggerObserver {
    decisions: UnboundedSender<Decision>,
    events: EventBus,
    metrics: Metrics,
}

impl TriggerObserver {
    fn resolve(&self, kind: Classification, decision: Decision) {
        self.metrics.inc_gesture(kind.as_str());
        let _ = self.events.publish(Event::GestureResolved {
            kind: kind.as_str().to_string(),
        });
        if self.decisions.send(decision).is_err() {
            warn!(kind = kind.as_str(), "gesture decision dropped");
        }
    }
}

impl GestureObserver<SaveRequest> for TriggerObserver {
    fn on_short(&self, request: SaveRequest) {
        self.resolve(Classification::Short, Decision::Save(request));
    }

    fn on_long(&self) {
        self.resolve(Classification::Long, Decision::Configure);
    }
}

pub(crate) async fn handle_press(ctx: &AppContext, args: PressArgs) -> CliResult<()> {
    let content = args.content.read().await?;
    let request = SaveRequest::new(args.path, content);

    let (decisions, mut received) = mpsc::unbounded_channel();
    let observer = Arc::new(TriggerObserver {
        decisions,
        events: ctx.events.clone(),
        metrics: ctx.metrics.clone(),
    });
    let classifier = GestureClassifier::<SaveRequest>::new(ctx.config.long_press(), observer)
        .map_err(CliError::failure)?;

    classifier.on_press_down().map_err(CliError::failure)?;
    sleep(Duration::from_millis(args.hold_ms)).await;
    let release = classifier.on_release(request);
    debug!(?release, hold_ms = args.hold_ms, "trigger released");

    // Short resolves inside `on_release`; long resolves no later than it.
    let decision = received
        .try_recv()
        .map_err(|_| CliError::failure(anyhow!("trigger produced no decision")))?;
    drop(classifier);

    match decision {
        Decision::Save(request) => save_request(ctx, &request).await,
        Decision::Configure => {
            info!("long press: showing save configuration");
            let capabilities = StorageCapabilities::probe(&ctx.env).await.ok();
            render_config(&ctx.config, capabilities, ctx.output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{ContentArgs, OutputFormat};
    use savetier_config::SaveConfig;
    use tempfile::TempDir;

    type TestResult<T> = anyhow::Result<T>;

    const DEADLINE_MS: u64 = 200;

    fn context(temp: &TempDir) -> TestResult<AppContext> {
        let mut config = SaveConfig::default();
        config.local.root = temp.path().to_path_buf();
        config.long_press_ms = DEADLINE_MS;
        AppContext::from_config(config, OutputFormat::Table)
            .map_err(|err| anyhow!(err.display_message()))
    }

    fn press(hold_ms: u64) -> PressArgs {
        PressArgs {
            path: "timestamps.txt".to_string(),
            content: ContentArgs {
                content: Some("00:07".to_string()),
                file: None,
            },
            hold_ms,
        }
    }

    #[tokio::test]
    async fn quick_press_saves() -> TestResult<()> {
        let temp = TempDir::new()?;
        let ctx = context(&temp)?;

        handle_press(&ctx, press(10))
            .await
            .map_err(|err| anyhow!(err.display_message()))?;

        let written = std::fs::read_to_string(temp.path().join("external/timestamps.txt"))?;
        assert_eq!(written, "00:07");
        let snapshot = ctx.metrics.snapshot();
        assert_eq!((snapshot.short_presses, snapshot.long_presses), (1, 0));
        Ok(())
    }

    #[tokio::test]
    async fn long_hold_opens_configuration_instead_of_saving() -> TestResult<()> {
        let temp = TempDir::new()?;
        let ctx = context(&temp)?;

        handle_press(&ctx, press(DEADLINE_MS * 2))
            .await
            .map_err(|err| anyhow!(err.display_message()))?;

        assert!(!temp.path().join("external").exists());
        let snapshot = ctx.metrics.snapshot();
        assert_eq!((snapshot.short_presses, snapshot.long_presses), (0, 1));
        let resolved = ctx
            .events
            .backlog_since(0)
            .into_iter()
            .any(|envelope| matches!(envelope.event, Event::GestureResolved { ref kind } if kind == "long"));
        assert!(resolved);
        Ok(())
    }
}
