use anyhow::anyhow;
use savetier_fsops::{SaveError, SaveReport, SaveRequest, render_chain};

use crate::cli::SaveArgs;
use crate::context::{AppContext, CliError, CliResult};
use crate::output::{render_report, render_selection};

pub(crate) async fn handle_save(ctx: &AppContext, args: SaveArgs) -> CliResult<()> {
    let content = args.content.read().await?;
    let mut request = SaveRequest::new(args.path, content);
    if args.select {
        let handle = ctx
            .writer
            .prepare_selection(&ctx.env)
            .await
            .map_err(selection_error)?;
        request = request.with_selection(handle);
    }
    save_request(ctx, &request).await
}

pub(crate) async fn handle_prepare(ctx: &AppContext) -> CliResult<()> {
    let handle = ctx
        .writer
        .prepare_selection(&ctx.env)
        .await
        .map_err(selection_error)?;
    render_selection(&handle, ctx.output)
}

pub(crate) async fn save_request(ctx: &AppContext, request: &SaveRequest) -> CliResult<()> {
    let report = ctx.writer.save_with_report(request, &ctx.env).await;
    render_report(&report, ctx.output)?;
    ensure_saved(&report)
}

fn ensure_saved(report: &SaveReport) -> CliResult<()> {
    if report.outcome.succeeded {
        return Ok(());
    }
    let reason = report
        .outcome
        .error
        .as_ref()
        .map_or_else(|| "no tier succeeded".to_string(), |error| render_chain(error));
    Err(CliError::failure(anyhow!(
        "save via {} failed: {reason}",
        report.outcome.strategy
    )))
}

fn selection_error(err: SaveError) -> CliError {
    match err {
        SaveError::SelectionUnavailable { platform } => CliError::validation(format!(
            "selections need a restricted_mobile platform (configured: {platform})"
        )),
        other => CliError::failure(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{ContentArgs, OutputFormat};
    use crate::output::event_trail;
    use savetier_config::{PlatformClass, SaveConfig};
    use std::path::Path;
    use tempfile::TempDir;

    type TestResult<T> = anyhow::Result<T>;

    fn context(root: &Path, platform: PlatformClass, permission: bool) -> AppContext {
        let mut config = SaveConfig::default();
        config.local.root = root.to_path_buf();
        config.local.platform = platform;
        config.local.storage_permission = permission;
        match AppContext::from_config(config, OutputFormat::Json) {
            Ok(ctx) => ctx,
            Err(err) => panic!("context: {}", err.display_message()),
        }
    }

    fn args(path: &str, select: bool) -> SaveArgs {
        SaveArgs {
            path: path.to_string(),
            content: ContentArgs {
                content: Some("00:01\n".to_string()),
                file: None,
            },
            select,
        }
    }

    fn ok(result: CliResult<()>) -> TestResult<()> {
        result.map_err(|err| anyhow!(err.display_message()))
    }

    #[tokio::test]
    async fn granted_save_lands_in_external_area() -> TestResult<()> {
        let temp = TempDir::new()?;
        let ctx = context(temp.path(), PlatformClass::Open, true);

        ok(handle_save(&ctx, args("exports/timestamps.txt", false)).await)?;

        let written = std::fs::read_to_string(temp.path().join("external/exports/timestamps.txt"))?;
        assert_eq!(written, "00:01\n");
        assert_eq!(ctx.metrics.snapshot().saves_succeeded, 1);
        Ok(())
    }

    #[tokio::test]
    async fn event_trail_replays_the_whole_save_once() -> TestResult<()> {
        let temp = TempDir::new()?;
        let ctx = context(temp.path(), PlatformClass::Open, true);

        ok(handle_save(&ctx, args("timestamps.txt", false)).await)?;
        let trail = event_trail(&ctx.events).await;

        let ids: Vec<_> = trail.iter().map(|envelope| envelope.id).collect();
        let expected: Vec<_> = (1..=ctx.events.last_event_id().unwrap_or(0)).collect();
        assert_eq!(ids, expected);
        assert_eq!(trail.first().map(|e| e.event.kind()), Some("save_started"));
        assert_eq!(trail.last().map(|e| e.event.kind()), Some("save_completed"));
        Ok(())
    }

    #[tokio::test]
    async fn denied_save_falls_back_to_documents() -> TestResult<()> {
        let temp = TempDir::new()?;
        let ctx = context(temp.path(), PlatformClass::RestrictedMobile, false);

        ok(handle_save(&ctx, args("Documents/sub/timestamps.txt", false)).await)?;

        let written =
            std::fs::read_to_string(temp.path().join("documents/Documents/timestamps.txt"))?;
        assert_eq!(written, "00:01\n");
        Ok(())
    }

    #[tokio::test]
    async fn selected_save_is_shared() -> TestResult<()> {
        let temp = TempDir::new()?;
        let ctx = context(temp.path(), PlatformClass::RestrictedMobile, false);

        ok(handle_save(&ctx, args("Documents/timestamps.txt", true)).await)?;

        let records = ctx.env.share_records().await?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "00:01\n");
        assert!(!temp.path().join("documents").exists());
        Ok(())
    }

    #[tokio::test]
    async fn invalid_path_fails_with_failure_code() -> TestResult<()> {
        let temp = TempDir::new()?;
        let ctx = context(temp.path(), PlatformClass::Open, true);

        let err = handle_save(&ctx, args("../escape.txt", false)).await.err();

        let err = err.ok_or_else(|| anyhow!("expected failure"))?;
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("invalid path"));
        Ok(())
    }

    #[tokio::test]
    async fn prepare_on_open_platform_is_a_validation_error() -> TestResult<()> {
        let temp = TempDir::new()?;
        let ctx = context(temp.path(), PlatformClass::Open, true);

        let err = handle_prepare(&ctx).await.err();

        assert!(matches!(err, Some(CliError::Validation(message)) if message.contains("restricted_mobile")));
        Ok(())
    }
}
