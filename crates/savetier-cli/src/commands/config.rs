use savetier_fsops::StorageCapabilities;
use tracing::warn;

use crate::context::{AppContext, CliResult};
use crate::output::render_config;

pub(crate) async fn handle_config(ctx: &AppContext) -> CliResult<()> {
    let capabilities = match StorageCapabilities::probe(&ctx.env).await {
        Ok(capabilities) => Some(capabilities),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "storage capability probe failed");
            None
        }
    };
    render_config(&ctx.config, capabilities, ctx.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use anyhow::anyhow;
    use savetier_config::{PlatformClass, SaveConfig};
    use savetier_fsops::{PermissionAuthority, PermissionState};

    #[tokio::test]
    async fn config_renders_with_probed_capabilities() -> anyhow::Result<()> {
        let mut config = SaveConfig::default();
        config.local.platform = PlatformClass::RestrictedMobile;
        config.local.storage_permission = false;
        let ctx = AppContext::from_config(config, OutputFormat::Json)
            .map_err(|err| anyhow!(err.display_message()))?;

        handle_config(&ctx)
            .await
            .map_err(|err| anyhow!(err.display_message()))?;

        let probed = StorageCapabilities::probe(&ctx.env).await?;
        assert_eq!(probed.platform_class, PlatformClass::RestrictedMobile);
        assert!(!probed.has_public_storage_permission);
        assert_eq!(ctx.env.check().await?, PermissionState::Denied);
        Ok(())
    }
}
