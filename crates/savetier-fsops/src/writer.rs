//! Tiered save chain.
//!
//! # Design
//! - Tiers run strictly in priority order; a tier whose precondition is false is
//!   skipped, not attempted.
//! - Failures from the share and permission tiers are logged and converted into
//!   "try the next tier"; only the last attempted tier's failure reaches the caller.
//! - Every tier transition is mirrored to the event bus and the tier counter.

use std::future::Future;

use savetier_config::SaveConfig;
use savetier_events::{Event, EventBus, TierStatus};
use savetier_telemetry::Metrics;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::capability::{
    CapabilityProvider, IntermediateStorage, PermissionAuthority, PlatformInfo, PrimaryStorage,
    ShareCapability,
};
use crate::error::{SaveError, SaveResult, render_chain};
use crate::model::{
    PermissionResolution, PermissionState, PlatformClass, SaveReport, SaveRequest,
    SelectionHandle, StorageArea, Strategy, StrategyOutcome,
};
use crate::path::{fallback_path, validate_relative};

/// Label reported for the permission tier, which never produces a storage outcome.
pub const PERMISSION_TIER: &str = "permission_check";

/// Static inputs for the save chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterSettings {
    /// Always-writable directory for the permission-denied fallback.
    pub default_dir: String,
    /// Title handed to the share surface.
    pub share_title: String,
    /// File name used when staging a selection.
    pub selection_file_name: String,
}

impl From<&SaveConfig> for WriterSettings {
    fn from(config: &SaveConfig) -> Self {
        Self {
            default_dir: config.default_dir.clone(),
            share_title: config.share_title.clone(),
            selection_file_name: config.selection_file_name.clone(),
        }
    }
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self::from(&SaveConfig::default())
    }
}

/// Persists content through the first storage tier the environment permits.
#[derive(Clone)]
pub struct TieredWriter {
    settings: WriterSettings,
    events: EventBus,
    metrics: Metrics,
}

impl TieredWriter {
    /// Construct a writer that reports progress on the shared event bus.
    #[must_use]
    pub const fn new(settings: WriterSettings, events: EventBus, metrics: Metrics) -> Self {
        Self {
            settings,
            events,
            metrics,
        }
    }

    /// Settings the writer was built with.
    #[must_use]
    pub const fn settings(&self) -> &WriterSettings {
        &self.settings
    }

    /// Persist `request` and return the outcome of the last attempted tier.
    pub async fn save<E>(&self, request: &SaveRequest, env: &E) -> StrategyOutcome
    where
        E: CapabilityProvider + ?Sized,
    {
        self.save_with_report(request, env).await.into_outcome()
    }

    /// Persist `request` and return every attempted tier alongside the final outcome.
    pub async fn save_with_report<E>(&self, request: &SaveRequest, env: &E) -> SaveReport
    where
        E: CapabilityProvider + ?Sized,
    {
        let save_id = Uuid::new_v4();
        info!(%save_id, path = request.path(), "save started");
        self.publish_event(Event::SaveStarted {
            save_id,
            path: request.path().to_string(),
        });

        let platform = match env.query().await {
            Ok(platform) => Some(platform),
            Err(source) => {
                let error = SaveError::PlatformQueryFailed { source };
                warn!(
                    %save_id,
                    error = %render_chain(&error),
                    "platform query failed; share tier unavailable"
                );
                None
            }
        };

        let mut failed_attempts = Vec::new();

        match (platform, request.selected_handle()) {
            (Some(PlatformClass::RestrictedMobile), Some(handle)) => {
                let outcome = self
                    .run_tier(
                        save_id,
                        Strategy::ShareSelected,
                        self.share_selected(request, handle, env),
                    )
                    .await;
                if outcome.succeeded {
                    return self.finish(SaveReport {
                        save_id,
                        platform,
                        permission: None,
                        failed_attempts,
                        outcome,
                    });
                }
                failed_attempts.push(outcome);
            }
            (_, None) => self.skip_tier(save_id, Strategy::ShareSelected.as_str(), "no selection"),
            (_, Some(_)) => self.skip_tier(
                save_id,
                Strategy::ShareSelected.as_str(),
                "share delegation needs a restricted platform",
            ),
        }

        let permission = self.resolve_permission(save_id, env).await;

        let outcome = if permission.state == Some(PermissionState::Denied) {
            let outcome = self
                .run_tier(
                    save_id,
                    Strategy::DefaultDirFallback,
                    self.write_default_dir(request, env),
                )
                .await;
            self.skip_tier(save_id, Strategy::DirectWrite.as_str(), "permission denied");
            outcome
        } else {
            self.skip_tier(
                save_id,
                Strategy::DefaultDirFallback.as_str(),
                "permission not denied",
            );
            self.run_tier(save_id, Strategy::DirectWrite, write_direct(request, env))
                .await
        };

        self.finish(SaveReport {
            save_id,
            platform,
            permission: Some(permission),
            failed_attempts,
            outcome,
        })
    }

    /// Stage an empty file for a later share-delegated save.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::SelectionUnavailable`] on unrestricted platforms, or the
    /// platform/staging failure otherwise.
    pub async fn prepare_selection<E>(&self, env: &E) -> SaveResult<SelectionHandle>
    where
        E: PlatformInfo + IntermediateStorage + ?Sized,
    {
        let platform = env
            .query()
            .await
            .map_err(|source| SaveError::PlatformQueryFailed { source })?;
        if platform != PlatformClass::RestrictedMobile {
            return Err(SaveError::SelectionUnavailable { platform });
        }

        let name = self.settings.selection_file_name.as_str();
        let location = IntermediateStorage::write(env, name, &[])
            .await
            .map_err(|source| SaveError::IntermediateWriteFailed {
                name: name.to_string(),
                source,
            })?;

        info!(name, location = %location, "selection prepared");
        self.publish_event(Event::SelectionPrepared {
            name: name.to_string(),
        });
        Ok(SelectionHandle::new(name, location))
    }

    async fn share_selected<E>(
        &self,
        request: &SaveRequest,
        handle: &SelectionHandle,
        env: &E,
    ) -> SaveResult<String>
    where
        E: IntermediateStorage + ShareCapability + ?Sized,
    {
        let staging_failed = |source: anyhow::Error| SaveError::IntermediateWriteFailed {
            name: handle.name().to_string(),
            source,
        };
        let location = IntermediateStorage::write(env, handle.name(), request.content())
            .await
            .map_err(staging_failed)?;
        let uri = env.uri_of(&location).await.map_err(staging_failed)?;

        let text = String::from_utf8_lossy(request.content());
        env.share(&self.settings.share_title, &text, &uri)
            .await
            .map_err(|source| SaveError::ShareDelegationFailed {
                url: uri.clone(),
                source,
            })?;
        Ok(uri)
    }

    async fn resolve_permission<E>(&self, save_id: Uuid, env: &E) -> PermissionResolution
    where
        E: PermissionAuthority + ?Sized,
    {
        self.record_tier(save_id, PERMISSION_TIER, TierStatus::Started);

        let resolution = match env.check().await {
            Ok(PermissionState::Granted) => PermissionResolution {
                state: Some(PermissionState::Granted),
                prompted: false,
                error: None,
            },
            Ok(PermissionState::Denied) if env.can_prompt() => match env.request().await {
                Ok(PermissionState::Granted) => PermissionResolution {
                    state: Some(PermissionState::Granted),
                    prompted: true,
                    error: None,
                },
                Ok(PermissionState::Denied) => PermissionResolution {
                    state: Some(PermissionState::Denied),
                    prompted: true,
                    error: Some(SaveError::PermissionDenied { prompted: true }),
                },
                Err(source) => PermissionResolution {
                    state: Some(PermissionState::Denied),
                    prompted: true,
                    error: Some(SaveError::PermissionQueryFailed {
                        operation: "request",
                        source,
                    }),
                },
            },
            Ok(PermissionState::Denied) => PermissionResolution {
                state: Some(PermissionState::Denied),
                prompted: false,
                error: Some(SaveError::PermissionDenied { prompted: false }),
            },
            Err(source) => PermissionResolution {
                state: None,
                prompted: false,
                error: Some(SaveError::PermissionQueryFailed {
                    operation: "check",
                    source,
                }),
            },
        };

        let status = if resolution.state.is_some() {
            TierStatus::Completed
        } else {
            TierStatus::Failed
        };
        self.record_tier(save_id, PERMISSION_TIER, status);

        match (&resolution.state, &resolution.error) {
            (None, Some(error)) => warn!(
                %save_id,
                error = %render_chain(error),
                "permission unconfirmed; attempting direct write"
            ),
            (Some(state), Some(error)) => debug!(
                %save_id,
                ?state,
                prompted = resolution.prompted,
                error = %render_chain(error),
                "public storage not permitted"
            ),
            (state, None) => debug!(
                %save_id,
                ?state,
                prompted = resolution.prompted,
                "public storage permitted"
            ),
        }
        resolution
    }

    async fn write_default_dir<E>(&self, request: &SaveRequest, env: &E) -> SaveResult<String>
    where
        E: PrimaryStorage + ?Sized,
    {
        let target = fallback_path(&self.settings.default_dir, request.path())?;
        PrimaryStorage::write(env, &target, request.content(), StorageArea::Documents)
            .await
            .map_err(|source| SaveError::DirectWriteFailed {
                path: target.clone(),
                area: StorageArea::Documents,
                source,
            })?;
        Ok(target)
    }

    async fn run_tier<F>(&self, save_id: Uuid, strategy: Strategy, op: F) -> StrategyOutcome
    where
        F: Future<Output = SaveResult<String>> + Send,
    {
        let tier = strategy.as_str();
        self.record_tier(save_id, tier, TierStatus::Started);

        match op.await {
            Ok(resolved_path) => {
                self.record_tier(save_id, tier, TierStatus::Completed);
                info!(%save_id, tier, resolved_path = %resolved_path, "tier completed");
                StrategyOutcome::success(strategy, resolved_path)
            }
            Err(error) => {
                self.record_tier(save_id, tier, TierStatus::Failed);
                warn!(%save_id, tier, error = %render_chain(&error), "tier failed");
                StrategyOutcome::failure(strategy, error)
            }
        }
    }

    fn skip_tier(&self, save_id: Uuid, tier: &'static str, reason: &'static str) {
        debug!(%save_id, tier, reason, "tier skipped");
        self.record_tier(save_id, tier, TierStatus::Skipped);
    }

    fn record_tier(&self, save_id: Uuid, tier: &'static str, status: TierStatus) {
        self.metrics.inc_save_tier(tier, status.as_str());
        self.publish_event(Event::TierProgress {
            save_id,
            tier: tier.to_string(),
            status,
        });
    }

    fn finish(&self, report: SaveReport) -> SaveReport {
        let outcome = &report.outcome;
        self.metrics.inc_save(outcome.succeeded);
        if outcome.succeeded {
            info!(
                save_id = %report.save_id,
                strategy = outcome.strategy.as_str(),
                resolved_path = %outcome.resolved_path,
                "save completed"
            );
            self.publish_event(Event::SaveCompleted {
                save_id: report.save_id,
                strategy: outcome.strategy.as_str().to_string(),
                resolved_path: outcome.resolved_path.clone(),
            });
        } else {
            let message = outcome
                .error
                .as_ref()
                .map_or_else(|| "save failed".to_string(), |error| render_chain(error));
            warn!(
                save_id = %report.save_id,
                strategy = outcome.strategy.as_str(),
                error = %message,
                "save failed"
            );
            self.publish_event(Event::SaveFailed {
                save_id: report.save_id,
                message,
            });
        }
        report
    }

    fn publish_event(&self, event: Event) {
        let kind = event.kind();
        let id = self.events.publish(event);
        debug!(event_id = id, event_kind = kind, "event published");
    }
}

async fn write_direct<E>(request: &SaveRequest, env: &E) -> SaveResult<String>
where
    E: PrimaryStorage + ?Sized,
{
    validate_relative(request.path())?;
    PrimaryStorage::write(
        env,
        request.path(),
        request.content(),
        StorageArea::ExternalGeneral,
    )
    .await
    .map_err(|source| SaveError::DirectWriteFailed {
        path: request.path().to_string(),
        area: StorageArea::ExternalGeneral,
        source,
    })?;
    Ok(request.path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StagedLocation;
    use anyhow::{anyhow, bail};
    use async_trait::async_trait;
    use std::sync::Mutex;

    type TestResult<T> = anyhow::Result<T>;

    /// Minimal environment; the full fake lives in the test-support crate.
    struct Scripted {
        platform: PlatformClass,
        permission: anyhow::Result<PermissionState>,
        fail_share: bool,
        writes: Mutex<Vec<(String, StorageArea)>>,
    }

    impl Scripted {
        fn new(platform: PlatformClass, permission: anyhow::Result<PermissionState>) -> Self {
            Self {
                platform,
                permission,
                fail_share: false,
                writes: Mutex::new(Vec::new()),
            }
        }

        fn writes(&self) -> Vec<(String, StorageArea)> {
            self.writes
                .lock()
                .map(|writes| writes.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl PlatformInfo for Scripted {
        async fn query(&self) -> anyhow::Result<PlatformClass> {
            Ok(self.platform)
        }
    }

    #[async_trait]
    impl PermissionAuthority for Scripted {
        async fn check(&self) -> anyhow::Result<PermissionState> {
            match &self.permission {
                Ok(state) => Ok(*state),
                Err(err) => Err(anyhow!("{err}")),
            }
        }
    }

    #[async_trait]
    impl IntermediateStorage for Scripted {
        async fn write(&self, name: &str, _bytes: &[u8]) -> anyhow::Result<StagedLocation> {
            Ok(StagedLocation::new(format!("cache/{name}")))
        }

        async fn uri_of(&self, location: &StagedLocation) -> anyhow::Result<String> {
            Ok(format!("content://{location}"))
        }
    }

    #[async_trait]
    impl ShareCapability for Scripted {
        async fn share(&self, _title: &str, _text: &str, _url: &str) -> anyhow::Result<()> {
            if self.fail_share {
                bail!("share sheet dismissed");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PrimaryStorage for Scripted {
        async fn write(&self, path: &str, _bytes: &[u8], area: StorageArea) -> anyhow::Result<()> {
            self.writes
                .lock()
                .map_err(|_| anyhow!("writes poisoned"))?
                .push((path.to_string(), area));
            Ok(())
        }
    }

    fn writer() -> TestResult<(TieredWriter, EventBus, Metrics)> {
        let events = EventBus::new();
        let metrics = Metrics::new()?;
        let writer = TieredWriter::new(WriterSettings::default(), events.clone(), metrics.clone());
        Ok((writer, events, metrics))
    }

    fn tier_statuses(events: &EventBus) -> Vec<(String, TierStatus)> {
        events
            .backlog_since(0)
            .into_iter()
            .filter_map(|envelope| match envelope.event {
                Event::TierProgress { tier, status, .. } => Some((tier, status)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn share_tier_short_circuits_on_success() -> TestResult<()> {
        let (writer, events, metrics) = writer()?;
        let env = Scripted::new(PlatformClass::RestrictedMobile, Ok(PermissionState::Granted));
        let handle = writer.prepare_selection(&env).await?;
        let request = SaveRequest::new("Documents/timestamps.txt", b"00:01".to_vec())
            .with_selection(handle);

        let report = writer.save_with_report(&request, &env).await;

        assert!(report.outcome.succeeded);
        assert_eq!(report.outcome.strategy, Strategy::ShareSelected);
        assert_eq!(report.outcome.resolved_path, "content://cache/timestamps.txt");
        assert!(report.permission.is_none());
        assert!(env.writes().is_empty());
        assert_eq!(
            tier_statuses(&events),
            vec![
                ("share_selected".to_string(), TierStatus::Started),
                ("share_selected".to_string(), TierStatus::Completed),
            ]
        );
        assert_eq!(metrics.snapshot().saves_succeeded, 1);
        Ok(())
    }

    #[tokio::test]
    async fn share_failure_falls_through_to_permission_tiers() -> TestResult<()> {
        let (writer, _events, _metrics) = writer()?;
        let mut env = Scripted::new(PlatformClass::RestrictedMobile, Ok(PermissionState::Denied));
        env.fail_share = true;
        let request = SaveRequest::new("Documents/sub/timestamps.txt", b"x".to_vec())
            .with_selection(SelectionHandle::new(
                "timestamps.txt",
                StagedLocation::new("cache/timestamps.txt"),
            ));

        let report = writer.save_with_report(&request, &env).await;

        assert_eq!(report.failed_attempts.len(), 1);
        assert!(matches!(
            report.failed_attempts[0].error,
            Some(SaveError::ShareDelegationFailed { .. })
        ));
        assert_eq!(report.outcome.strategy, Strategy::DefaultDirFallback);
        assert_eq!(report.outcome.resolved_path, "Documents/timestamps.txt");
        assert_eq!(
            env.writes(),
            vec![("Documents/timestamps.txt".to_string(), StorageArea::Documents)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn unconfirmed_permission_attempts_direct_write() -> TestResult<()> {
        let (writer, events, _metrics) = writer()?;
        let env = Scripted::new(PlatformClass::Open, Err(anyhow!("permission service offline")));
        let request = SaveRequest::new("exports/timestamps.txt", b"x".to_vec());

        let report = writer.save_with_report(&request, &env).await;

        let permission = report.permission.as_ref().map(|p| (p.state, p.prompted));
        assert_eq!(permission, Some((None, false)));
        assert_eq!(report.outcome.strategy, Strategy::DirectWrite);
        assert!(report.outcome.succeeded);
        assert!(tier_statuses(&events).contains(&(PERMISSION_TIER.to_string(), TierStatus::Failed)));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_direct_path_fails_without_writing() -> TestResult<()> {
        let (writer, events, metrics) = writer()?;
        let env = Scripted::new(PlatformClass::Open, Ok(PermissionState::Granted));
        let request = SaveRequest::new("../outside.txt", b"x".to_vec());

        let outcome = writer.save(&request, &env).await;

        assert!(!outcome.succeeded);
        assert!(outcome.resolved_path.is_empty());
        assert!(matches!(
            outcome.error,
            Some(SaveError::InvalidPath { reason: "parent segment", .. })
        ));
        assert!(env.writes().is_empty());
        assert_eq!(metrics.snapshot().saves_failed, 1);
        let failed = events
            .backlog_since(0)
            .into_iter()
            .any(|envelope| matches!(envelope.event, Event::SaveFailed { .. }));
        assert!(failed);
        Ok(())
    }

    #[tokio::test]
    async fn prepare_selection_requires_restricted_platform() -> TestResult<()> {
        let (writer, _events, _metrics) = writer()?;
        let env = Scripted::new(PlatformClass::Open, Ok(PermissionState::Granted));
        let err = writer.prepare_selection(&env).await.err();
        assert!(matches!(
            err,
            Some(SaveError::SelectionUnavailable { platform: PlatformClass::Open })
        ));
        Ok(())
    }
}
