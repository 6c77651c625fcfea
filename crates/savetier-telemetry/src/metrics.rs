//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes only the counters the save chain and gesture classifier need.

use std::sync::Arc;

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    save_tiers_total: IntCounterVec,
    saves_total: IntCounterVec,
    gesture_resolutions_total: IntCounterVec,
}

/// Snapshot of selected counters for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Saves that ended in a successful tier.
    pub saves_succeeded: u64,
    /// Saves where every applicable tier failed.
    pub saves_failed: u64,
    /// Interactions classified as short presses.
    pub short_presses: u64,
    /// Interactions classified as long presses.
    pub long_presses: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let save_tiers_total = counter_vec(
            &registry,
            "save_tiers_total",
            "Storage tiers executed by status",
            &["tier", "status"],
        )?;
        let saves_total = counter_vec(
            &registry,
            "saves_total",
            "Save requests by final outcome",
            &["outcome"],
        )?;
        let gesture_resolutions_total = counter_vec(
            &registry,
            "gesture_resolutions_total",
            "Trigger interactions classified by kind",
            &["kind"],
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                save_tiers_total,
                saves_total,
                gesture_resolutions_total,
            }),
        })
    }

    /// Increment the storage tier counter.
    pub fn inc_save_tier(&self, tier: &str, status: &str) {
        self.inner
            .save_tiers_total
            .with_label_values(&[tier, status])
            .inc();
    }

    /// Increment the final save outcome counter.
    pub fn inc_save(&self, succeeded: bool) {
        let outcome = if succeeded { "succeeded" } else { "failed" };
        self.inner.saves_total.with_label_values(&[outcome]).inc();
    }

    /// Increment the gesture classification counter.
    pub fn inc_gesture(&self, kind: &str) {
        self.inner
            .gesture_resolutions_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the save and gesture counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let saves = &self.inner.saves_total;
        let gestures = &self.inner.gesture_resolutions_total;
        MetricsSnapshot {
            saves_succeeded: saves.with_label_values(&["succeeded"]).get(),
            saves_failed: saves.with_label_values(&["failed"]).get(),
            short_presses: gestures.with_label_values(&["short"]).get(),
            long_presses: gestures.with_label_values(&["long"]).get(),
        }
    }
}

fn counter_vec(
    registry: &Registry,
    name: &'static str,
    help: &str,
    labels: &[&str],
) -> Result<IntCounterVec> {
    let counter = IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })?;
    registry
        .register(Box::new(counter.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    Ok(counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_save_tier("share_selected", "failed");
        metrics.inc_save_tier("direct_write", "completed");
        metrics.inc_save(true);
        metrics.inc_save(true);
        metrics.inc_save(false);
        metrics.inc_gesture("short");
        metrics.inc_gesture("long");
        metrics.inc_gesture("long");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.saves_succeeded, 2);
        assert_eq!(snapshot.saves_failed, 1);
        assert_eq!(snapshot.short_presses, 1);
        assert_eq!(snapshot.long_presses, 2);

        let rendered = metrics.render()?;
        assert!(rendered.contains(r#"save_tiers_total{status="completed",tier="direct_write"} 1"#));
        assert!(rendered.contains("gesture_resolutions_total"));
        Ok(())
    }

    #[test]
    fn registries_are_independent_per_instance() -> Result<()> {
        let first = Metrics::new()?;
        let second = Metrics::new()?;
        first.inc_save(true);
        assert_eq!(second.snapshot().saves_succeeded, 0);
        Ok(())
    }
}
