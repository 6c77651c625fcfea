//! Event payload types carried across the workspace.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identifier assigned to each event emitted on the bus.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 256;

/// Lifecycle status of a single storage tier.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TierStatus {
    /// The tier began executing.
    Started,
    /// The tier finished and satisfied the save.
    Completed,
    /// The tier was attempted and failed.
    Failed,
    /// The tier precondition was false; nothing was attempted.
    Skipped,
}

impl TierStatus {
    /// Render the status as a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Typed domain events surfaced across the system.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A save attempt entered the fallback chain.
    SaveStarted {
        /// Correlation id for the save attempt.
        save_id: Uuid,
        /// Destination path requested by the caller.
        path: String,
    },
    /// A tier inside the fallback chain changed status.
    TierProgress {
        /// Correlation id for the save attempt.
        save_id: Uuid,
        /// Stable tier label.
        tier: String,
        /// New status for the tier.
        status: TierStatus,
    },
    /// A save attempt finished with a successful tier.
    SaveCompleted {
        /// Correlation id for the save attempt.
        save_id: Uuid,
        /// Tier that satisfied the save.
        strategy: String,
        /// Where the content ended up.
        resolved_path: String,
    },
    /// Every applicable tier failed.
    SaveFailed {
        /// Correlation id for the save attempt.
        save_id: Uuid,
        /// Rendered error chain of the last attempted tier.
        message: String,
    },
    /// A staging file was prepared for later share delegation.
    SelectionPrepared {
        /// Staged file name.
        name: String,
    },
    /// The press/hold classifier resolved an interaction.
    GestureResolved {
        /// `short` or `long`.
        kind: String,
    },
}

impl Event {
    /// Machine-friendly discriminator for stream consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SaveStarted { .. } => "save_started",
            Self::TierProgress { .. } => "tier_progress",
            Self::SaveCompleted { .. } => "save_completed",
            Self::SaveFailed { .. } => "save_failed",
            Self::SelectionPrepared { .. } => "selection_prepared",
            Self::GestureResolved { .. } => "gesture_resolved",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier.
    pub id: EventId,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event.
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_matches_payload() {
        let id = Uuid::nil();
        assert_eq!(
            Event::SaveStarted {
                save_id: id,
                path: "Documents/timestamps.txt".into(),
            }
            .kind(),
            "save_started"
        );
        assert_eq!(
            Event::GestureResolved {
                kind: "long".into()
            }
            .kind(),
            "gesture_resolved"
        );
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::TierProgress {
            save_id: Uuid::nil(),
            tier: "direct_write".into(),
            status: TierStatus::Skipped,
        };
        let value = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(value["type"], "tier_progress");
        assert_eq!(value["status"], "skipped");
        assert_eq!(TierStatus::Failed.as_str(), "failed");
    }
}
