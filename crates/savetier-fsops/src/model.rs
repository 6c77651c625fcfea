//! Domain models for the tiered save chain.
//!
//! # Design
//! - Requests are immutable values built per save attempt.
//! - Outcomes carry the error of the tier they describe; nothing is thrown past the chain.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use savetier_config::PlatformClass;

use crate::error::SaveError;

/// Opaque reference to a file staged in intermediate storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StagedLocation(String);

impl StagedLocation {
    /// Wrap a location reported by an intermediate storage backend.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// Raw location text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StagedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Previously prepared write target, produced by
/// [`crate::TieredWriter::prepare_selection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionHandle {
    name: String,
    location: StagedLocation,
}

impl SelectionHandle {
    /// Build a handle for a staged file.
    #[must_use]
    pub fn new(name: impl Into<String>, location: StagedLocation) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }

    /// File name the content is staged under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the staging backend placed the file.
    #[must_use]
    pub const fn location(&self) -> &StagedLocation {
        &self.location
    }
}

/// Immutable inputs for one save attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    path: String,
    content: Vec<u8>,
    selected_handle: Option<SelectionHandle>,
}

impl SaveRequest {
    /// Build a request without a prior selection.
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            selected_handle: None,
        }
    }

    /// Attach a previously prepared selection.
    #[must_use]
    pub fn with_selection(mut self, handle: SelectionHandle) -> Self {
        self.selected_handle = Some(handle);
        self
    }

    /// Logical destination, slash separated, unvalidated.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Bytes to persist.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Prior selection, if any.
    #[must_use]
    pub const fn selected_handle(&self) -> Option<&SelectionHandle> {
        self.selected_handle.as_ref()
    }
}

/// Storage area addressed by [`crate::PrimaryStorage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageArea {
    /// General-purpose public storage; requires permission on restricted platforms.
    ExternalGeneral,
    /// Application documents area; always writable.
    Documents,
}

impl StorageArea {
    /// Stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExternalGeneral => "external_general",
            Self::Documents => "documents",
        }
    }
}

/// Answer from a [`crate::PermissionAuthority`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// Public storage writes are allowed.
    Granted,
    /// Public storage writes are not allowed.
    Denied,
}

/// Snapshot of what the environment permits at one instant.
///
/// A permission request never mutates a snapshot; probe again for a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageCapabilities {
    /// Platform classification.
    pub platform_class: PlatformClass,
    /// Whether public storage permission is currently granted.
    pub has_public_storage_permission: bool,
    /// Whether the environment may prompt the user for permission.
    pub can_prompt_for_permission: bool,
}

/// Storage tiers in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Stage the content and delegate to the share surface.
    ShareSelected,
    /// Write the basename into the always-writable default directory.
    DefaultDirFallback,
    /// Write to the requested path verbatim.
    DirectWrite,
}

impl Strategy {
    /// Stable label used in logs, events, and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ShareSelected => "share_selected",
            Self::DefaultDirFallback => "default_dir_fallback",
            Self::DirectWrite => "direct_write",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one attempted storage tier.
#[derive(Debug)]
pub struct StrategyOutcome {
    /// Tier that produced this outcome.
    pub strategy: Strategy,
    /// Whether the tier satisfied the save. For [`Strategy::ShareSelected`]
    /// this only confirms delegation to the share surface.
    pub succeeded: bool,
    /// Where the content went; empty on failure.
    pub resolved_path: String,
    /// Failure detail.
    pub error: Option<SaveError>,
}

impl StrategyOutcome {
    pub(crate) const fn success(strategy: Strategy, resolved_path: String) -> Self {
        Self {
            strategy,
            succeeded: true,
            resolved_path,
            error: None,
        }
    }

    pub(crate) const fn failure(strategy: Strategy, error: SaveError) -> Self {
        Self {
            strategy,
            succeeded: false,
            resolved_path: String::new(),
            error: Some(error),
        }
    }
}

/// How the permission tier resolved.
#[derive(Debug)]
pub struct PermissionResolution {
    /// Effective state; `None` when the check itself failed.
    pub state: Option<PermissionState>,
    /// Whether a prompt was issued.
    pub prompted: bool,
    /// `PermissionDenied` or `PermissionQueryFailed` when the permission was not confirmed.
    pub error: Option<SaveError>,
}

/// Full trail of one save attempt.
#[derive(Debug)]
pub struct SaveReport {
    /// Correlation id shared with logs and events.
    pub save_id: Uuid,
    /// Platform class, when the query succeeded.
    pub platform: Option<PlatformClass>,
    /// Permission tier result, when the chain reached it.
    pub permission: Option<PermissionResolution>,
    /// Earlier tiers that were attempted and failed, in order.
    pub failed_attempts: Vec<StrategyOutcome>,
    /// Outcome of the last attempted tier.
    pub outcome: StrategyOutcome,
}

impl SaveReport {
    /// Every attempted tier in order, ending with the final outcome.
    pub fn attempts(&self) -> impl Iterator<Item = &StrategyOutcome> {
        self.failed_attempts
            .iter()
            .chain(std::iter::once(&self.outcome))
    }

    /// Consume the report and keep the final outcome.
    #[must_use]
    pub fn into_outcome(self) -> StrategyOutcome {
        self.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_keeps_fields() {
        let handle = SelectionHandle::new("timestamps.txt", StagedLocation::new("cache/timestamps.txt"));
        let request = SaveRequest::new("Documents/timestamps.txt", b"00:01".to_vec())
            .with_selection(handle.clone());
        assert_eq!(request.path(), "Documents/timestamps.txt");
        assert_eq!(request.content(), b"00:01");
        assert_eq!(request.selected_handle(), Some(&handle));
        assert_eq!(handle.location().as_str(), "cache/timestamps.txt");
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(Strategy::ShareSelected.to_string(), "share_selected");
        assert_eq!(Strategy::DefaultDirFallback.as_str(), "default_dir_fallback");
        assert_eq!(StorageArea::Documents.as_str(), "documents");
    }
}
