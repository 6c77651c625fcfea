//! # Design
//!
//! - Constant-message errors for the save chain; context lives in fields.
//! - Capability failures are carried as `anyhow::Error` sources so backends keep their own detail.

use std::error::Error as StdError;

use thiserror::Error;

use crate::model::{PlatformClass, StorageArea};

/// Result type for save chain operations.
pub type SaveResult<T> = Result<T, SaveError>;

/// Errors produced by the tiered save chain.
#[derive(Debug, Error)]
pub enum SaveError {
    /// Staging the content in intermediate storage failed.
    #[error("intermediate write failed")]
    IntermediateWriteFailed {
        /// Staged file name.
        name: String,
        /// Underlying backend error.
        source: anyhow::Error,
    },
    /// The share surface rejected or failed the delegation.
    #[error("share delegation failed")]
    ShareDelegationFailed {
        /// Location handed to the share surface.
        url: String,
        /// Underlying backend error.
        source: anyhow::Error,
    },
    /// Checking or requesting the storage permission failed.
    #[error("permission query failed")]
    PermissionQueryFailed {
        /// `check` or `request`.
        operation: &'static str,
        /// Underlying backend error.
        source: anyhow::Error,
    },
    /// Public storage permission was not granted.
    #[error("storage permission denied")]
    PermissionDenied {
        /// Whether a prompt was issued before giving up.
        prompted: bool,
    },
    /// Writing to primary storage failed.
    #[error("direct write failed")]
    DirectWriteFailed {
        /// Path the write targeted.
        path: String,
        /// Area the write targeted.
        area: StorageArea,
        /// Underlying backend error.
        source: anyhow::Error,
    },
    /// The requested path cannot be written as given.
    #[error("invalid path")]
    InvalidPath {
        /// Offending path.
        path: String,
        /// Rule the path violated.
        reason: &'static str,
    },
    /// Selections can only be prepared where share delegation exists.
    #[error("selection unavailable on this platform")]
    SelectionUnavailable {
        /// Platform the environment reported.
        platform: PlatformClass,
    },
    /// Querying the platform class failed.
    #[error("platform query failed")]
    PlatformQueryFailed {
        /// Underlying backend error.
        source: anyhow::Error,
    },
}

impl SaveError {
    pub(crate) fn invalid_path(path: &str, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason,
        }
    }
}

/// Render an error and its source chain on one line, `outer: inner: root`.
#[must_use]
pub fn render_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut current = error.source();
    while let Some(source) = current {
        rendered.push_str(": ");
        rendered.push_str(&source.to_string());
        current = source.source();
    }
    rendered
}
