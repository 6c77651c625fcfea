//! Default values for configuration records.
//!
//! # Design
//! - Centralize defaults so the model, loader, and docs stay consistent.

/// Always-writable directory used when storage permission is denied.
pub(crate) const DEFAULT_DIR: &str = "Documents";
/// Title handed to the share surface.
pub(crate) const SHARE_TITLE: &str = "Save timestamps";
/// File name staged for share delegation.
pub(crate) const SELECTION_FILE_NAME: &str = "timestamps.txt";
/// Hold duration before a press resolves as long.
pub(crate) const LONG_PRESS_MS: u64 = 3_000;
/// Upper bound accepted for the hold duration.
pub(crate) const MAX_LONG_PRESS_MS: u64 = 60_000;
/// Root directory for the local capability adapters.
pub(crate) const LOCAL_ROOT: &str = ".savetier";
/// Default log level.
pub(crate) const LOG_LEVEL: &str = "info";
