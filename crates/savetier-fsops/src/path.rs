//! Logical path helpers. Paths are `/`-separated on every platform.

use crate::error::{SaveError, SaveResult};

const SEPARATOR: char = '/';

/// Final segment of `path`: everything after the last `/`, or the whole path.
#[must_use]
pub fn basename(path: &str) -> &str {
    path.rsplit_once(SEPARATOR).map_or(path, |(_, tail)| tail)
}

/// Destination used when public storage is not permitted: `<default_dir>/<basename>`.
///
/// # Errors
///
/// Returns [`SaveError::InvalidPath`] when `path` has no usable file name.
pub fn fallback_path(default_dir: &str, path: &str) -> SaveResult<String> {
    let name = basename(path);
    if matches!(name, "" | "." | "..") {
        return Err(SaveError::invalid_path(path, "missing file name"));
    }
    let dir = default_dir.trim_end_matches(SEPARATOR);
    if dir.is_empty() {
        return Ok(name.to_string());
    }
    Ok(format!("{dir}{SEPARATOR}{name}"))
}

/// Reject paths that cannot be written verbatim.
///
/// # Errors
///
/// Returns [`SaveError::InvalidPath`] naming the violated rule.
pub fn validate_relative(path: &str) -> SaveResult<()> {
    if path.is_empty() {
        return Err(SaveError::invalid_path(path, "empty path"));
    }
    if path.starts_with(SEPARATOR) {
        return Err(SaveError::invalid_path(path, "absolute path"));
    }
    if path.contains('\0') {
        return Err(SaveError::invalid_path(path, "nul byte"));
    }
    for segment in path.split(SEPARATOR) {
        match segment {
            "" => return Err(SaveError::invalid_path(path, "empty segment")),
            ".." => return Err(SaveError::invalid_path(path, "parent segment")),
            _ => {}
        }
    }
    Ok(())
}
