//! Product version lookup.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Read the product version from a source file.
///
/// Finds the first line containing `marker` and returns the last quoted
/// literal after the marker, trimmed. For `const string BKC_VERSION = "1.0.0";`
/// this yields `1.0.0`.
///
/// # Errors
///
/// Returns [`Error::MissingVersion`] when the file cannot be read, no line
/// carries the marker, or the marker line has no non-empty quoted literal.
pub fn resolve_version(path: &Path, marker: &str) -> Result<String> {
    let missing = |reason: String| Error::MissingVersion {
        path: path.to_path_buf(),
        marker: marker.to_string(),
        reason,
    };

    let source = fs::read_to_string(path).map_err(|e| missing(e.to_string()))?;

    let line = source
        .lines()
        .map(str::trim)
        .find(|line| line.contains(marker))
        .ok_or_else(|| missing("no line contains the version marker".to_string()))?;

    let version = extract_literal(line, marker)
        .ok_or_else(|| missing(format!("no quoted version in `{line}`")))?;

    tracing::debug!("resolved version {} from {}", version, path.display());
    Ok(version)
}

/// Last quoted literal following the final occurrence of `marker`.
fn extract_literal(line: &str, marker: &str) -> Option<String> {
    let (_, tail) = line.rsplit_once(marker)?;
    let parts: Vec<&str> = tail.split('"').collect();
    if parts.len() < 3 {
        return None;
    }
    let literal = parts[parts.len() - 2].trim();
    (!literal.is_empty()).then(|| literal.to_string())
}
