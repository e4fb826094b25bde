//! Ricoh firmware version strings (`1.91`, `Ver.2.00`, `v1.0.1`).

use std::cmp::Ordering;
use tracing::warn;

/// Dotted components of a version string with any `Ver.` / `v` prefix removed.
pub fn components(version: &str) -> Vec<&str> {
    let trimmed = version.trim();
    let lower = trimmed.to_ascii_lowercase();
    let stripped = if lower.starts_with("ver.") {
        &trimmed[4..]
    } else if lower.starts_with('v') {
        &trimmed[1..]
    } else {
        trimmed
    };
    stripped.trim().split('.').map(str::trim).collect()
}

fn numeric(version: &str) -> Option<Vec<u64>> {
    components(version)
        .into_iter()
        .map(|c| c.parse::<u64>().ok())
        .collect()
}

/// True when `candidate` is strictly newer than `current`
///
/// Components compare left to right with missing trailing components read as
/// zero. Anything non-numeric is logged and treated as not newer.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    let (Some(candidate_parts), Some(current_parts)) = (numeric(candidate), numeric(current)) else {
        warn!(
            "Cannot compare firmware versions '{}' and '{}'",
            candidate, current
        );
        return false;
    };

    let len = candidate_parts.len().max(current_parts.len());
    for i in 0..len {
        let a = candidate_parts.get(i).copied().unwrap_or(0);
        let b = current_parts.get(i).copied().unwrap_or(0);
        match a.cmp(&b) {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => {}
        }
    }
    false
}
