//! Loose version comparison for package requirements.
//!
//! This is not semver. A `>=` requirement compares the full
//! major.minor.patch triple; any other requirement only asks that the
//! current major version be at least the required major.

const OPERATOR_CHARS: [char; 5] = ['>', '<', '=', '^', '~'];

/// Numeric triple of a version string. Operators and pre-release suffixes
/// are dropped, missing or unparsable components count as 0.
pub fn version_triple(raw: &str) -> [u64; 3] {
    let cleaned = strip_operators(raw);
    let release = cleaned.split('-').next().unwrap_or_default();

    let mut triple = [0u64; 3];
    for (slot, part) in triple.iter_mut().zip(release.split('.')) {
        *slot = part.trim().parse::<u64>().unwrap_or(0);
    }
    triple
}

pub fn strip_operators(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !OPERATOR_CHARS.contains(c))
        .collect()
}

pub fn is_compatible(current: &str, required: &str) -> bool {
    let current_parts = version_triple(current);
    let required_parts = version_triple(required);

    if required.trim_start().starts_with(">=") {
        return current_parts >= required_parts;
    }

    current_parts[0] >= required_parts[0]
}
