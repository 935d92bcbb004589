//! Config validation: prefix shape, path segment syntax and uniqueness.

use crate::error::ConfigError;
use std::collections::HashSet;

/// Empty, or `/`-led without a trailing slash. A lone `/` normalises to empty.
pub fn normalize_prefix(prefix: &str) -> Result<String, ConfigError> {
    let prefix = prefix.trim();
    if prefix.is_empty() || prefix == "/" {
        return Ok(String::new());
    }
    if !prefix.starts_with('/') || prefix.ends_with('/') || prefix.contains("//") {
        return Err(ConfigError::InvalidPrefix(prefix.to_string()));
    }
    if prefix
        .split('/')
        .skip(1)
        .any(|part| part.starts_with(':') || part.starts_with('*'))
    {
        return Err(ConfigError::InvalidPrefix(prefix.to_string()));
    }
    Ok(prefix.to_string())
}

pub fn validate_segment(model: &str, segment: &str) -> Result<(), ConfigError> {
    let ok = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidPathSegment {
            model: model.to_string(),
            segment: segment.to_string(),
        })
    }
}

/// Segments served by `common_routes()` at the root.
pub const RESERVED_SEGMENTS: [&str; 2] = ["health", "version"];

/// Every (model, singular, plural) triple: segments well formed and unique across all of them.
/// With an empty prefix they also must not shadow the common routes.
pub fn validate_bindings<'a, I>(prefix: &str, bindings: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
{
    let mut seen = HashSet::new();
    for (model, singular, plural) in bindings {
        for segment in [singular, plural] {
            validate_segment(model, segment)?;
            if prefix.is_empty() && RESERVED_SEGMENTS.contains(&segment) {
                return Err(ConfigError::ReservedPathSegment(segment.to_string()));
            }
            if !seen.insert(segment) {
                return Err(ConfigError::DuplicatePathSegment(segment.to_string()));
            }
        }
    }
    Ok(())
}
