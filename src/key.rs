//! Cache key generation.
//!
//! Derives deterministic cache keys whose granularity is controlled by a
//! signed scope level supplied per resource type.

/// Namespace prefix under which relative resource types live.
const APP_ROOT: &str = "/apps";

const PATH_SEPARATOR: char = '/';

/// Granularity at which renderings are shared across resource instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheScope {
    /// Cache exactly this resource instance.
    InstanceOnly,
    /// Cache one rendering per resource type, ignoring the resource path.
    SiteWide,
    /// Cache per resource type plus the first `n` path segments.
    PathBounded(u32),
}

impl CacheScope {
    /// Derive a scope from a signed cache level: negative is instance-only,
    /// zero is site-wide, positive bounds the path to that many segments.
    pub fn from_level(level: i32) -> Self {
        if level < 0 {
            Self::InstanceOnly
        } else if level == 0 {
            Self::SiteWide
        } else {
            Self::PathBounded(level as u32)
        }
    }
}

/// Generate the cache key for one rendering.
///
/// Two requests that should share a cached rendering produce identical
/// keys. The function is total: no input combination fails.
pub fn generate_key(
    resource_path: &str,
    resource_type: &str,
    selector_string: &str,
    scope_level: i32,
) -> String {
    let selector = selector_suffix(selector_string);
    match CacheScope::from_level(scope_level) {
        CacheScope::InstanceOnly => format!("{resource_path}{selector}"),
        CacheScope::SiteWide => format!("{}{selector}", absolute_type_path(resource_type)),
        CacheScope::PathBounded(level) => format!(
            "{}{}{selector}",
            absolute_type_path(resource_type),
            cut_path(resource_path, level),
        ),
    }
}

/// Map a resource type onto its absolute content-tree path.
///
/// Types that already start with the path separator are used as-is.
pub(crate) fn absolute_type_path(resource_type: &str) -> String {
    if resource_type.starts_with(PATH_SEPARATOR) {
        resource_type.to_string()
    } else {
        format!("{APP_ROOT}/{resource_type}")
    }
}

/// Truncate `path` right before its `level`-th segment boundary.
///
/// A leading separator does not count as a boundary. Paths with fewer
/// boundaries are returned unmodified.
fn cut_path(path: &str, level: u32) -> &str {
    let mut count: i64 = if path.starts_with(PATH_SEPARATOR) { -1 } else { 0 };
    for (index, character) in path.char_indices() {
        if character == PATH_SEPARATOR {
            count += 1;
            if count == i64::from(level) {
                return &path[..index];
            }
        }
    }
    path
}

fn selector_suffix(selector_string: &str) -> String {
    if selector_string.trim().is_empty() {
        String::new()
    } else {
        format!(".{selector_string}")
    }
}
