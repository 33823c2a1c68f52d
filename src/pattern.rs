//! Invalidation pattern compilation and matching.
//!
//! Two dialects exist: the `"<literal-path>.*"` form produced for self and
//! referenced-field invalidation, and caller-supplied raw expressions for
//! custom paths. Both are full matchers over change-notification paths.

use regex::Regex;
use tracing::warn;

use crate::error::CacheError;

const WILDCARD_SUFFIX: &str = ".*";

const REGEX_META: &[char] = &[
    '.', '^', '$', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|', '\\',
];

/// Compiled matcher over change-notification path strings.
///
/// Created once by the resolver, shared read-only with the refresh engine;
/// never mutated after compilation.
#[derive(Debug, Clone)]
pub enum InvalidationPattern {
    /// Matches the literal prefix followed by any suffix.
    PrefixWildcard { prefix: String },
    /// Caller-supplied expression, matched against the full path.
    Custom(Regex),
}

impl InvalidationPattern {
    /// Wildcard-suffixed pattern anchored at a literal page path.
    pub fn anchored(path: &str) -> Self {
        Self::PrefixWildcard {
            prefix: path.to_string(),
        }
    }

    /// Compile a caller-supplied raw pattern.
    ///
    /// Raw patterns in the plain `"<path>.*"` form compile to the prefix
    /// matcher; anything else is treated as a general path expression.
    pub fn compile(raw: &str) -> Result<Self, CacheError> {
        match raw.strip_suffix(WILDCARD_SUFFIX) {
            Some(prefix) if !prefix.contains(REGEX_META) => Ok(Self::anchored(prefix)),
            _ => {
                let regex = Regex::new(&format!("^(?:{raw})$"))
                    .map_err(|error| CacheError::invalid_pattern(raw, error.to_string()))?;
                Ok(Self::Custom(regex))
            }
        }
    }

    /// Test a changed path against this pattern.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::PrefixWildcard { prefix } => path.starts_with(prefix),
            Self::Custom(regex) => regex.is_match(path),
        }
    }
}

/// Full-match a raw flush pattern against a cache entry key.
///
/// Uncompilable patterns are absorbed as no-match; lifecycle paths never
/// report errors.
pub(crate) fn full_match(raw: &str, key: &str) -> bool {
    match Regex::new(&format!("^(?:{raw})$")) {
        Ok(regex) => regex.is_match(key),
        Err(error) => {
            warn!(pattern = raw, %error, "Ignoring invalid flush pattern");
            false
        }
    }
}
