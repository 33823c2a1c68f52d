use thiserror::Error;

/// Errors surfaced by the cache core.
///
/// Per-request resolution failures are absorbed with a safe fallback and
/// never reach callers; only construction-time misuse is surfaced.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache entry key can not be blank")]
    BlankEntryKey,
    #[error("invalid invalidation pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl CacheError {
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}
