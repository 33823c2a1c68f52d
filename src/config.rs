//! Cache settings.
//!
//! Tunables for the cache core, deserializable from the host's
//! configuration file.

use serde::Deserialize;

const DEFAULT_TTL_SECONDS: u32 = 3600;

/// Cache settings from the host configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Master switch for the cache layer.
    pub enabled: bool,
    /// Time-to-live applied when a definition does not specify one.
    pub default_ttl_seconds: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }
}

impl CacheSettings {
    /// Returns true if the cache layer is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let settings = CacheSettings::default();
        assert!(settings.is_enabled());
        assert_eq!(settings.default_ttl_seconds, 3600);
    }

    #[test]
    fn deserializes_with_partial_overrides() {
        let settings: CacheSettings = toml::from_str("default_ttl_seconds = 120").unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.default_ttl_seconds, 120);
    }

    #[test]
    fn deserializes_disabled() {
        let settings: CacheSettings = toml::from_str("enabled = false").unwrap();
        assert!(!settings.is_enabled());
    }
}
