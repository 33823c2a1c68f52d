//! Resource type cache definitions.
//!
//! A definition describes how renderings of one resource type are cached
//! and invalidated. Definitions come from two sources: registered
//! programmatically in the [`DefinitionRegistry`](crate::DefinitionRegistry)
//! at runtime, or authored declaratively as a `cache` child node under the
//! resolved type path in the content tree.

use crate::collab::ResourceNode;

/// Name of the declarative configuration node under a type path.
pub(crate) const CACHE_NODE_NAME: &str = "cache";

/// Cache level when a definition does not specify one: instance-only.
const DEFAULT_CACHE_LEVEL: i32 = -1;

const PROP_TIME_TO_LIVE: &str = "timeToLive";
const PROP_CACHE_LEVEL: &str = "cacheLevel";
const PROP_INVALIDATE_ON_SELF: &str = "invalidateOnSelf";
const PROP_INVALIDATE_FIELDS: &str = "invalidateOnReferencedFields";
const PROP_INVALIDATE_PATHS: &str = "invalidateOnPaths";

/// Cache policy for one resource type.
#[derive(Debug, Clone)]
pub struct ResourceTypeCacheDefinition {
    /// Resource type this definition applies to.
    pub resource_type: String,
    /// Time-to-live of cached renderings, in seconds.
    pub time_to_live_seconds: u32,
    /// Signed cache level fed to key generation.
    pub cache_level: i32,
    /// Invalidate when the enclosing content document changes.
    pub invalidate_on_self: bool,
    /// Resource property names whose values are page paths to watch.
    pub invalidate_on_referenced_fields: Vec<String>,
    /// Raw custom invalidation patterns, compiled verbatim.
    pub invalidate_on_paths: Vec<String>,
}

impl ResourceTypeCacheDefinition {
    /// A definition with self-invalidation only.
    pub fn new(resource_type: impl Into<String>, time_to_live_seconds: u32) -> Self {
        Self {
            resource_type: resource_type.into(),
            time_to_live_seconds,
            cache_level: DEFAULT_CACHE_LEVEL,
            invalidate_on_self: true,
            invalidate_on_referenced_fields: Vec::new(),
            invalidate_on_paths: Vec::new(),
        }
    }

    /// Materialize a declarative definition from its configuration node.
    ///
    /// Unset properties fall back to the same defaults a programmatic
    /// definition starts with; the TTL falls back to the caller's default.
    pub(crate) fn from_node(
        node: &ResourceNode,
        resource_type: &str,
        default_ttl_seconds: u32,
    ) -> Self {
        let time_to_live_seconds = node
            .int_property(PROP_TIME_TO_LIVE)
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(default_ttl_seconds);
        Self {
            resource_type: resource_type.to_string(),
            time_to_live_seconds,
            cache_level: node
                .int_property(PROP_CACHE_LEVEL)
                .and_then(|value| i32::try_from(value).ok())
                .unwrap_or(DEFAULT_CACHE_LEVEL),
            invalidate_on_self: node.bool_property(PROP_INVALIDATE_ON_SELF).unwrap_or(true),
            invalidate_on_referenced_fields: node.text_list_property(PROP_INVALIDATE_FIELDS),
            invalidate_on_paths: node.text_list_property(PROP_INVALIDATE_PATHS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::PropertyValue;

    #[test]
    fn new_definition_invalidates_on_self_only() {
        let definition = ResourceTypeCacheDefinition::new("myapp/components/comp", 600);
        assert_eq!(definition.resource_type, "myapp/components/comp");
        assert_eq!(definition.time_to_live_seconds, 600);
        assert_eq!(definition.cache_level, -1);
        assert!(definition.invalidate_on_self);
        assert!(definition.invalidate_on_referenced_fields.is_empty());
        assert!(definition.invalidate_on_paths.is_empty());
    }

    #[test]
    fn from_node_reads_all_properties() {
        let node = ResourceNode::new("/apps/myapp/components/comp/cache")
            .with_property(PROP_TIME_TO_LIVE, PropertyValue::Int(120))
            .with_property(PROP_CACHE_LEVEL, PropertyValue::Int(2))
            .with_property(PROP_INVALIDATE_ON_SELF, PropertyValue::Bool(false))
            .with_property(
                PROP_INVALIDATE_FIELDS,
                PropertyValue::TextList(vec!["linkedPage".to_string()]),
            )
            .with_property(
                PROP_INVALIDATE_PATHS,
                PropertyValue::TextList(vec!["/content/shared.*".to_string()]),
            );

        let definition =
            ResourceTypeCacheDefinition::from_node(&node, "myapp/components/comp", 3600);
        assert_eq!(definition.time_to_live_seconds, 120);
        assert_eq!(definition.cache_level, 2);
        assert!(!definition.invalidate_on_self);
        assert_eq!(definition.invalidate_on_referenced_fields, vec!["linkedPage"]);
        assert_eq!(definition.invalidate_on_paths, vec!["/content/shared.*"]);
    }

    #[test]
    fn from_node_falls_back_to_defaults() {
        let node = ResourceNode::new("/apps/myapp/components/comp/cache");
        let definition =
            ResourceTypeCacheDefinition::from_node(&node, "myapp/components/comp", 3600);
        assert_eq!(definition.time_to_live_seconds, 3600);
        assert_eq!(definition.cache_level, -1);
        assert!(definition.invalidate_on_self);
    }
}
