//! Cache configuration resolution.
//!
//! Resolves the effective cache definition for a request (registry lookup,
//! then declarative fallback, then built-in default) and expands it into a
//! full invalidation policy: compiled patterns plus a time-to-live.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::collab::{ContentTreeReader, RequestContext, ResourceNode};
use crate::config::CacheSettings;
use crate::definition::{CACHE_NODE_NAME, ResourceTypeCacheDefinition};
use crate::key::absolute_type_path;
use crate::pattern::InvalidationPattern;
use crate::registry::DefinitionRegistry;

/// Path segment that separates a content document from its rendered
/// sub-resources.
const CONTENT_ROOT_SEGMENT: &str = "/jcr:content";

/// Fully resolved invalidation policy for one cache entry.
///
/// Built once per cache miss; immutable thereafter and owned by the refresh
/// engine bound to the resulting entry.
#[derive(Debug, Clone)]
pub struct CacheConfiguration {
    /// Resource type the policy was resolved for.
    pub resource_type: String,
    /// Time-to-live of the cached rendering, in seconds.
    pub time_to_live_seconds: u32,
    /// Signed cache level of the resolved definition, fed to key generation.
    pub cache_level: i32,
    /// Absolute path of the resolved type; unset when the content tree
    /// could not resolve it.
    pub resource_type_path: Option<String>,
    /// Compiled invalidation patterns.
    pub patterns: Vec<InvalidationPattern>,
}

/// Resolves cache configurations per request.
pub struct ConfigurationResolver {
    settings: CacheSettings,
    registry: Arc<DefinitionRegistry>,
    tree: Arc<dyn ContentTreeReader>,
}

impl ConfigurationResolver {
    pub fn new(
        settings: CacheSettings,
        registry: Arc<DefinitionRegistry>,
        tree: Arc<dyn ContentTreeReader>,
    ) -> Self {
        Self {
            settings,
            registry,
            tree,
        }
    }

    /// Resolve the effective configuration for a request, defaulting the
    /// time-to-live from the crate settings.
    pub fn resolve(&self, request: &dyn RequestContext) -> CacheConfiguration {
        self.resolve_with_default_ttl(request, self.settings.default_ttl_seconds)
    }

    /// Resolve the effective configuration for a request.
    ///
    /// Never fails: an unresolvable type path only disables the declarative
    /// fallback, and the built-in default definition always applies.
    pub fn resolve_with_default_ttl(
        &self,
        request: &dyn RequestContext,
        default_ttl_seconds: u32,
    ) -> CacheConfiguration {
        let resource_type = request.resource_type();
        let type_path = absolute_type_path(resource_type);
        let type_node = self.tree.resolve(&type_path);
        if type_node.is_none() {
            debug!(
                resource_type,
                type_path = %type_path,
                "Resource type not resolvable in content tree"
            );
        }

        let definition = self
            .registry
            .lookup(resource_type)
            .or_else(|| {
                self.declarative_definition(type_node.as_ref(), resource_type, default_ttl_seconds)
                    .map(Arc::new)
            })
            .unwrap_or_else(|| {
                Arc::new(ResourceTypeCacheDefinition::new(
                    resource_type,
                    default_ttl_seconds,
                ))
            });

        CacheConfiguration {
            resource_type: resource_type.to_string(),
            time_to_live_seconds: definition.time_to_live_seconds,
            cache_level: definition.cache_level,
            resource_type_path: type_node.map(|node| node.path),
            patterns: expand_patterns(request, &definition),
        }
    }

    /// Read the declarative definition stored under the resolved type path.
    fn declarative_definition(
        &self,
        type_node: Option<&ResourceNode>,
        resource_type: &str,
        default_ttl_seconds: u32,
    ) -> Option<ResourceTypeCacheDefinition> {
        let type_node = type_node?;
        let cache_node = self
            .tree
            .resolve(&format!("{}/{CACHE_NODE_NAME}", type_node.path))?;
        Some(ResourceTypeCacheDefinition::from_node(
            &cache_node,
            resource_type,
            default_ttl_seconds,
        ))
    }
}

/// Expand a definition into the compiled pattern set for one request.
fn expand_patterns(
    request: &dyn RequestContext,
    definition: &ResourceTypeCacheDefinition,
) -> Vec<InvalidationPattern> {
    let mut patterns = Vec::new();

    if definition.invalidate_on_self {
        patterns.push(InvalidationPattern::anchored(page_path(
            request.resource_path(),
        )));
    }

    for field in &definition.invalidate_on_referenced_fields {
        if field.trim().is_empty() {
            continue;
        }
        match request.property(field) {
            Some(value) if !value.trim().is_empty() => {
                patterns.push(InvalidationPattern::anchored(&value));
            }
            _ => {}
        }
    }

    for raw in &definition.invalidate_on_paths {
        match InvalidationPattern::compile(raw) {
            Ok(pattern) => patterns.push(pattern),
            Err(error) => {
                warn!(pattern = %raw, %error, "Skipping invalid custom invalidation pattern");
            }
        }
    }

    patterns
}

/// Path of the enclosing content document: the resource path truncated at,
/// and excluding, the content-root segment when one is present.
fn page_path(resource_path: &str) -> &str {
    match resource_path.find(CONTENT_ROOT_SEGMENT) {
        Some(index) if index > 0 => &resource_path[..index],
        _ => resource_path,
    }
}
