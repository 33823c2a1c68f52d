//! Programmatic definition registry.
//!
//! Components register cache definitions at runtime and remove them again
//! on hot reload. The map is keyed by resource type with at most one
//! definition per type; the first registration wins.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::warn;

use crate::definition::ResourceTypeCacheDefinition;

/// Thread-safe registry of programmatically registered cache definitions.
///
/// Bind, unbind and lookup are linearizable per key; unrelated keys never
/// block each other.
#[derive(Default)]
pub struct DefinitionRegistry {
    definitions: DashMap<String, Arc<ResourceTypeCacheDefinition>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self {
            definitions: DashMap::new(),
        }
    }

    /// Register a definition for its resource type.
    ///
    /// A duplicate registration is reported and ignored; the first-bound
    /// definition stays authoritative.
    pub fn bind(&self, definition: ResourceTypeCacheDefinition) {
        match self.definitions.entry(definition.resource_type.clone()) {
            Entry::Occupied(_) => {
                warn!(
                    resource_type = %definition.resource_type,
                    "Cache definition was already bound for this resource type"
                );
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(definition));
            }
        }
    }

    /// Remove the definition for a resource type; unknown types are a no-op.
    pub fn unbind(&self, resource_type: &str) {
        self.definitions.remove(resource_type);
    }

    /// Look up the definition bound for a resource type.
    pub fn lookup(&self, resource_type: &str) -> Option<Arc<ResourceTypeCacheDefinition>> {
        self.definitions
            .get(resource_type)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Number of bound definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
