//! Collaborator boundaries.
//!
//! The web-request abstraction and the content-repository tree are external
//! to this core; it consumes them through these traits. The cache store
//! itself is driven by the host and only interacts with this crate through
//! the event and listener types it exposes.

use std::collections::HashMap;

/// The request being rendered: resource addressing plus a string property
/// lookup for the requested resource.
pub trait RequestContext {
    fn resource_path(&self) -> &str;
    fn resource_type(&self) -> &str;
    /// Selector string; may be blank.
    fn selector_string(&self) -> &str;
    /// String property of the requested resource, if present.
    fn property(&self, name: &str) -> Option<String>;
}

/// Read access to the content-repository tree.
pub trait ContentTreeReader: Send + Sync {
    /// Resolve an absolute path to a node, if one exists.
    fn resolve(&self, path: &str) -> Option<ResourceNode>;
}

/// A node materialized from the content tree.
#[derive(Debug, Clone)]
pub struct ResourceNode {
    /// Absolute path of the node.
    pub path: String,
    /// Property map of the node.
    pub properties: HashMap<String, PropertyValue>,
}

/// A typed property value read off a content-tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Text(String),
    TextList(Vec<String>),
}

impl ResourceNode {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn bool_property(&self, name: &str) -> Option<bool> {
        match self.properties.get(name)? {
            PropertyValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn int_property(&self, name: &str) -> Option<i64> {
        match self.properties.get(name)? {
            PropertyValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn text_property(&self, name: &str) -> Option<&str> {
        match self.properties.get(name)? {
            PropertyValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Multi-valued string property; a single text value reads as a
    /// one-element list.
    pub fn text_list_property(&self, name: &str) -> Vec<String> {
        match self.properties.get(name) {
            Some(PropertyValue::TextList(values)) => values.clone(),
            Some(PropertyValue::Text(value)) => vec![value.clone()],
            _ => Vec::new(),
        }
    }
}
