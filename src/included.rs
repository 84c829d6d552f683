//! Deduplication of `included` resources.

use std::collections::HashSet;

use tracing::debug;

use crate::document::ResourceObject;

/// Accumulates included resources, unique by `(id, type)`.
///
/// The first occurrence of an identity wins and keeps its position; later
/// occurrences are dropped. Resources without an id cannot collide and are
/// always kept.
#[derive(Debug, Default)]
pub struct IncludedResources {
    seen: HashSet<(String, String)>,
    resources: Vec<ResourceObject>,
}

impl IncludedResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate. Returns `false` if it was a duplicate.
    pub fn add(&mut self, resource: ResourceObject) -> bool {
        if let Some((id, json_api_type)) = resource.identity() {
            let key = (id.to_string(), json_api_type.to_string());
            if self.seen.contains(&key) {
                debug!(id, json_api_type, "dropping duplicate included resource");
                return false;
            }
            self.seen.insert(key);
        }
        self.resources.push(resource);
        true
    }

    pub fn extend(&mut self, resources: impl IntoIterator<Item = ResourceObject>) {
        for resource in resources {
            self.add(resource);
        }
    }

    pub fn contains(&self, id: &str, json_api_type: &str) -> bool {
        self.seen.contains(&(id.to_string(), json_api_type.to_string()))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn into_vec(self) -> Vec<ResourceObject> {
        self.resources
    }
}
