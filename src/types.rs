use crate::error::{BoxError, ResourceError};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Label key → label value. Keys are unique by construction.
pub type Labels = BTreeMap<String, String>;

/// Shared handle to a resource. The store holds the same handle the caller does.
pub type ResourceRef = Arc<dyn Resource>;

// ============ RESOURCE CAPABILITY ============

/// A typed, identity-bearing entity with a label set.
pub trait Resource: Send + Sync + fmt::Debug {
    /// Globally unique identifier
    fn id(&self) -> &str;

    /// Type tag, e.g. "server" or "vlan"
    fn resource_type(&self) -> &str;

    fn labels(&self) -> &Labels;

    /// Self-validation, run before any index mutation.
    fn validate(&self) -> Result<(), BoxError>;

    /// JSON view used in API responses.
    fn to_json(&self) -> Value {
        serde_json::json!({
            "id": self.id(),
            "type": self.resource_type(),
            "labels": self.labels(),
        })
    }
}

/// Plain resource carrying only identity, type and labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicResource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub labels: Labels,
}

impl BasicResource {
    pub fn new(id: &str, resource_type: &str) -> Self {
        Self {
            id: id.to_string(),
            resource_type: resource_type.to_string(),
            labels: Labels::new(),
        }
    }

    /// Builder-style label setter
    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn into_ref(self) -> ResourceRef {
        Arc::new(self)
    }
}

impl Resource for BasicResource {
    fn id(&self) -> &str {
        &self.id
    }

    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn labels(&self) -> &Labels {
        &self.labels
    }

    fn validate(&self) -> Result<(), BoxError> {
        if self.id.is_empty() {
            return Err(ResourceError::MissingId.into());
        }
        if self.resource_type.is_empty() {
            return Err(ResourceError::MissingType.into());
        }
        if self.labels.keys().any(|k| k.is_empty()) {
            return Err(ResourceError::EmptyLabelKey.into());
        }
        Ok(())
    }
}

// ============ RESOURCE LIST ============

/// Unordered list of shared resources. Membership is by resource id.
#[derive(Clone, Default)]
pub struct ResourceList {
    resources: Vec<ResourceRef>,
}

impl ResourceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, res: ResourceRef) {
        self.resources.push(res);
    }

    /// Remove the entry with this id. Returns whether anything was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        match self.resources.iter().position(|r| r.id() == id) {
            Some(pos) => {
                self.resources.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.resources.iter().any(|r| r.id() == id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceRef> {
        self.resources.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.id()).collect()
    }
}

impl fmt::Debug for ResourceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}

impl FromIterator<ResourceRef> for ResourceList {
    fn from_iter<I: IntoIterator<Item = ResourceRef>>(iter: I) -> Self {
        Self { resources: iter.into_iter().collect() }
    }
}

// ============ RESOURCE MAP ============

/// String key → list of resources sharing that key.
///
/// Keyed by resource type in query results, by label value inside the label
/// index, and by `"key = value"` in a [`load`](crate::LabelStore::load) export.
#[derive(Clone, Debug, Default)]
pub struct ResourceMap {
    resources: AHashMap<String, ResourceList>,
}

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource under `key`, creating the list if needed.
    pub fn add(&mut self, res: ResourceRef, key: &str) {
        match self.resources.get_mut(key) {
            Some(list) => list.add(res),
            None => {
                let mut list = ResourceList::new();
                list.add(res);
                self.resources.insert(key.to_string(), list);
            }
        }
    }

    /// Remove resource `id` from the list under `key`. Empty lists are kept.
    pub fn delete(&mut self, id: &str, key: &str) -> bool {
        self.resources.get_mut(key).is_some_and(|list| list.delete(id))
    }

    /// Drop the list under `key` if it is empty.
    pub(crate) fn prune(&mut self, key: &str) {
        if self.resources.get(key).is_some_and(ResourceList::is_empty) {
            self.resources.remove(key);
        }
    }

    /// Put `list` under `key`, appending to any list already there.
    /// Returns true when `key` was already present.
    pub(crate) fn merge_list(&mut self, key: String, list: ResourceList) -> bool {
        match self.resources.get_mut(&key) {
            Some(existing) => {
                existing.resources.extend(list.resources);
                true
            }
            None => {
                self.resources.insert(key, list);
                false
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ResourceList> {
        self.resources.get(key)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.resources.values().any(|l| l.contains_id(id))
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Total resources across all lists (a resource under two keys counts twice).
    pub fn resource_count(&self) -> usize {
        self.resources.values().map(ResourceList::len).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceList)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceRef> {
        self.resources.values().flat_map(ResourceList::iter)
    }

    /// Sorted ids of every resource in the map (duplicates kept).
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.resources().map(|r| r.id().to_string()).collect();
        ids.sort();
        ids
    }

    pub fn to_json(&self) -> Value {
        let obj: serde_json::Map<String, Value> = self
            .resources
            .iter()
            .map(|(k, list)| (k.clone(), Value::Array(list.iter().map(|r| r.to_json()).collect())))
            .collect();
        Value::Object(obj)
    }
}
