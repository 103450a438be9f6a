//! Label index: label key → ResourceMap keyed by label value.

use crate::query::Query;
use crate::types::{Resource, ResourceList, ResourceMap, ResourceRef};
use ahash::AHashMap;
use tracing::warn;

/// Secondary index over resource labels
#[derive(Debug, Default)]
pub struct LabelIndex {
    /// label key -> (label value -> resources)
    labels: AHashMap<String, ResourceMap>,
}

impl LabelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `res` to the bucket of each of its labels.
    pub fn insert(&mut self, res: &ResourceRef) {
        for (key, value) in res.labels() {
            match self.labels.get_mut(key) {
                Some(values) => values.add(res.clone(), value),
                None => {
                    let mut values = ResourceMap::new();
                    values.add(res.clone(), value);
                    self.labels.insert(key.clone(), values);
                }
            }
        }
    }

    /// Remove `res` from the bucket of each of its labels.
    ///
    /// With `prune` set, buckets left empty are dropped, and so is a key
    /// with no buckets left.
    pub fn remove(&mut self, res: &dyn Resource, prune: bool) {
        for (key, value) in res.labels() {
            let Some(values) = self.labels.get_mut(key) else { continue };
            values.delete(res.id(), value);
            if prune {
                values.prune(value);
                if values.is_empty() {
                    self.labels.remove(key);
                }
            }
        }
    }

    /// Bucket for a (key, value) pair, if either was ever indexed.
    pub fn bucket(&self, key: &str, value: &str) -> Option<&ResourceList> {
        self.labels.get(key)?.get(value)
    }

    /// Resources matching `query`, keyed by resource type.
    ///
    /// The query must already be validated. An unknown key is an empty result.
    pub fn evaluate(&self, query: &Query) -> ResourceMap {
        let mut results = ResourceMap::new();
        let Some(values) = self.labels.get(&query.key) else {
            return results;
        };

        if query.op.is_inclusive() {
            for (i, value) in query.values.iter().enumerate() {
                // repeated candidates would add the same bucket twice
                if query.values[..i].contains(value) {
                    continue;
                }
                if let Some(list) = values.get(value) {
                    collect(&mut results, list);
                }
            }
        } else {
            for (value, list) in values.iter() {
                if query.excludes(value) {
                    collect(&mut results, list);
                }
            }
        }
        results
    }

    /// Flatten into `"key = value"` entries, one per non-empty bucket.
    /// Bucket lists are copied; the resources themselves stay shared.
    ///
    /// Keys or values containing `" = "` can render the same entry name for
    /// two buckets; those buckets are merged under it rather than dropped.
    pub fn export(&self) -> ResourceMap {
        let mut out = ResourceMap::new();
        for (key, values) in &self.labels {
            for (value, list) in values.iter() {
                if list.is_empty() {
                    continue;
                }
                let name = format!("{} = {}", key, value);
                if out.merge_list(name, list.clone()) {
                    warn!(key = %key, value = %value, "export entry name shared by two label buckets");
                }
            }
        }
        out
    }

    /// Indexed label keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.labels.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Values with at least one member under `key`, sorted
    pub fn values(&self, key: &str) -> Vec<String> {
        let Some(values) = self.labels.get(key) else {
            return Vec::new();
        };
        let mut out: Vec<String> = values
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(v, _)| v.to_string())
            .collect();
        out.sort();
        out
    }

    /// Number of (key, value) buckets, including empty ones
    pub fn bucket_count(&self) -> usize {
        self.labels.values().map(ResourceMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn collect(results: &mut ResourceMap, list: &ResourceList) {
    for res in list.iter() {
        results.add(res.clone(), res.resource_type());
    }
}
