//! Label-indexed resource store
//!
//! Keeps an identity index (id → resource) and a [`LabelIndex`] in lock-step.
//! Both live behind one `RwLock`: writers (create, update, delete, clear,
//! wipe) are serialized, readers (query, load, lookups) share access and
//! always observe both indices at the same point.
//!
//! # States
//! - Uninitialized: after [`LabelStore::new`] and after [`LabelStore::wipe`]
//! - Ready: after [`LabelStore::initialize`], [`LabelStore::clear`] or
//!   [`LabelStore::from_snapshot`]
//!
//! Operations other than initialize/clear/wipe fail with
//! [`StoreError::Uninitialized`] outside the Ready state.

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::index::LabelIndex;
use crate::query::{filter_label, Query};
use crate::types::{Resource, ResourceMap, ResourceRef};
use ahash::{AHashMap, AHashSet};
use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Both indices. Only ever touched through the store's lock.
#[derive(Debug, Default)]
struct Indices {
    uuids: AHashMap<String, ResourceRef>,
    labels: LabelIndex,
}

impl Indices {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            uuids: AHashMap::with_capacity(capacity),
            labels: LabelIndex::new(),
        }
    }

    fn insert(&mut self, res: ResourceRef) -> Result<()> {
        if self.uuids.contains_key(res.id()) {
            return Err(StoreError::AlreadyExists(res.id().to_string()));
        }
        self.install(res);
        Ok(())
    }

    /// Unconditional insert; caller has ensured `res.id()` is free.
    fn install(&mut self, res: ResourceRef) {
        self.labels.insert(&res);
        self.uuids.insert(res.id().to_string(), res);
    }

    /// Swap in `res` for the entry with the same id, old buckets out first.
    fn replace(&mut self, res: ResourceRef, prune: bool) {
        self.remove(res.id(), prune);
        self.install(res);
    }

    /// Remove `id` from both indices, returning the stored resource.
    ///
    /// Buckets are located through the stored resource's labels, not the
    /// caller's copy, so a stale handle cannot leave entries behind.
    fn remove(&mut self, id: &str, prune: bool) -> Option<ResourceRef> {
        let old = self.uuids.remove(id)?;
        self.labels.remove(old.as_ref(), prune);
        Some(old)
    }
}

pub struct LabelStore {
    config: StoreConfig,
    /// None while Uninitialized or Wiped
    inner: RwLock<Option<Indices>>,
}

impl LabelStore {
    /// Uninitialized store; call [`initialize`](Self::initialize) before use.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(None),
        }
    }

    /// Ready store seeded from an existing map in one pass.
    ///
    /// The same resource handle may appear under several keys (as in a
    /// [`load`](Self::load) export) and is indexed once. Two distinct
    /// resources sharing an id fail with `AlreadyExists`.
    pub fn from_snapshot(snapshot: &ResourceMap, config: StoreConfig) -> Result<Self> {
        let mut indices = Indices::with_capacity(config.initial_capacity.max(snapshot.resource_count()));
        for res in snapshot.resources() {
            validate(res.as_ref())?;
            if let Some(existing) = indices.uuids.get(res.id()) {
                if Arc::ptr_eq(existing, res) {
                    continue;
                }
                return Err(StoreError::AlreadyExists(res.id().to_string()));
            }
            indices.install(res.clone());
        }
        info!(resources = indices.uuids.len(), keys = snapshot.len(), "seeded label store from snapshot");
        Ok(Self {
            config,
            inner: RwLock::new(Some(indices)),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // --- Lifecycle ---

    /// Uninitialized/Wiped → Ready. No-op when already Ready.
    pub fn initialize(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.is_none() {
            *inner = Some(Indices::with_capacity(self.config.initial_capacity));
            info!("label store initialized");
        }
        Ok(())
    }

    /// Reset both indices to empty. Also brings a wiped store back to Ready.
    pub fn clear(&self) -> Result<()> {
        *self.inner.write() = Some(Indices::with_capacity(self.config.initial_capacity));
        info!("label store cleared");
        Ok(())
    }

    /// Drop both indices. The store is unusable until initialized again.
    pub fn wipe(&self) -> Result<()> {
        *self.inner.write() = None;
        info!("label store wiped");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.inner.read().is_some()
    }

    // --- Mutations ---

    /// Insert a new resource. Fails with `AlreadyExists` if its id is taken.
    pub fn create(&self, res: ResourceRef) -> Result<()> {
        validate(res.as_ref())?;
        let mut indices = self.write_ready()?;
        indices.insert(res.clone())?;
        debug!(id = res.id(), kind = res.resource_type(), labels = res.labels().len(), "created resource");
        Ok(())
    }

    /// Replace the stored resource with the same id.
    ///
    /// Old label buckets are dropped and new ones filled under a single
    /// write lock; readers see either the old or the new resource. Once the
    /// id is known to exist nothing in the swap can fail.
    pub fn update(&self, res: ResourceRef) -> Result<()> {
        validate(res.as_ref())?;
        let mut indices = self.write_ready()?;
        if !indices.uuids.contains_key(res.id()) {
            return Err(StoreError::NotFound(res.id().to_string()));
        }
        indices.replace(res.clone(), self.config.prune_empty_buckets);
        debug!(id = res.id(), labels = res.labels().len(), "updated resource");
        Ok(())
    }

    /// Remove a resource by id. Absent ids are not an error.
    pub fn delete(&self, res: &dyn Resource) -> Result<()> {
        if self.config.validate_on_delete {
            validate(res)?;
        }
        let mut indices = self.write_ready()?;
        match indices.remove(res.id(), self.config.prune_empty_buckets) {
            Some(_) => debug!(id = res.id(), "deleted resource"),
            None => trace!(id = res.id(), "delete of absent resource"),
        }
        Ok(())
    }

    // --- Reads ---

    /// Evaluate a label query. Results are keyed by resource type and hold
    /// the same handles the store does.
    ///
    /// Malformed queries fail with `InvalidQuery` in strict mode and yield
    /// an empty map in lenient mode.
    pub fn query(&self, query: &Query) -> Result<ResourceMap> {
        if let Err(err) = query.validate() {
            if self.config.is_strict() {
                return Err(err);
            }
            warn!(op = %query.op, key = %query.key, error = %err, "ignoring malformed label query");
            return Ok(ResourceMap::new());
        }

        let indices = self.read_ready()?;
        let results = indices.labels.evaluate(query);
        trace!(op = %query.op, key = %query.key, matches = results.resource_count(), "label query");
        Ok(results)
    }

    /// Evaluate the first query through the index, then narrow the result
    /// by each following query. An empty slice yields an empty map.
    pub fn query_all(&self, queries: &[Query]) -> Result<ResourceMap> {
        let Some((first, rest)) = queries.split_first() else {
            return Ok(ResourceMap::new());
        };
        let mut results = self.query(first)?;
        for q in rest {
            if q.validate().is_err() && !self.config.is_strict() {
                return Ok(ResourceMap::new());
            }
            results = filter_label(q, &results)?;
        }
        Ok(results)
    }

    /// Export every non-empty bucket as `"key = value"` → copied list.
    pub fn load(&self) -> Result<ResourceMap> {
        let indices = self.read_ready()?;
        Ok(indices.labels.export())
    }

    pub fn get(&self, id: &str) -> Result<Option<ResourceRef>> {
        Ok(self.read_ready()?.uuids.get(id).cloned())
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.read_ready()?.uuids.contains_key(id))
    }

    /// Identity lookup for several ids, keyed by resource type. Unknown ids
    /// are skipped.
    pub fn query_ids<S: AsRef<str>>(&self, ids: &[S]) -> Result<ResourceMap> {
        let indices = self.read_ready()?;
        let mut results = ResourceMap::new();
        let mut seen: AHashSet<&str> = AHashSet::with_capacity(ids.len());
        for id in ids {
            let Some((key, res)) = indices.uuids.get_key_value(id.as_ref()) else { continue };
            if seen.insert(key.as_str()) {
                results.add(res.clone(), res.resource_type());
            }
        }
        Ok(results)
    }

    /// Number of indexed resources
    pub fn len(&self) -> Result<usize> {
        Ok(self.read_ready()?.uuids.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read_ready()?.uuids.is_empty())
    }

    pub fn label_keys(&self) -> Result<Vec<String>> {
        Ok(self.read_ready()?.labels.keys())
    }

    pub fn label_values(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.read_ready()?.labels.values(key))
    }

    // --- Lock helpers ---

    fn read_ready(&self) -> Result<MappedRwLockReadGuard<'_, Indices>> {
        RwLockReadGuard::try_map(self.inner.read(), Option::as_ref).map_err(|_| {
            warn!("read on uninitialized label store");
            StoreError::Uninitialized
        })
    }

    fn write_ready(&self) -> Result<MappedRwLockWriteGuard<'_, Indices>> {
        RwLockWriteGuard::try_map(self.inner.write(), Option::as_mut).map_err(|_| {
            warn!("write on uninitialized label store");
            StoreError::Uninitialized
        })
    }
}

impl Default for LabelStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

fn validate(res: &dyn Resource) -> Result<()> {
    res.validate().map_err(|source| StoreError::Validation {
        id: res.id().to_string(),
        source,
    })
}
