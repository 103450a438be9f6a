//! Resource factory: type tag → constructor.
//!
//! Request and storage layers use this to turn a raw payload into a typed
//! resource before handing it to the store. The store never calls it.

use crate::error::{Result, StoreError};
use crate::types::{BasicResource, Resource, ResourceRef};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone, Copy)]
struct TypeEntry {
    zero: fn() -> ResourceRef,
    decode: fn(Value) -> serde_json::Result<ResourceRef>,
}

fn zero<T: Resource + Default + 'static>() -> ResourceRef {
    Arc::new(T::default())
}

fn decode<T: Resource + DeserializeOwned + 'static>(value: Value) -> serde_json::Result<ResourceRef> {
    Ok(Arc::new(serde_json::from_value::<T>(value)?))
}

/// Concurrent registry of resource types
#[derive(Default)]
pub struct ResourceFactory {
    types: DashMap<String, TypeEntry>,
}

impl ResourceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under `tag`, replacing any previous registration.
    pub fn register<T>(&self, tag: &str) -> &Self
    where
        T: Resource + Default + DeserializeOwned + 'static,
    {
        self.types.insert(
            tag.to_string(),
            TypeEntry {
                zero: zero::<T>,
                decode: decode::<T>,
            },
        );
        self
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.types.contains_key(tag)
    }

    /// Registered tags, sorted
    pub fn types(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.types.iter().map(|e| e.key().clone()).collect();
        tags.sort();
        tags
    }

    /// Zero-value resource of type `tag`.
    pub fn new_resource(&self, tag: &str) -> Result<ResourceRef> {
        let entry = self.entry(tag)?;
        Ok((entry.zero)())
    }

    /// Decode a JSON payload, dispatching on its `type` field.
    pub fn decode(&self, json: &str) -> Result<ResourceRef> {
        let value: Value = serde_json::from_str(json)?;
        self.decode_value(value)
    }

    pub fn decode_value(&self, value: Value) -> Result<ResourceRef> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::InvalidPayload("missing \"type\" field".into()))?
            .to_string();
        let entry = self.entry(&tag)?;
        Ok((entry.decode)(value)?)
    }

    fn entry(&self, tag: &str) -> Result<TypeEntry> {
        self.types
            .get(tag)
            .map(|e| *e.value())
            .ok_or_else(|| StoreError::UnknownType(tag.to_string()))
    }
}

/// Factory with [`BasicResource`] registered under each of `tags`.
pub fn basic_factory(tags: &[&str]) -> ResourceFactory {
    let factory = ResourceFactory::new();
    for tag in tags {
        factory.register::<BasicResource>(tag);
    }
    factory
}
