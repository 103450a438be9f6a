// labelstore - label-indexed in-memory resource store
// Identity index + label index kept in lock-step behind one RwLock.

pub mod config;
pub mod error;
pub mod factory;
pub mod index;
pub mod query;
pub mod store;
pub mod types;

// Re-export main types
pub use config::{QueryMode, StoreConfig};
pub use error::{BoxError, ResourceError, Result, StoreError};
pub use factory::{basic_factory, ResourceFactory};
pub use query::{filter_label, Operator, Query};
pub use store::LabelStore;
pub use types::{BasicResource, Labels, Resource, ResourceList, ResourceMap, ResourceRef};
