//! Error types for the label store.

/// Boxed error returned by a resource's own validation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A resource rejected itself; nothing was mutated.
    #[error("resource {id:?} failed validation: {source}")]
    Validation {
        id: String,
        #[source]
        source: BoxError,
    },

    #[error("resource {0:?} already exists")]
    AlreadyExists(String),

    #[error("resource {0:?} does not exist")]
    NotFound(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The store was never initialized, or was wiped.
    #[error("label store is not initialized")]
    Uninitialized,

    #[error("unknown resource type {0:?}")]
    UnknownType(String),

    #[error("invalid resource payload: {0}")]
    InvalidPayload(String),

    #[error("failed to decode resource: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Validation failures raised by [`BasicResource`](crate::BasicResource).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("missing resource id")]
    MissingId,

    #[error("missing resource type")]
    MissingType,

    #[error("empty label key")]
    EmptyLabelKey,
}
