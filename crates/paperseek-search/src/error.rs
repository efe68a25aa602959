//! Error types for embedding and search.

use thiserror::Error;

/// Errors that can occur while embedding text or querying a collection.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The embedding model failed to load or run.
    #[error("embedding model error: {0}")]
    Model(String),

    /// No supported model matches the configured name.
    #[error("unknown embedding model: {0}")]
    UnknownModel(String),

    /// The model returned a different number of vectors than inputs.
    #[error("embedding model returned {actual} vectors for {expected} inputs")]
    BatchSize { expected: usize, actual: usize },

    /// The collection was indexed with a different embedding model.
    #[error("collection was indexed with model '{indexed}', but the query uses '{query}'")]
    ModelMismatch { indexed: String, query: String },

    /// The query text was empty after trimming.
    #[error("query text is empty")]
    EmptyQuery,

    /// An error propagated from the store.
    #[error("store error: {0}")]
    Store(#[from] paperseek_core::Error),
}

/// Convenience alias for search results.
pub type SearchResult<T> = std::result::Result<T, SearchError>;
