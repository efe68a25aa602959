//! Error types for the ETL pipeline.

use thiserror::Error;

/// Errors that can occur while loading, embedding, or indexing papers.
#[derive(Debug, Error)]
pub enum EtlError {
    /// An HTTP request to the dataset source failed.
    #[error("HTTP error from {source_name}: {message}")]
    Http {
        source_name: String,
        status: Option<u16>,
        message: String,
    },

    /// The dataset source returned a rate-limit response.
    #[error("rate limited by {source_name}")]
    RateLimited { source_name: String },

    /// A response from the dataset source could not be parsed.
    #[error("parse error from {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// A dataset row lacks one of the selected text columns.
    #[error("row {row} has no text column '{column}'")]
    MissingColumn { column: String, row: u64 },

    /// An error propagated from `reqwest`.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// A local dataset file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error propagated from the store.
    #[error("database error: {0}")]
    Database(#[from] paperseek_core::Error),

    /// An error propagated from the embedding model.
    #[error("embedding error: {0}")]
    Embedding(#[from] paperseek_search::SearchError),
}

impl EtlError {
    /// Returns `true` when the error is transient and the operation may
    /// succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Http { status, .. } => status.map_or(true, |s| s >= 500),
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Convenience alias for ETL results.
pub type EtlResult<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        let rate_limited = EtlError::RateLimited {
            source_name: "hub".to_string(),
        };
        assert!(rate_limited.is_transient());

        let server = EtlError::Http {
            source_name: "hub".to_string(),
            status: Some(503),
            message: "unavailable".to_string(),
        };
        assert!(server.is_transient());
    }

    #[test]
    fn test_permanent_errors() {
        let not_found = EtlError::Http {
            source_name: "hub".to_string(),
            status: Some(404),
            message: "no such dataset".to_string(),
        };
        assert!(!not_found.is_transient());

        let missing = EtlError::MissingColumn {
            column: "abstract".to_string(),
            row: 3,
        };
        assert!(!missing.is_transient());
    }
}
