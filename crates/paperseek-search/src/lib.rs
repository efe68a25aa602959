//! Embedding and vector search for paperseek.
//!
//! Wraps the embedding models behind the [`Embedder`] trait and runs
//! nearest-neighbour queries against the paper collection.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod embed;
pub mod error;
pub mod query;

#[cfg(feature = "fastembed")]
pub use embed::FastEmbedder;
pub use embed::{Embedder, MockEmbedder};
pub use error::{SearchError, SearchResult};
pub use query::{QueryRunner, SearchHit};
