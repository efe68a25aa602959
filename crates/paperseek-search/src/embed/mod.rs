//! Text embedding models.

#[cfg(feature = "fastembed")]
mod fastembed;
mod mock;

use std::fmt;

use crate::error::{SearchError, SearchResult};

#[cfg(feature = "fastembed")]
pub use self::fastembed::FastEmbedder;
pub use mock::MockEmbedder;

/// Maps text to fixed-length vectors.
///
/// Every vector an embedder returns has [`Embedder::dimension`] elements.
/// Models run inference through `&mut self`, so callers that share an
/// embedder across stages wrap it in a mutex.
pub trait Embedder: Send + fmt::Debug {
    /// Name of the underlying model.
    fn model_name(&self) -> &str;

    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, returning one vector per input in order.
    fn embed(&mut self, texts: &[String]) -> SearchResult<Vec<Vec<f32>>>;

    /// Embed a single text.
    fn embed_one(&mut self, text: &str) -> SearchResult<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()])?;
        if vectors.len() != 1 {
            return Err(SearchError::BatchSize {
                expected: 1,
                actual: vectors.len(),
            });
        }
        vectors.pop().ok_or(SearchError::BatchSize {
            expected: 1,
            actual: 0,
        })
    }
}

/// Check that a model returned one vector of the right size per input.
pub(crate) fn check_batch(
    expected: usize,
    dimension: usize,
    vectors: &[Vec<f32>],
) -> SearchResult<()> {
    if vectors.len() != expected {
        return Err(SearchError::BatchSize {
            expected,
            actual: vectors.len(),
        });
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(SearchError::Store(paperseek_core::Error::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        }));
    }
    Ok(())
}
