//! Nearest-neighbour queries over the paper collection.

use serde::Serialize;

use paperseek_core::model::{PAPER_COLLECTION, TEXT_PROPERTY, TITLE_PROPERTY};
use paperseek_core::schema::{Database, NearVector};

use crate::embed::Embedder;
use crate::error::{SearchError, SearchResult};

/// A paper returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub text: String,
    pub distance: f32,
    pub certainty: Option<f32>,
}

/// Embeds a query string and asks the store for the closest papers.
#[derive(Debug, Clone)]
pub struct QueryRunner {
    collection: String,
    limit: usize,
    max_distance: Option<f32>,
}

impl QueryRunner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collection: PAPER_COLLECTION.to_string(),
            limit: NearVector::DEFAULT_LIMIT,
            max_distance: None,
        }
    }

    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_max_distance(mut self, max_distance: Option<f32>) -> Self {
        self.max_distance = max_distance;
        self
    }

    /// Run a query, returning at most `limit` papers nearest first.
    ///
    /// # Errors
    /// Returns [`SearchError::EmptyQuery`] for blank input and
    /// [`SearchError::ModelMismatch`] when the collection records a different
    /// embedding model than `embedder`. Embedding and store failures
    /// (including a dimension mismatch) are propagated.
    pub fn run(
        &self,
        db: &Database,
        embedder: &mut dyn Embedder,
        query: &str,
    ) -> SearchResult<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        if let Some(schema) = db.get_collection(&self.collection)? {
            if let Some(indexed) = schema.model {
                if indexed != embedder.model_name() {
                    return Err(SearchError::ModelMismatch {
                        indexed,
                        query: embedder.model_name().to_string(),
                    });
                }
            }
        }

        let vector = embedder.embed_one(query)?;
        log::debug!(
            "Embedded query with {} ({} dimensions)",
            embedder.model_name(),
            vector.len()
        );

        let mut near = NearVector::new(vector).with_limit(self.limit);
        if let Some(max) = self.max_distance {
            near = near.with_max_distance(max);
        }

        let hits = db.near_vector(&self.collection, &near)?;
        log::info!(
            "Query returned {} hits from {}",
            hits.len(),
            self.collection
        );

        Ok(hits
            .into_iter()
            .map(|hit| SearchHit {
                title: hit.text_property(TITLE_PROPERTY).unwrap_or_default().to_string(),
                text: hit.text_property(TEXT_PROPERTY).unwrap_or_default().to_string(),
                distance: hit.distance,
                certainty: hit.certainty,
            })
            .collect())
    }
}

impl Default for QueryRunner {
    fn default() -> Self {
        Self::new()
    }
}
