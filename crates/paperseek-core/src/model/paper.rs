use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::ids::PaperId;
use crate::schema::collection::{CollectionSchema, DataObject, Property};
use crate::vector::DistanceMetric;

/// Name of the vector collection papers are indexed into.
pub const PAPER_COLLECTION: &str = "Paper";

/// Collection property holding the embedded text.
pub const TEXT_PROPERTY: &str = "text";

/// Collection property holding the paper title.
pub const TITLE_PROPERTY: &str = "title";

/// Separator placed between the abstract and the title when building the
/// text that gets embedded.
pub const TEXT_SEPARATOR: &str = " ";

/// A machine-learning paper sampled from the source dataset.
///
/// `text` is the abstract followed by the title and is what the embedding
/// model sees. The embedding is filled in by the embed stage and cleared
/// again only when the embedding model changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: PaperId,

    /// Row index in the source dataset split.
    pub dataset_row: u64,

    pub title: String,
    pub abstract_text: String,
    pub text: String,

    pub embedding: Option<Vec<f32>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Paper {
    /// Build a paper from its title and abstract, deriving `text`.
    #[must_use]
    pub fn new(dataset_row: u64, title: impl Into<String>, abstract_text: impl Into<String>) -> Self {
        let title = title.into();
        let abstract_text = abstract_text.into();
        let text = combine_text(&abstract_text, &title);
        let now = Utc::now();
        Self {
            id: PaperId::new(),
            dataset_row,
            title,
            abstract_text,
            text,
            embedding: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    #[must_use]
    pub const fn is_embedded(&self) -> bool {
        self.embedding.is_some()
    }

    /// Schema of the paper collection: two text properties.
    #[must_use]
    pub fn collection_schema(metric: DistanceMetric) -> CollectionSchema {
        CollectionSchema::new(PAPER_COLLECTION)
            .with_property(Property::text(TEXT_PROPERTY))
            .with_property(Property::text(TITLE_PROPERTY))
            .with_metric(metric)
    }

    /// Convert into a `(vector, text, title)` data object.
    ///
    /// # Errors
    /// Returns [`Error::InvalidData`] if the paper has not been embedded.
    pub fn to_object(&self) -> Result<DataObject> {
        let vector = self.embedding.clone().ok_or_else(|| {
            Error::InvalidData(format!("paper {} has no embedding", self.id))
        })?;

        Ok(DataObject::new(vector)
            .with_property(TEXT_PROPERTY, self.text.as_str())
            .with_property(TITLE_PROPERTY, self.title.as_str()))
    }
}

fn combine_text(abstract_text: &str, title: &str) -> String {
    let abstract_text = abstract_text.trim();
    let title = title.trim();
    let mut text = String::with_capacity(abstract_text.len() + TEXT_SEPARATOR.len() + title.len());
    text.push_str(abstract_text);
    text.push_str(TEXT_SEPARATOR);
    text.push_str(title);
    text
}
