//! The index stage: write embedded papers into the vector collection.

use std::path::PathBuf;

use paperseek_core::model::Paper;
use paperseek_core::schema::{DataObject, Database};
use paperseek_core::vector::DistanceMetric;
use treadle::{Stage, StageContext, StageOutcome};

use crate::error::EtlResult;

/// The Index stage: (re)build the paper collection from staged papers.
///
/// The collection is redefined and refilled with every `(vector, text,
/// title)` triple in one transaction, so a failed rebuild leaves the
/// previous index in place. The collection records the embedding model so
/// queries with another model are rejected.
#[derive(Debug)]
pub struct IndexStage {
    metric: DistanceMetric,
    db_path: PathBuf,
}

impl IndexStage {
    #[must_use]
    pub fn new(metric: DistanceMetric, db_path: PathBuf) -> Self {
        Self { metric, db_path }
    }

    /// Returns the number of objects indexed.
    fn index_papers(&self) -> EtlResult<usize> {
        let db = Database::open(&self.db_path)?;
        let papers = db.list_papers()?;

        let objects = papers
            .iter()
            .map(Paper::to_object)
            .collect::<paperseek_core::Result<Vec<DataObject>>>()?;

        let mut schema = Paper::collection_schema(self.metric);
        if let Some(model) = db.embedding_model()? {
            schema = schema.with_model(model);
        }

        Ok(db.replace_collection(&schema, &objects)?)
    }
}

#[async_trait::async_trait]
impl Stage for IndexStage {
    fn name(&self) -> &str {
        "index"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        match self.index_papers() {
            Ok(count) => {
                log::info!("Index complete: {} objects inserted", count);
                Ok(StageOutcome::Complete)
            }
            Err(e) => Err(treadle::TreadleError::StageExecution(format!(
                "Index failed: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperseek_core::model::PAPER_COLLECTION;
    use tempfile::TempDir;

    fn embedded_db(dir: &TempDir) -> PathBuf {
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        db.insert_papers(&[
            Paper::new(0, "Right", "r").with_embedding(vec![1.0, 0.0]),
            Paper::new(1, "Up", "u").with_embedding(vec![0.0, 1.0]),
        ])
        .unwrap();
        db_path
    }

    #[test]
    fn test_index_inserts_every_paper() {
        let dir = TempDir::new().unwrap();
        let db_path = embedded_db(&dir);

        let stage = IndexStage::new(DistanceMetric::Cosine, db_path.clone());
        assert_eq!(stage.index_papers().unwrap(), 2);

        let db = Database::open(&db_path).unwrap();
        let schema = db.get_collection(PAPER_COLLECTION).unwrap().unwrap();
        assert_eq!(schema.dimension, Some(2));
        assert_eq!(schema.properties.len(), 2);
        assert_eq!(db.count_objects(PAPER_COLLECTION).unwrap(), 2);
    }

    #[test]
    fn test_index_rebuilds_collection() {
        let dir = TempDir::new().unwrap();
        let db_path = embedded_db(&dir);
        let stage = IndexStage::new(DistanceMetric::Cosine, db_path.clone());

        stage.index_papers().unwrap();
        stage.index_papers().unwrap();

        let db = Database::open(&db_path).unwrap();
        assert_eq!(db.count_objects(PAPER_COLLECTION).unwrap(), 2);
    }

    #[test]
    fn test_index_fails_on_unembedded_paper() {
        let dir = TempDir::new().unwrap();
        let db_path = embedded_db(&dir);
        Database::open(&db_path)
            .unwrap()
            .insert_papers(&[Paper::new(2, "Pending", "p")])
            .unwrap();

        let stage = IndexStage::new(DistanceMetric::Cosine, db_path.clone());
        assert!(stage.index_papers().is_err());

        // Conversion fails before the collection is touched
        let db = Database::open(&db_path).unwrap();
        assert!(db.get_collection(PAPER_COLLECTION).unwrap().is_none());
    }

    #[test]
    fn test_failed_reindex_keeps_previous_index() {
        let dir = TempDir::new().unwrap();
        let db_path = embedded_db(&dir);
        let stage = IndexStage::new(DistanceMetric::Cosine, db_path.clone());
        assert_eq!(stage.index_papers().unwrap(), 2);

        // A paper with a longer vector makes the rebuild fail
        Database::open(&db_path)
            .unwrap()
            .insert_papers(&[Paper::new(2, "Odd", "o").with_embedding(vec![1.0, 0.0, 0.0])])
            .unwrap();
        assert!(stage.index_papers().is_err());

        let db = Database::open(&db_path).unwrap();
        assert_eq!(db.count_objects(PAPER_COLLECTION).unwrap(), 2);
        let schema = db.get_collection(PAPER_COLLECTION).unwrap().unwrap();
        assert_eq!(schema.dimension, Some(2));
    }

    #[test]
    fn test_index_records_embedding_model() {
        let dir = TempDir::new().unwrap();
        let db_path = embedded_db(&dir);
        Database::open(&db_path)
            .unwrap()
            .set_embedding_model("mock")
            .unwrap();

        IndexStage::new(DistanceMetric::Cosine, db_path.clone())
            .index_papers()
            .unwrap();

        let db = Database::open(&db_path).unwrap();
        let schema = db.get_collection(PAPER_COLLECTION).unwrap().unwrap();
        assert_eq!(schema.model.as_deref(), Some("mock"));
    }
}
