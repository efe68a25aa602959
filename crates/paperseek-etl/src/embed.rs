//! The embed stage: compute vectors for staged papers.

use std::path::PathBuf;
use std::sync::Mutex;

use paperseek_core::schema::Database;
use paperseek_search::{Embedder, SearchError};
use treadle::{Stage, StageContext, StageOutcome};

use crate::error::{EtlError, EtlResult};

/// The Embed stage: map each staged paper's text to a vector.
///
/// Only papers without an embedding are processed, so an interrupted run
/// picks up where it stopped. When the store records a different model than
/// the one configured, every paper is embedded again.
#[derive(Debug)]
pub struct EmbedStage {
    embedder: Mutex<Box<dyn Embedder>>,
    batch_size: usize,
    db_path: PathBuf,
}

impl EmbedStage {
    #[must_use]
    pub fn new(embedder: Box<dyn Embedder>, batch_size: usize, db_path: PathBuf) -> Self {
        Self {
            embedder: Mutex::new(embedder),
            batch_size: batch_size.max(1),
            db_path,
        }
    }

    /// Returns the number of papers embedded by this run.
    fn embed_papers(&self) -> EtlResult<usize> {
        let db = Database::open(&self.db_path)?;
        let mut embedder = self
            .embedder
            .lock()
            .map_err(|_| SearchError::Model("embedder lock poisoned".to_string()))?;

        let model = embedder.model_name().to_string();
        let recorded = db.embedding_model()?;
        if recorded.as_deref() != Some(model.as_str()) {
            if db.count_embedded_papers()? > 0 {
                log::warn!(
                    "Embeddings were computed with {}, not {}; embedding all papers again",
                    recorded.as_deref().unwrap_or("an unrecorded model"),
                    model
                );
                db.clear_embeddings()?;
            }
            db.set_embedding_model(&model)?;
        }

        let papers = db.list_unembedded_papers()?;
        if papers.is_empty() {
            log::info!("All staged papers already embedded");
            return Ok(0);
        }

        log::info!(
            "Embedding {} papers with {} in batches of {}",
            papers.len(),
            model,
            self.batch_size
        );

        let mut embedded = 0;
        for batch in papers.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
            let vectors = embedder.embed(&texts)?;
            if vectors.len() != batch.len() {
                return Err(EtlError::Embedding(SearchError::BatchSize {
                    expected: batch.len(),
                    actual: vectors.len(),
                }));
            }

            for (paper, vector) in batch.iter().zip(&vectors) {
                db.set_paper_embedding(&paper.id, vector)?;
            }
            embedded += batch.len();
            log::debug!("Embedded {}/{} papers", embedded, papers.len());
        }

        Ok(embedded)
    }
}

#[async_trait::async_trait]
impl Stage for EmbedStage {
    fn name(&self) -> &str {
        "embed"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        match self.embed_papers() {
            Ok(count) => {
                log::info!("Embed complete: {} papers embedded", count);
                Ok(StageOutcome::Complete)
            }
            Err(e) => Err(treadle::TreadleError::StageExecution(format!(
                "Embed failed: {e}"
            ))),
        }
    }
}
