//! The load stage: fetch, sample, and stage papers.

use std::path::PathBuf;
use std::sync::Arc;

use paperseek_core::model::{Paper, SampleProvenance};
use paperseek_core::schema::Database;
use treadle::{Stage, StageContext, StageOutcome};

use crate::config::SamplingConfig;
use crate::dataset::DatasetSource;
use crate::error::EtlResult;
use crate::sample::sample_indices;

/// The Load stage: pick a fixed-seed sample of rows and stage them as
/// papers.
///
/// Skips when the staged papers came from the same dataset, seed and size.
/// A different sample, or `fresh`, clears the staged papers and samples
/// again.
#[derive(Debug)]
pub struct LoadStage {
    source: Arc<dyn DatasetSource>,
    sampling: SamplingConfig,
    db_path: PathBuf,
    fresh: bool,
}

impl LoadStage {
    #[must_use]
    pub fn new(source: Arc<dyn DatasetSource>, sampling: SamplingConfig, db_path: PathBuf) -> Self {
        Self {
            source,
            sampling,
            db_path,
            fresh: false,
        }
    }

    #[must_use]
    pub fn fresh(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }

    fn provenance(&self) -> SampleProvenance {
        SampleProvenance::new(
            self.source.describe(),
            self.sampling.seed,
            self.sampling.size,
        )
    }

    /// Returns the number of papers staged by this run.
    async fn load(&self) -> EtlResult<usize> {
        let wanted = self.provenance();

        // Read phase: decide whether to run, then drop the DB before async work.
        {
            let db = Database::open(&self.db_path)?;
            let staged = db.count_papers()?;
            if staged > 0 {
                let recorded = db.sample_provenance()?;
                if !self.fresh {
                    if recorded.as_ref() == Some(&wanted) {
                        log::info!("{} papers already staged from {}, skipping load", staged, wanted);
                        return Ok(0);
                    }
                    log::warn!(
                        "Staged papers came from {}, not {}; sampling again",
                        recorded.map_or_else(|| "an unrecorded sample".to_string(), |p| p.to_string()),
                        wanted
                    );
                }
                log::info!("Clearing {} staged papers", db.clear_papers()?);
            }
        }

        let total = self.source.num_rows().await?;
        let indices = sample_indices(total, self.sampling.size, self.sampling.seed);
        log::info!(
            "Sampling {} of {} rows from {} (seed {})",
            indices.len(),
            total,
            self.source.describe(),
            self.sampling.seed
        );

        let rows = self.source.fetch_rows(&indices).await?;
        let papers: Vec<Paper> = indices
            .iter()
            .zip(rows)
            .map(|(&index, row)| Paper::new(index, row.title, row.abstract_text))
            .collect();

        let db = Database::open(&self.db_path)?;
        let count = db.insert_papers(&papers)?;
        db.set_sample_provenance(&wanted)?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl Stage for LoadStage {
    fn name(&self) -> &str {
        "load"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        match self.load().await {
            Ok(count) => {
                log::info!("Load complete: {} papers staged", count);
                Ok(StageOutcome::Complete)
            }
            Err(e) => Err(treadle::TreadleError::StageExecution(format!(
                "Load failed: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{ColumnSelection, JsonlDataset};
    use std::fs;
    use tempfile::TempDir;

    fn write_dataset(dir: &TempDir, rows: usize) -> Arc<dyn DatasetSource> {
        let path = dir.path().join("papers.jsonl");
        let lines: Vec<String> = (0..rows)
            .map(|i| format!(r#"{{"title": "Paper {i}", "abstract": "Abstract {i}."}}"#))
            .collect();
        fs::write(&path, lines.join("\n")).unwrap();
        Arc::new(JsonlDataset::open(&path, ColumnSelection::default()).unwrap())
    }

    #[tokio::test]
    async fn test_load_stages_sampled_papers() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        let source = write_dataset(&dir, 50);
        let sampling = SamplingConfig { seed: 42, size: 10 };

        let stage = LoadStage::new(source, sampling, db_path.clone());
        assert_eq!(stage.load().await.unwrap(), 10);

        let db = Database::open(&db_path).unwrap();
        let papers = db.list_papers().unwrap();
        let rows: Vec<u64> = papers.iter().map(|p| p.dataset_row).collect();
        assert_eq!(rows, sample_indices(50, 10, 42));
        for paper in &papers {
            assert_eq!(
                paper.text,
                format!("Abstract {0}. Paper {0}", paper.dataset_row)
            );
        }
    }

    #[tokio::test]
    async fn test_load_skips_when_already_staged() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        let source = write_dataset(&dir, 20);
        let sampling = SamplingConfig { seed: 1, size: 5 };

        let stage = LoadStage::new(Arc::clone(&source), sampling, db_path.clone());
        assert_eq!(stage.load().await.unwrap(), 5);
        assert_eq!(stage.load().await.unwrap(), 0);

        let fresh = LoadStage::new(source, sampling, db_path.clone()).fresh(true);
        assert_eq!(fresh.load().await.unwrap(), 5);
        assert_eq!(Database::open(&db_path).unwrap().count_papers().unwrap(), 5);
    }

    #[tokio::test]
    async fn test_load_resamples_when_sampling_changes() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        let source = write_dataset(&dir, 30);

        let first = LoadStage::new(
            Arc::clone(&source),
            SamplingConfig { seed: 42, size: 3 },
            db_path.clone(),
        );
        assert_eq!(first.load().await.unwrap(), 3);

        // New seed and size: the old sample is replaced, not kept
        let second = LoadStage::new(
            Arc::clone(&source),
            SamplingConfig { seed: 7, size: 5 },
            db_path.clone(),
        );
        assert_eq!(second.load().await.unwrap(), 5);

        let db = Database::open(&db_path).unwrap();
        let rows: Vec<u64> = db.list_papers().unwrap().iter().map(|p| p.dataset_row).collect();
        assert_eq!(rows, sample_indices(30, 5, 7));
        assert_eq!(
            db.sample_provenance().unwrap(),
            Some(SampleProvenance::new(source.describe(), 7, 5))
        );

        // Same seed, different size also resamples
        let third = LoadStage::new(source, SamplingConfig { seed: 7, size: 4 }, db_path.clone());
        assert_eq!(third.load().await.unwrap(), 4);
        assert_eq!(db.count_papers().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_load_resamples_unrecorded_papers() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        {
            let db = Database::open(&db_path).unwrap();
            db.insert_papers(&[Paper::new(0, "Stale", "No provenance")])
                .unwrap();
        }

        let stage = LoadStage::new(
            write_dataset(&dir, 10),
            SamplingConfig { seed: 1, size: 2 },
            db_path.clone(),
        );
        assert_eq!(stage.load().await.unwrap(), 2);
        let titles: Vec<String> = Database::open(&db_path)
            .unwrap()
            .list_papers()
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert!(!titles.contains(&"Stale".to_string()));
    }

    #[tokio::test]
    async fn test_load_stage_execute() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        let stage = LoadStage::new(write_dataset(&dir, 3), SamplingConfig::default(), db_path);
        assert_eq!(stage.name(), "load");

        let job = crate::IngestJob::new("job", "papers.jsonl");
        let mut ctx = StageContext::new("load".to_string());
        let outcome = stage.execute(&job, &mut ctx).await.unwrap();
        assert!(matches!(outcome, StageOutcome::Complete));
    }
}
