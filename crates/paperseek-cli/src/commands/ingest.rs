use anyhow::{Context, Result};
use paperseek_core::model::PAPER_COLLECTION;
use paperseek_core::schema::Database;
use paperseek_etl::dataset::ColumnSelection;
use paperseek_etl::{build_pipeline, Config, DatasetSource, HubDataset, IngestJob, JsonlDataset};
use paperseek_search::Embedder;
use std::path::PathBuf;
use std::sync::Arc;

/// Run the load → embed → index pipeline once.
///
/// `dataset_file` overrides `dataset.local_file` from the config; without
/// either, rows come from the Hugging Face datasets-server.
pub async fn run_ingest(
    config: &Config,
    embedder: Box<dyn Embedder>,
    dataset_file: Option<PathBuf>,
    fresh: bool,
) -> Result<()> {
    let source = open_source(config, dataset_file)?;

    println!("\n📄 Paperseek Ingest\n");
    println!("  Dataset: {}", source.describe());
    println!(
        "  Sample: {} rows (seed {})",
        config.sampling.size, config.sampling.seed
    );
    println!("  Model: {}", embedder.model_name());
    println!("  Database: {}", config.database_path.display());
    println!();

    let job = IngestJob::unique(source.describe());
    let workflow = build_pipeline(config, source, embedder, fresh)
        .context("Failed to build pipeline")?;

    let mut store = treadle::SqliteStateStore::open(&config.pipeline_state_path())
        .await
        .context("Failed to open pipeline state store")?;

    // Subscribe to events for progress display
    let mut events = workflow.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                treadle::WorkflowEvent::StageStarted { stage, .. } => {
                    println!("  ⏳ [{stage}] Starting...");
                }
                treadle::WorkflowEvent::StageCompleted { stage, .. } => {
                    println!("  ✓ [{stage}] Complete");
                }
                treadle::WorkflowEvent::StageFailed { stage, error, .. } => {
                    eprintln!("  ✗ [{stage}] FAILED: {error}");
                }
                _ => {}
            }
        }
    });

    workflow
        .advance(&job, &mut store)
        .await
        .context("Pipeline execution failed")?;

    let db = Database::open(&config.database_path)?;
    println!("\n✓ Ingest complete");
    println!("  Papers staged: {}", db.count_papers()?);
    println!("  Papers embedded: {}", db.count_embedded_papers()?);
    println!(
        "  Objects in {}: {}",
        PAPER_COLLECTION,
        db.count_objects(PAPER_COLLECTION)?
    );
    println!("\nNext steps:");
    println!("  - Run 'paperseek query \"<text>\"' to search the collection");

    Ok(())
}

fn open_source(config: &Config, dataset_file: Option<PathBuf>) -> Result<Arc<dyn DatasetSource>> {
    match dataset_file.or_else(|| config.dataset.local_file.clone()) {
        Some(path) => {
            let columns = ColumnSelection::from_config(&config.dataset);
            let dataset = JsonlDataset::open(&path, columns)
                .with_context(|| format!("Failed to read dataset file {}", path.display()))?;
            if dataset.is_empty() {
                anyhow::bail!("Dataset file {} contains no rows", path.display());
            }
            log::info!("Read {} rows from {}", dataset.len(), path.display());
            Ok(Arc::new(dataset))
        }
        None => {
            let dataset =
                HubDataset::new(&config.dataset).context("Failed to create dataset client")?;
            Ok(Arc::new(dataset))
        }
    }
}
