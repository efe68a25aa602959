use std::path::PathBuf;
use std::sync::Arc;

use paperseek_search::Embedder;
use treadle::Workflow;

use crate::config::Config;
use crate::dataset::DatasetSource;
use crate::{EmbedStage, IndexStage, LoadStage};

/// Build the load → embed → index pipeline.
///
/// `fresh` discards previously staged papers before loading.
///
/// # Errors
/// Returns an error if the workflow cannot be built.
pub fn build_pipeline(
    config: &Config,
    source: Arc<dyn DatasetSource>,
    embedder: Box<dyn Embedder>,
    fresh: bool,
) -> treadle::Result<Workflow> {
    let db_path: PathBuf = config.database_path.clone();

    let load_stage = LoadStage::new(source, config.sampling, db_path.clone()).fresh(fresh);
    let embed_stage = EmbedStage::new(embedder, config.embedding.batch_size, db_path.clone());
    let index_stage = IndexStage::new(config.search.metric, db_path);

    Workflow::builder()
        .stage("load", load_stage)
        .stage("embed", embed_stage)
        .stage("index", index_stage)
        .dependency("embed", "load")
        .dependency("index", "embed")
        .build()
}
