use std::fmt;
use std::path::PathBuf;

use ::fastembed::{InitOptions, TextEmbedding};

use crate::embed::{check_batch, Embedder};
use crate::error::{SearchError, SearchResult};

/// Local sentence-embedding model run through ONNX Runtime.
///
/// Model files are downloaded from the Hugging Face hub on first use and
/// cached under `cache_dir`.
pub struct FastEmbedder {
    model: TextEmbedding,
    name: String,
    dimension: usize,
    batch_size: Option<usize>,
}

impl FastEmbedder {
    /// Load a model by name, e.g. `all-MiniLM-L6-v2` or
    /// `sentence-transformers/all-MiniLM-L6-v2`.
    ///
    /// # Errors
    /// Returns [`SearchError::UnknownModel`] if no supported model matches
    /// the name, or [`SearchError::Model`] if loading fails.
    pub fn new(model_name: &str, cache_dir: Option<PathBuf>) -> SearchResult<Self> {
        let info = TextEmbedding::list_supported_models()
            .into_iter()
            .find(|info| {
                model_matches(&info.model_code, &format!("{:?}", info.model), model_name)
            })
            .ok_or_else(|| SearchError::UnknownModel(model_name.to_string()))?;

        log::info!(
            "Loading embedding model {} ({} dimensions)",
            info.model_code,
            info.dim
        );

        let mut options = InitOptions::new(info.model.clone()).with_show_download_progress(true);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        let model =
            TextEmbedding::try_new(options).map_err(|e| SearchError::Model(e.to_string()))?;

        Ok(Self {
            model,
            name: info.model_code.clone(),
            dimension: info.dim,
            batch_size: None,
        })
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size.max(1));
        self
    }
}

impl fmt::Debug for FastEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastEmbedder")
            .field("name", &self.name)
            .field("dimension", &self.dimension)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl Embedder for FastEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&mut self, texts: &[String]) -> SearchResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self
            .model
            .embed(texts.to_vec(), self.batch_size)
            .map_err(|e| SearchError::Model(e.to_string()))?;

        check_batch(texts.len(), self.dimension, &vectors)?;
        Ok(vectors)
    }
}

/// Whether a configured model name refers to a supported model.
///
/// Accepts the full hub code (`Qdrant/all-MiniLM-L6-v2-onnx`), the repo
/// name with or without an `-onnx` suffix or an owner prefix
/// (`sentence-transformers/all-MiniLM-L6-v2`), and the enum variant name
/// (`AllMiniLML6V2`). Comparison is case-insensitive.
fn model_matches(model_code: &str, variant: &str, wanted: &str) -> bool {
    let wanted = wanted.trim().to_lowercase();
    let wanted_repo = repo_name(&wanted);
    let code = model_code.to_lowercase();
    let code_repo = repo_name(&code);

    code == wanted
        || code_repo == wanted_repo
        || code_repo.strip_suffix("-onnx") == Some(wanted_repo)
        || variant.to_lowercase() == wanted
}

fn repo_name(code: &str) -> &str {
    code.rsplit('/').next().unwrap_or(code)
}
