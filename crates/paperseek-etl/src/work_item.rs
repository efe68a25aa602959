use serde::{Deserialize, Serialize};
use std::fmt;
use treadle::WorkItem;
use uuid::Uuid;

/// One ingestion run flowing through the pipeline.
///
/// This is the treadle `WorkItem` that flows through the load → embed →
/// index stages. Each run gets a fresh ID so the state store never treats a
/// new run as already complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestJob {
    id: String,
    /// Description of the dataset being ingested.
    pub dataset: String,
}

impl IngestJob {
    #[must_use]
    pub fn new(id: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dataset: dataset.into(),
        }
    }

    /// Create a job with a unique `ingest-<uuid>` ID.
    #[must_use]
    pub fn unique(dataset: impl Into<String>) -> Self {
        Self::new(format!("ingest-{}", Uuid::new_v4()), dataset)
    }
}

impl WorkItem for IngestJob {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for IngestJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dataset)
    }
}
