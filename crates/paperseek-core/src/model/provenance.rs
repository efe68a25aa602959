use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the sample the staged papers were drawn from.
///
/// Two loads with equal provenance select the same rows in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleProvenance {
    /// Description of the dataset source (hub name and split, or file path).
    pub dataset: String,
    pub seed: u64,
    /// Requested sample size, before clamping to the dataset size.
    pub size: usize,
}

impl SampleProvenance {
    #[must_use]
    pub fn new(dataset: impl Into<String>, seed: u64, size: usize) -> Self {
        Self {
            dataset: dataset.into(),
            seed,
            size,
        }
    }
}

impl fmt::Display for SampleProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (seed {}, size {})", self.dataset, self.seed, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provenance_display() {
        let provenance = SampleProvenance::new("CShorten/ML-ArXiv-Papers (default/train)", 42, 100);
        assert_eq!(
            provenance.to_string(),
            "CShorten/ML-ArXiv-Papers (default/train) (seed 42, size 100)"
        );
    }

    #[test]
    fn test_provenance_differs_by_seed_and_size() {
        let base = SampleProvenance::new("papers.jsonl", 42, 100);
        assert_ne!(base, SampleProvenance::new("papers.jsonl", 7, 100));
        assert_ne!(base, SampleProvenance::new("papers.jsonl", 42, 50));
        assert_ne!(base, SampleProvenance::new("other.jsonl", 42, 100));
        assert_eq!(base, SampleProvenance::new("papers.jsonl", 42, 100));
    }
}
