//! Vector distance metrics and the on-disk vector encoding.
//!
//! Distances follow the convention "smaller is closer" for every metric so
//! that search can always sort ascending:
//!
//! - `cosine`: `1 - cos(a, b)`, in `[0, 2]`
//! - `dot`: negative dot product
//! - `l2-squared`: squared Euclidean distance

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// How closeness between two vectors is measured in a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Dot,
    L2Squared,
}

impl DistanceMetric {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Dot => "dot",
            Self::L2Squared => "l2-squared",
        }
    }

    /// Distance between two vectors of equal length.
    ///
    /// # Errors
    /// Returns [`Error::DimensionMismatch`] when the lengths differ.
    pub fn distance(self, a: &[f32], b: &[f32]) -> Result<f32> {
        if a.len() != b.len() {
            return Err(Error::DimensionMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }

        let d = match self {
            Self::Cosine => {
                let (dot, norm_a, norm_b) = a.iter().zip(b).fold(
                    (0.0_f32, 0.0_f32, 0.0_f32),
                    |(dot, na, nb), (x, y)| (dot + x * y, na + x * x, nb + y * y),
                );
                let denom = norm_a.sqrt() * norm_b.sqrt();
                if denom == 0.0 {
                    // A zero vector has no direction; treat it as orthogonal.
                    1.0
                } else {
                    1.0 - (dot / denom).clamp(-1.0, 1.0)
                }
            }
            Self::Dot => -a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>(),
            Self::L2Squared => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let diff = x - y;
                    diff * diff
                })
                .sum(),
        };

        Ok(d)
    }

    /// Normalised certainty in `[0, 1]` for a distance, where `1` means
    /// identical direction. Only defined for the cosine metric.
    #[must_use]
    pub fn certainty(self, distance: f32) -> Option<f32> {
        match self {
            Self::Cosine => Some((1.0 - distance / 2.0).clamp(0.0, 1.0)),
            Self::Dot | Self::L2Squared => None,
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "dot" => Ok(Self::Dot),
            "l2-squared" | "l2" => Ok(Self::L2Squared),
            other => Err(Error::InvalidData(format!(
                "unknown distance metric: {other}"
            ))),
        }
    }
}

/// Encode a vector as a little-endian `f32` blob.
#[must_use]
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode a little-endian `f32` blob.
///
/// # Errors
/// Returns [`Error::InvalidData`] if the blob length is not a multiple of 4.
pub fn decode_vector(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(Error::InvalidData(format!(
            "vector blob length {} is not a multiple of 4",
            blob.len()
        )));
    }

    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
