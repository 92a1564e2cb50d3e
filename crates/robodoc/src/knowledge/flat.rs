//! Exact nearest-neighbor index with squared-Euclidean distance

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Flat (brute-force) vector index
///
/// Vectors are stored contiguously; position `i` in the index corresponds
/// to chunk ordinal `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatIndex {
    dimensions: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.vectors.len() / self.dimensions
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the stored data splits evenly into vectors of `dimensions`
    pub fn is_well_formed(&self) -> bool {
        self.dimensions > 0 && self.vectors.len() % self.dimensions == 0
    }

    /// Append a vector; its position is the next ordinal
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        if vector.len() != self.dimensions {
            return Err(Error::knowledge_base(format!(
                "Embedding has {} dimensions, index expects {}",
                vector.len(),
                self.dimensions
            )));
        }
        let ordinal = self.len();
        self.vectors.extend_from_slice(vector);
        Ok(ordinal)
    }

    /// Vector stored at `ordinal`
    pub fn vector(&self, ordinal: usize) -> Option<&[f32]> {
        let start = ordinal.checked_mul(self.dimensions)?;
        self.vectors.get(start..start + self.dimensions)
    }

    /// The `k` nearest vectors as `(ordinal, squared distance)`, closest first
    ///
    /// Equal distances are ordered by ordinal so results are stable.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimensions {
            return Err(Error::knowledge_base(format!(
                "Query embedding has {} dimensions, index expects {}",
                query.len(),
                self.dimensions
            )));
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(ordinal, vector)| (ordinal, squared_euclidean(query, vector)))
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }
}

/// Squared Euclidean (L2²) distance
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
