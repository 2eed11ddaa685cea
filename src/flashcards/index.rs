//! Exhaustive (flat) nearest-neighbour index over fixed-length vectors.
//!
//! Vectors are stored contiguously in insertion order; a vector's position
//! is its insertion index and never changes. There is no delete or update.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    #[error("dimension mismatch: index holds {expected}-d vectors, got {got}")]
    Dimension { expected: usize, got: usize },
}

/// A search hit: insertion position plus squared Euclidean distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

#[derive(Debug, Clone)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, data: Vec::new() }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        if self.dim == 0 { 0 } else { self.data.len() / self.dim }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append `vector` and return its position.
    pub fn add(&mut self, vector: &[f32]) -> Result<usize, IndexError> {
        self.check_dim(vector)?;
        let position = self.len();
        self.data.extend_from_slice(vector);
        Ok(position)
    }

    /// The `k` stored vectors closest to `query`, nearest first. Equal
    /// distances are ordered by position. Returns fewer than `k` hits when
    /// the index holds fewer vectors.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        self.check_dim(query)?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(position, stored)| Neighbor { position, distance: squared_l2(stored, query) })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.position.cmp(&b.position)));
        hits.truncate(k);
        Ok(hits)
    }

    fn check_dim(&self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dim {
            return Err(IndexError::Dimension { expected: self.dim, got: vector.len() });
        }
        Ok(())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
