//! Append-only flat vector index with exact cosine-similarity search.
//!
//! Vectors are L2-normalized on the way in, so the inner product of a stored
//! row and a normalized query equals their cosine similarity. Search is
//! brute-force over every row; there is no approximate structure and no
//! deletion.

use std::cmp::Ordering;

use crate::error::{IndexError, IndexResult};

/// Epsilon added to the L2 norm so the zero vector normalizes to zero
/// instead of dividing by zero.
pub const NORM_EPSILON: f32 = 1e-9;

/// Returns `v / (||v||_2 + epsilon)`.
///
/// Normalizing an already-unit-norm vector returns the same vector within
/// floating tolerance.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    let scale = 1.0 / (norm + NORM_EPSILON);
    v.iter().map(|x| x * scale).collect()
}

/// Append-only collection of L2-normalized embedding vectors.
///
/// Storage is row-major: row *i* occupies `data[i*dim .. (i+1)*dim]`. The
/// index stores normalized vectors only, never raw ones.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dim: usize,
    data: Vec<f32>,
}

impl VectorIndex {
    /// Creates an empty index for vectors of the given dimension.
    ///
    /// # Panics
    /// Panics if `dim` is zero; a zero-dimensional index is meaningless.
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "vector index dimension must be positive");
        Self {
            dim,
            data: Vec::new(),
        }
    }

    /// Reconstructs an index from already-normalized row-major data.
    ///
    /// Used by the store when loading a persisted index.
    pub(crate) fn from_raw(dim: usize, data: Vec<f32>) -> IndexResult<Self> {
        if dim == 0 {
            return Err(IndexError::corrupt("dimension is zero"));
        }
        if data.len() % dim != 0 {
            return Err(IndexError::corrupt(format!(
                "{} values is not a whole number of {}-dim rows",
                data.len(),
                dim
            )));
        }
        Ok(Self { dim, data })
    }

    /// Vector dimension this index was constructed with.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored rows.
    pub fn count(&self) -> usize {
        self.data.len() / self.dim
    }

    /// True if no vectors have been added.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The normalized vector stored at `row`.
    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.dim..(row + 1) * self.dim]
    }

    /// Raw row-major storage of all normalized rows.
    pub fn rows_flat(&self) -> &[f32] {
        &self.data
    }

    /// Normalizes and appends a batch of raw vectors.
    ///
    /// Every vector is validated before any is appended, so a dimension
    /// mismatch leaves the index untouched (no partial commit).
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> IndexResult<()> {
        for v in vectors {
            if v.len() != self.dim {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dim,
                    found: v.len(),
                });
            }
        }
        self.data.reserve(vectors.len() * self.dim);
        for v in vectors {
            self.data.extend(l2_normalize(v));
        }
        Ok(())
    }

    /// Exact top-k search: cosine similarity of the normalized query against
    /// every stored row, descending by score.
    ///
    /// Ties are broken by insertion order (lower row index first) so results
    /// are deterministic. Requesting more rows than are stored returns all
    /// rows ranked; searching an empty index returns an empty list.
    pub fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<(usize, f32)>> {
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                found: query.len(),
            });
        }
        let q = l2_normalize(query);
        let mut scored: Vec<(usize, f32)> = (0..self.count())
            .map(|row| {
                let score = self
                    .row(row)
                    .iter()
                    .zip(q.iter())
                    .map(|(a, b)| a * b)
                    .sum::<f32>();
                (row, score)
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_unit_vector_is_idempotent() {
        let v = vec![1.0, 0.0, 0.0];
        let n = l2_normalize(&v);
        for (a, b) in v.iter().zip(n.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_normalize_zero_vector() {
        let n = l2_normalize(&[0.0, 0.0]);
        assert_eq!(n, vec![0.0, 0.0]);
    }

    #[test]
    fn test_normalize_scales_to_unit_norm() {
        let n = l2_normalize(&[3.0, 4.0]);
        let norm = (n[0] * n[0] + n[1] * n[1]).sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_add_rejects_wrong_dimension() {
        let mut idx = VectorIndex::new(3);
        let err = idx.add(&[vec![1.0, 0.0]]).unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                found: 2
            }
        ));
        // Rejected batch must not leave partial rows behind.
        assert_eq!(idx.count(), 0);
    }

    #[test]
    fn test_add_validates_before_appending() {
        let mut idx = VectorIndex::new(2);
        let err = idx.add(&[vec![1.0, 0.0], vec![1.0, 0.0, 0.0]]).unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
        assert_eq!(idx.count(), 0);
    }

    #[test]
    fn test_search_example_scenario() {
        // Index [1,0] and [0,1]; query [1,0] k=1 -> row 0 at 1.0;
        // query [2,0] k=2 -> rows 0 then 1 at 1.0 and 0.0.
        let mut idx = VectorIndex::new(2);
        idx.add(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();

        let top1 = idx.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(top1.len(), 1);
        assert_eq!(top1[0].0, 0);
        assert!((top1[0].1 - 1.0).abs() < 1e-5);

        let top2 = idx.search(&[2.0, 0.0], 2).unwrap();
        assert_eq!(top2.len(), 2);
        assert_eq!(top2[0].0, 0);
        assert!((top2[0].1 - 1.0).abs() < 1e-5);
        assert_eq!(top2[1].0, 1);
        assert!(top2[1].1.abs() < 1e-5);
    }

    #[test]
    fn test_search_self_retrieval_unnormalized_query() {
        let mut idx = VectorIndex::new(3);
        idx.add(&[vec![0.3, -1.2, 0.7], vec![5.0, 5.0, 5.0]]).unwrap();
        let hits = idx.search(&[0.3, -1.2, 0.7], 1).unwrap();
        assert_eq!(hits[0].0, 0);
        assert!((hits[0].1 - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_search_scores_non_increasing() {
        let mut idx = VectorIndex::new(2);
        idx.add(&[
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![-1.0, 0.0],
        ])
        .unwrap();
        let hits = idx.search(&[1.0, 0.2], 4).unwrap();
        for pair in hits.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn test_search_k_exceeds_count() {
        let mut idx = VectorIndex::new(2);
        idx.add(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let hits = idx.search(&[1.0, 0.0], 100).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_search_empty_index_returns_empty() {
        let idx = VectorIndex::new(4);
        let hits = idx.search(&[1.0, 0.0, 0.0, 0.0], 10).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_search_ties_broken_by_insertion_order() {
        let mut idx = VectorIndex::new(2);
        // Identical directions: all three rows score identically.
        idx.add(&[vec![2.0, 0.0], vec![1.0, 0.0], vec![4.0, 0.0]])
            .unwrap();
        let hits = idx.search(&[1.0, 0.0], 3).unwrap();
        let rows: Vec<usize> = hits.iter().map(|h| h.0).collect();
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn test_search_rejects_wrong_query_dimension() {
        let idx = VectorIndex::new(3);
        let err = idx.search(&[1.0], 1).unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
    }
}
