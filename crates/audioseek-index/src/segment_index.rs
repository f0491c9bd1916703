//! Aligned facade over the vector index and metadata store.

use crate::descriptor::SegmentDescriptor;
use crate::error::{IndexError, IndexResult};
use crate::index::VectorIndex;
use crate::meta::MetadataStore;

/// Binds a [`VectorIndex`] and a [`MetadataStore`] behind one aligned `add`.
///
/// Invariant: `metadata.len() == vectors.count()` and the descriptor at row
/// *i* describes the segment whose normalized embedding occupies row *i*.
/// The invariant holds after every mutation; `add` commits both sides or
/// neither.
///
/// Mutation goes through `&mut self`, so a build has exactly one writer. A
/// shared index needs a single mutex around `add`; `search` only reads
/// committed state.
#[derive(Debug, Clone)]
pub struct SegmentIndex {
    vectors: VectorIndex,
    metadata: MetadataStore,
}

impl SegmentIndex {
    /// Creates an empty index for embeddings of the given dimension.
    pub fn new(dim: usize) -> Self {
        Self {
            vectors: VectorIndex::new(dim),
            metadata: MetadataStore::new(),
        }
    }

    /// Rebinds previously persisted parts, validating row alignment.
    pub fn from_parts(vectors: VectorIndex, metadata: MetadataStore) -> IndexResult<Self> {
        if metadata.len() != vectors.count() {
            return Err(IndexError::StoreMisaligned {
                metadata: metadata.len(),
                rows: vectors.count(),
            });
        }
        Ok(Self { vectors, metadata })
    }

    /// Embedding dimension.
    pub fn dim(&self) -> usize {
        self.vectors.dim()
    }

    /// Number of indexed segments.
    pub fn count(&self) -> usize {
        self.vectors.count()
    }

    /// True if nothing has been indexed.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The underlying vector index.
    pub fn vectors(&self) -> &VectorIndex {
        &self.vectors
    }

    /// The underlying metadata store.
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Appends a batch of raw vectors with their descriptors, row-aligned.
    ///
    /// Counts must match ([`IndexError::AlignmentMismatch`] otherwise), and
    /// every vector must have the index dimension. Validation happens before
    /// anything is appended, so a failed add leaves both sides untouched.
    pub fn add(
        &mut self,
        vectors: &[Vec<f32>],
        descriptors: Vec<SegmentDescriptor>,
    ) -> IndexResult<()> {
        if vectors.len() != descriptors.len() {
            return Err(IndexError::AlignmentMismatch {
                vectors: vectors.len(),
                descriptors: descriptors.len(),
            });
        }
        self.vectors.add(vectors)?;
        for descriptor in descriptors {
            self.metadata.append(descriptor);
        }
        Ok(())
    }

    /// Exact top-k search returning `(descriptor, score)` pairs, descending
    /// by score with insertion-order tie-break.
    ///
    /// The query vector is normalized internally; pass it raw. An empty
    /// index yields an empty list - "no matches" is a valid outcome, not an
    /// error.
    pub fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<(SegmentDescriptor, f32)>> {
        let hits = self.vectors.search(query, k)?;
        Ok(hits
            .into_iter()
            .map(|(row, score)| {
                let descriptor = self
                    .metadata
                    .get(row)
                    .expect("row alignment invariant")
                    .clone();
                (descriptor, score)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn desc(track: &str, seg: u32) -> SegmentDescriptor {
        SegmentDescriptor::new(track, seg, 0.0, 1.0, 44100, format!("/tmp/{track}"))
    }

    #[test]
    fn test_add_keeps_rows_aligned() {
        let mut idx = SegmentIndex::new(2);
        idx.add(
            &[vec![1.0, 0.0], vec![0.0, 1.0]],
            vec![desc("a.wav", 0), desc("a.wav", 1)],
        )
        .unwrap();
        idx.add(&[vec![1.0, 1.0]], vec![desc("b.wav", 0)]).unwrap();

        assert_eq!(idx.count(), 3);
        assert_eq!(idx.metadata().len(), idx.vectors().count());
        assert_eq!(idx.metadata().get(0).unwrap().track_id, "a.wav");
        assert_eq!(idx.metadata().get(2).unwrap().track_id, "b.wav");
    }

    #[test]
    fn test_add_rejects_count_divergence() {
        let mut idx = SegmentIndex::new(2);
        let err = idx
            .add(&[vec![1.0, 0.0], vec![0.0, 1.0]], vec![desc("a.wav", 0)])
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::AlignmentMismatch {
                vectors: 2,
                descriptors: 1
            }
        ));
        assert_eq!(idx.count(), 0);
        assert_eq!(idx.metadata().len(), 0);
    }

    #[test]
    fn test_failed_add_commits_neither_side() {
        let mut idx = SegmentIndex::new(2);
        let err = idx
            .add(&[vec![1.0, 0.0, 0.0]], vec![desc("a.wav", 0)])
            .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
        assert_eq!(idx.count(), 0);
        assert_eq!(idx.metadata().len(), 0);
    }

    #[test]
    fn test_search_returns_descriptors_with_scores() {
        let mut idx = SegmentIndex::new(2);
        idx.add(
            &[vec![1.0, 0.0], vec![0.0, 1.0]],
            vec![desc("a.wav", 0), desc("b.wav", 0)],
        )
        .unwrap();

        let hits = idx.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.track_id, "a.wav");
        assert!((hits[0].1 - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_search_empty_index() {
        let idx = SegmentIndex::new(2);
        assert!(idx.search(&[1.0, 0.0], 10).unwrap().is_empty());
    }

    #[test]
    fn test_from_parts_validates_alignment() {
        let vectors = VectorIndex::new(2);
        let mut metadata = MetadataStore::new();
        metadata.append(desc("a.wav", 0));
        let err = SegmentIndex::from_parts(vectors, metadata).unwrap_err();
        assert!(matches!(
            err,
            IndexError::StoreMisaligned {
                metadata: 1,
                rows: 0
            }
        ));
    }
}
