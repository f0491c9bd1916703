//! Error types for index operations.

use thiserror::Error;

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors that can occur in the vector index and its persisted form.
///
/// `DimensionMismatch` and `AlignmentMismatch` signal caller bugs and are
/// never recovered from silently.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A vector's dimension does not match the index dimension.
    #[error("dimension mismatch: index expects {expected}, got {found}")]
    DimensionMismatch {
        /// Dimension the index was constructed with.
        expected: usize,
        /// Dimension of the offending vector.
        found: usize,
    },

    /// An aligned add was called with diverging vector/descriptor counts.
    #[error("aligned add requires equal counts: {vectors} vectors vs {descriptors} descriptors")]
    AlignmentMismatch {
        /// Number of vectors supplied.
        vectors: usize,
        /// Number of descriptors supplied.
        descriptors: usize,
    },

    /// The persisted vector file failed structural validation.
    #[error("corrupt vector file: {reason}")]
    CorruptVectorFile {
        /// What was wrong with the file.
        reason: String,
    },

    /// The persisted artifacts disagree about the row count.
    #[error("store misaligned: {metadata} metadata records vs {rows} vector rows")]
    StoreMisaligned {
        /// Records in the metadata file.
        metadata: usize,
        /// Rows in the vector file.
        rows: usize,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata (de)serialization error.
    #[error("metadata serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IndexError {
    /// Creates a corrupt-vector-file error.
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptVectorFile {
            reason: reason.into(),
        }
    }
}
