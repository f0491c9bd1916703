//! audioseek segment index
//!
//! This crate implements the core retrieval data structures for audioseek:
//!
//! - [`SegmentDescriptor`] - identity of one embedded time span
//! - [`VectorIndex`] - append-only flat index of L2-normalized vectors with
//!   exact brute-force cosine-similarity search
//! - [`MetadataStore`] - insertion-ordered descriptor storage, row-aligned
//!   1:1 with the vector index
//! - [`SegmentIndex`] - the facade binding both behind one aligned `add`,
//!   so the row-alignment invariant cannot be broken from outside
//! - [`store`] - the persisted on-disk form (binary vector file + JSON
//!   metadata file, written and loaded as a unit)
//!
//! # Determinism
//!
//! Search results are fully deterministic: scores are inner products of
//! L2-normalized vectors, sorted descending, with ties broken by insertion
//! order (lower row index wins).

pub mod descriptor;
pub mod error;
pub mod index;
pub mod meta;
pub mod segment_index;
pub mod store;

pub use descriptor::SegmentDescriptor;
pub use error::{IndexError, IndexResult};
pub use index::{l2_normalize, VectorIndex, NORM_EPSILON};
pub use meta::MetadataStore;
pub use segment_index::SegmentIndex;
pub use store::{load_index, save_index};
