//! Segment descriptor type.

use serde::{Deserialize, Serialize};

/// Identifies one embedded time span of a source track.
///
/// Descriptors are immutable once created. Row *i* of the persisted metadata
/// file holds the descriptor for row *i* of the vector file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    /// Source file identity (track basename).
    pub track_id: String,
    /// Index of this segment within its track, starting at 0.
    pub seg_id: u32,
    /// Span start in seconds.
    pub start: f64,
    /// Span end in seconds. Always greater than `start`.
    pub end: f64,
    /// Sample rate of the source file in Hz.
    pub sample_rate: u32,
    /// Path the track was read from.
    pub source_path: String,
}

impl SegmentDescriptor {
    /// Creates a descriptor for one span of a track.
    pub fn new(
        track_id: impl Into<String>,
        seg_id: u32,
        start: f64,
        end: f64,
        sample_rate: u32,
        source_path: impl Into<String>,
    ) -> Self {
        Self {
            track_id: track_id.into(),
            seg_id,
            start,
            end,
            sample_rate,
            source_path: source_path.into(),
        }
    }

    /// Span duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}
