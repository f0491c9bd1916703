//! Query-side orchestration: a text or audio request embedded into the
//! index's vector space and searched.

use serde::Serialize;
use thiserror::Error;

use audioseek_audio::{canonicalize, AudioError, Embedder, Waveform};
use audioseek_index::{IndexError, SegmentIndex};

/// Default result count when none is requested.
pub const DEFAULT_TOP_K: usize = 10;

/// Errors on the query path.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Both or neither of text/audio were supplied. User-input error; the
    /// query is aborted and reported.
    #[error("ambiguous query: supply exactly one of a text string or an audio clip")]
    AmbiguousQuery,

    /// The embedding provider returned nothing for the query.
    #[error("embedding provider returned no vector for the query")]
    EmptyEmbedding,

    /// Audio-side failure (decode, canonicalization, embedding).
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Index-side failure (dimension mismatch).
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// A query in exactly one modality.
#[derive(Debug, Clone)]
pub enum QueryRequest {
    /// Free-text query.
    Text(String),
    /// Audio-clip query (any sample rate; canonicalized before embedding).
    Audio(Waveform),
}

impl QueryRequest {
    /// Builds a request from optional inputs, enforcing the
    /// exactly-one-modality rule.
    pub fn from_options(
        text: Option<String>,
        audio: Option<Waveform>,
    ) -> Result<Self, QueryError> {
        match (text, audio) {
            (Some(text), None) => Ok(Self::Text(text)),
            (None, Some(audio)) => Ok(Self::Audio(audio)),
            _ => Err(QueryError::AmbiguousQuery),
        }
    }
}

/// One ranked query result.
#[derive(Debug, Clone, Serialize)]
pub struct QueryHit {
    /// Source track identity.
    pub track_id: String,
    /// Segment number within the track.
    pub seg_id: u32,
    /// Span start in seconds.
    pub start: f64,
    /// Span end in seconds.
    pub end: f64,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
}

/// Embeds the request and runs top-k search.
///
/// The chosen modality is embedded into the same space used at build time
/// (the provider's contract), then dispatched to the index. An empty index
/// yields an empty list - "no matches" is a valid outcome, not an error.
pub fn query(
    index: &SegmentIndex,
    embedder: &dyn Embedder,
    request: &QueryRequest,
    k: usize,
) -> Result<Vec<QueryHit>, QueryError> {
    let vector = match request {
        QueryRequest::Text(text) => {
            let mut vectors = embedder.embed_text(std::slice::from_ref(text))?;
            if vectors.is_empty() {
                return Err(QueryError::EmptyEmbedding);
            }
            vectors.remove(0)
        }
        QueryRequest::Audio(audio) => {
            let canonical = canonicalize(audio, embedder.sample_rate());
            embedder.embed_audio(&canonical)?
        }
    };

    let hits = index.search(&vector, k)?;
    Ok(hits
        .into_iter()
        .map(|(descriptor, score)| QueryHit {
            track_id: descriptor.track_id,
            seg_id: descriptor.seg_id,
            start: descriptor.start,
            end: descriptor.end,
            score,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use audioseek_audio::AudioResult;
    use audioseek_index::SegmentDescriptor;

    /// Fixed-vector embedder: audio maps to [1, 0], text to [0, 1].
    struct FixedEmbedder;

    impl Embedder for FixedEmbedder {
        fn dim(&self) -> usize {
            2
        }
        fn sample_rate(&self) -> u32 {
            48000
        }
        fn embed_audio(&self, _track: &Waveform) -> AudioResult<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
        fn embed_text(&self, texts: &[String]) -> AudioResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0, 1.0]).collect())
        }
    }

    fn desc(track: &str) -> SegmentDescriptor {
        SegmentDescriptor::new(track, 0, 0.0, 1.0, 48000, format!("/tmp/{track}"))
    }

    fn sample_index() -> SegmentIndex {
        let mut index = SegmentIndex::new(2);
        index
            .add(
                &[vec![1.0, 0.0], vec![0.0, 1.0]],
                vec![desc("drums.wav"), desc("pads.wav")],
            )
            .unwrap();
        index
    }

    #[test]
    fn test_request_requires_exactly_one_modality() {
        assert!(matches!(
            QueryRequest::from_options(None, None),
            Err(QueryError::AmbiguousQuery)
        ));
        assert!(matches!(
            QueryRequest::from_options(
                Some("kick".into()),
                Some(Waveform::new(vec![0.0], 48000))
            ),
            Err(QueryError::AmbiguousQuery)
        ));
        assert!(QueryRequest::from_options(Some("kick".into()), None).is_ok());
        assert!(QueryRequest::from_options(None, Some(Waveform::new(vec![0.0], 48000))).is_ok());
    }

    #[test]
    fn test_audio_query_ranks_audio_row_first() {
        let index = sample_index();
        let request = QueryRequest::Audio(Waveform::new(vec![0.5; 100], 48000));
        let hits = query(&index, &FixedEmbedder, &request, 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].track_id, "drums.wav");
        assert!((hits[0].score - 1.0).abs() < 1e-5);
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_text_query_ranks_text_row_first() {
        let index = sample_index();
        let request = QueryRequest::Text("warm pad".into());
        let hits = query(&index, &FixedEmbedder, &request, 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].track_id, "pads.wav");
    }

    #[test]
    fn test_empty_index_returns_no_hits() {
        let index = SegmentIndex::new(2);
        let request = QueryRequest::Text("anything".into());
        let hits = query(&index, &FixedEmbedder, &request, 10).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_hit_serializes_expected_fields() {
        let index = sample_index();
        let request = QueryRequest::Text("pad".into());
        let hits = query(&index, &FixedEmbedder, &request, 1).unwrap();
        let json = serde_json::to_value(&hits).unwrap();
        let record = &json[0];
        assert!(record.get("track_id").is_some());
        assert!(record.get("seg_id").is_some());
        assert!(record.get("start").is_some());
        assert!(record.get("end").is_some());
        assert!(record.get("score").is_some());
    }
}
