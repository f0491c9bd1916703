//! Build-side orchestration: files through segmentation, cached embedding,
//! and one aligned index add.
//!
//! Per-file failures (decode, segmentation) are collected as warnings and
//! the file is skipped, so one bad file does not abort a corpus build;
//! strict mode turns the first such failure into an abort. Structural
//! index errors (dimension, alignment) always propagate.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use audioseek_audio::{
    canonicalize, load_wav, segment, slice_span, AudioResult, Embedder, EmbeddingCache,
    SegmentationStrategy, Waveform,
};
use audioseek_index::{SegmentDescriptor, SegmentIndex};

/// Build configuration.
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Boundary-detection strategy for every file.
    pub strategy: SegmentationStrategy,
    /// Abort on the first per-file failure instead of skipping.
    pub strict: bool,
}

/// Result of a corpus build.
#[derive(Debug)]
pub struct BuildOutcome {
    /// The populated index.
    pub index: SegmentIndex,
    /// Files successfully indexed.
    pub files_indexed: usize,
    /// Files skipped after a per-file failure (lenient mode only).
    pub files_skipped: usize,
    /// One warning line per skipped file.
    pub warnings: Vec<String>,
}

impl BuildOutcome {
    /// Total segments in the index.
    pub fn segments(&self) -> usize {
        self.index.count()
    }
}

/// Builds a segment index over `files`.
///
/// Each file is decoded to a mono waveform, segmented, and every span is
/// sliced, canonicalized to the embedder's rate, and embedded through the
/// cache. All vectors and descriptors accumulate into one batch that is
/// added to the index in a single aligned operation - vectors are never
/// committed without their descriptors or vice versa.
pub fn build_index(
    files: &[PathBuf],
    embedder: &dyn Embedder,
    cache: &EmbeddingCache,
    options: &BuildOptions,
) -> Result<BuildOutcome> {
    let mut vectors: Vec<Vec<f32>> = Vec::new();
    let mut descriptors: Vec<SegmentDescriptor> = Vec::new();
    let mut files_indexed = 0usize;
    let mut files_skipped = 0usize;
    let mut warnings = Vec::new();

    for path in files {
        match index_file(path, embedder, cache, options.strategy) {
            Ok((file_vectors, file_descriptors)) => {
                vectors.extend(file_vectors);
                descriptors.extend(file_descriptors);
                files_indexed += 1;
            }
            Err(err) => {
                if options.strict {
                    return Err(err).with_context(|| {
                        format!("strict mode: failed to index '{}'", path.display())
                    });
                }
                warnings.push(format!("skipped '{}': {err}", path.display()));
                files_skipped += 1;
            }
        }
    }

    if files_indexed == 0 {
        bail!("no files could be indexed ({files_skipped} skipped)");
    }

    let mut index = SegmentIndex::new(embedder.dim());
    index
        .add(&vectors, descriptors)
        .context("aligned add of the build batch")?;

    Ok(BuildOutcome {
        index,
        files_indexed,
        files_skipped,
        warnings,
    })
}

/// Segments and embeds one file, returning row-aligned vectors and
/// descriptors.
fn index_file(
    path: &Path,
    embedder: &dyn Embedder,
    cache: &EmbeddingCache,
    strategy: SegmentationStrategy,
) -> AudioResult<(Vec<Vec<f32>>, Vec<SegmentDescriptor>)> {
    let track = load_wav(path)?;
    let spans = segment(&track, strategy)?;

    let track_id = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let source_path = path.display().to_string();

    let mut vectors = Vec::with_capacity(spans.len());
    let mut descriptors = Vec::with_capacity(spans.len());
    for (seg_id, span) in spans.iter().enumerate() {
        let slice = slice_span(&track, span.start, span.end, track.sample_rate)?;
        let vector = embed_cached(&slice, embedder, cache)?;
        vectors.push(vector);
        descriptors.push(SegmentDescriptor::new(
            track_id.clone(),
            seg_id as u32,
            span.start,
            span.end,
            track.sample_rate,
            source_path.clone(),
        ));
    }

    Ok((vectors, descriptors))
}

/// Canonicalizes a slice and obtains its embedding through the cache.
pub fn embed_cached(
    slice: &Waveform,
    embedder: &dyn Embedder,
    cache: &EmbeddingCache,
) -> AudioResult<Vec<f32>> {
    let canonical = canonicalize(slice, embedder.sample_rate());
    cache.get_or_compute(&canonical, |wave| embedder.embed_audio(wave))
}

#[cfg(test)]
mod tests {
    use super::*;
    use audioseek_audio::SpectralEmbedder;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_click_wav(path: &Path, sample_rate: u32, seconds: f64, clicks_per_second: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let n = (sample_rate as f64 * seconds) as usize;
        let step = sample_rate as usize / clicks_per_second as usize;
        for i in 0..n {
            let sample: i16 = if i % step == 0 { i16::MAX } else { 0 };
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn options() -> BuildOptions {
        BuildOptions {
            strategy: SegmentationStrategy::Beats,
            strict: false,
        }
    }

    #[test]
    fn test_build_produces_aligned_index() {
        let tmp = TempDir::new().unwrap();
        let wav = tmp.path().join("clicks.wav");
        write_click_wav(&wav, 24000, 2.0, 2);

        let embedder = SpectralEmbedder;
        let outcome = build_index(
            &[wav],
            &embedder,
            &EmbeddingCache::disabled(),
            &options(),
        )
        .unwrap();

        assert_eq!(outcome.files_indexed, 1);
        assert_eq!(outcome.files_skipped, 0);
        assert_eq!(outcome.segments(), 4);
        assert_eq!(
            outcome.index.metadata().len(),
            outcome.index.vectors().count()
        );
        // seg_ids number spans within the track from 0.
        for (row, descriptor) in outcome.index.metadata().records().iter().enumerate() {
            assert_eq!(descriptor.seg_id as usize, row);
            assert!(descriptor.end > descriptor.start);
            assert_eq!(descriptor.track_id, "clicks.wav");
        }
    }

    #[test]
    fn test_lenient_build_skips_bad_file() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("good.wav");
        write_click_wav(&good, 24000, 2.0, 2);
        let bad = tmp.path().join("bad.wav");
        std::fs::write(&bad, b"not a wav file").unwrap();

        let embedder = SpectralEmbedder;
        let outcome = build_index(
            &[bad, good],
            &embedder,
            &EmbeddingCache::disabled(),
            &options(),
        )
        .unwrap();

        assert_eq!(outcome.files_indexed, 1);
        assert_eq!(outcome.files_skipped, 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("bad.wav"));
    }

    #[test]
    fn test_strict_build_aborts_on_bad_file() {
        let tmp = TempDir::new().unwrap();
        let bad = tmp.path().join("bad.wav");
        std::fs::write(&bad, b"not a wav file").unwrap();

        let embedder = SpectralEmbedder;
        let result = build_index(
            &[bad],
            &embedder,
            &EmbeddingCache::disabled(),
            &BuildOptions {
                strategy: SegmentationStrategy::Beats,
                strict: true,
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_build_with_no_indexable_files_fails() {
        let tmp = TempDir::new().unwrap();
        let bad = tmp.path().join("bad.wav");
        std::fs::write(&bad, b"junk").unwrap();

        let embedder = SpectralEmbedder;
        assert!(build_index(
            &[bad],
            &embedder,
            &EmbeddingCache::disabled(),
            &options(),
        )
        .is_err());
    }

    #[test]
    fn test_build_populates_cache() {
        let tmp = TempDir::new().unwrap();
        let wav = tmp.path().join("clicks.wav");
        write_click_wav(&wav, 24000, 2.0, 2);
        let cache_dir = tmp.path().join("cache");

        let embedder = SpectralEmbedder;
        let cache = EmbeddingCache::new(&cache_dir);
        let outcome = build_index(&[wav], &embedder, &cache, &options()).unwrap();

        let stats = cache.stats();
        assert!(stats.entries >= 1);
        assert!(stats.entries <= outcome.segments() as u64);
        assert!(stats.total_bytes > 0);
    }
}
