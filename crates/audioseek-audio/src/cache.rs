//! Content-addressed embedding cache.
//!
//! Entries are keyed by a BLAKE3 hash of the canonicalized (mono,
//! provider-rate) sample buffer, so byte-identical audio shares one entry
//! no matter which file or segment produced it. Values are the raw,
//! pre-normalization embedding vectors.
//!
//! There is no eviction, TTL, or size bound: cache identity is pure content
//! addressing, so recomputing and overwriting an entry is idempotent.
//! Concurrent callers racing on a miss may each compute and write the same
//! bytes; the last writer wins and contents never diverge for one key.
//! Staleness after an embedding-provider change is the caller's problem.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use walkdir::WalkDir;

use crate::error::AudioResult;
use crate::wav::Waveform;

/// File extension for cache entries.
const ENTRY_EXT: &str = "vec";

/// Disk-backed cache mapping canonical waveform content to embedding
/// vectors. With no directory configured the cache is disabled and every
/// call computes directly.
#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    dir: Option<PathBuf>,
}

/// Cache statistics reported after a build.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    /// Number of persisted entries.
    pub entries: u64,
    /// Total entry bytes on disk.
    pub total_bytes: u64,
}

impl EmbeddingCache {
    /// Creates a cache persisting entries under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Creates a disabled cache: no lookup, no persistence.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// True if a storage location is configured.
    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Content hash of a canonicalized waveform, as lowercase hex.
    ///
    /// Canonicalization (resample to the provider rate, down-mix to mono)
    /// must happen before calling, so the same audio content always yields
    /// the same key regardless of its original rate or source file.
    pub fn content_key(canonical: &Waveform) -> String {
        let mut bytes = Vec::with_capacity(canonical.len() * 4);
        for sample in &canonical.samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        blake3::hash(&bytes).to_hex().to_string()
    }

    /// Returns the cached vector for this content, or computes, persists,
    /// and returns it.
    ///
    /// A hit never invokes `compute`. An unreadable or truncated entry is
    /// treated as a miss and overwritten.
    pub fn get_or_compute<F>(&self, canonical: &Waveform, compute: F) -> AudioResult<Vec<f32>>
    where
        F: FnOnce(&Waveform) -> AudioResult<Vec<f32>>,
    {
        let dir = match &self.dir {
            Some(dir) => dir,
            None => return compute(canonical),
        };

        let key = Self::content_key(canonical);
        let path = dir.join(format!("{key}.{ENTRY_EXT}"));
        if let Some(vector) = read_entry(&path) {
            return Ok(vector);
        }

        let vector = compute(canonical)?;
        fs::create_dir_all(dir)?;
        write_entry(&path, &vector)?;
        Ok(vector)
    }

    /// Entry count and total bytes under the cache directory.
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            entries: 0,
            total_bytes: 0,
        };
        let dir = match &self.dir {
            Some(dir) if dir.exists() => dir,
            _ => return stats,
        };
        for entry in WalkDir::new(dir).into_iter().flatten() {
            let is_entry = entry.file_type().is_file()
                && entry.path().extension().and_then(|e| e.to_str()) == Some(ENTRY_EXT);
            if is_entry {
                stats.entries += 1;
                stats.total_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }
        stats
    }
}

/// Reads an entry file. Any failure (missing, truncated, short read) is a
/// cache miss, not an error.
fn read_entry(path: &Path) -> Option<Vec<f32>> {
    let mut reader = BufReader::new(File::open(path).ok()?);
    let len = reader.read_u32::<LittleEndian>().ok()? as usize;
    let mut vector = Vec::with_capacity(len);
    for _ in 0..len {
        vector.push(reader.read_f32::<LittleEndian>().ok()?);
    }
    Some(vector)
}

fn write_entry(path: &Path, vector: &[f32]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_u32::<LittleEndian>(vector.len() as u32)?;
    for &value in vector {
        writer.write_f32::<LittleEndian>(value)?;
    }
    Ok(())
}
