//! Build command implementation
//!
//! Expands the input glob, builds the segment index, and writes the two
//! aligned artifacts (binary vector file + JSON metadata file).

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use audioseek_audio::{EmbeddingCache, SegmentationStrategy, SpectralEmbedder};
use audioseek_index::save_index;

use crate::pipeline::{build_index, BuildOptions};

/// Machine-readable build report for `--json` mode.
#[derive(Serialize)]
struct BuildReport {
    created_at: String,
    files_indexed: usize,
    files_skipped: usize,
    segments: usize,
    dim: usize,
    duration_ms: u64,
    vector_path: String,
    metadata_path: String,
    warnings: Vec<String>,
}

/// Runs the build command.
///
/// # Arguments
/// * `in_glob` - glob pattern selecting input audio files
/// * `seg` - segmentation strategy name (`onsets` or `beats`)
/// * `out_idx` - output path for the binary vector file
/// * `out_meta` - output path for the JSON metadata file
/// * `cache_dir` - optional embedding cache directory; absent = disabled
/// * `strict` - abort on the first per-file failure
/// * `json` - machine-readable JSON output (no colored output)
///
/// # Returns
/// Exit code: 0 on success, 1 when nothing could be indexed.
pub fn run(
    in_glob: &str,
    seg: &str,
    out_idx: &str,
    out_meta: &str,
    cache_dir: Option<&str>,
    strict: bool,
    json: bool,
) -> Result<ExitCode> {
    let start = Instant::now();

    let files = expand_glob(in_glob)?;
    if files.is_empty() {
        if json {
            println!(
                "{}",
                serde_json::json!({ "error": format!("no files match '{in_glob}'") })
            );
        } else {
            eprintln!("{} no files match '{}'", "ERROR".red().bold(), in_glob);
        }
        return Ok(ExitCode::from(1));
    }

    let strategy = parse_strategy(seg);
    let cache = match cache_dir {
        Some(dir) => EmbeddingCache::new(dir),
        None => EmbeddingCache::disabled(),
    };
    let embedder = SpectralEmbedder;

    if !json {
        println!("{} {} ({} files)", "Indexing:".cyan().bold(), in_glob, files.len());
        println!("{} {}", "Strategy:".dimmed(), seg);
    }

    let outcome = build_index(&files, &embedder, &cache, &BuildOptions { strategy, strict })?;

    if !json {
        for warning in &outcome.warnings {
            println!("  {} {}", "!".yellow(), warning);
        }
    }

    let vector_path = Path::new(out_idx);
    let metadata_path = Path::new(out_meta);
    save_index(&outcome.index, vector_path, metadata_path)
        .with_context(|| format!("failed to write index to '{out_idx}' / '{out_meta}'"))?;

    let duration_ms = start.elapsed().as_millis() as u64;

    if json {
        let report = BuildReport {
            created_at: chrono::Utc::now().to_rfc3339(),
            files_indexed: outcome.files_indexed,
            files_skipped: outcome.files_skipped,
            segments: outcome.segments(),
            dim: outcome.index.dim(),
            duration_ms,
            vector_path: out_idx.to_string(),
            metadata_path: out_meta.to_string(),
            warnings: outcome.warnings.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "\n{} {} segments from {} files ({}ms)",
            "SUCCESS".green().bold(),
            outcome.segments(),
            outcome.files_indexed,
            duration_ms
        );
        if outcome.files_skipped > 0 {
            println!(
                "{} {} files skipped",
                "Warning:".yellow().bold(),
                outcome.files_skipped
            );
        }
        if cache.is_enabled() {
            let stats = cache.stats();
            println!(
                "{} {} entries, {} bytes",
                "Cache:".dimmed(),
                stats.entries,
                stats.total_bytes
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Expands a glob pattern into a sorted file list.
fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).with_context(|| format!("invalid glob pattern '{pattern}'"))?;
    let mut files: Vec<PathBuf> = paths.filter_map(|entry| entry.ok()).collect();
    files.sort();
    Ok(files)
}

fn parse_strategy(name: &str) -> SegmentationStrategy {
    // clap's value_parser restricts the input to these two names.
    if name == "onsets" {
        SegmentationStrategy::Onsets
    } else {
        SegmentationStrategy::Beats
    }
}
