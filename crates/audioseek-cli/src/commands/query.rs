//! Query command implementation
//!
//! Loads the persisted index, embeds a text or audio query, and prints the
//! ranked results as a JSON array on stdout. Human-readable status goes to
//! stderr so stdout stays parseable.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;

use audioseek_audio::{load_wav, SpectralEmbedder};
use audioseek_index::load_index;

use crate::query::{query, QueryError, QueryRequest};

/// Runs the query command.
///
/// # Arguments
/// * `idx` - path to the binary vector file
/// * `meta` - path to the JSON metadata file
/// * `text` - optional free-text query
/// * `wav` - optional audio-clip query (WAV path)
/// * `topk` - requested result count
/// * `json` - suppress human-readable status on stderr
///
/// # Returns
/// Exit code: 0 on success, 1 on an ambiguous query.
pub fn run(
    idx: &str,
    meta: &str,
    text: Option<String>,
    wav: Option<String>,
    topk: usize,
    json: bool,
) -> Result<ExitCode> {
    let audio = match &wav {
        Some(path) => Some(
            load_wav(Path::new(path))
                .with_context(|| format!("failed to load query audio '{path}'"))?,
        ),
        None => None,
    };

    let request = match QueryRequest::from_options(text, audio) {
        Ok(request) => request,
        Err(err @ QueryError::AmbiguousQuery) => {
            eprintln!("{} {}", "ERROR".red().bold(), err);
            return Ok(ExitCode::from(1));
        }
        Err(err) => return Err(err.into()),
    };

    let index = load_index(Path::new(idx), Path::new(meta))
        .with_context(|| format!("failed to load index from '{idx}' / '{meta}'"))?;

    if !json {
        match &request {
            QueryRequest::Text(t) => eprintln!("{} \"{}\"", "Query:".cyan().bold(), t),
            QueryRequest::Audio(_) => eprintln!("{} audio clip", "Query:".cyan().bold()),
        }
        eprintln!(
            "{} {} segments, dim {}",
            "Index:".dimmed(),
            index.count(),
            index.dim()
        );
    }

    let embedder = SpectralEmbedder;
    let hits = query(&index, &embedder, &request, topk)?;

    if !json {
        eprintln!("{} {} results", "Found:".dimmed(), hits.len());
    }
    println!("{}", serde_json::to_string_pretty(&hits)?);

    Ok(ExitCode::SUCCESS)
}
