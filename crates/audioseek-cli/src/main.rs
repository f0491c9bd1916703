//! audioseek CLI - similarity retrieval over embedded audio segments
//!
//! This binary provides commands for building a segment embedding index
//! from a corpus of audio files and querying it by text or audio clip.

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use audioseek_cli::commands;

/// audioseek - Audio Segment Similarity Retrieval
#[derive(Parser)]
#[command(name = "audioseek")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a corpus of audio files as embedded segments
    Build {
        /// Glob pattern selecting input audio files (e.g. "loops/*.wav")
        #[arg(long)]
        in_glob: String,

        /// Segmentation strategy
        #[arg(long, default_value = "beats", value_parser = ["onsets", "beats"])]
        seg: String,

        /// Output path for the binary vector file
        #[arg(long)]
        out_idx: String,

        /// Output path for the JSON metadata file
        #[arg(long)]
        out_meta: String,

        /// Embedding cache directory (omit to disable caching)
        #[arg(long)]
        cache: Option<String>,

        /// Abort on the first per-file failure instead of skipping
        #[arg(long)]
        strict: bool,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Query an index for the top-k most similar segments
    Query {
        /// Path to the binary vector file
        #[arg(long)]
        idx: String,

        /// Path to the JSON metadata file
        #[arg(long)]
        meta: String,

        /// Free-text query (exactly one of --text / --wav)
        #[arg(long)]
        text: Option<String>,

        /// Audio-clip query as a WAV path (exactly one of --text / --wav)
        #[arg(long)]
        wav: Option<String>,

        /// Number of results to return
        #[arg(long, default_value_t = audioseek_cli::query::DEFAULT_TOP_K)]
        topk: usize,

        /// Suppress human-readable status output on stderr
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build {
            in_glob,
            seg,
            out_idx,
            out_meta,
            cache,
            strict,
            json,
        } => commands::build::run(
            &in_glob,
            &seg,
            &out_idx,
            &out_meta,
            cache.as_deref(),
            strict,
            json,
        ),
        Commands::Query {
            idx,
            meta,
            text,
            wav,
            topk,
            json,
        } => commands::query::run(&idx, &meta, text, wav, topk, json),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            use colored::Colorize;
            eprintln!("{} {:#}", "ERROR".red().bold(), err);
            ExitCode::from(1)
        }
    }
}
