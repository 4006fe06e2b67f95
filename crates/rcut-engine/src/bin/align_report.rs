//! QA binary: diff a produced transcript against a reference transcript.
//!
//! Used to regression-test the whole trimming pipeline across parameter
//! changes: render with a candidate config, transcribe the result, then
//! compare against the transcript of a hand-edited reference cut.
//!
//! ```text
//! align_report --reference reference.json --produced produced.json \
//!     --min-similarity 0.9
//! ```
//!
//! Transcript files are JSON arrays of `{"text": ..., "start": ..., "end": ...}`
//! words, as emitted by the transcription adapter. The process exits non-zero
//! when the aggregate similarity falls below `--min-similarity`, so it can
//! gate CI runs.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use rcut_engine::{compare_transcripts, EngineConfig};
use rcut_models::Word;

#[derive(Parser, Debug)]
#[command(name = "align_report", about = "Transcript alignment regression report")]
struct Args {
    /// Reference transcript JSON (word list)
    #[arg(long)]
    reference: PathBuf,

    /// Produced transcript JSON (word list)
    #[arg(long)]
    produced: PathBuf,

    /// Engine preset supplying the alignment parameters
    #[arg(long, default_value = "moderate")]
    preset: String,

    /// Minimum anchor size in words
    #[arg(long)]
    min_block_words: Option<usize>,

    /// Fail (exit non-zero) below this similarity, 0.0-1.0
    #[arg(long, default_value_t = 0.0)]
    min_similarity: f64,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

fn load_words(path: &PathBuf) -> Result<Vec<Word>, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&data).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let Some(mut config) = EngineConfig::preset(&args.preset) else {
        error!(preset = %args.preset, "Unknown preset; expected aggressive, moderate, or conservative");
        return ExitCode::FAILURE;
    };
    if let Some(min_block) = args.min_block_words {
        config.align_min_block_words = min_block;
    }

    let reference = match load_words(&args.reference) {
        Ok(words) => words,
        Err(message) => {
            error!("{}", message);
            return ExitCode::FAILURE;
        }
    };
    let produced = match load_words(&args.produced) {
        Ok(words) => words,
        Err(message) => {
            error!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    let report = compare_transcripts(&reference, &produced, &config);
    info!(
        similarity = format!("{:.1}%", report.similarity_percent()),
        gaps = report.gaps.len(),
        insertions = report.insertions.len(),
        replacements = report.replacements.len(),
        "Alignment complete"
    );

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    match json {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("failed to serialize report: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if report.similarity < args.min_similarity {
        error!(
            similarity = format!("{:.3}", report.similarity),
            floor = format!("{:.3}", args.min_similarity),
            "Similarity below the configured floor"
        );
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
