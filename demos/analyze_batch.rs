//! Example: Analyze multiple audio files in parallel
//!
//! Usage:
//!   cargo run --release --example analyze_batch -- [--jobs N] [--json] <file1> <file2> ...
//!
//! Notes:
//! - Parallelism is across files (batch-level). Each file analysis is still single-threaded.
//! - Default workers: (available CPU threads - 1), keeping one core free for the system.

use std::env;
use std::time::Instant;

use rayon::prelude::*;
use serde_json::json;

use motif_dsp::{decode_audio, AnalysisError, AudioFeatureExtractor, AudioFeatures};

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1).max(1))
        .unwrap_or(1)
}

fn analyse_path(extractor: &AudioFeatureExtractor, path: &str) -> Result<AudioFeatures, AnalysisError> {
    let audio = decode_audio(path)?;
    extractor.analyse(&audio.samples, audio.sample_rate)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut json = false;
    let mut jobs: Option<usize> = None;
    let mut paths: Vec<String> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--jobs" => {
                let v = args
                    .first()
                    .ok_or("--jobs requires a value")?
                    .parse::<usize>()?;
                args.remove(0);
                jobs = Some(std::cmp::max(1, v));
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: analyze_batch [--jobs N] [--json] <file1> <file2> ...\n\
                     \n\
                     --jobs N   Parallel workers (default: CPU-1)\n\
                     --json     Emit one JSON object per line (JSONL)\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one audio file path. Use --help for usage.");
        std::process::exit(2);
    }

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!("Batch: {} files, jobs={}", paths.len(), jobs);

    let extractor = AudioFeatureExtractor::default();

    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    let outs: Vec<(String, Result<AudioFeatures, AnalysisError>)> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| (path.clone(), analyse_path(&extractor, path)))
            .collect()
    });

    let mut failures = 0usize;
    for (path, out) in &outs {
        match out {
            Ok(features) if json => {
                println!("{}", json!({ "file": path, "features": features }));
            }
            Ok(features) => println!("{}: {}", path, features.summary()),
            Err(e) => {
                failures += 1;
                if json {
                    println!("{}", json!({ "file": path, "error": e.to_string() }));
                } else {
                    println!("{}: ERROR {}", path, e);
                }
            }
        }
    }

    eprintln!(
        "Done: {} ok, {} failed in {:.1} s",
        outs.len() - failures,
        failures,
        t0.elapsed().as_secs_f32()
    );
    Ok(())
}
