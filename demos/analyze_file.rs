//! Example: Analyze a single audio file
//!
//! Usage:
//!   cargo run --release --example analyze_file -- <file> [--prompt]
//!
//! Prints the feature summary. With `--prompt`, also prints the composition prompt that
//! would be sent to the text model (no request is made).

use std::env;
use std::time::Instant;

use motif_dsp::{decode_audio, render_prompt, AudioFeatureExtractor};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut show_prompt = false;
    let mut path: Option<String> = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--prompt" => show_prompt = true,
            "--help" | "-h" => {
                eprintln!("Usage: analyze_file <file> [--prompt]");
                return Ok(());
            }
            _ => path = Some(arg),
        }
    }

    let Some(path) = path else {
        eprintln!("ERROR: Provide an audio file path. Use --help for usage.");
        std::process::exit(2);
    };

    let t0 = Instant::now();
    let audio = decode_audio(&path)?;
    let decode_ms = t0.elapsed().as_secs_f32() * 1000.0;

    let t1 = Instant::now();
    let features = AudioFeatureExtractor::default().analyse(&audio.samples, audio.sample_rate)?;
    let analyse_ms = t1.elapsed().as_secs_f32() * 1000.0;

    println!("File: {}", path);
    println!(
        "  Source: {} Hz, {} channel(s)",
        audio.sample_rate, audio.channels
    );
    println!("  {}", features.summary());
    println!("  Decode: {:.1} ms, analysis: {:.1} ms", decode_ms, analyse_ms);

    if show_prompt {
        println!();
        println!("{}", render_prompt(&features));
    }

    Ok(())
}
