//! # Motif DSP
//!
//! Coarse acoustic descriptors for music files: duration, global tempo, and the
//! dominant pitch class, plus a renderer that turns them into a composition prompt for
//! a generative text model.
//!
//! ## Features
//!
//! - **Tempo**: log-mel onset strength, autocorrelation tempogram with a log-normal
//!   prior, and dynamic-programming beat tracking
//! - **Key**: constant-Q chromagram averaged over time, strongest pitch class wins
//! - **Decoding**: any format Symphonia supports, averaged to mono
//! - **Prompting**: environment-driven model settings and a pluggable text generator
//!
//! ## Quick Start
//!
//! ```no_run
//! use motif_dsp::analyse_file;
//!
//! let features = analyse_file("song.mp3")?;
//! println!("{}", features.summary());
//! # Ok::<(), motif_dsp::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! File → Decoder → Mono samples → Feature Extractor → AudioFeatures → Prompt
//!                                   ├─ BeatTracker (tempo)
//!                                   └─ KeyEstimator (pitch class)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod preprocessing;
pub mod prompt;

use std::path::Path;

// Re-export main types
pub use analysis::extractor::AudioFeatureExtractor;
pub use analysis::result::{AudioFeatures, PitchClass, NOTE_NAMES};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use features::beat_tracking::{BeatTrack, BeatTracker, DynamicBeatTracker};
pub use features::chroma::Chromagram;
pub use features::key::{DominantPitchClassEstimator, KeyEstimator, ProfileCorrelationEstimator};
pub use io::decoder::{decode_audio, DecodedAudio};
pub use prompt::{generate_prompt, render_prompt, PromptSettings, TextGenerator};

/// Analyse mono samples with the default configuration
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz
///
/// # Errors
///
/// `InvalidInput` for an empty buffer, a zero sample rate, or non-finite samples.
///
/// # Example
///
/// ```no_run
/// use motif_dsp::analyse_audio;
///
/// let samples = vec![0.0f32; 22050 * 30]; // 30 seconds of silence
/// let features = analyse_audio(&samples, 22050)?;
/// assert_eq!(features.duration, 30.0);
/// # Ok::<(), motif_dsp::AnalysisError>(())
/// ```
pub fn analyse_audio(samples: &[f32], sample_rate: u32) -> Result<AudioFeatures, AnalysisError> {
    AudioFeatureExtractor::default().analyse(samples, sample_rate)
}

/// Decode a file and analyse it with the default configuration
///
/// # Errors
///
/// `DecodingError` if the file cannot be decoded, otherwise as [`analyse_audio`].
pub fn analyse_file(path: impl AsRef<Path>) -> Result<AudioFeatures, AnalysisError> {
    let audio = decode_audio(path)?;
    analyse_audio(&audio.samples, audio.sample_rate)
}
