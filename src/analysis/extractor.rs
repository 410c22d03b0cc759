//! Feature extraction pipeline
//!
//! Runs the beat tracker and key estimator over one mono buffer and bundles the results
//! with the duration.
//!
//! # Example
//!
//! ```no_run
//! use motif_dsp::{AnalysisConfig, AudioFeatureExtractor};
//! use motif_dsp::features::key::ProfileCorrelationEstimator;
//!
//! let config = AnalysisConfig::default();
//! let extractor = AudioFeatureExtractor::new(config.clone())?
//!     .with_key_estimator(Box::new(ProfileCorrelationEstimator::new(config)));
//!
//! let samples = vec![0.0f32; 22050 * 10];
//! let features = extractor.analyse(&samples, 22050)?;
//! println!("{}", features.summary());
//! # Ok::<(), motif_dsp::AnalysisError>(())
//! ```

use std::time::Instant;

use super::result::AudioFeatures;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::beat_tracking::{BeatTracker, DynamicBeatTracker};
use crate::features::key::{DominantPitchClassEstimator, KeyEstimator};

/// Extracts duration, tempo, and key from mono audio
///
/// The extractor holds no per-call state; one instance can be shared across threads.
pub struct AudioFeatureExtractor {
    config: AnalysisConfig,
    beat_tracker: Box<dyn BeatTracker>,
    key_estimator: Box<dyn KeyEstimator>,
}

impl std::fmt::Debug for AudioFeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFeatureExtractor")
            .field("config", &self.config)
            .field("key_estimator", &self.key_estimator.name())
            .finish()
    }
}

impl Default for AudioFeatureExtractor {
    fn default() -> Self {
        Self::with_config(AnalysisConfig::default())
    }
}

impl AudioFeatureExtractor {
    /// Extractor with the default strategies built from `config`
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `config` fails validation.
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: AnalysisConfig) -> Self {
        Self {
            beat_tracker: Box::new(DynamicBeatTracker::new(config.clone())),
            key_estimator: Box::new(DominantPitchClassEstimator::new(config.clone())),
            config,
        }
    }

    /// Replace the key estimator
    pub fn with_key_estimator(mut self, estimator: Box<dyn KeyEstimator>) -> Self {
        self.key_estimator = estimator;
        self
    }

    /// Replace the beat tracker
    pub fn with_beat_tracker(mut self, tracker: Box<dyn BeatTracker>) -> Self {
        self.beat_tracker = tracker;
        self
    }

    /// Configuration the default strategies were built from
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyse mono samples
    ///
    /// # Arguments
    ///
    /// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    ///
    /// `AudioFeatures` with `duration = samples.len() / sample_rate`, the global tempo,
    /// the dominant pitch class, and no instruments
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty buffer, a zero sample rate, or non-finite samples;
    /// otherwise whatever the strategies report.
    pub fn analyse(&self, samples: &[f32], sample_rate: u32) -> Result<AudioFeatures, AnalysisError> {
        let start_time = Instant::now();
        log::debug!(
            "Starting feature extraction: {} samples at {} Hz",
            samples.len(),
            sample_rate
        );

        if samples.is_empty() {
            return Err(AnalysisError::InvalidInput("Empty audio samples".to_string()));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput("Invalid sample rate: 0".to_string()));
        }
        if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
            return Err(AnalysisError::InvalidInput(format!(
                "Non-finite sample at index {}",
                pos
            )));
        }

        let duration = samples.len() as f64 / sample_rate as f64;

        let beats = self.beat_tracker.track(samples, sample_rate)?;
        log::debug!("Tempo {:.1} BPM with {} beats", beats.bpm, beats.beat_times.len());

        let key = self.key_estimator.estimate_key(samples, sample_rate)?;
        log::debug!("Key {} ({})", key, self.key_estimator.name());

        log::debug!(
            "Feature extraction finished in {:.1} ms",
            start_time.elapsed().as_secs_f32() * 1000.0
        );
        Ok(AudioFeatures::new(duration, beats.bpm, key))
    }
}
