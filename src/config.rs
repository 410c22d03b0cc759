//! Configuration parameters for audio analysis

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Frequency of C1 in Hz (MIDI note 24 with A4 = 440 Hz)
pub const C1_HZ: f32 = 32.703_197;

/// Analysis configuration parameters
///
/// Defaults reproduce the usual chroma-CQT / beat-tracking settings: hop 512,
/// 2048-point STFT with 128 mel bands for onset strength, a 120 BPM tempo prior and a
/// seven-octave, 36-bins-per-octave constant-Q transform starting at C1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // Framing
    /// Hop size in samples shared by the onset envelope and the chromagram (default: 512)
    pub hop_size: usize,

    /// STFT frame size used for onset strength (default: 2048)
    pub frame_size: usize,

    /// Number of mel bands for onset strength (default: 128)
    pub n_mels: usize,

    // Tempo
    /// Center of the log-normal tempo prior in BPM (default: 120.0)
    pub start_bpm: f32,

    /// Width of the tempo prior in octaves (default: 1.0)
    pub std_bpm: f32,

    /// Tempi at or above this are never selected (default: 320.0)
    pub max_bpm: f32,

    /// Autocorrelation window for the tempogram in seconds (default: 8.0)
    pub tempo_window_seconds: f32,

    /// How strictly beats follow the estimated period (default: 100.0)
    pub beat_tightness: f32,

    /// Drop weak beats at the start and end of the track (default: true)
    pub trim_beats: bool,

    // Chroma
    /// Lowest constant-Q frequency in Hz (default: C1)
    pub chroma_fmin: f32,

    /// Number of octaves covered by the constant-Q transform (default: 7)
    pub chroma_octaves: usize,

    /// Constant-Q bins per octave, must be a multiple of 12 (default: 36)
    pub chroma_bins_per_octave: usize,

    /// Tuning deviation from A440 in fractions of a constant-Q bin (default: 0.0)
    ///
    /// Tuning is never estimated from the audio; this value is used as given. With three
    /// bins per semitone, folding still assigns tones up to about a third of a semitone
    /// off A440 to the right pitch class.
    pub tuning: f32,

    /// Filter length scale; larger values give sharper bins (default: 1.0)
    pub cqt_filter_scale: f32,

    /// Fraction of each kernel's spectral mass that may be discarded (default: 0.01)
    pub cqt_sparsity: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            hop_size: 512,
            frame_size: 2048,
            n_mels: 128,
            start_bpm: 120.0,
            std_bpm: 1.0,
            max_bpm: 320.0,
            tempo_window_seconds: 8.0,
            beat_tightness: 100.0,
            trim_beats: true,
            chroma_fmin: C1_HZ,
            chroma_octaves: 7,
            chroma_bins_per_octave: 36,
            tuning: 0.0,
            cqt_filter_scale: 1.0,
            cqt_sparsity: 0.01,
        }
    }
}

impl AnalysisConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, AnalysisError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AnalysisError::InvalidInput(format!("Malformed analysis config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let invalid = |msg: String| Err(AnalysisError::InvalidInput(msg));

        if self.hop_size == 0 {
            return invalid("Hop size must be > 0".to_string());
        }
        if self.frame_size < 2 {
            return invalid(format!("Frame size must be >= 2, got {}", self.frame_size));
        }
        if self.n_mels == 0 {
            return invalid("Number of mel bands must be > 0".to_string());
        }
        if !(self.start_bpm > 0.0) || !(self.std_bpm > 0.0) || !(self.max_bpm > 0.0) {
            return invalid(format!(
                "Tempo prior must be positive: start={}, std={}, max={}",
                self.start_bpm, self.std_bpm, self.max_bpm
            ));
        }
        if !(self.tempo_window_seconds > 0.0) {
            return invalid("Tempo window must be > 0 seconds".to_string());
        }
        if !(self.beat_tightness > 0.0) {
            return invalid("Beat tightness must be > 0".to_string());
        }
        if !(self.chroma_fmin > 0.0) {
            return invalid(format!("Chroma fmin must be > 0, got {}", self.chroma_fmin));
        }
        if self.chroma_octaves == 0 {
            return invalid("Constant-Q transform needs at least one octave".to_string());
        }
        if self.chroma_bins_per_octave == 0 || self.chroma_bins_per_octave % 12 != 0 {
            return invalid(format!(
                "Bins per octave must be a positive multiple of 12, got {}",
                self.chroma_bins_per_octave
            ));
        }
        if !self.tuning.is_finite() || self.tuning.abs() > 0.5 {
            return invalid(format!("Tuning must be within [-0.5, 0.5) bins, got {}", self.tuning));
        }
        if !(self.cqt_filter_scale > 0.0) {
            return invalid("Filter scale must be > 0".to_string());
        }
        if !(0.0..1.0).contains(&self.cqt_sparsity) {
            return invalid(format!("Sparsity must be in [0, 1), got {}", self.cqt_sparsity));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bins_per_octave_must_fold_into_semitones() {
        let config = AnalysisConfig {
            chroma_bins_per_octave: 30,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = AnalysisConfig::from_json_str(r#"{ "hop_size": 256, "start_bpm": 100.0 }"#)
            .unwrap();
        assert_eq!(config.hop_size, 256);
        assert_eq!(config.start_bpm, 100.0);
        assert_eq!(config.chroma_bins_per_octave, 36);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(AnalysisConfig::from_json_str("{ hop_size: ").is_err());
        assert!(AnalysisConfig::from_json_str(r#"{ "hop_size": 0 }"#).is_err());
    }
}
