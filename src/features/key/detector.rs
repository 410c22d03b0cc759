//! Dominant pitch-class detection
//!
//! Averages a constant-Q chromagram over time and picks the strongest pitch class.
//! This reports a tonal center, not a major/minor key: modes are out of scope.
//!
//! # Example
//!
//! ```no_run
//! use motif_dsp::features::key::{DominantPitchClassEstimator, KeyEstimator};
//!
//! let samples: Vec<f32> = (0..22050 * 2)
//!     .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 22050.0).sin())
//!     .collect();
//! let key = DominantPitchClassEstimator::default().estimate_key(&samples, 22050)?;
//! assert_eq!(key.label(), "A");
//! # Ok::<(), motif_dsp::AnalysisError>(())
//! ```

use super::KeyEstimator;
use crate::analysis::result::PitchClass;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::chroma::{extract_chroma_cqt, Chromagram};

/// Default key estimator: argmax of the mean chroma energy
#[derive(Debug, Clone, Default)]
pub struct DominantPitchClassEstimator {
    config: AnalysisConfig,
}

impl DominantPitchClassEstimator {
    /// Estimator using the constant-Q settings from `config`
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }
}

impl KeyEstimator for DominantPitchClassEstimator {
    fn estimate_key(&self, samples: &[f32], sample_rate: u32) -> Result<PitchClass, AnalysisError> {
        let chroma = extract_chroma_cqt(samples, sample_rate, &self.config)?;
        dominant_pitch_class(&chroma)
    }

    fn name(&self) -> &'static str {
        "dominant-pitch-class"
    }
}

/// Index of the largest value; the lowest index wins ties
///
/// NaN entries never win.
pub fn stable_argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] || (values[best].is_nan() && !v.is_nan()) {
            best = i;
        }
    }
    best
}

/// Pitch class with the highest mean energy
///
/// # Errors
///
/// `InvalidInput` for a chromagram without frames, `ComputationFailure` if the mean
/// energy is not finite.
pub fn dominant_pitch_class(chroma: &Chromagram) -> Result<PitchClass, AnalysisError> {
    let mean = chroma.mean_energy()?;
    let index = stable_argmax(&mean);

    log::debug!(
        "Mean chroma over {} frames: {:?} -> {}",
        chroma.n_frames(),
        mean,
        PitchClass::from_index(index)
    );
    Ok(PitchClass::from_index(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (seconds * sample_rate as f32) as usize;
        (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_stable_argmax_prefers_lowest_index() {
        assert_eq!(stable_argmax(&[0.1, 0.9, 0.3, 0.9]), 1);
        assert_eq!(stable_argmax(&[0.0; 12]), 0);
        assert_eq!(stable_argmax(&[f32::NAN, 0.2, 0.1]), 1);
    }

    #[test]
    fn test_tie_resolves_to_lower_pitch_class() {
        let mut frame = [0.1f32; 12];
        frame[4] = 0.8;
        frame[9] = 0.8;
        let chroma = Chromagram::from_frames(vec![frame, frame]);
        assert_eq!(dominant_pitch_class(&chroma).unwrap(), PitchClass::E);
    }

    #[test]
    fn test_mean_over_frames_decides() {
        let mut loud_once = [0.0f32; 12];
        loud_once[2] = 1.0;
        let mut steady = [0.0f32; 12];
        steady[7] = 0.6;
        let chroma = Chromagram::from_frames(vec![loud_once, steady, steady]);
        // D: 1/3, G: 1.2/3
        assert_eq!(dominant_pitch_class(&chroma).unwrap(), PitchClass::G);
    }

    #[test]
    fn test_zero_frames_is_invalid_input() {
        let result = dominant_pitch_class(&Chromagram::default());
        assert!(matches!(result, Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn test_a440_is_a() {
        let estimator = DominantPitchClassEstimator::default();
        let key = estimator.estimate_key(&sine(440.0, 22050, 2.0), 22050).unwrap();
        assert_eq!(key.label(), "A");
    }

    #[test]
    fn test_detuned_a_is_still_a() {
        // A quarter semitone sharp and flat of A440, tuning left at 0
        let estimator = DominantPitchClassEstimator::default();
        for cents in [25.0f32, -25.0] {
            let freq = 440.0 * 2f32.powf(cents / 1200.0);
            let key = estimator.estimate_key(&sine(freq, 22050, 2.0), 22050).unwrap();
            assert_eq!(key, PitchClass::A, "{} cents", cents);
        }
    }

    #[test]
    fn test_tuning_offset_shifts_folding() {
        // 55 cents sharp of A440 folds into A# at the default tuning; shifting the bins
        // up by half a bin (about 17 cents) pulls it back to A.
        let samples = sine(440.0 * 2f32.powf(55.0 / 1200.0), 22050, 2.0);

        let untuned = DominantPitchClassEstimator::default()
            .estimate_key(&samples, 22050)
            .unwrap();
        assert_eq!(untuned, PitchClass::ASharp);

        let config = AnalysisConfig {
            tuning: 0.5,
            ..Default::default()
        };
        let tuned = DominantPitchClassEstimator::new(config)
            .estimate_key(&samples, 22050)
            .unwrap();
        assert_eq!(tuned, PitchClass::A);
    }

    #[test]
    fn test_middle_c_is_c() {
        let estimator = DominantPitchClassEstimator::default();
        let key = estimator.estimate_key(&sine(261.63, 22050, 2.0), 22050).unwrap();
        assert_eq!(key, PitchClass::C);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let samples: Vec<f32> = sine(329.63, 22050, 1.5)
            .iter()
            .zip(sine(196.0, 22050, 1.5))
            .map(|(a, b)| a + 0.5 * b)
            .collect();
        let estimator = DominantPitchClassEstimator::default();
        let first = estimator.estimate_key(&samples, 22050).unwrap();
        let second = estimator.estimate_key(&samples, 22050).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_silence_falls_to_first_label() {
        let estimator = DominantPitchClassEstimator::default();
        let key = estimator.estimate_key(&vec![0.0f32; 22050], 22050).unwrap();
        assert_eq!(key, PitchClass::C);
    }
}
