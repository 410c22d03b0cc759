//! Chroma vector extraction
//!
//! Folds a constant-Q magnitude spectrogram into 12 pitch classes per frame.
//!
//! # Algorithm
//!
//! 1. Constant-Q magnitudes (`bins_per_octave` bins per octave from `chroma_fmin`)
//! 2. Each bin is assigned to the pitch class nearest its center frequency; bins
//!    between semitones are split evenly around the semitone center
//! 3. Magnitudes are summed per pitch class
//! 4. Each frame is scaled to a peak of 1.0 (silent frames stay zero)
//!
//! # Example
//!
//! ```no_run
//! use motif_dsp::features::chroma::extractor::extract_chroma_cqt;
//! use motif_dsp::AnalysisConfig;
//!
//! let samples = vec![0.0f32; 22050 * 5];
//! let chroma = extract_chroma_cqt(&samples, 22050, &AnalysisConfig::default())?;
//! println!("{} chroma frames", chroma.n_frames());
//! # Ok::<(), motif_dsp::AnalysisError>(())
//! ```

use super::cqt::ConstantQTransform;
use super::normalization::normalize_max;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;

/// Per-frame pitch-class energies (index 0 = C)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chromagram {
    frames: Vec<[f32; 12]>,
}

impl Chromagram {
    /// Wrap precomputed frames
    pub fn from_frames(frames: Vec<[f32; 12]>) -> Self {
        Self { frames }
    }

    /// Number of time frames
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    /// Frames in time order
    pub fn frames(&self) -> &[[f32; 12]] {
        &self.frames
    }

    /// Mean energy of each pitch class across all frames
    ///
    /// # Errors
    ///
    /// `InvalidInput` when there are no frames, `ComputationFailure` if the mean is not
    /// finite.
    pub fn mean_energy(&self) -> Result<[f32; 12], AnalysisError> {
        if self.frames.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "Chromagram has no frames".to_string(),
            ));
        }

        let mut sums = [0.0f64; 12];
        for frame in &self.frames {
            for (sum, &v) in sums.iter_mut().zip(frame.iter()) {
                *sum += v as f64;
            }
        }

        let n = self.frames.len() as f64;
        let mut mean = [0.0f32; 12];
        for (m, &sum) in mean.iter_mut().zip(sums.iter()) {
            *m = (sum / n) as f32;
        }

        if mean.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::ComputationFailure(
                "Non-finite mean chroma energy".to_string(),
            ));
        }
        Ok(mean)
    }
}

/// Pitch class of constant-Q `bin`
///
/// `roll` is the pitch class of bin 0 (0 when the transform starts on a C).
pub fn chroma_bin(bin: usize, bins_per_octave: usize, roll: usize) -> usize {
    let per_semitone = (bins_per_octave / 12).max(1);
    ((bin + per_semitone / 2) / per_semitone + roll) % 12
}

/// Pitch class of the frequency `freq` rounded to the nearest semitone
pub(crate) fn pitch_class_of(freq: f64) -> usize {
    let midi = 12.0 * (freq / 440.0).log2() + 69.0;
    (midi.round() as i64).rem_euclid(12) as usize
}

/// Sum one constant-Q frame into 12 pitch classes
pub fn fold_to_chroma(cqt_frame: &[f32], bins_per_octave: usize, roll: usize) -> [f32; 12] {
    let mut chroma = [0.0f32; 12];
    for (bin, &mag) in cqt_frame.iter().enumerate() {
        chroma[chroma_bin(bin, bins_per_octave, roll)] += mag;
    }
    chroma
}

/// Extract a constant-Q chromagram
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Constant-Q settings (`chroma_*`, `cqt_*`, `tuning`, `hop_size`)
///
/// # Returns
///
/// One max-normalized chroma vector per hop (`1 + len / hop_size` frames)
pub fn extract_chroma_cqt(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<Chromagram, AnalysisError> {
    log::debug!(
        "Extracting CQT chroma: {} samples at {} Hz",
        samples.len(),
        sample_rate
    );

    let cqt = ConstantQTransform::new(sample_rate, config)?;
    let roll = pitch_class_of(cqt.fmin());
    let bins_per_octave = config.chroma_bins_per_octave;

    let frames = cqt
        .magnitude(samples)?
        .iter()
        .map(|frame| {
            let mut chroma = fold_to_chroma(frame, bins_per_octave, roll);
            normalize_max(&mut chroma);
            chroma
        })
        .collect();

    Ok(Chromagram::from_frames(frames))
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
    fn test_chroma_bin_folding() {
        // 3 bins per semitone: bins 0 and 1 are C, bin 2 is the lower edge of C#
        assert_eq!(chroma_bin(0, 36, 0), 0);
        assert_eq!(chroma_bin(1, 36, 0), 0);
        assert_eq!(chroma_bin(2, 36, 0), 1);
        assert_eq!(chroma_bin(135, 36, 0), 9);
        assert_eq!(chroma_bin(35, 36, 0), 0);
        assert_eq!(chroma_bin(0, 12, 9), 9);
    }

    #[test]
    fn test_pitch_class_of() {
        assert_eq!(pitch_class_of(440.0), 9);
        assert_eq!(pitch_class_of(32.703), 0);
        assert_eq!(pitch_class_of(261.63), 0);
        assert_eq!(pitch_class_of(277.18), 1);
    }

    #[test]
    fn test_mean_energy() {
        let mut a = [0.0f32; 12];
        a[0] = 1.0;
        let mut b = [0.0f32; 12];
        b[0] = 0.5;
        b[3] = 1.0;
        let mean = Chromagram::from_frames(vec![a, b]).mean_energy().unwrap();
        assert_eq!(mean[0], 0.75);
        assert_eq!(mean[3], 0.5);
        assert_eq!(mean[5], 0.0);
    }

    #[test]
    fn test_mean_energy_of_empty_chromagram() {
        let result = Chromagram::default().mean_energy();
        assert!(matches!(result, Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn test_a440_dominates_chroma() {
        let sr = 22050;
        let chroma = extract_chroma_cqt(&sine(440.0, sr, 2.0), sr, &AnalysisConfig::default()).unwrap();
        assert_eq!(chroma.n_frames(), 1 + 44100 / 512);

        let mid = chroma.frames()[chroma.n_frames() / 2];
        assert_eq!(mid[9], 1.0);
        for (pc, &v) in mid.iter().enumerate() {
            if pc != 9 {
                assert!(v < 0.5, "pitch class {} = {}", pc, v);
            }
        }
    }

    #[test]
    fn test_silence_gives_zero_frames() {
        let chroma = extract_chroma_cqt(&vec![0.0f32; 8192], 22050, &AnalysisConfig::default()).unwrap();
        assert_eq!(chroma.n_frames(), 1 + 8192 / 512);
        assert!(chroma.frames().iter().flatten().all(|&v| v == 0.0));
    }
}
