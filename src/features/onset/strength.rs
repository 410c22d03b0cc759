//! Onset strength envelope
//!
//! Spectral flux on a log-power mel spectrogram:
//!
//! 1. Centered STFT power spectrogram (Hann window)
//! 2. Project onto a Slaney mel filterbank
//! 3. Convert to dB (`amin = 1e-10`, clipped to 80 dB below the global peak)
//! 4. First-order difference along time, half-wave rectified, averaged over bands
//! 5. Shift by `1 + frame_size / (2 * hop_size)` frames so values line up with frame
//!    centers, and trim to the spectrogram length
//!
//! # Reference
//!
//! Böck, S., & Widmer, G. (2013). Maximum Filter Vibrato Suppression for Onset Detection.
//! *Proceedings of the 16th International Conference on Digital Audio Effects (DAFx)*.

use super::mel::MelFilterbank;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::spectrogram::power_spectrogram;

const AMIN: f32 = 1e-10;
const TOP_DB: f32 = 80.0;

/// Compute the onset strength envelope
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Uses `frame_size`, `hop_size` and `n_mels`
///
/// # Returns
///
/// One non-negative value per STFT frame (`1 + len / hop_size` values). All zeros for
/// silent or constant input.
pub fn onset_strength(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<Vec<f32>, AnalysisError> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput("Invalid sample rate: 0".to_string()));
    }

    let power = power_spectrogram(samples, config.frame_size, config.hop_size)?;
    let n_frames = power.len();
    let filterbank = MelFilterbank::new(sample_rate, config.frame_size, config.n_mels);

    let mut mel_db: Vec<Vec<f32>> = power
        .iter()
        .map(|frame| {
            filterbank
                .apply(frame)
                .into_iter()
                .map(|p| 10.0 * p.max(AMIN).log10())
                .collect()
        })
        .collect();

    let peak_db = mel_db
        .iter()
        .flat_map(|frame| frame.iter().copied())
        .fold(f32::NEG_INFINITY, f32::max);
    let floor_db = peak_db - TOP_DB;
    for value in mel_db.iter_mut().flat_map(|frame| frame.iter_mut()) {
        *value = value.max(floor_db);
    }

    let n_mels = filterbank.n_mels().max(1) as f32;
    let flux = mel_db.windows(2).map(|pair| {
        pair[1]
            .iter()
            .zip(pair[0].iter())
            .map(|(&curr, &prev)| (curr - prev).max(0.0))
            .sum::<f32>()
            / n_mels
    });

    let lag_pad = 1 + config.frame_size / (2 * config.hop_size);
    let envelope: Vec<f32> = std::iter::repeat(0.0)
        .take(lag_pad)
        .chain(flux)
        .take(n_frames)
        .collect();

    if envelope.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::ComputationFailure(
            "Non-finite value in onset strength envelope".to_string(),
        ));
    }

    log::debug!(
        "Onset strength: {} frames, peak mel level {:.1} dB",
        envelope.len(),
        peak_db
    );

    Ok(envelope)
}
