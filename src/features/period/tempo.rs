//! Global tempo estimation from an onset strength envelope
//!
//! # Algorithm
//!
//! 1. Autocorrelation tempogram: slide a Hann-weighted window of
//!    `floor(tempo_window_seconds * sr / hop)` frames over the envelope (hop 1,
//!    linear-ramp padded at both ends), autocorrelate each window and normalize it by
//!    its zero-lag value
//! 2. Average the tempogram over time
//! 3. Score each lag with `ln(1 + 1e6 * tg) + prior`, where the prior is log-normal in
//!    BPM around `start_bpm` with a width of `std_bpm` octaves
//! 4. Lags whose tempo is at or above `max_bpm` are excluded; the best lag gives the BPM
//!
//! # Reference
//!
//! Grosche, P., Müller, M., & Kurth, F. (2010). Cyclic Tempogram: A Mid-level Tempo
//! Representation for Music Signals. *ICASSP*.

use super::autocorrelation::Autocorrelator;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::spectrogram::hann_window;

/// Tempo for each autocorrelation lag (lag 0 maps to infinity)
pub fn lag_to_bpm(lag: usize, sample_rate: u32, hop_size: usize) -> f32 {
    if lag == 0 {
        return f32::INFINITY;
    }
    60.0 * sample_rate as f32 / (hop_size as f32 * lag as f32)
}

/// Pad with a linear ramp from 0 up to the edge value on each side
fn linear_ramp_pad(signal: &[f32], pad: usize) -> Vec<f32> {
    let mut padded = Vec::with_capacity(signal.len() + 2 * pad);
    let (first, last) = match (signal.first(), signal.last()) {
        (Some(&f), Some(&l)) => (f, l),
        _ => (0.0, 0.0),
    };
    padded.extend((0..pad).map(|i| first * i as f32 / pad as f32));
    padded.extend_from_slice(signal);
    padded.extend((0..pad).map(|i| last * (pad - 1 - i) as f32 / pad as f32));
    padded
}

/// Time-averaged autocorrelation tempogram
///
/// # Returns
///
/// `win_length` values, one per lag, each frame normalized so its largest lag value is 1
pub fn mean_tempogram(onset_envelope: &[f32], win_length: usize) -> Vec<f32> {
    let padded = linear_ramp_pad(onset_envelope, win_length / 2);
    let window = hann_window(win_length);
    let mut autocorrelator = Autocorrelator::new(win_length);

    let mut frame = vec![0.0f32; win_length];
    let mut acf = vec![0.0f32; win_length];
    let mut sum = vec![0.0f64; win_length];
    let mut n_frames = 0usize;

    for start in 0..=(padded.len().saturating_sub(win_length)) {
        if start + win_length > padded.len() {
            break;
        }
        for ((f, &x), &w) in frame
            .iter_mut()
            .zip(&padded[start..start + win_length])
            .zip(window.iter())
        {
            *f = x * w;
        }
        autocorrelator.process(&frame, &mut acf);

        let norm = acf.iter().fold(0.0f32, |m, &v| m.max(v.abs()));
        let scale = if norm > f32::MIN_POSITIVE { 1.0 / norm } else { 1.0 };
        for (s, &v) in sum.iter_mut().zip(acf.iter()) {
            *s += (v * scale) as f64;
        }
        n_frames += 1;
    }

    if n_frames == 0 {
        return vec![0.0; win_length];
    }
    sum.iter().map(|&s| (s / n_frames as f64) as f32).collect()
}

/// Estimate a single global tempo in BPM
///
/// # Arguments
///
/// * `onset_envelope` - Onset strength, one value per hop
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Uses `hop_size`, `tempo_window_seconds`, `start_bpm`, `std_bpm`, `max_bpm`
///
/// # Returns
///
/// Tempo in BPM, or 0.0 when the envelope carries no onsets (silence, DC, too short)
///
/// # Example
///
/// ```
/// use motif_dsp::features::period::tempo::estimate_tempo;
/// use motif_dsp::AnalysisConfig;
///
/// let silent = vec![0.0f32; 500];
/// let bpm = estimate_tempo(&silent, 22050, &AnalysisConfig::default())?;
/// assert_eq!(bpm, 0.0);
/// # Ok::<(), motif_dsp::AnalysisError>(())
/// ```
pub fn estimate_tempo(
    onset_envelope: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<f32, AnalysisError> {
    if sample_rate == 0 || config.hop_size == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid tempo parameters: sample_rate={}, hop_size={}",
            sample_rate, config.hop_size
        )));
    }

    if onset_envelope.len() < 2 || onset_envelope.iter().all(|&v| v == 0.0) {
        log::warn!("Onset envelope carries no onsets, reporting 0 BPM");
        return Ok(0.0);
    }

    let win_length =
        (config.tempo_window_seconds as f64 * sample_rate as f64) as usize / config.hop_size;
    if win_length < 2 {
        log::warn!(
            "Tempo window of {} frames is too short to estimate a period",
            win_length
        );
        return Ok(0.0);
    }

    log::debug!(
        "Estimating tempo: {} envelope frames, window={} frames, prior={:.1} BPM",
        onset_envelope.len(),
        win_length,
        config.start_bpm
    );

    let tempogram = mean_tempogram(onset_envelope, win_length);

    let log_start = config.start_bpm.log2();
    let mut best: Option<(usize, f32)> = None;
    for (lag, &strength) in tempogram.iter().enumerate().skip(1) {
        let bpm = lag_to_bpm(lag, sample_rate, config.hop_size);
        if bpm >= config.max_bpm {
            continue;
        }
        let prior = -0.5 * ((bpm.log2() - log_start) / config.std_bpm).powi(2);
        let score = (1e6 * strength.max(0.0)).ln_1p() + prior;
        if !score.is_finite() {
            return Err(AnalysisError::ComputationFailure(format!(
                "Non-finite tempo score at lag {}",
                lag
            )));
        }
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((lag, score));
        }
    }

    let bpm = match best {
        Some((lag, _)) => lag_to_bpm(lag, sample_rate, config.hop_size),
        None => {
            log::warn!("No tempo lag below {:.0} BPM fits in the window", config.max_bpm);
            0.0
        }
    };

    log::debug!("Tempo estimate: {:.2} BPM", bpm);
    Ok(bpm)
}
