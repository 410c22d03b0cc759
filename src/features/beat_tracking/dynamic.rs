//! Dynamic-programming beat tracker
//!
//! Finds the beat sequence that best balances onset strength against deviation from
//! the global tempo period.
//!
//! # Algorithm
//!
//! 1. Normalize the onset envelope by its standard deviation
//! 2. Local score: convolve with a Gaussian of width `period / 32`
//! 3. For every frame, pick the best predecessor in `[i - 2p, i - p/2]` under the
//!    transition cost `-tightness * ln(gap / p)²` and accumulate the score
//! 4. Backtrack from the last cumulative-score peak that exceeds half the median peak
//! 5. Optionally trim leading/trailing beats whose smoothed local score is weak
//!
//! # Reference
//!
//! Ellis, D. P. W. (2007). Beat Tracking by Dynamic Programming.
//! *Journal of New Music Research*, 36(1), 51-60.

use super::{BeatTrack, BeatTracker};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::onset::onset_strength;
use crate::features::period::estimate_tempo;

/// Default beat tracker: onset strength -> tempogram tempo -> DP beat placement
#[derive(Debug, Clone, Default)]
pub struct DynamicBeatTracker {
    config: AnalysisConfig,
}

impl DynamicBeatTracker {
    /// Create a tracker with the given analysis parameters
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }
}

impl BeatTracker for DynamicBeatTracker {
    fn track(&self, samples: &[f32], sample_rate: u32) -> Result<BeatTrack, AnalysisError> {
        let envelope = onset_strength(samples, sample_rate, &self.config)?;
        let bpm = estimate_tempo(&envelope, sample_rate, &self.config)?;
        if bpm <= 0.0 {
            return Ok(BeatTrack::silent());
        }

        let frame_rate = sample_rate as f32 / self.config.hop_size as f32;
        let frames = track_beats(
            &envelope,
            bpm,
            frame_rate,
            self.config.beat_tightness,
            self.config.trim_beats,
        )?;

        let seconds_per_frame = self.config.hop_size as f32 / sample_rate as f32;
        let beat_times = frames
            .into_iter()
            .map(|f| f as f32 * seconds_per_frame)
            .collect::<Vec<_>>();

        log::debug!("Beat tracker: {:.2} BPM, {} beats", bpm, beat_times.len());

        Ok(BeatTrack { bpm, beat_times })
    }
}

/// Place beats on an onset envelope given a tempo
///
/// # Arguments
///
/// * `onset_envelope` - Onset strength, one value per frame
/// * `bpm` - Global tempo estimate (must be > 0)
/// * `frame_rate` - Envelope frames per second (`sample_rate / hop_size`)
/// * `tightness` - Penalty weight for deviating from the tempo period
/// * `trim` - Drop weak beats at the edges
///
/// # Returns
///
/// Beat positions as ascending frame indices (empty for an all-zero envelope)
pub fn track_beats(
    onset_envelope: &[f32],
    bpm: f32,
    frame_rate: f32,
    tightness: f32,
    trim: bool,
) -> Result<Vec<usize>, AnalysisError> {
    if !(bpm > 0.0) || !(frame_rate > 0.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "Beat tracking needs positive tempo and frame rate: bpm={}, frame_rate={}",
            bpm, frame_rate
        )));
    }
    if onset_envelope.len() < 2 || onset_envelope.iter().all(|&v| v == 0.0) {
        return Ok(Vec::new());
    }

    let period = ((60.0 * frame_rate / bpm).round() as usize).max(1);
    let local = local_score(&normalize_onsets(onset_envelope), period);
    let (backlink, cumulative) = beat_dp(&local, period, tightness as f64);

    let mut beats = match last_beat(&cumulative) {
        Some(tail) => vec![tail],
        None => return Ok(Vec::new()),
    };
    while let Some(prev) = beats.last().and_then(|&b| backlink[b]) {
        beats.push(prev);
    }
    beats.reverse();

    if trim {
        beats = trim_beats(&local, beats);
    }

    if local.iter().any(|v| !v.is_finite()) || cumulative.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::ComputationFailure(
            "Non-finite beat tracking score".to_string(),
        ));
    }

    Ok(beats)
}

/// Scale to unit standard deviation (sample estimate)
fn normalize_onsets(onsets: &[f32]) -> Vec<f64> {
    let n = onsets.len() as f64;
    let mean = onsets.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = onsets
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0).max(1.0);
    let std = var.sqrt() + f64::MIN_POSITIVE;
    onsets.iter().map(|&v| v as f64 / std).collect()
}

/// Smooth onsets with a Gaussian spanning `±period` frames
fn local_score(onsets: &[f64], period: usize) -> Vec<f64> {
    let p = period as f64;
    let window: Vec<f64> = (0..=2 * period)
        .map(|j| {
            let x = (j as f64 - p) * 32.0 / p;
            (-0.5 * x * x).exp()
        })
        .collect();

    (0..onsets.len())
        .map(|i| {
            window
                .iter()
                .enumerate()
                .filter_map(|(j, &w)| {
                    (i + j)
                        .checked_sub(period)
                        .and_then(|idx| onsets.get(idx))
                        .map(|&x| x * w)
                })
                .sum()
        })
        .collect()
}

/// Forward pass: best predecessor and cumulative score for every frame
fn beat_dp(local: &[f64], period: usize, tightness: f64) -> (Vec<Option<usize>>, Vec<f64>) {
    let p = period as f64;
    let nearest = (p / 2.0).round() as isize;
    // Predecessor offsets -2p ..= -round(p/2)
    let offsets: Vec<isize> = (-(2 * period as isize)..=-nearest).collect();
    let transition: Vec<f64> = offsets
        .iter()
        .map(|&o| -tightness * ((-o as f64) / p).ln().powi(2))
        .collect();

    let max_local = local.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut backlink = vec![None; local.len()];
    let mut cumulative = vec![0.0f64; local.len()];
    let mut first_beat = true;

    for (i, &score) in local.iter().enumerate() {
        let mut best: Option<(isize, f64)> = None;
        for (&offset, &cost) in offsets.iter().zip(transition.iter()) {
            let idx = i as isize + offset;
            let candidate = if idx >= 0 {
                cost + cumulative[idx as usize]
            } else {
                cost
            };
            if best.map_or(true, |(_, s)| candidate > s) {
                best = Some((idx, candidate));
            }
        }
        let (best_idx, best_score) = best.unwrap_or((-1, 0.0));

        cumulative[i] = score + best_score;
        if first_beat && score < 0.01 * max_local {
            backlink[i] = None;
        } else {
            backlink[i] = usize::try_from(best_idx).ok();
            first_beat = false;
        }
    }

    (backlink, cumulative)
}

/// Last frame whose cumulative score is a local peak above half the median peak
fn last_beat(cumulative: &[f64]) -> Option<usize> {
    let n = cumulative.len();
    let is_peak = |i: usize| {
        let prev = cumulative[i.saturating_sub(1)];
        let next = cumulative[(i + 1).min(n - 1)];
        cumulative[i] > prev && cumulative[i] >= next
    };

    let mut peaks: Vec<f64> = (0..n).filter(|&i| is_peak(i)).map(|i| cumulative[i]).collect();
    if peaks.is_empty() {
        return None;
    }
    peaks.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = peaks.len() / 2;
    let median = if peaks.len() % 2 == 0 {
        (peaks[mid - 1] + peaks[mid]) / 2.0
    } else {
        peaks[mid]
    };

    (0..n).rev().find(|&i| {
        let masked = if is_peak(i) { cumulative[i] } else { 0.0 };
        masked * 2.0 > median
    })
}

/// Drop beats outside the span where the smoothed beat strength exceeds half its RMS
fn trim_beats(local: &[f64], beats: Vec<usize>) -> Vec<usize> {
    const SMOOTH: [f64; 5] = [0.0, 0.5, 1.0, 0.5, 0.0];

    let strength: Vec<f64> = beats.iter().map(|&b| local[b]).collect();
    let smooth: Vec<f64> = (0..strength.len())
        .map(|i| {
            SMOOTH
                .iter()
                .enumerate()
                .filter_map(|(k, &w)| {
                    (i + k)
                        .checked_sub(2)
                        .and_then(|idx| strength.get(idx))
                        .map(|&s| s * w)
                })
                .sum()
        })
        .collect();

    if smooth.is_empty() {
        return beats;
    }
    let rms = (smooth.iter().map(|s| s * s).sum::<f64>() / smooth.len() as f64).sqrt();
    let threshold = 0.5 * rms;

    let first = smooth.iter().position(|&s| s > threshold);
    let last = smooth.iter().rposition(|&s| s > threshold);
    match (first, last) {
        // The last strong beat itself is excluded
        (Some(first), Some(last)) => beats[first..last].to_vec(),
        _ => beats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse_envelope(period: usize, n: usize, offset: usize) -> Vec<f32> {
        (0..n)
            .map(|i| if i >= offset && (i - offset) % period == 0 { 1.0 } else { 0.0 })
            .collect()
    }

    fn click_track(bpm: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
        let n = (seconds * sample_rate as f32) as usize;
        let interval = (60.0 / bpm * sample_rate as f32) as usize;
        let click_len = (0.01 * sample_rate as f32) as usize;
        let mut samples = vec![0.0f32; n];
        let mut pos = sample_rate as usize / 4;
        while pos < n {
            for i in 0..click_len.min(n - pos) {
                let decay = (-(i as f32) / (click_len as f32 / 4.0)).exp();
                samples[pos + i] = 0.8 * decay * if i % 2 == 0 { 1.0 } else { -1.0 };
            }
            pos += interval;
        }
        samples
    }

    #[test]
    fn test_beats_follow_pulse_train() {
        let env = pulse_envelope(20, 400, 5);
        // 20 frames per beat at 43.066 frames/s
        let frame_rate = 22050.0 / 512.0;
        let bpm = 60.0 * frame_rate / 20.0;
        // The backtracking tail can land past the last pulse; trimming removes it
        let beats = track_beats(&env, bpm, frame_rate, 100.0, true).unwrap();

        assert!(beats.len() >= 15, "got {:?}", beats);
        for &b in &beats {
            assert_eq!((b + 20 - 5) % 20, 0, "beat {} is off the pulse grid", b);
        }
    }

    #[test]
    fn test_trimming_never_adds_beats() {
        let env = pulse_envelope(20, 400, 5);
        let frame_rate = 22050.0 / 512.0;
        let bpm = 60.0 * frame_rate / 20.0;
        let untrimmed = track_beats(&env, bpm, frame_rate, 100.0, false).unwrap();
        let trimmed = track_beats(&env, bpm, frame_rate, 100.0, true).unwrap();
        assert!(trimmed.len() <= untrimmed.len());
        assert!(trimmed.iter().all(|b| untrimmed.contains(b)));
    }

    #[test]
    fn test_silent_envelope_has_no_beats() {
        let env = vec![0.0f32; 200];
        assert!(track_beats(&env, 120.0, 43.0, 100.0, true).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_tempo() {
        let env = pulse_envelope(20, 100, 0);
        assert!(track_beats(&env, 0.0, 43.0, 100.0, true).is_err());
    }

    #[test]
    fn test_tracker_on_click_track() {
        let sr = 22050;
        let samples = click_track(120.0, 8.0, sr);
        let track = DynamicBeatTracker::default().track(&samples, sr).unwrap();

        assert!((track.bpm - 120.0).abs() < 5.0, "bpm {}", track.bpm);
        assert!(track.beat_times.len() >= 8, "beats {:?}", track.beat_times);

        let mut intervals: Vec<f32> = track.beat_times.windows(2).map(|w| w[1] - w[0]).collect();
        intervals.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let median = intervals[intervals.len() / 2];
        assert!((median - 0.5).abs() < 0.05, "median interval {}", median);
    }

    #[test]
    fn test_tracker_on_silence() {
        let samples = vec![0.0f32; 22050 * 2];
        let track = DynamicBeatTracker::default().track(&samples, 22050).unwrap();
        assert_eq!(track, BeatTrack::silent());
    }
}
