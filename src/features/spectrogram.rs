//! Short-time Fourier transform helpers
//!
//! Frames are centered: frame `t` covers `[t * hop - n / 2, t * hop + n / 2)` with zero
//! padding outside the signal, so a buffer of `len` samples yields `1 + len / hop` frames.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::AnalysisError;

/// Periodic Hann window of length `len`
pub(crate) fn hann_window(len: usize) -> Vec<f32> {
    if len <= 1 {
        return vec![1.0; len];
    }
    (0..len)
        .map(|n| {
            let phase = 2.0 * std::f64::consts::PI * n as f64 / len as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}

/// Number of centered frames for a buffer
pub(crate) fn centered_frame_count(len: usize, hop_size: usize) -> usize {
    1 + len / hop_size
}

/// Copy the window of `out.len()` samples centered on `center` into `out`, zero padded
pub(crate) fn fill_centered(samples: &[f32], center: usize, out: &mut [Complex<f32>]) {
    let half = out.len() / 2;
    for (i, slot) in out.iter_mut().enumerate() {
        let idx = (center + i).checked_sub(half);
        let x = match idx {
            Some(idx) if idx < samples.len() => samples[idx],
            _ => 0.0,
        };
        *slot = Complex::new(x, 0.0);
    }
}

/// Compute a centered power spectrogram
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `frame_size` - FFT size (typically 2048)
/// * `hop_size` - Hop size in samples (typically 512)
///
/// # Returns
///
/// `n_frames × (frame_size / 2 + 1)` power values (|X|²), Hann windowed
pub fn power_spectrogram(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
) -> Result<Vec<Vec<f32>>, AnalysisError> {
    if frame_size < 2 || hop_size == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid STFT parameters: frame_size={}, hop_size={}",
            frame_size, hop_size
        )));
    }

    let n_frames = centered_frame_count(samples.len(), hop_size);
    let n_bins = frame_size / 2 + 1;

    log::debug!(
        "Computing power spectrogram: {} samples, {} frames, {} bins",
        samples.len(),
        n_frames,
        n_bins
    );

    let window = hann_window(frame_size);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(frame_size);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); frame_size];
    let mut scratch = vec![Complex::new(0.0f32, 0.0); fft.get_inplace_scratch_len()];

    let mut frames = Vec::with_capacity(n_frames);
    for t in 0..n_frames {
        fill_centered(samples, t * hop_size, &mut buffer);
        for (slot, &w) in buffer.iter_mut().zip(window.iter()) {
            *slot *= w;
        }
        fft.process_with_scratch(&mut buffer, &mut scratch);
        frames.push(buffer[..n_bins].iter().map(|c| c.norm_sqr()).collect());
    }

    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window_is_periodic() {
        let w = hann_window(8);
        assert_eq!(w.len(), 8);
        assert!(w[0].abs() < 1e-7);
        assert!((w[4] - 1.0).abs() < 1e-6);
        // Periodic window: symmetric around len/2, not around (len-1)/2
        assert!((w[1] - w[7]).abs() < 1e-6);
    }

    #[test]
    fn test_frame_count_is_centered() {
        let samples = vec![0.0f32; 44100];
        let spec = power_spectrogram(&samples, 2048, 512).unwrap();
        assert_eq!(spec.len(), 1 + 44100 / 512);
        assert_eq!(spec[0].len(), 1025);
    }

    #[test]
    fn test_sine_peaks_at_expected_bin() {
        let sr = 22050.0f32;
        let freq = 1000.0f32;
        let samples: Vec<f32> = (0..8192)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr).sin())
            .collect();
        let spec = power_spectrogram(&samples, 2048, 512).unwrap();
        let mid = &spec[spec.len() / 2];
        let peak = mid
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
            .0;
        let expected = (freq * 2048.0 / sr).round() as usize;
        assert!((peak as i32 - expected as i32).abs() <= 1, "peak bin {} vs {}", peak, expected);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(power_spectrogram(&[0.0; 100], 0, 512).is_err());
        assert!(power_spectrogram(&[0.0; 100], 2048, 0).is_err());
    }
}
