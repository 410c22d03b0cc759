//! Mel filterbank (Slaney scale and area normalization)

/// Frequency spacing of the linear part of the Slaney mel scale
const F_SP: f64 = 200.0 / 3.0;

/// Start of the logarithmic part of the scale
const MIN_LOG_HZ: f64 = 1000.0;

const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert Hz to Slaney mels
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert Slaney mels to Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Sparse triangular mel filterbank spanning 0 Hz to Nyquist
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    /// Non-zero `(fft_bin, weight)` pairs for each band
    bands: Vec<Vec<(usize, f32)>>,
}

impl MelFilterbank {
    /// Build `n_mels` triangular filters over the `n_fft / 2 + 1` STFT bins
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize) -> Self {
        let sr = sample_rate as f64;
        let n_bins = n_fft / 2 + 1;
        let fft_freqs: Vec<f64> = (0..n_bins).map(|k| k as f64 * sr / n_fft as f64).collect();

        let mel_max = hz_to_mel(sr / 2.0);
        let mel_f: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
            .collect();

        let bands = (0..n_mels)
            .map(|m| {
                let (lo, center, hi) = (mel_f[m], mel_f[m + 1], mel_f[m + 2]);
                let enorm = 2.0 / (hi - lo);
                fft_freqs
                    .iter()
                    .enumerate()
                    .filter_map(|(k, &f)| {
                        let lower = (f - lo) / (center - lo);
                        let upper = (hi - f) / (hi - center);
                        let w = lower.min(upper).max(0.0) * enorm;
                        (w > 0.0).then_some((k, w as f32))
                    })
                    .collect()
            })
            .collect();

        Self { bands }
    }

    /// Number of mel bands
    pub fn n_mels(&self) -> usize {
        self.bands.len()
    }

    /// Project one power spectrum frame onto the mel bands
    pub fn apply(&self, power_frame: &[f32]) -> Vec<f32> {
        self.bands
            .iter()
            .map(|band| {
                band.iter()
                    .filter_map(|&(k, w)| power_frame.get(k).map(|&p| p * w))
                    .sum()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mel_scale_round_trip_points() {
        assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-9);
        assert!((mel_to_hz(15.0) - 1000.0).abs() < 1e-9);
        assert!((hz_to_mel(200.0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_filterbank_shape() {
        let fb = MelFilterbank::new(22050, 2048, 128);
        assert_eq!(fb.n_mels(), 128);
        // Every band covers at least one bin at this resolution except possibly the
        // narrowest low bands; the upper bands must all be populated.
        assert!(fb.bands[64..].iter().all(|b| !b.is_empty()));
    }

    #[test]
    fn test_apply_tone_lands_in_matching_band() {
        let fb = MelFilterbank::new(22050, 2048, 40);
        let mut frame = vec![0.0f32; 1025];
        // ~2 kHz
        frame[186] = 1.0;
        let mel = fb.apply(&frame);
        let peak = mel
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
            .0;
        let f = mel_to_hz(hz_to_mel(11025.0) * (peak + 1) as f64 / 41.0);
        assert!((f - 2003.0).abs() < 300.0, "band center {} Hz", f);
    }
}
