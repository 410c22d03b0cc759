//! Constant-Q transform
//!
//! Frequency bins are spaced geometrically (`bins_per_octave` per octave) so each bin
//! lines up with a musical pitch and low notes get long analysis windows while high
//! notes get short ones.
//!
//! # Algorithm
//!
//! 1. Build one octave of filters for the top octave: Hann-windowed complex
//!    exponentials of length `Q * sr / f`, L1-normalized, transformed to sparse spectral
//!    kernels (Brown & Puckette, 1992)
//! 2. Evaluate the top octave at the native rate on centered FFT frames
//! 3. Low-pass and decimate by 2, halve the hop, and reuse the same kernels for the
//!    next octave down; repeat for every octave
//! 4. Scale magnitudes by the square root of each filter's native-rate length
//!
//! # Reference
//!
//! Brown, J. C., & Puckette, M. S. (1992). An Efficient Algorithm for the Calculation of
//! a Constant Q Transform. *JASA*, 92(5), 2698-2701.
//!
//! Schörkhuber, C., & Klapuri, A. (2010). Constant-Q Transform Toolbox for Music
//! Processing. *Sound and Music Computing Conference*.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::spectrogram::{centered_frame_count, fill_centered, hann_window};

/// Equivalent noise bandwidth of the Hann window in bins
const HANN_BANDWIDTH: f64 = 1.50018;

/// Decimation filter length (odd, so the filter has a center tap)
const LOWPASS_TAPS: usize = 63;

/// Decimation filter cutoff in cycles per input sample
const LOWPASS_CUTOFF: f64 = 0.22;

/// Highest frequency (cycles per input sample) the decimation filter passes within 1%
///
/// Lower octaves are only accurate while their top bin stays below this. That holds
/// unless the top octave is within about 3% of Nyquist (e.g. C8 at 8.4 kHz).
const LOWPASS_PASSBAND: f64 = 0.18;

/// Sparse spectral kernel: `(fft_bin, conj(K[bin]) / fft_len)` pairs
type SpectralKernel = Vec<(usize, Complex<f32>)>;

/// Precomputed multirate constant-Q transform
pub struct ConstantQTransform {
    hop_size: usize,
    n_octaves: usize,
    bins_per_octave: usize,
    fmin: f64,
    fft: Arc<dyn Fft<f32>>,
    fft_len: usize,
    /// Kernels for one octave, lowest bin first
    kernels: Vec<SpectralKernel>,
    /// Native-rate filter lengths of the top-octave bins
    lengths: Vec<f64>,
    lowpass: Vec<f32>,
}

impl std::fmt::Debug for ConstantQTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstantQTransform")
            .field("hop_size", &self.hop_size)
            .field("n_octaves", &self.n_octaves)
            .field("bins_per_octave", &self.bins_per_octave)
            .field("fmin", &self.fmin)
            .field("fft_len", &self.fft_len)
            .finish()
    }
}

impl ConstantQTransform {
    /// Plan a transform for `sample_rate`
    ///
    /// Octaves whose filters would reach past Nyquist are dropped from the top.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the sample rate is zero, no octave fits below Nyquist, or the
    /// hop size is not divisible by `2^(octaves - 1)`.
    pub fn new(sample_rate: u32, config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput("Invalid sample rate: 0".to_string()));
        }

        let sr = sample_rate as f64;
        let bpo = config.chroma_bins_per_octave;
        let q = config.cqt_filter_scale as f64 / (2f64.powf(1.0 / bpo as f64) - 1.0);
        let fmin = config.chroma_fmin as f64 * 2f64.powf(config.tuning as f64 / bpo as f64);

        let nyquist = sr / 2.0;
        let fits = |octaves: usize| {
            let fmax = fmin * 2f64.powf((octaves * bpo - 1) as f64 / bpo as f64);
            fmax * (1.0 + 0.5 * HANN_BANDWIDTH / q) <= nyquist
        };
        let n_octaves = (1..=config.chroma_octaves).rev().find(|&o| fits(o)).ok_or_else(|| {
            AnalysisError::InvalidInput(format!(
                "No constant-Q octave above {:.1} Hz fits below Nyquist ({:.1} Hz)",
                fmin, nyquist
            ))
        })?;
        if n_octaves < config.chroma_octaves {
            log::warn!(
                "Dropping {} constant-Q octave(s) above Nyquist at {} Hz",
                config.chroma_octaves - n_octaves,
                sample_rate
            );
        }

        let decimation = 1usize << (n_octaves - 1);
        if config.hop_size % decimation != 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "Hop size {} must be divisible by {} for {} octaves",
                config.hop_size, decimation, n_octaves
            )));
        }

        let top_fmin = fmin * 2f64.powi(n_octaves as i32 - 1);
        if n_octaves > 1 {
            let next_top = top_fmin * 2f64.powf((bpo - 1) as f64 / bpo as f64) / 2.0;
            let edge = next_top * (1.0 + 0.5 * HANN_BANDWIDTH / q) / sr;
            if edge > LOWPASS_PASSBAND {
                log::warn!(
                    "Top bins below {:.1} Hz are attenuated by decimation at {} Hz",
                    next_top,
                    sample_rate
                );
            }
        }
        let freqs: Vec<f64> = (0..bpo)
            .map(|b| top_fmin * 2f64.powf(b as f64 / bpo as f64))
            .collect();
        let lengths: Vec<f64> = freqs.iter().map(|&f| q * sr / f).collect();
        let longest = lengths.iter().copied().fold(0.0f64, f64::max).ceil() as usize;
        let fft_len = longest.next_power_of_two();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_len);
        let kernels = freqs
            .iter()
            .zip(lengths.iter())
            .map(|(&f, &len)| {
                spectral_kernel(f / sr, len.ceil() as usize, fft_len, &fft, config.cqt_sparsity)
            })
            .collect();

        log::debug!(
            "Constant-Q plan: {} octaves x {} bins from {:.2} Hz, Q={:.1}, fft_len={}",
            n_octaves,
            bpo,
            fmin,
            q,
            fft_len
        );

        Ok(Self {
            hop_size: config.hop_size,
            n_octaves,
            bins_per_octave: bpo,
            fmin,
            fft,
            fft_len,
            kernels,
            lengths,
            lowpass: lowpass_filter(LOWPASS_TAPS, LOWPASS_CUTOFF),
        })
    }

    /// Total number of bins
    pub fn n_bins(&self) -> usize {
        self.n_octaves * self.bins_per_octave
    }

    /// Number of octaves actually evaluated
    pub fn n_octaves(&self) -> usize {
        self.n_octaves
    }

    /// Center frequency of the lowest bin (tuning applied)
    pub fn fmin(&self) -> f64 {
        self.fmin
    }

    /// Center frequency of `bin`
    pub fn bin_frequency(&self, bin: usize) -> f64 {
        self.fmin * 2f64.powf(bin as f64 / self.bins_per_octave as f64)
    }

    /// Magnitude constant-Q spectrogram
    ///
    /// # Returns
    ///
    /// `1 + len / hop_size` frames of `n_bins()` magnitudes, lowest frequency first
    pub fn magnitude(&self, samples: &[f32]) -> Result<Vec<Vec<f32>>, AnalysisError> {
        let n_frames = centered_frame_count(samples.len(), self.hop_size);
        let n_bins = self.n_bins();
        let mut out = vec![vec![0.0f32; n_bins]; n_frames];

        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.fft_len];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];

        let mut signal = samples.to_vec();
        let mut hop = self.hop_size;

        for octave in 0..self.n_octaves {
            if octave > 0 {
                signal = decimate(&signal, &self.lowpass);
                hop /= 2;
            }

            let bin_offset = (self.n_octaves - 1 - octave) * self.bins_per_octave;
            let rate_factor = (1usize << octave) as f64;
            let scales: Vec<f32> = self
                .lengths
                .iter()
                .map(|&len| (len * rate_factor).sqrt() as f32)
                .collect();

            for (t, frame) in out.iter_mut().enumerate() {
                fill_centered(&signal, t * hop, &mut buffer);
                self.fft.process_with_scratch(&mut buffer, &mut scratch);

                for (b, (kernel, &scale)) in self.kernels.iter().zip(scales.iter()).enumerate() {
                    let response: Complex<f32> =
                        kernel.iter().map(|&(k, coef)| buffer[k] * coef).sum();
                    frame[bin_offset + b] = response.norm() * scale;
                }
            }
        }

        if out.iter().flatten().any(|v| !v.is_finite()) {
            return Err(AnalysisError::ComputationFailure(
                "Non-finite constant-Q magnitude".to_string(),
            ));
        }

        log::debug!("Constant-Q spectrogram: {} frames x {} bins", n_frames, n_bins);
        Ok(out)
    }
}

/// Sparse spectral kernel for a filter at normalized frequency `freq` (cycles/sample)
fn spectral_kernel(
    freq: f64,
    len: usize,
    fft_len: usize,
    fft: &Arc<dyn Fft<f32>>,
    sparsity: f32,
) -> SpectralKernel {
    let len = len.clamp(1, fft_len);
    let window = hann_window(len);
    let norm: f64 = window.iter().map(|&w| w as f64).sum::<f64>().max(f64::MIN_POSITIVE);

    let mut buffer = vec![Complex::new(0.0f32, 0.0); fft_len];
    let center = fft_len / 2;
    for (k, &w) in window.iter().enumerate() {
        let n = k as f64 - (len / 2) as f64;
        let phase = 2.0 * std::f64::consts::PI * freq * n;
        let amp = w as f64 / norm;
        let idx = (center as isize + n as isize) as usize;
        buffer[idx] = Complex::new((amp * phase.cos()) as f32, (amp * phase.sin()) as f32);
    }
    fft.process(&mut buffer);

    let scale = 1.0 / fft_len as f32;
    let magnitudes: Vec<f32> = buffer.iter().map(|c| c.norm()).collect();
    let threshold = sparsity_threshold(&magnitudes, sparsity);

    buffer
        .iter()
        .zip(magnitudes.iter())
        .enumerate()
        .filter(|&(_, (_, &m))| m > 0.0 && m >= threshold)
        .map(|(k, (c, _))| (k, c.conj() * scale))
        .collect()
}

/// Smallest magnitude to keep so that the discarded mass is below `quantile` of the total
fn sparsity_threshold(magnitudes: &[f32], quantile: f32) -> f32 {
    if quantile <= 0.0 {
        return 0.0;
    }
    let total: f64 = magnitudes.iter().map(|&m| m as f64).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let mut sorted = magnitudes.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut cumulative = 0.0f64;
    for &m in &sorted {
        cumulative += m as f64;
        if cumulative / total >= quantile as f64 {
            return m;
        }
    }
    sorted.last().copied().unwrap_or(0.0)
}

/// Hann-windowed sinc low-pass with unit DC gain
fn lowpass_filter(taps: usize, cutoff: f64) -> Vec<f32> {
    let mid = (taps / 2) as f64;
    let raw: Vec<f64> = (0..taps)
        .map(|m| {
            let x = m as f64 - mid;
            let sinc = if x == 0.0 {
                2.0 * cutoff
            } else {
                (2.0 * std::f64::consts::PI * cutoff * x).sin() / (std::f64::consts::PI * x)
            };
            let window =
                0.5 - 0.5 * (2.0 * std::f64::consts::PI * m as f64 / (taps - 1) as f64).cos();
            sinc * window
        })
        .collect();
    let gain: f64 = raw.iter().sum();
    raw.iter().map(|&h| (h / gain) as f32).collect()
}

/// Low-pass filter (zero phase) and keep every second sample
fn decimate(signal: &[f32], lowpass: &[f32]) -> Vec<f32> {
    let half = (lowpass.len() / 2) as isize;
    let n_out = (signal.len() + 1) / 2;
    (0..n_out)
        .map(|m| {
            let center = 2 * m as isize;
            lowpass
                .iter()
                .enumerate()
                .filter_map(|(j, &h)| {
                    let idx = center + half - j as isize;
                    usize::try_from(idx)
                        .ok()
                        .and_then(|i| signal.get(i))
                        .map(|&x| x * h)
                })
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (seconds * sample_rate as f32) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn peak_bin(frame: &[f32]) -> usize {
        frame
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
            .0
    }

    #[test]
    fn test_plan_default_at_22050() {
        let cqt = ConstantQTransform::new(22050, &AnalysisConfig::default()).unwrap();
        assert_eq!(cqt.n_octaves(), 7);
        assert_eq!(cqt.n_bins(), 252);
        assert!((cqt.fmin() - 32.7032).abs() < 1e-3);
        // A4 sits 45 semitones (135 bins) above C1
        assert!((cqt.bin_frequency(135) - 440.0).abs() < 0.05);
    }

    #[test]
    fn test_drops_octaves_above_nyquist() {
        let cqt = ConstantQTransform::new(8000, &AnalysisConfig::default()).unwrap();
        assert!(cqt.n_octaves() < 7);
        let top = cqt.bin_frequency(cqt.n_bins() - 1);
        assert!(top < 4000.0);
    }

    #[test]
    fn test_rejects_unusable_rates_and_hops() {
        assert!(ConstantQTransform::new(0, &AnalysisConfig::default()).is_err());
        assert!(ConstantQTransform::new(40, &AnalysisConfig::default()).is_err());

        let config = AnalysisConfig {
            hop_size: 100,
            ..Default::default()
        };
        assert!(ConstantQTransform::new(22050, &config).is_err());
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let sr = 22050;
        let cqt = ConstantQTransform::new(sr, &AnalysisConfig::default()).unwrap();
        for (freq, bin) in [(440.0f32, 135usize), (110.0, 63), (1760.0, 207)] {
            let spec = cqt.magnitude(&sine(freq, sr, 1.0)).unwrap();
            let mid = &spec[spec.len() / 2];
            let peak = peak_bin(mid);
            assert!(
                (peak as i32 - bin as i32).abs() <= 1,
                "{} Hz peaked at bin {} (expected {})",
                freq,
                peak,
                bin
            );
        }
    }

    #[test]
    fn test_frame_count_matches_hop() {
        let cqt = ConstantQTransform::new(22050, &AnalysisConfig::default()).unwrap();
        let spec = cqt.magnitude(&vec![0.0f32; 10_000]).unwrap();
        assert_eq!(spec.len(), 1 + 10_000 / 512);
        assert!(spec.iter().flatten().all(|&v| v == 0.0));
    }

    #[test]
    fn test_lowpass_has_unit_dc_gain() {
        let h = lowpass_filter(LOWPASS_TAPS, LOWPASS_CUTOFF);
        let sum: f32 = h.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(h.len(), LOWPASS_TAPS);
    }

    #[test]
    fn test_lowpass_passband_and_stopband() {
        let h = lowpass_filter(LOWPASS_TAPS, LOWPASS_CUTOFF);
        let mid = (LOWPASS_TAPS / 2) as f64;
        let gain = |f: f64| -> f64 {
            h.iter()
                .enumerate()
                .map(|(m, &c)| c as f64 * (2.0 * std::f64::consts::PI * f * (m as f64 - mid)).cos())
                .sum::<f64>()
                .abs()
        };

        for i in 0..=18 {
            let f = LOWPASS_PASSBAND * i as f64 / 18.0;
            assert!((gain(f) - 1.0).abs() < 0.01, "gain {} at {}", gain(f), f);
        }
        // Anything that would alias into the passband after decimation is suppressed
        for i in 0..=18 {
            let f = 0.5 - LOWPASS_PASSBAND + LOWPASS_PASSBAND * i as f64 / 18.0;
            assert!(gain(f) < 0.02, "gain {} at {}", gain(f), f);
        }
    }

    #[test]
    fn test_default_plan_stays_in_passband() {
        // Next octave's top bin relative to the rate it is filtered at
        let q = 1.0 / (2f64.powf(1.0 / 36.0) - 1.0);
        let top_last = 32.703_197 * 2f64.powf(6.0 + 35.0 / 36.0);
        let edge = top_last / 2.0 * (1.0 + 0.5 * HANN_BANDWIDTH / q) / 22050.0;
        assert!(edge < LOWPASS_PASSBAND);
    }

    #[test]
    fn test_decimate_keeps_low_tone_and_halves_length() {
        let sr = 22050;
        let x = sine(200.0, sr, 0.5);
        let y = decimate(&x, &lowpass_filter(LOWPASS_TAPS, LOWPASS_CUTOFF));
        assert_eq!(y.len(), (x.len() + 1) / 2);
        let peak = y[200..y.len() - 200].iter().fold(0.0f32, |m, &v| m.max(v.abs()));
        assert!((peak - 1.0).abs() < 0.02, "peak {}", peak);
    }

    #[test]
    fn test_sparsity_threshold() {
        let mags = vec![0.001, 0.002, 1.0, 2.0];
        let t = sparsity_threshold(&mags, 0.01);
        assert!(t >= 0.002 && t <= 1.0);
        assert_eq!(sparsity_threshold(&mags, 0.0), 0.0);
    }
}
