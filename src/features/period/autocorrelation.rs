//! FFT-accelerated autocorrelation
//!
//! Uses the identity `ACF = IFFT(|FFT(signal)|²)` with zero padding to at least twice
//! the signal length, so the result is the linear (not circular) autocorrelation.
//!
//! # Reference
//!
//! Ellis, D. P. W., & Pikrakis, A. (2006). Real-time Beat Induction.
//! *Proceedings of the International Conference on Music Information Retrieval*.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Reusable autocorrelation for fixed-length signals
///
/// Plans the forward and inverse FFTs once so that tempogram frames (thousands of
/// short windows per track) do not re-plan.
pub struct Autocorrelator {
    len: usize,
    fft_size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Autocorrelator {
    /// Create an autocorrelator for signals of `len` samples
    pub fn new(len: usize) -> Self {
        let fft_size = (2 * len.max(1)).next_power_of_two();
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Self {
            len,
            fft_size,
            forward,
            inverse,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// Autocorrelation of `signal` for lags `0..len`, written to `out`
    ///
    /// `signal` longer than `len` is truncated, shorter is zero padded.
    pub fn process(&mut self, signal: &[f32], out: &mut [f32]) {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let x = if i < self.len { signal.get(i).copied().unwrap_or(0.0) } else { 0.0 };
            *slot = Complex::new(x, 0.0);
        }

        self.forward
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        for x in &mut self.buffer {
            *x = Complex::new(x.norm_sqr(), 0.0);
        }
        self.inverse
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        for (o, x) in out.iter_mut().zip(self.buffer.iter()).take(self.len) {
            *o = x.re * scale;
        }
    }
}

/// Autocorrelation of a whole signal (lags `0..signal.len()`)
pub fn autocorrelate(signal: &[f32]) -> Vec<f32> {
    let mut out = vec![0.0f32; signal.len()];
    Autocorrelator::new(signal.len()).process(signal, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(signal: &[f32]) -> Vec<f32> {
        (0..signal.len())
            .map(|lag| {
                signal
                    .iter()
                    .zip(signal.iter().skip(lag))
                    .map(|(a, b)| a * b)
                    .sum()
            })
            .collect()
    }

    #[test]
    fn test_matches_direct_sum() {
        let signal = vec![1.0, -0.5, 0.25, 2.0, 0.0, 1.5, -1.0];
        let fast = autocorrelate(&signal);
        let slow = naive(&signal);
        for (lag, (f, s)) in fast.iter().zip(slow.iter()).enumerate() {
            assert!((f - s).abs() < 1e-4, "lag {}: {} vs {}", lag, f, s);
        }
    }

    #[test]
    fn test_periodic_pulse_train() {
        // Pulse every 4 frames: ACF peaks at multiples of 4
        let mut signal = vec![0.0f32; 32];
        for i in (0..32).step_by(4) {
            signal[i] = 1.0;
        }
        let acf = autocorrelate(&signal);
        assert!(acf[4] > acf[3] && acf[4] > acf[5]);
        assert!(acf[8] > acf[7] && acf[8] > acf[9]);
        assert!((acf[0] - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_reuse_gives_same_result() {
        let signal = vec![0.3, 0.1, -0.7, 0.9, 0.2];
        let mut ac = Autocorrelator::new(signal.len());
        let mut first = vec![0.0; 5];
        let mut second = vec![0.0; 5];
        ac.process(&signal, &mut first);
        ac.process(&signal, &mut second);
        assert_eq!(first, second);
    }
}
