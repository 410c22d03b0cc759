//! Channel mixing utilities (multichannel to mono conversion)

use crate::error::AnalysisError;

/// Average interleaved frames down to one channel
///
/// # Arguments
///
/// * `samples` - Interleaved samples (`L R L R ...` for stereo)
/// * `channels` - Number of interleaved channels
///
/// # Returns
///
/// Mono samples, one per frame. A trailing partial frame is dropped.
pub fn downmix_interleaved(samples: &[f32], channels: usize) -> Result<Vec<f32>, AnalysisError> {
    if channels == 0 {
        return Err(AnalysisError::InvalidInput(
            "Channel count must be at least 1".to_string(),
        ));
    }
    if channels == 1 {
        return Ok(samples.to_vec());
    }

    if samples.len() % channels != 0 {
        log::warn!(
            "Dropping {} trailing samples that do not fill a {}-channel frame",
            samples.len() % channels,
            channels
        );
    }

    let scale = 1.0 / channels as f32;
    Ok(samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect())
}
