//! Chroma normalization

/// Scale a chroma frame so its largest entry is 1.0
///
/// Frames whose peak is below `f32::MIN_POSITIVE` (silence) are left unchanged.
pub fn normalize_max(chroma: &mut [f32; 12]) {
    let peak = chroma.iter().fold(0.0f32, |m, &v| m.max(v.abs()));
    if peak < f32::MIN_POSITIVE {
        return;
    }
    for v in chroma.iter_mut() {
        *v /= peak;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_max_scales_peak_to_one() {
        let mut chroma = [0.0f32; 12];
        chroma[4] = 4.0;
        chroma[7] = 2.0;
        normalize_max(&mut chroma);
        assert_eq!(chroma[4], 1.0);
        assert_eq!(chroma[7], 0.5);
    }

    #[test]
    fn test_normalize_max_leaves_silence() {
        let mut chroma = [0.0f32; 12];
        normalize_max(&mut chroma);
        assert!(chroma.iter().all(|&v| v == 0.0));
    }
}
