//! Krumhansl-Kessler key templates
//!
//! Defines tonal profiles for 24 keys (12 major + 12 minor) and an estimator that
//! correlates the mean chroma against them.
//!
//! # Reference
//!
//! Krumhansl, C. L., & Kessler, E. J. (1982). Tracing the Dynamic Changes in Perceived
//! Tonal Organization in a Spatial Representation of Musical Keys. *Psychological Review*,
//! 89(4), 334-368.

use super::detector::stable_argmax;
use super::KeyEstimator;
use crate::analysis::result::PitchClass;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::chroma::extract_chroma_cqt;

/// C major probe-tone ratings
const MAJOR_PROFILE: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// C minor probe-tone ratings
const MINOR_PROFILE: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Key templates for all 24 keys
#[derive(Debug, Clone)]
pub struct KeyTemplates {
    /// Major key templates (12 keys: C, C#, D, ..., B)
    pub major: [[f32; 12]; 12],

    /// Minor key templates (12 keys: C, C#, D, ..., B)
    pub minor: [[f32; 12]; 12],
}

impl KeyTemplates {
    /// Create new key templates with Krumhansl-Kessler profiles
    pub fn new() -> Self {
        Self {
            major: std::array::from_fn(|tonic| rotate(&MAJOR_PROFILE, tonic)),
            minor: std::array::from_fn(|tonic| rotate(&MINOR_PROFILE, tonic)),
        }
    }

    /// Template for the major key on `tonic` (0 = C)
    pub fn get_major_template(&self, tonic: usize) -> &[f32; 12] {
        &self.major[tonic % 12]
    }

    /// Template for the minor key on `tonic` (0 = C)
    pub fn get_minor_template(&self, tonic: usize) -> &[f32; 12] {
        &self.minor[tonic % 12]
    }
}

impl Default for KeyTemplates {
    fn default() -> Self {
        Self::new()
    }
}

/// Shift a C-based profile so index `tonic` holds the tonic rating
fn rotate(profile: &[f32; 12], tonic: usize) -> [f32; 12] {
    std::array::from_fn(|pc| profile[(pc + 12 - tonic) % 12])
}

/// Pearson correlation; 0.0 when either side has no variance
pub fn pearson_correlation(a: &[f32; 12], b: &[f32; 12]) -> f32 {
    let mean_a = a.iter().sum::<f32>() / 12.0;
    let mean_b = b.iter().sum::<f32>() / 12.0;

    let mut cov = 0.0f32;
    let mut var_a = 0.0f32;
    let mut var_b = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom <= f32::EPSILON {
        0.0
    } else {
        cov / denom
    }
}

/// Key estimator matching mean chroma against the 24 Krumhansl-Kessler keys
///
/// Reports the tonic of the best-correlated key. Flat chroma (silence) correlates with
/// nothing and falls back to C.
#[derive(Debug, Clone, Default)]
pub struct ProfileCorrelationEstimator {
    config: AnalysisConfig,
    templates: KeyTemplates,
}

impl ProfileCorrelationEstimator {
    /// Estimator using the constant-Q settings from `config`
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            templates: KeyTemplates::new(),
        }
    }

    /// Correlation of `mean_chroma` with every key: 12 major then 12 minor
    pub fn key_scores(&self, mean_chroma: &[f32; 12]) -> [f32; 24] {
        std::array::from_fn(|k| {
            let template = if k < 12 {
                self.templates.get_major_template(k)
            } else {
                self.templates.get_minor_template(k - 12)
            };
            pearson_correlation(mean_chroma, template)
        })
    }
}

impl KeyEstimator for ProfileCorrelationEstimator {
    fn estimate_key(&self, samples: &[f32], sample_rate: u32) -> Result<PitchClass, AnalysisError> {
        let chroma = extract_chroma_cqt(samples, sample_rate, &self.config)?;
        let mean = chroma.mean_energy()?;
        let scores = self.key_scores(&mean);
        let best = stable_argmax(&scores);

        log::debug!(
            "Best profile match: {} {} (r={:.3})",
            PitchClass::from_index(best % 12),
            if best < 12 { "major" } else { "minor" },
            scores[best]
        );
        Ok(PitchClass::from_index(best % 12))
    }

    fn name(&self) -> &'static str {
        "profile-correlation"
    }
}
