//! Key detection modules
//!
//! Reduce a track to a single pitch class:
//! - `KeyEstimator` seam so the extractor can swap implementations
//! - Dominant pitch class of the mean chromagram (default)
//! - Krumhansl-Kessler profile correlation

pub mod detector;
pub mod templates;

pub use detector::{dominant_pitch_class, stable_argmax, DominantPitchClassEstimator};
pub use templates::{KeyTemplates, ProfileCorrelationEstimator};

use crate::analysis::result::PitchClass;
use crate::error::AnalysisError;

/// Key-estimation routine used by the feature extractor
///
/// Implementations must be deterministic: identical samples give an identical pitch
/// class.
pub trait KeyEstimator: Send + Sync {
    /// Estimate the pitch class of mono `samples` recorded at `sample_rate`
    fn estimate_key(&self, samples: &[f32], sample_rate: u32) -> Result<PitchClass, AnalysisError>;

    /// Short identifier for logs
    fn name(&self) -> &'static str;
}
