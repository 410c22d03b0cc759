//! Beat tracking modules
//!
//! Estimate a global tempo and place beats on it:
//! - `BeatTracker` seam so the extractor can swap implementations
//! - Dynamic-programming tracker (onset strength + tempogram + Ellis DP)

pub mod dynamic;

pub use dynamic::DynamicBeatTracker;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Global tempo and beat positions of one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatTrack {
    /// Tempo in BPM (0.0 when no pulse was found)
    pub bpm: f32,

    /// Beat times in seconds, ascending
    pub beat_times: Vec<f32>,
}

impl BeatTrack {
    /// Result for input without any detectable pulse
    pub fn silent() -> Self {
        Self {
            bpm: 0.0,
            beat_times: Vec::new(),
        }
    }
}

/// Beat-tracking routine used by the feature extractor
///
/// Implementations must be deterministic and must not keep per-call state, so one
/// tracker can serve concurrent calls.
pub trait BeatTracker: Send + Sync {
    /// Track beats in mono `samples` recorded at `sample_rate`
    fn track(&self, samples: &[f32], sample_rate: u32) -> Result<BeatTrack, AnalysisError>;
}
