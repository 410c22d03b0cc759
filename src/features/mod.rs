//! Feature extraction modules
//!
//! This module contains all feature extraction algorithms:
//! - Short-time spectra
//! - Onset strength (log-mel spectral flux)
//! - Period estimation (tempo)
//! - Beat tracking (dynamic programming)
//! - Constant-Q chroma
//! - Key detection

pub mod beat_tracking;
pub mod chroma;
pub mod key;
pub mod onset;
pub mod period;
pub mod spectrogram;
