//! Onset detection modules
//!
//! - Slaney mel filterbank
//! - Onset strength envelope (log-mel spectral flux)

pub mod mel;
pub mod strength;

pub use strength::onset_strength;
