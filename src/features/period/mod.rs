//! Period estimation modules
//!
//! Turn an onset strength envelope into a global tempo:
//! - FFT autocorrelation
//! - Autocorrelation tempogram with a log-normal tempo prior

pub mod autocorrelation;
pub mod tempo;

pub use tempo::estimate_tempo;
