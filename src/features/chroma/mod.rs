//! Chroma extraction modules
//!
//! Extract pitch-class distribution (12 semitones) from audio:
//! - Multirate constant-Q transform
//! - Chroma folding
//! - Per-frame normalization

pub mod cqt;
pub mod extractor;
pub mod normalization;

pub use extractor::{extract_chroma_cqt, Chromagram};
