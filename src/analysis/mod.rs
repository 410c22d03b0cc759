//! Analysis and result aggregation modules
//!
//! Combines feature extraction results into the final summary:
//! - Feature extractor (duration, tempo, key)
//! - Result types

pub mod extractor;
pub mod result;
