//! Error types for feature extraction and its collaborators

use std::fmt;

/// Errors that can occur during audio analysis
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Caller contract violation: empty buffer, zero sample rate, non-finite samples,
    /// a chromagram without frames, or an invalid analysis configuration
    InvalidInput(String),

    /// Unexpected numerical failure inside the tempo or chroma routines
    ComputationFailure(String),

    /// Audio decoding error
    DecodingError(String),

    /// Missing or malformed prompt-generation settings
    InvalidConfig(String),

    /// The text generator failed or returned nothing usable
    GenerationFailure(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::ComputationFailure(msg) => write!(f, "Computation failure: {}", msg),
            AnalysisError::DecodingError(msg) => write!(f, "Decoding error: {}", msg),
            AnalysisError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            AnalysisError::GenerationFailure(msg) => write!(f, "Generation failure: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<symphonia::core::errors::Error> for AnalysisError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        AnalysisError::DecodingError(err.to_string())
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::DecodingError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        let err = AnalysisError::InvalidInput("Empty audio samples".to_string());
        assert_eq!(err.to_string(), "Invalid input: Empty audio samples");

        let err = AnalysisError::ComputationFailure("NaN in chroma".to_string());
        assert!(err.to_string().starts_with("Computation failure"));
    }

    #[test]
    fn test_io_error_maps_to_decoding_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.mp3");
        match AnalysisError::from(io) {
            AnalysisError::DecodingError(msg) => assert!(msg.contains("missing.mp3")),
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
