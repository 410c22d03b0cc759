//! Analysis result types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Canonical pitch-class labels in chromatic order from C, sharps only
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// One of the 12 pitch classes, independent of octave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PitchClass {
    /// C
    #[serde(rename = "C")]
    C,
    /// C sharp
    #[serde(rename = "C#")]
    CSharp,
    /// D
    #[serde(rename = "D")]
    D,
    /// D sharp
    #[serde(rename = "D#")]
    DSharp,
    /// E
    #[serde(rename = "E")]
    E,
    /// F
    #[serde(rename = "F")]
    F,
    /// F sharp
    #[serde(rename = "F#")]
    FSharp,
    /// G
    #[serde(rename = "G")]
    G,
    /// G sharp
    #[serde(rename = "G#")]
    GSharp,
    /// A
    #[serde(rename = "A")]
    A,
    /// A sharp
    #[serde(rename = "A#")]
    ASharp,
    /// B
    #[serde(rename = "B")]
    B,
}

impl PitchClass {
    /// All pitch classes in chromatic order from C
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Pitch class for a chroma index; wraps modulo 12
    ///
    /// # Example
    ///
    /// ```
    /// use motif_dsp::PitchClass;
    ///
    /// assert_eq!(PitchClass::from_index(9), PitchClass::A);
    /// assert_eq!(PitchClass::from_index(13), PitchClass::CSharp);
    /// ```
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    /// Chroma index (0 = C, ..., 11 = B)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical label (e.g. "C", "F#")
    pub fn label(self) -> &'static str {
        NOTE_NAMES[self.index()]
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PitchClass {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NOTE_NAMES
            .iter()
            .position(|&name| name == s)
            .map(Self::from_index)
            .ok_or_else(|| AnalysisError::InvalidInput(format!("Unknown pitch class: {:?}", s)))
    }
}

/// Coarse descriptors of one audio file
///
/// Built once per analysis call and handed to the caller; nothing in the crate keeps or
/// mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    /// Duration in seconds
    pub duration: f64,

    /// Global tempo estimate in BPM (0.0 when no pulse could be found)
    pub bpm: f32,

    /// Dominant pitch class
    pub key: PitchClass,

    /// Reserved for instrument labels; always empty for now
    #[serde(default)]
    pub instruments: Vec<String>,
}

impl AudioFeatures {
    /// Create a result with an empty instrument list
    pub fn new(duration: f64, bpm: f32, key: PitchClass) -> Self {
        Self {
            duration,
            bpm,
            key,
            instruments: Vec::new(),
        }
    }

    /// One-line status summary, e.g. `Duration: 12.3s - 120 BPM - A`
    pub fn summary(&self) -> String {
        format!(
            "Duration: {:.1}s - {:.0} BPM - {}",
            self.duration, self.bpm, self.key
        )
    }
}
