//! Composition-prompt generation
//!
//! Renders extracted features into a request for a generative text model and forwards
//! it to a caller-supplied [`TextGenerator`]. Model settings come from the environment:
//!
//! | Variable         | Default      |
//! |------------------|--------------|
//! | `GEMINI_API_KEY` | (required)   |
//! | `GEMINI_MODEL`   | `gemini-pro` |
//! | `MAX_TOKENS`     | `300`        |
//! | `TEMPERATURE`    | `0.7`        |
//!
//! # Example
//!
//! ```no_run
//! use motif_dsp::prompt::{generate_prompt, PromptSettings, TextGenerator};
//! use motif_dsp::{AnalysisError, AudioFeatures, PitchClass};
//!
//! struct Echo;
//!
//! impl TextGenerator for Echo {
//!     fn generate(&self, prompt: &str, _settings: &PromptSettings) -> Result<String, AnalysisError> {
//!         Ok(prompt.to_string())
//!     }
//! }
//!
//! let settings = PromptSettings::from_env()?;
//! let features = AudioFeatures::new(180.0, 120.0, PitchClass::A);
//! println!("{}", generate_prompt(&features, &Echo, &settings)?);
//! # Ok::<(), AnalysisError>(())
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analysis::result::AudioFeatures;
use crate::error::AnalysisError;

/// Default model identifier
pub const DEFAULT_MODEL: &str = "gemini-pro";

/// Default output token limit
pub const DEFAULT_MAX_TOKENS: u32 = 300;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Settings forwarded to the text generator
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSettings {
    /// API credential for the model service (never serialized)
    #[serde(skip_serializing, default)]
    pub api_key: String,

    /// Model identifier
    pub model: String,

    /// Maximum number of output tokens
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,
}

impl std::fmt::Debug for PromptSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl PromptSettings {
    /// Read settings from the process environment
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `GEMINI_API_KEY` is missing or empty, or a numeric variable
    /// does not parse.
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup` (variable name -> value)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AnalysisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AnalysisError::InvalidConfig(
                    "Environment variable 'GEMINI_API_KEY' is not set".to_string(),
                )
            })?;

        let model = lookup("GEMINI_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let max_tokens = parse_var(&lookup, "MAX_TOKENS", DEFAULT_MAX_TOKENS)?;
        let temperature: f32 = parse_var(&lookup, "TEMPERATURE", DEFAULT_TEMPERATURE)?;
        if !temperature.is_finite() {
            return Err(AnalysisError::InvalidConfig(format!(
                "TEMPERATURE must be finite, got {}",
                temperature
            )));
        }

        log::debug!(
            "Prompt settings: model={}, max_tokens={}, temperature={}",
            model,
            max_tokens,
            temperature
        );

        Ok(Self {
            api_key,
            model,
            max_tokens,
            temperature,
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, AnalysisError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            AnalysisError::InvalidConfig(format!("{} is not a valid number: {:?}", name, raw))
        }),
    }
}

/// Generative text model backend
pub trait TextGenerator {
    /// Complete `prompt` using `settings`
    fn generate(&self, prompt: &str, settings: &PromptSettings) -> Result<String, AnalysisError>;
}

/// Composition request for a model, built from extracted features
pub fn render_prompt(features: &AudioFeatures) -> String {
    format!(
        "Write a detailed prompt for composing a new piece of music.\n\
         Features extracted from the reference audio:\n\
         - Duration: {:.1} s\n\
         - BPM: {:.0}\n\
         - Key: {}\n\
         \n\
         Instructions:\n\
         1. Define a fitting musical style, atmosphere and instrumentation.\n\
         2. Suggest coherent harmonic and melodic variations.\n\
         3. Propose a structure (intro, verse, chorus, bridge, etc.).\n\
         4. Be concise but rich in technical detail.\n",
        features.duration, features.bpm, features.key
    )
}

/// Render the prompt for `features`, send it to `generator`, and return the trimmed reply
///
/// # Errors
///
/// Errors from the generator are passed through; an empty reply is a
/// `GenerationFailure`.
pub fn generate_prompt(
    features: &AudioFeatures,
    generator: &dyn TextGenerator,
    settings: &PromptSettings,
) -> Result<String, AnalysisError> {
    let prompt = render_prompt(features);
    log::debug!("Requesting composition prompt from model '{}'", settings.model);

    let reply = generator.generate(&prompt, settings)?;
    let reply = reply.trim();
    if reply.is_empty() {
        return Err(AnalysisError::GenerationFailure(format!(
            "Model '{}' returned an empty reply",
            settings.model
        )));
    }
    Ok(reply.to_string())
}
