//! Selection of the completion model provider.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::model::{AnalysisModel, ModelError};
use super::{anthropic, gemini};

/// Completion API a run talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModelProvider {
    #[default]
    Anthropic,
    Gemini,
}

impl ModelProvider {
    /// Model used when none is configured.
    #[must_use]
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => anthropic::DEFAULT_MODEL,
            Self::Gemini => gemini::DEFAULT_MODEL,
        }
    }

    /// Environment variable holding the provider's API key.
    #[must_use]
    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::Anthropic => anthropic::API_KEY_ENV,
            Self::Gemini => gemini::API_KEY_ENV,
        }
    }

    /// Builds the provider's client from its API key variable.
    ///
    /// `model` falls back to [`ModelProvider::default_model`]. Returns `None`
    /// when the key is unset.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Unconfigured`] for an unusable key.
    pub fn model_from_env(
        self,
        model: Option<&str>,
    ) -> Result<Option<Arc<dyn AnalysisModel>>, ModelError> {
        let model = model.unwrap_or(self.default_model()).to_string();
        Ok(match self {
            Self::Anthropic => anthropic::AnthropicModel::from_env(model)?
                .map(|m| Arc::new(m) as Arc<dyn AnalysisModel>),
            Self::Gemini => {
                gemini::GeminiModel::from_env(model)?.map(|m| Arc::new(m) as Arc<dyn AnalysisModel>)
            }
        })
    }
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        })
    }
}

impl FromStr for ModelProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" => Ok(Self::Gemini),
            other => Err(format!(
                "unknown model provider `{other}` (expected anthropic or gemini)"
            )),
        }
    }
}
