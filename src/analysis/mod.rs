//! Posting analysis: payload merging, the model boundary and consolidation.

pub mod anthropic;
pub mod consolidate;
pub mod gemini;
pub mod merge;
pub mod model;
pub mod provider;

pub use anthropic::AnthropicModel;
pub use gemini::GeminiModel;
pub use consolidate::{consolidate, consolidate_emails};
pub use merge::merge_content;
pub use model::{
    AnalysisModel, ModelAnalysis, ModelError, ModelOutcome, build_prompt, parse_model_response,
    request_analysis,
};
pub use provider::ModelProvider;
