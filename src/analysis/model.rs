//! Boundary to the external completion model.
//!
//! The model receives one prompt and answers with a JSON object. Everything
//! that can go wrong on the way (transport, status, empty or malformed
//! answer) is a [`ModelError`], and the attempt as a whole is summarized as a
//! [`ModelOutcome`] the consolidator branches on.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::posting::PostingRecord;

/// Errors from one model call.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Transport-level failure.
    #[error("model request failed: {source}")]
    Request {
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx answer from the model API.
    #[error("model API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The answer carried no text.
    #[error("model returned an empty response")]
    EmptyResponse,

    /// The answer is not a usable JSON object.
    #[error("malformed model response: {reason}")]
    Malformed { reason: String },

    /// The model client cannot be used (missing key, invalid header value).
    #[error("model not configured: {reason}")]
    Unconfigured { reason: String },
}

impl ModelError {
    /// Creates a malformed response error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// A text completion model.
#[async_trait]
pub trait AnalysisModel: Send + Sync {
    /// Model name, for logs.
    fn name(&self) -> &str;

    /// Completes `prompt` and returns the raw answer text.
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Fields the model reports for one posting.
///
/// Missing string fields are empty and missing lists are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelAnalysis {
    pub organization: String,
    pub emails: Vec<String>,
    pub sector: String,
    pub opportunity_type: String,
    pub location: String,
    pub summary: String,
    pub keywords: Vec<String>,
}

/// Result of trying the model for one posting.
#[derive(Debug)]
pub enum ModelOutcome {
    /// The model answered with a usable object.
    Completed(ModelAnalysis),
    /// The call or its answer failed.
    Failed(ModelError),
    /// No model is configured for this run.
    Skipped,
}

/// Runs the model on one posting, or skips when none is configured.
#[instrument(skip_all, fields(url = %record.url))]
pub async fn request_analysis(
    model: Option<&dyn AnalysisModel>,
    record: &PostingRecord,
    merged_payload: &str,
) -> ModelOutcome {
    let Some(model) = model else {
        return ModelOutcome::Skipped;
    };

    let prompt = build_prompt(record, merged_payload);
    let outcome = match model.complete(&prompt).await {
        Ok(raw) => parse_model_response(&raw),
        Err(error) => Err(error),
    };

    match outcome {
        Ok(analysis) => {
            debug!(model = model.name(), emails = analysis.emails.len(), "model analysis completed");
            ModelOutcome::Completed(analysis)
        }
        Err(error) => {
            warn!(model = model.name(), error = %error, "model analysis failed, using fallback");
            ModelOutcome::Failed(error)
        }
    }
}

/// Builds the deterministic prompt for one posting.
#[must_use]
pub fn build_prompt(record: &PostingRecord, merged_payload: &str) -> String {
    let file_emails = if record.file_emails.is_empty() {
        "none".to_string()
    } else {
        record.file_emails.iter().cloned().collect::<Vec<_>>().join(", ")
    };

    format!(
        r#"You extract structured data from a job or tender posting and its attached documents (terms of reference, tender dossiers).

URL: {url}
Title: {title}
Organization: {organization}
Date: {date}

Emails already extracted from the attached files:
{file_emails}

=== TEXT TO ANALYZE ===

{merged_payload}

=== END OF TEXT ===

Extract:
1. organisation: the exact, complete name of the publishing entity, copied as written.
2. emails: every contact email in the page and the files, including the ones listed above.
3. secteur: one of "Health", "Education", "Environment", "Humanitarian", "Development", "Governance", "Human rights", "Other".
4. type_opportunite: one of "Permanent contract", "Fixed-term contract", "Freelance", "Short mission", "Call for tenders".
5. localisation: city or cities, "National", or "unspecified".
6. resume: two or three sentences (at most 80 words).
7. mots_cles: five to eight keywords.

Do not invent anything. Answer with this JSON object only, without markdown:
{{"organisation": "...", "emails": ["..."], "secteur": "...", "type_opportunite": "...", "localisation": "...", "resume": "...", "mots_cles": ["..."]}}
"#,
        url = record.url,
        title = record.title,
        organization = record.organization,
        date = record.date,
    )
}

/// Parses a model answer, tolerating a fenced code block around the JSON.
///
/// # Errors
///
/// Returns [`ModelError::EmptyResponse`] for a blank answer and
/// [`ModelError::Malformed`] when the answer is not a JSON object.
pub fn parse_model_response(raw: &str) -> Result<ModelAnalysis, ModelError> {
    let json = strip_code_fences(raw);
    if json.is_empty() {
        return Err(ModelError::EmptyResponse);
    }

    let value: Value =
        serde_json::from_str(json).map_err(|e| ModelError::malformed(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(ModelError::malformed("expected a JSON object"));
    };

    Ok(ModelAnalysis {
        organization: string_field(&fields, "organisation"),
        emails: list_field(&fields, "emails"),
        sector: string_field(&fields, "secteur"),
        opportunity_type: string_field(&fields, "type_opportunite"),
        location: string_field(&fields, "localisation"),
        summary: string_field(&fields, "resume"),
        keywords: list_field(&fields, "mots_cles"),
    })
}

/// Returns the content of the first ```json (or bare ```) block, else the
/// trimmed input.
fn strip_code_fences(raw: &str) -> &str {
    let text = raw.trim();
    if let Some((_, rest)) = text.split_once("```json") {
        return rest.split("```").next().unwrap_or_default().trim();
    }
    if let Some((_, rest)) = text.split_once("```") {
        let inner = rest.split("```").next().unwrap_or_default().trim();
        return inner.strip_prefix("json").unwrap_or(inner).trim();
    }
    text
}

fn string_field(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn list_field(fields: &Map<String, Value>, key: &str) -> Vec<String> {
    match fields.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(single)) if !single.trim().is_empty() => vec![single.trim().to_string()],
        _ => Vec::new(),
    }
}
