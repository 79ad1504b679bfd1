//! Extraction Adapter: turns an upload or raw text into an `Analysis`.
//!
//! Path selection:
//! - decodable text → text model (single attempt, bounded by `timeout`) →
//!   Fallback Matcher on any error, timeout, or unusable reply
//! - no text model configured → Fallback Matcher
//! - undecodable file → filename heuristic fed to the Fallback Matcher, else not relevant
//!
//! Upstream failures never escape this module; they only change which path
//! produced the analysis.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::carbon::{emission, Category, EmissionFactorTable};
use crate::extraction::document::{decode_text, filename_hint, UploadedFile};
use crate::extraction::fallback;
use crate::extraction::models::{parse_quantity, Analysis, Confidence, Extraction};
use crate::extraction::prompts::{
    EXTRACTION_PROMPT, EXTRACTION_SYSTEM, MODEL_SUGGESTIONS, UNSUPPORTED_FILE_SUGGESTIONS,
};
use crate::llm_client::TextModel;

/// Upper bound on document text embedded in a single prompt.
const MAX_PROMPT_DOCUMENT_CHARS: usize = 20_000;

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("no JSON object in reply")]
    NoJson,

    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("relevant reply is missing a usable {0}")]
    Incomplete(&'static str),
}

/// Loose shape of the model's answer; validated into an `Analysis` by `interpret_reply`.
#[derive(Debug, Deserialize)]
struct ModelReply {
    relevant: bool,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    quantity: Option<Value>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    source_text: Option<String>,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Clone)]
pub struct ExtractionAdapter {
    model: Option<Arc<dyn TextModel>>,
    factors: Arc<EmissionFactorTable>,
    timeout: Duration,
}

impl ExtractionAdapter {
    pub fn new(
        model: Option<Arc<dyn TextModel>>,
        factors: Arc<EmissionFactorTable>,
        timeout: Duration,
    ) -> Self {
        Self {
            model,
            factors,
            timeout,
        }
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model.as_deref().map(|m| m.model_name())
    }

    pub async fn analyze_upload(&self, file: &UploadedFile) -> Analysis {
        if let Some(text) = decode_text(file).await {
            return self.analyze_text(&text, &file.file_name).await;
        }

        info!(
            "No readable text in {} ({}); using filename heuristics",
            file.file_name,
            file.file_type()
        );

        match filename_hint(&file.file_name) {
            Some(assumed) => match fallback::match_text(assumed, &file.file_name) {
                Analysis::Relevant(mut extraction) => {
                    extraction.confidence = Some(Confidence::Low);
                    extraction.source_text = format!(
                        "Assumed from file name '{}': {}",
                        file.file_name, extraction.source_text
                    );
                    Analysis::Relevant(extraction)
                }
                not_relevant => not_relevant,
            },
            None => Analysis::NotRelevant {
                reason: "Unsupported file type or content".to_string(),
                source_text: file.file_name.clone(),
                suggested_files: UNSUPPORTED_FILE_SUGGESTIONS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
        }
    }

    pub async fn analyze_text(&self, text: &str, file_name: &str) -> Analysis {
        let Some(model) = &self.model else {
            debug!("Text model not configured; using fallback matcher");
            return fallback::match_text(text, file_name);
        };

        let document: String = text.chars().take(MAX_PROMPT_DOCUMENT_CHARS).collect();
        let prompt = EXTRACTION_PROMPT.replace("{document_text}", &document);

        let reply =
            match tokio::time::timeout(self.timeout, model.complete(&prompt, EXTRACTION_SYSTEM))
                .await
            {
                Ok(Ok(reply)) => reply,
                Ok(Err(e)) => {
                    warn!("Text model call failed, using fallback matcher: {e}");
                    return fallback::match_text(text, file_name);
                }
                Err(_) => {
                    warn!(
                        "Text model timed out after {}s, using fallback matcher",
                        self.timeout.as_secs()
                    );
                    return fallback::match_text(text, file_name);
                }
            };

        match interpret_reply(&reply, &self.factors) {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("Unusable text model reply ({e}), using fallback matcher");
                fallback::match_text(text, file_name)
            }
        }
    }
}

/// Span from the first `{` to the last `}`, if any.
fn first_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Validates the model's answer against the factor table.
pub fn interpret_reply(reply: &str, factors: &EmissionFactorTable) -> Result<Analysis, ReplyError> {
    let json = first_json_object(reply).ok_or(ReplyError::NoJson)?;
    let parsed: ModelReply = serde_json::from_str(json)?;

    if !parsed.relevant {
        return Ok(Analysis::NotRelevant {
            reason: parsed
                .reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| "Document not suitable for carbon calculation".to_string()),
            source_text: parsed.source_text.unwrap_or_default(),
            suggested_files: MODEL_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        });
    }

    let category = parsed
        .category
        .as_deref()
        .and_then(Category::parse)
        .ok_or(ReplyError::Incomplete("category"))?;
    let quantity = parsed
        .quantity
        .as_ref()
        .and_then(parse_quantity)
        .ok_or(ReplyError::Incomplete("quantity"))?;

    // Only keep subtypes the table knows, so the stored value matches the factor used.
    let subtype = parsed
        .subtype
        .as_deref()
        .and_then(|s| factors.find(category, s))
        .map(|row| row.subtype.to_string());

    // A quantity whose emission overflows cannot be stored.
    emission(quantity, factors.factor_for(category, subtype.as_deref()))
        .ok_or(ReplyError::Incomplete("quantity"))?;

    let unit = parsed
        .unit
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| factors.unit_for(category, subtype.as_deref()).to_string());

    let confidence = match parsed.confidence.as_deref().map(str::to_ascii_lowercase) {
        Some(c) if c == "high" => Some(Confidence::High),
        Some(c) if c == "medium" => Some(Confidence::Medium),
        Some(c) if c == "low" => Some(Confidence::Low),
        _ => None,
    };

    let source_text = parsed
        .source_text
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("{category} usage: {quantity} {unit}"));

    Ok(Analysis::Relevant(Extraction {
        category: category.as_str().to_string(),
        quantity,
        unit,
        subtype,
        source_text,
        confidence,
        manual_entry: false,
    }))
}
