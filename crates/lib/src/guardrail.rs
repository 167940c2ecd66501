//! Topic guardrail: asks the backend whether a question is outside the three engineering domains.
//!
//! The backend must answer with a JSON object `{ "is_irrelevant": bool, "reasoning": string }`.
//! Anything else is a backend contract violation and is returned as an error, never read as a
//! pass or a rejection.

use crate::llm::{ChatRequest, LlmBackend, LlmError, ResponseFormat};
use serde::{Deserialize, Serialize};

const GUARDRAIL_INSTRUCTIONS: &str = "You are the Engineering Guardrail. Determine whether the user's question is NOT related to \
Mechatronics, Avionics, or Electrical Engineering. The question may be written in English, Urdu, or French. \
Set is_irrelevant to true only when the question is unrelated to all three domains, and explain your decision briefly in reasoning.";

const SCHEMA_NAME: &str = "engineer_topic_verdict";

/// Result of one admission check. Lives only for the dispatch decision it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassificationVerdict {
    /// True when the question is unrelated to mechatronics, avionics, or electrical engineering.
    pub is_irrelevant: bool,
    pub reasoning: String,
}

/// JSON schema the backend's reply is constrained to.
pub fn verdict_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "is_irrelevant": {
                "type": "boolean",
                "description": "Is the question unrelated to mechatronics, avionics, or electrical engineering?"
            },
            "reasoning": { "type": "string" }
        },
        "required": ["is_irrelevant", "reasoning"],
        "additionalProperties": false
    })
}

/// Admission check run before any specialist is invoked.
#[derive(Debug, Clone)]
pub struct TopicGuardrail {
    model: String,
}

impl TopicGuardrail {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    /// One structured-output call. Backend and decoding failures propagate unchanged.
    pub async fn check(
        &self,
        backend: &dyn LlmBackend,
        input: &str,
    ) -> Result<ClassificationVerdict, LlmError> {
        let request = ChatRequest::new(&self.model, GUARDRAIL_INSTRUCTIONS, input)
            .with_response_format(ResponseFormat::JsonSchema {
                name: SCHEMA_NAME.to_string(),
                schema: verdict_schema(),
            });
        let response = backend.chat(request).await?;
        let verdict = parse_verdict(&response.content)?;
        log::info!(
            "guardrail: is_irrelevant={} reasoning={:?}",
            verdict.is_irrelevant,
            verdict.reasoning
        );
        Ok(verdict)
    }
}

/// Decode the backend's structured reply. Must be an object with exactly the two schema fields.
pub fn parse_verdict(content: &str) -> Result<ClassificationVerdict, LlmError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(LlmError::MalformedOutput(
            "empty classification verdict".to_string(),
        ));
    }
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| LlmError::MalformedOutput(format!("classification verdict: {}", e)))?;
    if !value.is_object() {
        return Err(LlmError::MalformedOutput(
            "classification verdict is not a JSON object".to_string(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|e| LlmError::MalformedOutput(format!("classification verdict: {}", e)))
}
