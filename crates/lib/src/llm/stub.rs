//! Scripted backend for unit tests: canned replies per call kind, and a record of every request.

use crate::llm::{ChatRequest, ChatResponse, LlmBackend, LlmError, ToolCall};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    /// Request with a response_format (classification).
    Structured,
    /// Request offering tools (handoff).
    Handoff,
    /// Plain free-text request (specialist).
    FreeText,
}

impl CallKind {
    fn of(request: &ChatRequest) -> Self {
        if request.response_format.is_some() {
            CallKind::Structured
        } else if request.tools.is_some() {
            CallKind::Handoff
        } else {
            CallKind::FreeText
        }
    }
}

/// Canned outcome; errors are stored as (status, body) and rebuilt as `LlmError::Api`.
type Scripted = Result<ChatResponse, (u16, String)>;

pub(crate) struct StubBackend {
    structured: Scripted,
    handoff: Scripted,
    free_text: Scripted,
    requests: Mutex<Vec<ChatRequest>>,
}

impl StubBackend {
    pub(crate) fn new() -> Self {
        Self {
            structured: Err((500, "no verdict scripted".to_string())),
            handoff: Err((500, "no handoff scripted".to_string())),
            free_text: Err((500, "no answer scripted".to_string())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn verdict(self, is_irrelevant: bool, reasoning: &str) -> Self {
        let body = serde_json::json!({ "is_irrelevant": is_irrelevant, "reasoning": reasoning });
        self.structured_raw(&body.to_string())
    }

    pub(crate) fn structured_raw(mut self, content: &str) -> Self {
        self.structured = Ok(ChatResponse::text(content));
        self
    }

    pub(crate) fn structured_fails(mut self, status: u16, body: &str) -> Self {
        self.structured = Err((status, body.to_string()));
        self
    }

    pub(crate) fn handoff_to(mut self, tool_name: &str, language: Option<&str>) -> Self {
        let arguments = match language {
            Some(l) => serde_json::json!({ "language": l }),
            None => serde_json::json!({}),
        };
        self.handoff = Ok(ChatResponse {
            content: String::new(),
            tool_calls: vec![ToolCall {
                name: tool_name.to_string(),
                arguments,
            }],
        });
        self
    }

    pub(crate) fn handoff_response(mut self, response: ChatResponse) -> Self {
        self.handoff = Ok(response);
        self
    }

    pub(crate) fn answer(mut self, text: &str) -> Self {
        self.free_text = Ok(ChatResponse::text(text));
        self
    }

    pub(crate) fn answer_fails(mut self, status: u16, body: &str) -> Self {
        self.free_text = Err((status, body.to_string()));
        self
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self, kind: CallKind) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| CallKind::of(r) == kind)
            .count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmBackend for StubBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let kind = CallKind::of(&request);
        self.requests.lock().unwrap().push(request);
        let scripted = match kind {
            CallKind::Structured => &self.structured,
            CallKind::Handoff => &self.handoff,
            CallKind::FreeText => &self.free_text,
        };
        scripted.clone().map_err(|(status, body)| LlmError::Api { status, body })
    }
}
