//! LLM abstraction and the OpenAI-compatible client.
//!
//! Everything that talks to the remote model goes through [`LlmBackend::chat`]: free-text
//! generation is a plain request, structured output sets `response_format`, and handoff
//! selection offers `tools`.

mod openai;

pub use openai::{OpenAiCompatClient, RemoteModel};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("backend api error: {status} {body}")]
    Api { status: u16, body: String },
    #[error("backend returned no message")]
    EmptyResponse,
    #[error("malformed backend output: {0}")]
    MalformedOutput(String),
}

/// Remote text-generation backend.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// One non-streaming chat completion.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Function tool offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub typ: String,
    pub function: ToolFunctionDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            typ: "function".to_string(),
            function: ToolFunctionDefinition {
                name: name.into(),
                description: Some(description.into()),
                parameters,
            },
        }
    }
}

/// Tool call returned by the model. Arguments are parsed JSON (Null when unparseable).
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
    Required,
}

/// Constraint on the shape of the reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    /// Reply must be a JSON document matching `schema`.
    JsonSchema {
        name: String,
        schema: serde_json::Value,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub tool_choice: Option<ToolChoice>,
    pub response_format: Option<ResponseFormat>,
}

impl ChatRequest {
    /// Request with a system instruction and one user message.
    pub fn new(model: impl Into<String>, instructions: &str, input: &str) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::system(instructions), ChatMessage::user(input)],
            tools: None,
            tool_choice: None,
            response_format: None,
        }
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>, choice: ToolChoice) -> Self {
        self.tools = Some(tools);
        self.tool_choice = Some(choice);
        self
    }

    /// Text of the user message, if any.
    pub fn user_input(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
    }

    /// Text of the system message, if any.
    pub fn instructions(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }
}

#[cfg(test)]
pub(crate) mod stub;
