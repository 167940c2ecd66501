//! OpenAI-compatible chat completions client (Gemini, OpenAI, LM Studio, ...).
//!
//! Uses `POST {base}/chat/completions` (tools and `response_format` supported) and
//! `GET {base}/models`. Auth is a bearer API key fixed at construction.

use crate::config::{self, Config};
use crate::llm::{
    ChatMessage, ChatRequest, ChatResponse, LlmBackend, LlmError, ResponseFormat, ToolCall,
    ToolChoice, ToolDefinition,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, LlmError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: builder.build()?,
        })
    }

    /// Client for the resolved backend in `config`. Fails when no API key is configured.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config::resolve_api_key(config).ok_or_else(|| {
            anyhow::anyhow!(
                "no backend API key (set TRAINER_API_KEY or GEMINI_API_KEY, or backend.apiKey in config)"
            )
        })?;
        let timeout =
            Some(Duration::from_secs(config.backend.timeout_secs)).filter(|d| !d.is_zero());
        let client = Self::new(config::resolve_base_url(config), api_key, timeout)
            .map_err(|e| anyhow::anyhow!("building backend client: {}", e))?;
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /models: list available models.
    pub async fn list_models(&self) -> Result<Vec<RemoteModel>, LlmError> {
        let url = format!("{}/models", self.base_url);
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }
        let data: ModelsResponse = res.json().await?;
        Ok(data
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|m| RemoteModel { name: m.id })
            .collect())
    }

    /// POST /chat/completions: non-streaming chat.
    async fn chat_completions(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = WireChatRequest::from(request);
        log::debug!(
            "llm: POST {} model={} tools={} structured={}",
            url,
            body.model,
            body.tools.as_ref().map_or(0, |t| t.len()),
            body.response_format.is_some()
        );
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }
        let data: WireChatResponse = res.json().await?;
        wire_response_to_chat_response(data)
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        self.chat_completions(request).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteModel {
    pub name: String,
}

// --- wire types ---

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Option<Vec<ModelObject>>,
}

#[derive(Debug, Deserialize)]
struct ModelObject {
    id: String,
}

#[derive(Debug, Serialize)]
struct WireChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireResponseFormat>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireResponseFormat {
    JsonSchema { json_schema: WireJsonSchema },
}

#[derive(Debug, Serialize)]
struct WireJsonSchema {
    name: String,
    schema: serde_json::Value,
    strict: bool,
}

impl From<ChatRequest> for WireChatRequest {
    fn from(r: ChatRequest) -> Self {
        Self {
            model: r.model,
            messages: r.messages,
            stream: false,
            tools: r.tools,
            tool_choice: r.tool_choice,
            response_format: r.response_format.map(|f| match f {
                ResponseFormat::JsonSchema { name, schema } => WireResponseFormat::JsonSchema {
                    json_schema: WireJsonSchema {
                        name,
                        schema,
                        strict: true,
                    },
                },
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireChatResponse {
    choices: Option<Vec<WireChoice>>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: Option<WireResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    function: Option<WireToolCallFunction>,
}

#[derive(Debug, Deserialize)]
struct WireToolCallFunction {
    name: Option<String>,
    arguments: Option<String>,
}

fn wire_response_to_chat_response(data: WireChatResponse) -> Result<ChatResponse, LlmError> {
    let message = data
        .choices
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.message)
        .ok_or(LlmError::EmptyResponse)?;
    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .filter_map(|tc| tc.function)
        .filter_map(|f| {
            let name = f.name?;
            let arguments = f
                .arguments
                .as_deref()
                .and_then(|s| serde_json::from_str(s).ok())
                .unwrap_or(serde_json::Value::Null);
            Some(ToolCall { name, arguments })
        })
        .collect();
    Ok(ChatResponse {
        content: message.content.unwrap_or_default(),
        tool_calls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenAiCompatClient {
        OpenAiCompatClient::new(format!("{}/v1/", server.uri()), "test-key", None).unwrap()
    }

    #[tokio::test]
    async fn chat_returns_content_and_sends_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({ "model": "m", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "V = I * R" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let res = client(&server)
            .chat(ChatRequest::new("m", "be helpful", "Explain Ohm's law"))
            .await
            .unwrap();
        assert_eq!(res.content, "V = I * R");
        assert!(res.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn structured_request_carries_json_schema() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "response_format": {
                    "type": "json_schema",
                    "json_schema": { "name": "verdict", "strict": true }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "{}" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let req = ChatRequest::new("m", "classify", "x").with_response_format(
            ResponseFormat::JsonSchema {
                name: "verdict".to_string(),
                schema: json!({ "type": "object" }),
            },
        );
        let res = client(&server).chat(req).await.unwrap();
        assert_eq!(res.content, "{}");
    }

    #[tokio::test]
    async fn tool_calls_are_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({ "tool_choice": "required" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_0",
                        "type": "function",
                        "function": { "name": "pick", "arguments": "{\"language\":\"french\"}" }
                    }]
                } }]
            })))
            .mount(&server)
            .await;

        let tool = ToolDefinition::function("pick", "pick one", json!({ "type": "object" }));
        let req = ChatRequest::new("m", "route", "x").with_tools(vec![tool], ToolChoice::Required);
        let res = client(&server).chat(req).await.unwrap();
        assert_eq!(res.content, "");
        assert_eq!(
            res.tool_calls,
            vec![ToolCall {
                name: "pick".to_string(),
                arguments: json!({ "language": "french" }),
            }]
        );
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = client(&server)
            .chat(ChatRequest::new("m", "i", "x"))
            .await
            .unwrap_err();
        match err {
            LlmError::Api { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_choices_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = client(&server)
            .chat(ChatRequest::new("m", "i", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[tokio::test]
    async fn list_models_reads_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": "gemini-2.5-flash" }, { "id": "gemini-2.5-pro" }]
            })))
            .mount(&server)
            .await;

        let models = client(&server).list_models().await.unwrap();
        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["gemini-2.5-flash", "gemini-2.5-pro"]);
    }
}
