//! Chat-completions LLM client.
//!
//! Talks to the **OpenAI Chat Completions API** and anything that mimics it
//! (gateways, local servers), plus **Azure-style deployments** where the
//! model is addressed by a deployment identifier in the URL path rather than
//! by a `model` field.  Both streaming SSE and non-streaming modes are
//! supported.

use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};

use crate::error::{AgentError, Result};
use crate::llm::streaming::ChatStreamAccumulator;
use crate::llm::types::{ChatRequest, LlmResponse, Message, Role, ToolCall, ToolDefinition};

/// Default OpenAI API base URL.
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default `api-version` query value for deployment endpoints.
const AZURE_API_VERSION: &str = "2024-06-01";

/// Per-request HTTP timeout.
const REQUEST_TIMEOUT_SECS: u64 = 120;

// ---------------------------------------------------------------------------
// Provider and configuration
// ---------------------------------------------------------------------------

/// How the endpoint expects the model to be addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmProvider {
    /// `POST {base}/chat/completions` with `model` in the body and bearer auth.
    OpenAi,
    /// `POST {base}/openai/deployments/{id}/chat/completions?api-version=..`
    /// with an `api-key` header.
    AzureOpenAi,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::AzureOpenAi => "azure",
        }
    }
}

/// Configuration for one LLM endpoint.
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    pub provider: LlmProvider,
    pub api_key: String,
    pub base_url: String,
    /// Model name or deployment identifier used when a request leaves
    /// [`ChatRequest::model`] empty.
    pub default_model: String,
    pub max_tokens: u32,
    /// `api-version` for deployment endpoints; ignored by [`LlmProvider::OpenAi`].
    pub api_version: String,
}

impl LlmClientConfig {
    /// Configuration for the public OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::openai_compatible(api_key, model, OPENAI_BASE_URL)
    }

    /// Configuration for any OpenAI-compatible endpoint.
    pub fn openai_compatible(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            api_key: api_key.into(),
            base_url: base_url.into(),
            default_model: model.into(),
            max_tokens: 4096,
            api_version: AZURE_API_VERSION.to_owned(),
        }
    }

    /// Configuration for a deployment-addressed endpoint.
    pub fn azure(
        api_key: impl Into<String>,
        deployment_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            provider: LlmProvider::AzureOpenAi,
            ..Self::openai_compatible(api_key, deployment_id, base_url)
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// An HTTP client for chat-completion endpoints.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: LlmClientConfig,
    http: reqwest::Client,
}

impl LlmClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::MissingApiKey`] when the key is empty.
    pub fn new(config: LlmClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AgentError::MissingApiKey {
                provider: config.provider.as_str().into(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { config, http })
    }

    pub fn provider(&self) -> LlmProvider {
        self.config.provider.clone()
    }

    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }

    /// Send a chat request and wait for the complete response.
    pub async fn chat(&self, request: &ChatRequest) -> Result<LlmResponse> {
        let body = self.build_request_body(request, false);
        let resp = self.send(request, &body).await?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| AgentError::LlmRequestFailed {
            reason: format!("failed to read response body: {e}"),
        })?;
        if !status.is_success() {
            return Err(AgentError::LlmRequestFailed {
                reason: format!("API returned {status}: {text}"),
            });
        }

        let v: Value = serde_json::from_str(&text).map_err(|e| AgentError::LlmParseFailed {
            reason: format!("invalid JSON response: {e}"),
        })?;
        parse_chat_response(&v)
    }

    /// Send a chat request in streaming mode and return the aggregated
    /// response.
    pub async fn stream_chat(&self, request: &ChatRequest) -> Result<LlmResponse> {
        self.stream_chat_with_callback(request, |_| {}).await
    }

    /// Streaming chat that hands every text fragment to `on_text`.
    pub async fn stream_chat_with_callback<F>(
        &self,
        request: &ChatRequest,
        mut on_text: F,
    ) -> Result<LlmResponse>
    where
        F: FnMut(&str) + Send,
    {
        let body = self.build_request_body(request, true);
        let resp = self.send(request, &body).await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AgentError::LlmRequestFailed {
                reason: format!("API returned {status}: {text}"),
            });
        }

        let mut accumulator = ChatStreamAccumulator::new();
        let mut byte_stream = resp.bytes_stream();
        // Raw bytes: a multi-byte character may straddle two chunks.
        let mut line_buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk.map_err(|e| AgentError::LlmStreamError {
                reason: format!("stream read error: {e}"),
            })?;
            line_buffer.extend_from_slice(&chunk);

            while let Some(newline) = line_buffer.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = line_buffer.drain(..=newline).collect();
                let line = String::from_utf8(raw).map_err(|e| AgentError::LlmStreamError {
                    reason: format!("invalid UTF-8 in stream: {e}"),
                })?;
                if let Some(delta) = accumulator.feed_line(&line)? {
                    on_text(&delta);
                }
                if accumulator.is_done() {
                    return accumulator.into_response();
                }
            }
        }

        if !line_buffer.is_empty() {
            let tail = String::from_utf8(line_buffer).map_err(|e| AgentError::LlmStreamError {
                reason: format!("invalid UTF-8 in stream: {e}"),
            })?;
            if let Some(delta) = accumulator.feed_line(&tail)? {
                on_text(&delta);
            }
        }

        accumulator.into_response()
    }

    // -- Request building ----------------------------------------------------

    fn model_for<'a>(&'a self, request: &'a ChatRequest) -> &'a str {
        if request.model.is_empty() {
            &self.config.default_model
        } else {
            &request.model
        }
    }

    /// The endpoint URL for a request.
    pub fn endpoint_url(&self, request: &ChatRequest) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match self.config.provider {
            LlmProvider::OpenAi => format!("{base}/chat/completions"),
            LlmProvider::AzureOpenAi => format!(
                "{base}/openai/deployments/{}/chat/completions?api-version={}",
                self.model_for(request),
                self.config.api_version
            ),
        }
    }

    fn build_request_body(&self, request: &ChatRequest, stream: bool) -> Value {
        let mut body = json!({
            "model": self.model_for(request),
            "max_tokens": request.max_tokens.unwrap_or(self.config.max_tokens),
            "messages": messages_to_wire(&request.messages),
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = json!(temp);
        }
        if !request.tools.is_empty() {
            body["tools"] = tools_to_wire(&request.tools);
        }
        if stream {
            body["stream"] = json!(true);
        }

        body
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let invalid = |e: reqwest::header::InvalidHeaderValue| AgentError::LlmRequestFailed {
            reason: format!("invalid credential header: {e}"),
        };

        let mut headers = HeaderMap::new();
        match self.config.provider {
            LlmProvider::OpenAi => {
                let value = format!("Bearer {}", self.config.api_key);
                headers.insert(AUTHORIZATION, HeaderValue::from_str(&value).map_err(invalid)?);
            }
            LlmProvider::AzureOpenAi => {
                headers.insert(
                    HeaderName::from_static("api-key"),
                    HeaderValue::from_str(&self.config.api_key).map_err(invalid)?,
                );
            }
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn send(&self, request: &ChatRequest, body: &Value) -> Result<reqwest::Response> {
        let url = self.endpoint_url(request);
        tracing::debug!(
            url = %url,
            model = %body["model"],
            provider = self.config.provider.as_str(),
            "sending LLM request"
        );

        self.http
            .post(&url)
            .headers(self.auth_headers()?)
            .json(body)
            .send()
            .await
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: e.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Wire format conversion
// ---------------------------------------------------------------------------

/// Convert messages to the chat-completions wire format.
pub fn messages_to_wire(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|msg| match msg.role {
            Role::System => json!({ "role": "system", "content": msg.content }),
            Role::User => json!({ "role": "user", "content": msg.content }),
            Role::Assistant if msg.tool_calls.is_empty() => {
                json!({ "role": "assistant", "content": msg.content })
            }
            Role::Assistant => {
                let calls: Vec<Value> = msg
                    .tool_calls
                    .iter()
                    .map(|tc| {
                        json!({
                            "id": tc.id,
                            "type": "function",
                            "function": {
                                "name": tc.name,
                                "arguments": tc.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
                let mut wire = json!({ "role": "assistant", "tool_calls": calls });
                if !msg.content.is_empty() {
                    wire["content"] = json!(msg.content);
                }
                wire
            }
            Role::Tool => json!({
                "role": "tool",
                "tool_call_id": msg.tool_call_id,
                "content": msg.content,
            }),
        })
        .collect()
}

/// Convert tool definitions to the `{"type": "function", ...}` wire format.
pub fn tools_to_wire(tools: &[ToolDefinition]) -> Value {
    Value::Array(
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.input_schema,
                    }
                })
            })
            .collect(),
    )
}

/// Parse a non-streaming chat-completions response.
pub fn parse_chat_response(v: &Value) -> Result<LlmResponse> {
    let message = &v["choices"][0]["message"];
    if message.is_null() {
        return Err(AgentError::LlmParseFailed {
            reason: "missing `choices[0].message` in response".into(),
        });
    }

    if let Some(calls) = message["tool_calls"].as_array()
        && !calls.is_empty()
    {
        let calls = calls
            .iter()
            .map(|tc| {
                let name = tc["function"]["name"].as_str().unwrap_or_default().to_owned();
                let raw = tc["function"]["arguments"].as_str().unwrap_or("{}");
                let arguments: Value =
                    serde_json::from_str(raw).map_err(|e| AgentError::LlmParseFailed {
                        reason: format!("invalid JSON in tool call `{name}` arguments: {e}"),
                    })?;
                Ok(ToolCall {
                    id: tc["id"].as_str().unwrap_or_default().to_owned(),
                    name,
                    arguments,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(LlmResponse::ToolCalls(calls));
    }

    Ok(LlmResponse::Text(
        message["content"].as_str().unwrap_or_default().to_owned(),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
