//! Core ReAct loop runtime.
//!
//! The agent sends the conversation to the model; when the model answers
//! with tool calls the runtime executes them and feeds the results back.
//! This repeats until the model produces a final text answer or the step
//! budget (`max_turns`) runs out.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::llm::LlmClient;
use crate::llm::types::{ChatRequest, LlmResponse, Message, ToolCall, ToolDefinition, ToolResult};

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Something that can execute tool calls on behalf of the agent.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// The unique identifier for this adapter.
    fn adapter_id(&self) -> &str;

    /// Tool definitions this adapter exposes to the model.
    fn tool_definitions(&self) -> Vec<ToolDefinition>;

    /// Execute a named tool and return text suitable for the model.
    async fn execute(&self, tool_name: &str, arguments: Value) -> Result<String>;
}

/// A model that can answer one chat turn.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<LlmResponse>;
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn complete(&self, request: &ChatRequest) -> Result<LlmResponse> {
        if request.stream {
            self.stream_chat(request).await
        } else {
            self.chat(request).await
        }
    }
}

// ---------------------------------------------------------------------------
// Agent context
// ---------------------------------------------------------------------------

/// Configuration for the ReAct loop.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Step budget: one model call plus its tool executions is one turn.
    pub max_turns: u32,

    /// Model or deployment identifier; empty uses the client default.
    pub model: String,

    pub temperature: Option<f32>,

    pub max_tokens: Option<u32>,

    /// Use streaming SSE for model calls.
    pub stream: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 30,
            model: String::new(),
            temperature: Some(0.0),
            max_tokens: Some(4096),
            stream: true,
        }
    }
}

/// State for a single agent invocation.
pub struct AgentContext {
    pub task_id: Uuid,
    pub messages: Vec<Message>,
    pub adapters: Vec<Arc<dyn ToolAdapter>>,
    pub llm: Arc<dyn ChatModel>,
    pub config: AgentConfig,
}

impl AgentContext {
    pub fn new(
        llm: Arc<dyn ChatModel>,
        adapters: Vec<Arc<dyn ToolAdapter>>,
        config: AgentConfig,
    ) -> Self {
        Self {
            task_id: Uuid::now_v7(),
            messages: Vec::new(),
            adapters,
            llm,
            config,
        }
    }

    /// Put a system prompt at the head of the conversation.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.messages.insert(0, Message::system(prompt));
        self
    }

    pub fn with_user_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(Message::user(message));
        self
    }

    fn all_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.adapters
            .iter()
            .flat_map(|a| a.tool_definitions())
            .collect()
    }

    fn find_adapter_for_tool(&self, tool_name: &str) -> Option<&Arc<dyn ToolAdapter>> {
        self.adapters
            .iter()
            .find(|a| a.tool_definitions().iter().any(|td| td.name == tool_name))
    }
}

// ---------------------------------------------------------------------------
// Agent response
// ---------------------------------------------------------------------------

/// The final response from an agent invocation.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub text: String,
    pub turns_used: u32,
    pub task_id: Uuid,
}

// ---------------------------------------------------------------------------
// ReAct loop
// ---------------------------------------------------------------------------

/// Execute the ReAct (Reason + Act) loop.
///
/// # Errors
///
/// Returns [`AgentError::MaxTurnsExceeded`] when the step budget runs out,
/// [`AgentError::UnknownTool`] when the model names a tool nobody provides,
/// and propagates model transport errors unchanged.  Failures inside a tool
/// are reported back to the model as error text instead.
pub async fn react_loop(ctx: &mut AgentContext) -> Result<AgentResponse> {
    let tools = ctx.all_tool_definitions();
    let task_id = ctx.task_id;
    let max_turns = ctx.config.max_turns;

    tracing::info!(
        task_id = %task_id,
        max_turns,
        tool_count = tools.len(),
        "starting ReAct loop"
    );

    for turn in 0..max_turns {
        tracing::debug!(turn, "ReAct turn start");

        let request = ChatRequest {
            model: ctx.config.model.clone(),
            messages: ctx.messages.clone(),
            tools: tools.clone(),
            temperature: ctx.config.temperature,
            max_tokens: ctx.config.max_tokens,
            stream: ctx.config.stream,
        };

        match ctx.llm.complete(&request).await? {
            LlmResponse::Text(text) => {
                tracing::info!(task_id = %task_id, turns = turn + 1, "ReAct loop completed");
                ctx.messages.push(Message::assistant(&text));
                return Ok(AgentResponse {
                    text,
                    turns_used: turn + 1,
                    task_id,
                });
            }

            LlmResponse::ToolCalls(calls) => {
                tracing::info!(
                    task_id = %task_id,
                    turn,
                    tools = ?calls.iter().map(|c| &c.name).collect::<Vec<_>>(),
                    "model requested tool calls"
                );

                ctx.messages.push(Message::assistant_tool_calls(calls.clone()));
                for result in execute_tool_calls(&calls, ctx).await? {
                    ctx.messages
                        .push(Message::tool_result(result.tool_call_id, result.content));
                }
            }
        }
    }

    tracing::warn!(task_id = %task_id, max_turns, "step budget exhausted");
    Err(AgentError::MaxTurnsExceeded { task_id, max_turns })
}

/// Run one turn's tool calls in order.
///
/// Calls share the MCP sessions of a single query, so they are executed one
/// after another rather than fanned out.
async fn execute_tool_calls(calls: &[ToolCall], ctx: &AgentContext) -> Result<Vec<ToolResult>> {
    let mut results = Vec::with_capacity(calls.len());

    for call in calls {
        let adapter = ctx
            .find_adapter_for_tool(&call.name)
            .ok_or_else(|| AgentError::UnknownTool {
                tool_name: call.name.clone(),
            })?;

        tracing::debug!(tool = %call.name, id = %call.id, adapter = adapter.adapter_id(), "executing tool");

        let result = match adapter.execute(&call.name, call.arguments.clone()).await {
            Ok(content) => ToolResult {
                tool_call_id: call.id.clone(),
                content,
                is_error: false,
            },
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "tool execution failed");
                ToolResult {
                    tool_call_id: call.id.clone(),
                    content: format!("Error: {e}"),
                    is_error: true,
                }
            }
        };
        results.push(result);
    }

    Ok(results)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
