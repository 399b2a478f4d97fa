//! LLM integration layer.
//!
//! - [`types`] -- Provider-agnostic messages, tool calls and requests.
//! - [`client`] -- HTTP client for OpenAI-style chat completion endpoints.
//! - [`streaming`] -- SSE accumulator for streamed chat completions.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::{LlmClient, LlmClientConfig, LlmProvider};
pub use types::{
    ChatRequest, LlmResponse, Message, Role, ToolCall, ToolDefinition, ToolResult, Usage,
};
