//! Agent runtime for StaySearch.
//!
//! This crate holds the reasoning half of the search flow: an LLM client that
//! speaks the OpenAI Chat Completions dialect (including Azure-style
//! deployment endpoints), and a bounded-step ReAct loop that lets the model
//! call tools before it commits to a final answer.
//!
//! ```text
//! ┌─────────────┐   turn ≤ max_turns   ┌──────────────┐
//! │ react_loop  │─────────────────────>│  LLM client  │
//! └──────┬──────┘                      └──────────────┘
//!        │ tool calls
//!        v
//! ┌─────────────┐
//! │ ToolAdapter │  (MCP sessions live behind this trait)
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`llm`] -- LLM client, streaming accumulator, and wire types.
//! - [`runtime`] -- The ReAct loop and tool adapter trait.
//! - [`error`] -- Agent error types.

pub mod error;
pub mod llm;
pub mod runtime;

pub use error::{AgentError, Result};
pub use llm::{
    ChatRequest, LlmClient, LlmClientConfig, LlmProvider, LlmResponse, Message, Role, ToolCall,
    ToolDefinition, ToolResult,
};
pub use runtime::{AgentConfig, AgentContext, AgentResponse, ChatModel, ToolAdapter, react_loop};
