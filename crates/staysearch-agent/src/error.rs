//! Agent error types.
//!
//! Every failure inside the agent (model transport, response parsing, tool
//! execution, step budget) surfaces as an [`AgentError`].

use uuid::Uuid;

/// Unified error type for the agent runtime.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    // -- LLM errors ----------------------------------------------------------
    /// An HTTP request to the LLM endpoint failed.
    #[error("llm request failed: {reason}")]
    LlmRequestFailed { reason: String },

    /// The LLM response could not be parsed into the expected format.
    #[error("llm response parse error: {reason}")]
    LlmParseFailed { reason: String },

    /// The streaming SSE connection was interrupted or produced invalid data.
    #[error("llm stream error: {reason}")]
    LlmStreamError { reason: String },

    /// No API key was supplied for an endpoint that requires one.
    #[error("missing api key for provider: {provider}")]
    MissingApiKey { provider: String },

    // -- Runtime errors ------------------------------------------------------
    /// The ReAct loop used its whole step budget without a final answer.
    #[error("step budget of {max_turns} exhausted without a final answer (task {task_id})")]
    MaxTurnsExceeded { task_id: Uuid, max_turns: u32 },

    /// The model asked for a tool that no adapter provides.
    #[error("unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    /// A tool invocation failed in a way the loop cannot recover from.
    #[error("tool execution failed for `{tool_name}`: {reason}")]
    ToolExecutionFailed { tool_name: String, reason: String },

    /// A tool backend could not be reached before the loop started.
    #[error("tool session could not be opened: {source}")]
    ToolUnavailable {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // -- Serialization -------------------------------------------------------
    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    // -- Generic -------------------------------------------------------------
    /// Catch-all for unexpected internal errors.
    #[error("internal agent error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Whether this error is the step-budget condition.
    pub fn is_step_budget_exceeded(&self) -> bool {
        matches!(self, Self::MaxTurnsExceeded { .. })
    }
}

/// Convenience alias used throughout the agent crate.
pub type Result<T> = std::result::Result<T, AgentError>;

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        Self::LlmRequestFailed {
            reason: err.to_string(),
        }
    }
}
