//! Error types for search orchestration.

use staysearch_agent::AgentError;
use staysearch_mcp::McpError;

/// Everything that can go wrong between reading configuration and showing
/// a result.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Missing or invalid configuration.  Fatal; nothing is retried.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    /// The query was empty or whitespace only.
    #[error("Please enter a valid query.")]
    EmptyQuery,

    /// The agent failed: model, tool, transport or step budget.
    #[error("agent execution failed: {0}")]
    AgentExecution(#[from] AgentError),

    /// The agent succeeded but its sessions could not be closed.
    #[error("session cleanup failed: {0}")]
    SessionCleanup(#[source] McpError),

    /// The agent failed and closing its sessions failed too.
    #[error("agent execution failed: {agent} (session cleanup also failed: {cleanup})")]
    AgentExecutionWithCleanup {
        #[source]
        agent: AgentError,
        cleanup: McpError,
    },

    /// The task driving the query was lost before it produced a result.
    #[error("search task panicked: {reason}")]
    HostPanicked { reason: String },
}

impl SearchError {
    /// The agent error behind this failure, if any.
    pub fn agent_error(&self) -> Option<&AgentError> {
        match self {
            Self::AgentExecution(e) | Self::AgentExecutionWithCleanup { agent: e, .. } => Some(e),
            _ => None,
        }
    }

    /// Whether the agent ran out of steps.
    pub fn is_step_budget_exceeded(&self) -> bool {
        self.agent_error()
            .is_some_and(AgentError::is_step_budget_exceeded)
    }
}

/// Convenience alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, SearchError>;
