//! Exposes an MCP session's tools to the agent's ReAct loop.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use staysearch_agent::{AgentError, ToolAdapter, ToolDefinition};

use crate::session::McpSession;

/// A [`ToolAdapter`] backed by one MCP session.
pub struct McpToolAdapter {
    adapter_id: String,
    session: Arc<McpSession>,
    definitions: Vec<ToolDefinition>,
}

impl McpToolAdapter {
    pub fn new(session: Arc<McpSession>) -> Self {
        let definitions = session
            .tools()
            .iter()
            .map(|tool| ToolDefinition {
                name: tool.name.clone(),
                description: tool.description.clone().unwrap_or_default(),
                input_schema: tool.input_schema.clone(),
            })
            .collect();
        Self {
            adapter_id: format!("mcp:{}", session.name()),
            session,
            definitions,
        }
    }

    /// One adapter per session.
    pub fn for_sessions(sessions: &[Arc<McpSession>]) -> Vec<Arc<dyn ToolAdapter>> {
        sessions
            .iter()
            .map(|s| Arc::new(Self::new(Arc::clone(s))) as Arc<dyn ToolAdapter>)
            .collect()
    }
}

#[async_trait]
impl ToolAdapter for McpToolAdapter {
    fn adapter_id(&self) -> &str {
        &self.adapter_id
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.definitions.clone()
    }

    async fn execute(&self, tool_name: &str, arguments: Value) -> staysearch_agent::Result<String> {
        let result = self
            .session
            .call_tool(tool_name, arguments)
            .await
            .map_err(|e| AgentError::ToolExecutionFailed {
                tool_name: tool_name.to_owned(),
                reason: e.to_string(),
            })?;

        let text = result.to_text();
        if result.is_error {
            return Err(AgentError::ToolExecutionFailed {
                tool_name: tool_name.to_owned(),
                reason: text,
            });
        }
        Ok(text)
    }
}
