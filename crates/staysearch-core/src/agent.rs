//! The search agent: an LLM driving MCP tools through the ReAct loop.

use std::sync::Arc;

use async_trait::async_trait;
use staysearch_agent::{AgentConfig, AgentContext, AgentError, ChatModel, react_loop};
use staysearch_mcp::{McpClient, McpToolAdapter};

use crate::error::{Result, SearchError};
use crate::query::Query;
use crate::traits::QueryAgent;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a travel assistant that finds places to stay. \
Use the available listing-search tools to look up accommodation that matches the user's \
destination, dates and number of guests. Summarize the best options with price, rating and \
link. If the tools return nothing useful, say so plainly instead of inventing listings.";

/// An LLM bound to an MCP client and a step budget.
///
/// Holds no per-query state: sessions are opened at the start of each run
/// and closed by the query runner afterwards.
pub struct SearchAgent {
    llm: Arc<dyn ChatModel>,
    client: Arc<McpClient>,
    model: String,
    max_steps: u32,
    system_prompt: String,
}

impl SearchAgent {
    pub fn new(
        llm: Arc<dyn ChatModel>,
        client: Arc<McpClient>,
        model: impl Into<String>,
        max_steps: u32,
    ) -> Self {
        Self {
            llm,
            client,
            model: model.into(),
            max_steps,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
        }
    }

    /// Replace the built-in system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    fn dated_prompt(&self) -> String {
        let today = chrono::Local::now().format("%A, %B %-d, %Y");
        format!("{}\n\nToday is {today}.", self.system_prompt)
    }
}

#[async_trait]
impl QueryAgent for SearchAgent {
    async fn run(&self, query: &Query, max_steps: u32) -> Result<String> {
        let sessions = self.client.create_all_sessions().await.map_err(|e| {
            SearchError::AgentExecution(AgentError::ToolUnavailable { source: Box::new(e) })
        })?;

        let config = AgentConfig {
            max_turns: max_steps,
            model: self.model.clone(),
            ..AgentConfig::default()
        };
        let mut ctx = AgentContext::new(
            Arc::clone(&self.llm),
            McpToolAdapter::for_sessions(&sessions),
            config,
        )
        .with_system_prompt(self.dated_prompt())
        .with_user_message(query.as_str());

        let response = react_loop(&mut ctx).await?;
        tracing::info!(
            task_id = %response.task_id,
            turns = response.turns_used,
            "search agent answered"
        );
        Ok(response.text)
    }

    fn max_steps(&self) -> u32 {
        self.max_steps
    }
}
